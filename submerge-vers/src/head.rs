// spec.md GLOSSARY: "Head-set: for a room, the set of events referenced
// by no other local event - the DAG frontier." §4.7 step 3: `room_head`
// inserts the newly-written event, `room_head_resolve` removes its
// `prev_events` from the set (they are no longer frontier once
// something references them). §9 flags that the source left the
// `room_head`-without-`present` combination underspecified; the fix
// lives in `submerge_vm::options::Options::validate`, not here - this
// type just implements the two independent operations plainly.

use std::collections::BTreeSet;
use submerge_model::EventIndex;

#[derive(Clone, Debug, Default)]
pub struct HeadSet {
    heads: BTreeSet<EventIndex>,
}

impl HeadSet {
    pub fn new() -> Self {
        HeadSet::default()
    }

    pub fn insert(&mut self, index: EventIndex) {
        self.heads.insert(index);
    }

    /// Removes every entry in `resolved` from the frontier. Safe to call
    /// with indices that were never heads (e.g. events referenced
    /// out-of-order, backfilled after the fact).
    pub fn resolve(&mut self, resolved: impl IntoIterator<Item = EventIndex>) {
        for idx in resolved {
            self.heads.remove(&idx);
        }
    }

    pub fn is_head(&self, index: EventIndex) -> bool {
        self.heads.contains(&index)
    }

    pub fn iter(&self) -> impl Iterator<Item = EventIndex> + '_ {
        self.heads.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.heads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }
}
