// spec.md §4.7 step 3: "if `present` and event is a state event, update
// the present-state snapshot". One `PresentState` per room: a map from
// the `(type, state_key)` slot to the index of the event currently
// occupying it. This is intentionally dumb - last writer in sequence
// order wins the slot - because spec.md's Non-goals exclude "defining
// the Matrix specification itself," and full state resolution across
// concurrent forks is part of that spec, not part of the evaluation
// core's writer contract. What the writer *does* own is keeping this
// table consistent with whatever the auth/writer phases already decided
// the winning event is (see submerge-vm::writer).

use std::collections::BTreeMap;
use submerge_model::EventIndex;

#[derive(Clone, Debug, Default)]
pub struct PresentState {
    slots: BTreeMap<(String, String), EventIndex>,
}

impl PresentState {
    pub fn new() -> Self {
        PresentState::default()
    }

    /// Unconditionally sets the slot. Callers are responsible for having
    /// already decided, via `sequence` ordering, that `index` should win
    /// (spec.md invariant 2: events become visible in sequence order).
    pub fn set(&mut self, event_type: &str, state_key: &str, index: EventIndex) {
        self.slots.insert((event_type.to_string(), state_key.to_string()), index);
    }

    pub fn get(&self, event_type: &str, state_key: &str) -> Option<EventIndex> {
        self.slots.get(&(event_type.to_string(), state_key.to_string())).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(String, String), &EventIndex)> {
        self.slots.iter()
    }
}
