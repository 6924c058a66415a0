// spec.md §4.7 step 3: "if `history`, update the historical state
// BTree." Unlike `PresentState` (one slot per `(type, state_key)`,
// always overwritten), the history tree keeps every state change ever
// made, ordered by depth, so a caller can ask "what was the state at
// depth D" - the building block a `/state_ids`-style federation
// responder or a room-version auth check (which evaluates against the
// state implied by a specific `auth_events` set, not necessarily the
// present state) would need. Keyed by `(depth, EventIndex)` rather than
// just `depth` since multiple state events can share a depth.

use std::collections::BTreeMap;
use submerge_model::EventIndex;

#[derive(Clone, Debug, Default)]
pub struct HistoryTree {
    // (event_type, state_key) -> ordered changes, each an (depth, index).
    changes: BTreeMap<(String, String), Vec<(i64, EventIndex)>>,
}

impl HistoryTree {
    pub fn new() -> Self {
        HistoryTree::default()
    }

    pub fn record(&mut self, event_type: &str, state_key: &str, depth: i64, index: EventIndex) {
        let key = (event_type.to_string(), state_key.to_string());
        let entry = self.changes.entry(key).or_default();
        entry.push((depth, index));
        entry.sort_by_key(|(d, _)| *d);
    }

    /// The event index occupying this state slot at or before `depth`,
    /// i.e. the value a reader positioned at `depth` would observe.
    pub fn at_depth(&self, event_type: &str, state_key: &str, depth: i64) -> Option<EventIndex> {
        let key = (event_type.to_string(), state_key.to_string());
        self.changes
            .get(&key)
            .and_then(|changes| changes.iter().rev().find(|(d, _)| *d <= depth))
            .map(|(_, idx)| *idx)
    }

    pub fn change_count(&self, event_type: &str, state_key: &str) -> usize {
        let key = (event_type.to_string(), state_key.to_string());
        self.changes.get(&key).map(|v| v.len()).unwrap_or(0)
    }
}
