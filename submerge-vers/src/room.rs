// Aggregates the three per-room tables the writer touches in step 3 of
// spec.md §4.7, plus the room's version, behind one handle so
// submerge-vm's writer only needs one lock/lookup per room rather than
// three independently-keyed ones.

use crate::head::HeadSet;
use crate::history::HistoryTree;
use crate::resolution::AuthRuleSet;
use crate::state::PresentState;
use submerge_model::{EventIndex, RoomVersion};

pub struct RoomDag {
    pub version: RoomVersion,
    pub present: PresentState,
    pub heads: HeadSet,
    pub history: HistoryTree,
}

impl RoomDag {
    pub fn new(version: RoomVersion) -> Self {
        RoomDag {
            version,
            present: PresentState::new(),
            heads: HeadSet::new(),
            history: HistoryTree::new(),
        }
    }

    pub fn auth_rule_set(&self) -> AuthRuleSet {
        AuthRuleSet::for_version(self.version)
    }

    /// Applies the three writer-controlled index updates for one
    /// committed event, gated the way spec.md §4.7 step 3 describes:
    /// `present` toggles the state-slot write, `room_head` toggles
    /// adding this event to the frontier, `room_head_resolve` toggles
    /// removing its `prev_events` from the frontier, `history` toggles
    /// recording the change. None of the four are implied by the others.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_write(
        &mut self,
        index: EventIndex,
        depth: i64,
        state_key_tuple: Option<(&str, &str)>,
        prev_indices: &[EventIndex],
        present: bool,
        room_head: bool,
        room_head_resolve: bool,
        history: bool,
    ) {
        if let Some((event_type, state_key)) = state_key_tuple {
            if present {
                self.present.set(event_type, state_key, index);
            }
            if history {
                self.history.record(event_type, state_key, depth, index);
            }
        }
        if room_head {
            self.heads.insert(index);
        }
        if room_head_resolve {
            self.heads.resolve(prev_indices.iter().copied());
        }
    }
}
