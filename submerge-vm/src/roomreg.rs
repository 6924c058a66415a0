// Holds one `submerge_vers::RoomDag` per room the node has state for.
// spec.md §5: "Sequence counters and registry are process-wide and
// mutated only by the owning task of each eval" - the writer phase is
// the only place that takes this lock, and never holds it across an
// `.await`, so a `parking_lot::Mutex` (no poisoning, cheaper uncontended
// path than `std::sync::Mutex`) is the right fit, matching how the
// teacher's other process-wide tables are guarded.

use parking_lot::Mutex;
use std::collections::HashMap;
use submerge_model::{RoomId, RoomVersion};
use submerge_vers::RoomDag;

#[derive(Default)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<RoomId, RoomDag>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        RoomRegistry::default()
    }

    pub fn ensure(&self, room: &RoomId, version: RoomVersion) {
        self.rooms.lock().entry(room.clone()).or_insert_with(|| RoomDag::new(version));
    }

    pub fn has_state(&self, room: &RoomId) -> bool {
        self.rooms.lock().contains_key(room)
    }

    pub fn with_room<R>(&self, room: &RoomId, f: impl FnOnce(&mut RoomDag) -> R) -> Option<R> {
        self.rooms.lock().get_mut(room).map(f)
    }

    pub fn version_of(&self, room: &RoomId) -> Option<RoomVersion> {
        self.rooms.lock().get(room).map(|dag| dag.version)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn ensure_is_idempotent_and_preserves_existing_state() {
        let registry = RoomRegistry::new();
        let room = RoomId::new("!r:example.org");
        registry.ensure(&room, RoomVersion::V11);
        registry.with_room(&room, |dag| dag.heads.insert(submerge_model::EventIndex(1)));
        registry.ensure(&room, RoomVersion::V1);
        assert_eq!(registry.version_of(&room), Some(RoomVersion::V11));
        assert_eq!(registry.with_room(&room, |dag| dag.heads.len()), Some(1));
    }

    #[test]
    fn unknown_room_has_no_state() {
        let registry = RoomRegistry::new();
        assert!(!registry.has_state(&RoomId::new("!unknown:example.org")));
    }
}
