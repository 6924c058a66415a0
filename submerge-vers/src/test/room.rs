use crate::RoomDag;
use submerge_model::{EventIndex, RoomVersion};
use test_log::test;

#[test]
fn apply_write_respects_independent_toggles() {
    let mut dag = RoomDag::new(RoomVersion::V11);
    // present=false, history=true: present-state slot untouched, history recorded.
    dag.apply_write(EventIndex(1), 1, Some(("m.room.name", "")), &[], false, true, false, true);
    assert!(dag.present.get("m.room.name", "").is_none());
    assert_eq!(dag.history.change_count("m.room.name", ""), 1);
    assert!(dag.heads.is_head(EventIndex(1)));

    // present=true on a later depth: slot now set, head resolved.
    dag.apply_write(
        EventIndex(2),
        2,
        Some(("m.room.name", "")),
        &[EventIndex(1)],
        true,
        true,
        true,
        true,
    );
    assert_eq!(dag.present.get("m.room.name", ""), Some(EventIndex(2)));
    assert!(!dag.heads.is_head(EventIndex(1)));
    assert!(dag.heads.is_head(EventIndex(2)));
}

#[test]
fn history_at_depth_returns_most_recent_change_at_or_before() {
    let mut dag = RoomDag::new(RoomVersion::V11);
    dag.apply_write(EventIndex(1), 1, Some(("m.room.topic", "")), &[], true, true, false, true);
    dag.apply_write(
        EventIndex(2),
        5,
        Some(("m.room.topic", "")),
        &[EventIndex(1)],
        true,
        true,
        true,
        true,
    );
    assert_eq!(dag.history.at_depth("m.room.topic", "", 3), Some(EventIndex(1)));
    assert_eq!(dag.history.at_depth("m.room.topic", "", 5), Some(EventIndex(2)));
    assert_eq!(dag.history.at_depth("m.room.topic", "", 0), None);
}
