use crate::{authorize, AuthReject, AuthState};
use serde_json::json;
use submerge_model::{Event, RoomVersion};
use test_log::test;

fn base_event(kind: &str, sender: &str, room_id: &str, content: serde_json::Value) -> Event {
    Event {
        kind: kind.to_string(),
        sender: sender.into(),
        room_id: room_id.into(),
        state_key: None,
        content,
        depth: 2,
        prev_events: vec!["$prev".into()],
        auth_events: vec![],
        hashes: None,
        signatures: [("origin.example".to_string(), Default::default())].into_iter().collect(),
        origin: "origin.example".to_string(),
        origin_server_ts: 0,
        unsigned: None,
        event_id: None,
    }
}

fn create_event(room_id: &str, creator: &str) -> Event {
    let mut e = base_event("m.room.create", creator, room_id, json!({"creator": creator}));
    e.depth = 1;
    e.prev_events = vec![];
    e
}

fn member_event(room_id: &str, sender: &str, target: &str, membership: &str) -> Event {
    let mut e = base_event("m.room.member", sender, room_id, json!({"membership": membership}));
    e.state_key = Some(target.to_string());
    e
}

fn power_levels_event(room_id: &str, sender: &str, content: serde_json::Value) -> Event {
    let mut e = base_event("m.room.power_levels", sender, room_id, content);
    e.state_key = Some(String::new());
    e
}

#[test]
fn create_event_requires_sender_to_match_creator() {
    let mut create = create_event("!r:x", "@alice:x");
    let state = AuthState::default();
    assert!(authorize(&create, &state, RoomVersion::V11).is_ok());

    create.sender = "@mallory:x".into();
    let err = authorize(&create, &state, RoomVersion::V11).unwrap_err();
    assert_eq!(err, AuthReject::CreateSenderMismatch);
}

#[test]
fn creator_can_join_their_own_room_without_power_levels_event() {
    let create = create_event("!r:x", "@alice:x");
    let join = member_event("!r:x", "@alice:x", "@alice:x", "join");
    let state = AuthState::from_events([&create]);
    assert!(authorize(&join, &state, RoomVersion::V11).is_ok());
}

#[test]
fn stranger_cannot_join_an_invite_only_room_uninvited() {
    let create = create_event("!r:x", "@alice:x");
    let join_rules = {
        let mut e = base_event("m.room.join_rules", "@alice:x", "!r:x", json!({"join_rule": "invite"}));
        e.state_key = Some(String::new());
        e
    };
    let join = member_event("!r:x", "@mallory:x", "@mallory:x", "join");
    let state = AuthState::from_events([&create, &join_rules]);
    let err = authorize(&join, &state, RoomVersion::V11).unwrap_err();
    assert!(matches!(err, AuthReject::JoinRuleForbids(_)));
}

#[test]
fn public_room_allows_any_join() {
    let create = create_event("!r:x", "@alice:x");
    let join_rules = {
        let mut e = base_event("m.room.join_rules", "@alice:x", "!r:x", json!({"join_rule": "public"}));
        e.state_key = Some(String::new());
        e
    };
    let join = member_event("!r:x", "@bob:x", "@bob:x", "join");
    let state = AuthState::from_events([&create, &join_rules]);
    assert!(authorize(&join, &state, RoomVersion::V11).is_ok());
}

#[test]
fn low_power_sender_cannot_invite_when_invite_power_raised() {
    let create = create_event("!r:x", "@alice:x");
    let power_levels = power_levels_event(
        "!r:x",
        "@alice:x",
        json!({"invite": 50, "users": {"@alice:x": 100, "@bob:x": 0}}),
    );
    let invite = member_event("!r:x", "@bob:x", "@carol:x", "invite");
    let state = AuthState::from_events([&create, &power_levels]);
    let err = authorize(&invite, &state, RoomVersion::V11).unwrap_err();
    assert!(matches!(err, AuthReject::InsufficientPowerForMembership { .. }));
}

#[test]
fn event_without_required_signature_is_rejected() {
    let mut create = create_event("!r:x", "@alice:x");
    create.signatures.clear();
    let state = AuthState::default();
    let err = authorize(&create, &state, RoomVersion::V11).unwrap_err();
    assert!(matches!(err, AuthReject::MissingRequiredSignature { .. }));
}

#[test]
fn generic_state_event_requires_state_default_power() {
    let create = create_event("!r:x", "@alice:x");
    let power_levels = power_levels_event(
        "!r:x",
        "@alice:x",
        json!({"users": {"@alice:x": 100, "@bob:x": 0}}),
    );
    let mut topic = base_event("m.room.topic", "@bob:x", "!r:x", json!({"topic": "hi"}));
    topic.state_key = Some(String::new());
    let state = AuthState::from_events([&create, &power_levels]);
    let err = authorize(&topic, &state, RoomVersion::V11).unwrap_err();
    assert!(matches!(err, AuthReject::InsufficientPowerForEvent { .. }));
}
