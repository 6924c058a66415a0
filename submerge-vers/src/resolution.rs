// spec.md §4.6: "the auth engine selects a rule set keyed on
// room_version". The *choice* of algorithm family lives here since it's
// a property of the room version, shared between the writer's
// bookkeeping and submerge-auth's rule selection; the rule
// implementations themselves stay in submerge-auth.

use submerge_model::RoomVersion;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuthRuleSet {
    /// Rules as of room version 1-5.
    V1,
    /// Adds the restricted-join and knock-room-version checks (v6-v7
    /// tightened redaction rules are a conform/redaction concern, not an
    /// auth-rule-set concern, so they don't fork this enum).
    V6,
    /// Adds restricted joins via `join_rules.allow` (v8+) and the
    /// stricter power-event auth introduced for v9-v11.
    V8,
}

impl AuthRuleSet {
    pub fn for_version(version: RoomVersion) -> AuthRuleSet {
        match version {
            RoomVersion::V1 | RoomVersion::V2 | RoomVersion::V3 | RoomVersion::V4 | RoomVersion::V5 => AuthRuleSet::V1,
            RoomVersion::V6 => AuthRuleSet::V6,
            RoomVersion::V9 | RoomVersion::V10 | RoomVersion::V11 => AuthRuleSet::V8,
        }
    }
}
