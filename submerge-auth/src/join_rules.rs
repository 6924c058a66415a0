// spec.md §4.6: "power-level and join_rules checks." `Restricted` and
// `KnockRestricted` (v8+) additionally carry an `allow` list of rooms
// whose membership substitutes for an invite; that list is a client-API
// presentation detail once authorized, so this enum only names which
// rule applies, leaving the `allow` list check to `rules.rs` which has
// the full `AuthState` to consult.

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JoinRule {
    Public,
    Invite,
    Knock,
    Restricted,
    KnockRestricted,
    Private,
}

impl JoinRule {
    pub fn parse(s: &str) -> JoinRule {
        match s {
            "public" => JoinRule::Public,
            "knock" => JoinRule::Knock,
            "restricted" => JoinRule::Restricted,
            "knock_restricted" => JoinRule::KnockRestricted,
            "private" => JoinRule::Private,
            // "invite" and anything unrecognized default to the
            // strictest widely-deployed rule, matching the spec's own
            // fallback for rooms that predate join_rules.
            _ => JoinRule::Invite,
        }
    }
}
