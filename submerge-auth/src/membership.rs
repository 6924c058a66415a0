use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Membership {
    Invite,
    Join,
    Leave,
    Ban,
    Knock,
}

impl Membership {
    pub fn parse(s: &str) -> Option<Membership> {
        match s {
            "invite" => Some(Membership::Invite),
            "join" => Some(Membership::Join),
            "leave" => Some(Membership::Leave),
            "ban" => Some(Membership::Ban),
            "knock" => Some(Membership::Knock),
            _ => None,
        }
    }

    /// spec.md §4.6: "state-transition table over membership values". A
    /// row is `(current, proposed) -> allowed`; the caller still has to
    /// separately check power levels and join_rules (see `rules.rs`) -
    /// this table only captures which transitions are *structurally*
    /// sane regardless of who's asking.
    pub fn transition_allowed(current: Option<Membership>, proposed: Membership) -> bool {
        use Membership::*;
        match (current, proposed) {
            // Nobody may re-propose the state they're already in, except
            // join (joins can be idempotent, e.g. profile updates).
            (Some(Ban), _) if proposed != Leave => false, // only an unban (via leave's kick path) exits a ban
            (Some(Ban), Leave) => false, // bans are lifted by the room's moderator acting as "leave", not the banned user
            (None, Join) => true,       // initial join, e.g. room creator
            (None, Invite) => true,
            (None, Knock) => true,
            (None, Leave) => false,
            (None, Ban) => true, // pre-emptive ban of a never-joined user
            (Some(Invite), Join) => true,
            (Some(Invite), Leave) => true, // reject invite
            (Some(Invite), Ban) => true,
            (Some(Invite), Invite) => false,
            (Some(Invite), Knock) => false,
            (Some(Join), Leave) => true,
            (Some(Join), Ban) => true,
            (Some(Join), Join) => true, // profile update
            (Some(Join), Invite) => false,
            (Some(Join), Knock) => false,
            (Some(Leave), Join) => true,
            (Some(Leave), Invite) => true,
            (Some(Leave), Ban) => true,
            (Some(Leave), Knock) => true,
            (Some(Leave), Leave) => false,
            (Some(Knock), Join) => true,
            (Some(Knock), Leave) => true,
            (Some(Knock), Ban) => true,
            (Some(Knock), Invite) => false,
            (Some(Knock), Knock) => false,
        }
    }
}
