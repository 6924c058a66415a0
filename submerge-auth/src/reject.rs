// spec.md §4.6: "On reject raise AUTH". This enum is the *reason*
// submerge-vm's auth phase attaches to that fault; it never escapes as
// a different fault code, only as context for logging / the rejected
// client's error body.

use std::fmt;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AuthReject {
    MissingCreateEvent,
    CreateNotFirst,
    CreateSenderMismatch,
    RoomIdMismatch,
    UnknownMembership(String),
    MembershipTransitionNotAllowed { current: Option<String>, proposed: String },
    JoinRuleForbids(JoinRule),
    InsufficientPowerForEvent { event_type: String, required: i64, have: i64 },
    InsufficientPowerForMembership { proposed: String, required: i64, have: i64 },
    SenderNotJoined,
    MissingRequiredSignature { server: String },
    MalformedPowerLevels(String),
    MalformedContent(String),
}

use crate::join_rules::JoinRule;

impl fmt::Display for AuthReject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthReject::MissingCreateEvent => write!(f, "no m.room.create in auth_events"),
            AuthReject::CreateNotFirst => write!(f, "m.room.create must be the first event in the room"),
            AuthReject::CreateSenderMismatch => write!(f, "m.room.create sender does not match room creator"),
            AuthReject::RoomIdMismatch => write!(f, "event room_id does not match create event's room_id"),
            AuthReject::UnknownMembership(m) => write!(f, "unrecognized membership value {m:?}"),
            AuthReject::MembershipTransitionNotAllowed { current, proposed } => {
                write!(f, "membership transition {current:?} -> {proposed} not allowed")
            }
            AuthReject::JoinRuleForbids(rule) => write!(f, "join_rules ({rule:?}) forbids this membership change"),
            AuthReject::InsufficientPowerForEvent { event_type, required, have } => {
                write!(f, "sender power {have} below required {required} for event type {event_type}")
            }
            AuthReject::InsufficientPowerForMembership { proposed, required, have } => {
                write!(f, "sender power {have} below required {required} for membership {proposed}")
            }
            AuthReject::SenderNotJoined => write!(f, "sender is not joined to the room"),
            AuthReject::MissingRequiredSignature { server } => write!(f, "missing required signature from {server}"),
            AuthReject::MalformedPowerLevels(msg) => write!(f, "malformed m.room.power_levels content: {msg}"),
            AuthReject::MalformedContent(msg) => write!(f, "malformed event content: {msg}"),
        }
    }
}

impl std::error::Error for AuthReject {}
