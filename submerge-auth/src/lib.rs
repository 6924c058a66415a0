//! Room-version-keyed authorization rule sets (spec.md §4.6 Auth
//! Engine): "the auth engine selects a rule set keyed on room_version
//! and evaluates the event against the state formed by its declared
//! `auth_events`." The auth decision is a pure function of (event,
//! auth-event set, room-version); `submerge-vm` resolves `auth_events`
//! into actual `Event`s (via storage/fetch) and calls [`authorize`].

mod join_rules;
mod membership;
mod power_levels;
mod reject;
mod rules;
mod state;

#[cfg(test)]
mod test;

pub use join_rules::JoinRule;
pub use membership::Membership;
pub use power_levels::PowerLevels;
pub use reject::AuthReject;
pub use rules::authorize;
pub use state::AuthState;
