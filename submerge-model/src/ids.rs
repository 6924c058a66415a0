// Identifiers are opaque sigiled strings in the wire protocol (`$`, `!`,
// `@`, `#` for events, rooms, users, aliases respectively) but the core
// never needs to parse their localpart/domain structure - only compare,
// hash, and round-trip them - so each is a thin newtype over an interned
// `Box<str>` rather than a parsed struct. Parsing into localpart+server
// lives at the client-API boundary, out of scope here (spec.md §1).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

macro_rules! sigil_id {
    ($name:ident, $sigil:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Arc<str>);

        impl $name {
            pub const SIGIL: char = $sigil;

            pub fn new(s: impl Into<Arc<str>>) -> Self {
                $name(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s.into())
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(Arc::from(s))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

sigil_id!(EventId, '$', "An event's content-addressed or origin-assigned identifier.");
sigil_id!(RoomId, '!', "A room's opaque identifier (stable across its whole history).");
sigil_id!(UserId, '@', "A matrix user id (`@localpart:server`), opaque to the core.");
sigil_id!(ServerName, ' ', "A federation peer's DNS name, used to key the keyring and the fetch coalescing map.");

impl EventId {
    /// True for the synthetic placeholder assigned to EDUs, which never
    /// receive a real `event_id` (spec.md §4.1 `edu` option, GLOSSARY "EDU").
    pub fn is_edu_placeholder(&self) -> bool {
        self.0.is_empty()
    }

    pub fn edu_placeholder() -> Self {
        EventId(Arc::from(""))
    }
}
