// spec.md §3 Data Model: an event is referenced three ways - source form
// (exact bytes, kept when `json_source` is set so signatures stay
// verifiable), tuple form (this struct), and index form (`EventIndex`, a
// 64-bit opaque handle assigned on write). The three-way bijection
// between index, event_id, and bytes is a storage-layer invariant
// (submerge-rowdb), not something this struct enforces by itself.

use crate::ids::{EventId, RoomId, UserId};
use crate::room_version::RoomVersion;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// The opaque 64-bit handle used for all internal cross-references once
/// an event has been written, so the hot paths (prev/auth adjacency,
/// depth ordering) never carry string ids. Never exposed over federation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct EventIndex(pub u64);

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Hashes {
    pub sha256: String,
}

/// A signature set keyed by origin server name, then by key id, base64
/// unpadded, matching `m.signatures`.
pub type Signatures = std::collections::BTreeMap<String, std::collections::BTreeMap<String, String>>;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Unsigned {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

/// The parsed ("tuple") view of an event. Construction does not imply
/// the event has passed conform/verify/auth - an `Event` is just a shape,
/// the way `ircd::m::event` is a field accessor over a json::tuple
/// without judging validity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    pub sender: UserId,
    pub room_id: RoomId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
    pub content: Value,
    pub depth: i64,
    pub prev_events: Vec<EventId>,
    pub auth_events: Vec<EventId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashes: Option<Hashes>,
    #[serde(default, skip_serializing_if = "Signatures_is_empty")]
    pub signatures: Signatures,
    pub origin: String,
    pub origin_server_ts: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsigned: Option<Unsigned>,

    /// Present for room versions that carry an explicit id (v1/v2); for
    /// newer versions this is filled in only after derivation and is not
    /// part of the signed content (it's derived *from* the signed content).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
}

#[allow(non_snake_case)]
fn Signatures_is_empty(s: &Signatures) -> bool {
    s.is_empty()
}

impl Event {
    pub fn is_state_event(&self) -> bool {
        self.state_key.is_some()
    }

    /// A `(type, state_key)` pair identifies the slot a state event
    /// occupies in the room's present-state table (spec.md GLOSSARY).
    pub fn state_key_tuple(&self) -> Option<(&str, &str)> {
        self.state_key.as_deref().map(|sk| (self.kind.as_str(), sk))
    }
}

/// The three forms spec.md §3 requires a committed event to keep
/// consistent: exact bytes (when preserved), the parsed tuple, and the
/// derived id. `source` is `None` whenever the evaluator reserialized
/// from the tuple (i.e. `json_source` was false at write time).
#[derive(Clone, Debug)]
pub struct EventSource {
    pub tuple: Event,
    pub source: Option<Arc<str>>,
    pub room_version: RoomVersion,
}

impl EventSource {
    pub fn event_id(&self) -> Option<&EventId> {
        self.tuple.event_id.as_ref()
    }
}
