//! Event/id/value types shared by every other crate in the workspace:
//! the room DAG's node shape, its identifiers, the room-version table
//! that governs how both are interpreted, and the canonical-JSON and
//! signing collaborator surface the evaluation core drives.

mod canonical;
mod conform;
mod crypto;
mod event;
mod ids;
mod room_version;

#[cfg(test)]
mod test;

pub use canonical::{
    canonicalize, check_strict_canonical, content_hash, derive_event_id, redacted_skeleton, signable_bytes,
};
pub use conform::{ConformFlag, ConformReport, ALL_FLAGS};
pub use crypto::{Ed25519Signer, KeyId, Signer, Verifier};
pub use event::{Event, EventIndex, EventSource, Hashes, Signatures, Unsigned};
pub use ids::{EventId, RoomId, ServerName, UserId};
pub use room_version::RoomVersion;
