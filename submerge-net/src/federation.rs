// spec.md §6 "Federation RPCs consumed (collaborator contract)" lists
// five calls; this module is the Rust trait those five become, so
// submerge-vm's fetch coordinator can depend on a trait object and
// submerge-test can supply a scripted fake instead of a real HTTP client.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use submerge_base::Result;
use submerge_model::{EventId, RoomId, ServerName, UserId};

/// Raw event JSON bytes in source form, exactly as received or about to
/// be sent over the wire. Kept as `Arc<str>` rather than `serde_json::Value`
/// because signature verification needs the original byte sequence, not
/// a reparsed/reordered one (spec.md §3: "source form ... to keep exact
/// signatures verifiable").
pub type PduJson = Arc<str>;

/// `make_join(room, user) -> proto-event {auth_events, prev_events, depth}`.
#[derive(Clone, Debug)]
pub struct JoinTemplate {
    pub room_version: String,
    pub auth_events: Vec<EventId>,
    pub prev_events: Vec<EventId>,
    pub depth: i64,
}

/// `send_join(...) -> [code, {origin, auth_chain[], state[]}]`. The
/// `code` half of the pair is the transport's concern (HTTP status);
/// this trait only surfaces the payload a successful call returns.
#[derive(Clone, Debug)]
pub struct JoinResult {
    pub origin: ServerName,
    pub auth_chain: Vec<PduJson>,
    pub state: Vec<PduJson>,
}

/// `keys/query(server) -> {verify_keys: {key_id: base64}}`.
#[derive(Clone, Debug, Default)]
pub struct VerifyKeys(pub BTreeMap<String, String>);

/// The narrow RPC surface spec.md §1 calls out as an external
/// collaborator. Every method is fallible and async: each is a
/// suspension point per spec.md §5 ("Any fetch coordinator call awaiting
/// a peer RPC").
#[async_trait]
pub trait FederationClient: Send + Sync {
    async fn make_join(&self, origin: &ServerName, room: &RoomId, user: &UserId) -> Result<JoinTemplate>;

    async fn send_join(
        &self,
        origin: &ServerName,
        room: &RoomId,
        event_id: &EventId,
        signed_event: PduJson,
    ) -> Result<JoinResult>;

    async fn event_auth(&self, origin: &ServerName, room: &RoomId, event_id: &EventId) -> Result<Vec<PduJson>>;

    async fn backfill(
        &self,
        origin: &ServerName,
        room: &RoomId,
        from: &[EventId],
        limit: usize,
    ) -> Result<Vec<PduJson>>;

    async fn keys_query(&self, origin: &ServerName) -> Result<VerifyKeys>;
}
