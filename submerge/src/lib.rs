//! The node binary's wiring: `Server<S>` bundles the evaluation core
//! (`submerge_vm::Vm`), the admin stack (`submerge_admin`'s config,
//! logging, metrics), and the collaborators the core depends on
//! (signer, clock, federation client) into the one long-lived object
//! `src/bin.rs` constructs and drives. Kept deliberately small - the
//! pipeline itself lives in `submerge-vm`, this crate just assembles it.

use async_trait::async_trait;
use rand::rngs::OsRng;
use serde_json::Value;
use std::sync::Arc;
use submerge_admin::{Metrics, NodeConfig};
use submerge_base::{err, Result, SystemClock};
use submerge_model::{Ed25519Signer, Event, RoomId, RoomVersion, ServerName, Unsigned, UserId};
use submerge_net::{FederationClient, JoinResult, JoinTemplate, PduJson, VerifyKeys};
use submerge_vm::{Copts, Fault, Store, Vm};

/// A `FederationClient` for a node with no configured peers: every call
/// fails immediately rather than hanging, the same "fail loudly instead
/// of stalling a suspended eval" posture `submerge-test`'s scripted fake
/// takes when a response wasn't queued. A node that does speak to peers
/// supplies its own `Arc<dyn FederationClient>` to [`Server::new`]
/// instead - `submerge-net` only defines the trait and the wire shapes
/// (spec.md §1: "Federation wire clients ... are collaborators").
pub struct OfflineFederationClient;

#[async_trait]
impl FederationClient for OfflineFederationClient {
    async fn make_join(&self, origin: &ServerName, _room: &RoomId, _user: &UserId) -> Result<JoinTemplate> {
        Err(err(format!("no federation transport configured; cannot reach {origin}")))
    }

    async fn send_join(
        &self,
        origin: &ServerName,
        _room: &RoomId,
        _event_id: &submerge_model::EventId,
        _signed_event: PduJson,
    ) -> Result<JoinResult> {
        Err(err(format!("no federation transport configured; cannot reach {origin}")))
    }

    async fn event_auth(&self, origin: &ServerName, _room: &RoomId, _event_id: &submerge_model::EventId) -> Result<Vec<PduJson>> {
        Err(err(format!("no federation transport configured; cannot reach {origin}")))
    }

    async fn backfill(&self, origin: &ServerName, _room: &RoomId, _from: &[submerge_model::EventId], _limit: usize) -> Result<Vec<PduJson>> {
        Err(err(format!("no federation transport configured; cannot reach {origin}")))
    }

    async fn keys_query(&self, origin: &ServerName) -> Result<VerifyKeys> {
        Err(err(format!("no federation transport configured; cannot reach {origin}")))
    }
}

/// Everything one running node needs, bundled so `src/bin.rs` only has
/// to construct one value and drive it. Generic over the storage
/// backend for the same reason `Vm<S>` is: `submerge-rowdb`'s `RowDb`
/// in production, an in-memory fake in a test harness.
pub struct Server<S: Store> {
    pub config: NodeConfig,
    pub metrics: Arc<Metrics>,
    pub vm: Vm<S>,
    signer: Ed25519Signer,
    clock: SystemClock,
}

impl<S: Store> Server<S> {
    /// Generates a fresh signing keypair and registers its public half
    /// in the node's own keyring under `config.signing_key_id`, so the
    /// verify phase (spec.md §4.4) accepts this node's own locally
    /// originated events the same way it would a peer's: by looking the
    /// key up, never by special-casing "this is one of ours".
    /// Persisted key storage is out of scope (spec.md §1 names key
    /// management a collaborator); a restart gets a new identity.
    pub fn new(config: NodeConfig, store: S, federation: Arc<dyn FederationClient>) -> Result<Self> {
        let metrics = Arc::new(Metrics::new()?);
        let server_name = ServerName::new(config.server_name.clone());
        let vm = Vm::new(store, federation, server_name.clone());

        let mut rng = OsRng;
        let keypair = ed25519_dalek::Keypair::generate(&mut rng);
        vm.keyring.insert(server_name.as_str(), config.signing_key_id.clone(), keypair.public.to_bytes().to_vec());
        let signer = Ed25519Signer::new(config.signing_key_id.clone(), keypair);

        Ok(Server {
            config,
            metrics,
            vm,
            signer,
            clock: SystemClock,
        })
    }

    pub fn server_name(&self) -> ServerName {
        ServerName::new(self.config.server_name.clone())
    }

    /// spec.md §6's `inject` entry point, with the caller supplying only
    /// the properties a client request actually carries; everything
    /// `Copts::prop_mask` covers is synthesized by `Vm::inject` itself.
    pub async fn inject_local(
        &self,
        kind: impl Into<String>,
        sender: UserId,
        room_id: RoomId,
        state_key: Option<String>,
        content: Value,
        room_version: RoomVersion,
    ) -> Fault {
        let tuple = Event {
            kind: kind.into(),
            sender,
            room_id,
            state_key,
            content,
            depth: 0,
            prev_events: vec![],
            auth_events: vec![],
            hashes: None,
            signatures: Default::default(),
            origin: String::new(),
            origin_server_ts: 0,
            unsigned: Some(Unsigned::default()),
            event_id: None,
        };
        self.vm.inject(&Copts::default(), tuple, room_version, &self.signer, &self.clock).await
    }

    /// Snapshots the three sequence counters (spec.md §3) into the
    /// process's gauges, the way a periodic admin-surface scrape would
    /// (spec.md §1 places the scrape/export transport itself out of scope).
    pub fn record_sequence_metrics(&self) {
        self.metrics
            .record_sequence(self.vm.sequence.uncommitted(), self.vm.sequence.committed(), self.vm.sequence.retired());
    }
}
