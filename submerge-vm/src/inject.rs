// spec.md §4.8 Injector: "synthesizes the properties of a locally
// originated event (`origin`, `origin_server_ts`, `depth`, `prev_events`,
// `auth_events`, `hashes`, `signatures`, `event_id`) deterministically
// given a fixed clock and a fixed head-set, then runs the completed
// event through the same pipeline `execute` does." `Copts::prop_mask`
// (§4.1) gates which properties get filled in; a caller that already
// supplied a property (a client retrying a request with an explicit
// `origin_server_ts`, say) is left alone.
//
// SPEC_FULL.md §4 item 2 supplements this with the make_join/send_join
// bootstrap path (`modules/client/rooms/join.cc`): the shape a node
// needs to join a room it has no local state for.

use crate::fault::Fault;
use crate::options::{Copts, Options};
use crate::pipeline::Vm;
use crate::store::Store;
use std::sync::Arc;
use submerge_base::{err, Clock, Result};
use submerge_model::{canonicalize, content_hash, signable_bytes, derive_event_id};
use submerge_model::{Event, EventId, EventIndex, EventSource, Hashes, RoomId, RoomVersion, ServerName, Signatures, Signer, UserId};

impl<S: Store> Vm<S> {
    /// spec.md §6: `inject(eval, event_iov, content_iov) -> fault`.
    /// `tuple` already carries `kind`/`sender`/`room_id`/`state_key`/
    /// `content` from the caller; everything `copts.prop_mask` requests
    /// is synthesized here before the event is handed to [`Vm::execute_local`],
    /// which marks the eval `room_internal` so the verify phase (spec.md
    /// §4.4, "for non-local events") is skipped: the event was just signed
    /// with this node's own key, not looked up in the keyring.
    /// `copts.issue` false stops short of that: properties are filled in
    /// and the completed event is returned via `Fault::Accept` without
    /// ever being admitted, the shape a "preview this event" client call
    /// needs.
    pub async fn inject(&self, copts: &Copts, mut tuple: Event, room_version: RoomVersion, signer: &dyn Signer, clock: &dyn Clock) -> Fault {
        if let Err(e) = self.synthesize(copts, &mut tuple, room_version, signer, clock) {
            return Fault::General(e);
        }
        if !copts.issue {
            return Fault::Accept;
        }
        let source = Arc::new(EventSource {
            tuple,
            source: None,
            room_version,
        });
        self.execute_local(Arc::new(copts.options.clone()), source).await
    }

    fn synthesize(&self, copts: &Copts, tuple: &mut Event, room_version: RoomVersion, signer: &dyn Signer, clock: &dyn Clock) -> Result<()> {
        let mask = copts.prop_mask;

        if mask.origin && tuple.origin.is_empty() {
            tuple.origin = self.server_name.as_str().to_string();
        }
        if mask.origin_server_ts && tuple.origin_server_ts == 0 {
            tuple.origin_server_ts = clock.now_millis();
        }

        let room = tuple.room_id.clone();
        let head_indices: Vec<EventIndex> = self.rooms.with_room(&room, |dag| dag.heads.iter().collect()).unwrap_or_default();
        let prev_ids: Vec<EventId> = head_indices.iter().filter_map(|idx| self.store.find_id(*idx)).collect();

        if mask.depth && tuple.depth == 0 {
            let max_depth = prev_ids
                .iter()
                .filter_map(|id| self.store.find_event(id))
                .map(|source| source.tuple.depth)
                .max()
                .unwrap_or(0);
            tuple.depth = max_depth + 1;
        }

        if mask.prev_events && tuple.prev_events.is_empty() {
            tuple.prev_events = prev_ids;
        }

        if mask.auth_events && tuple.auth_events.is_empty() {
            tuple.auth_events = self.default_auth_events(&room, tuple);
        }

        if mask.hashes || mask.signatures || mask.event_id {
            self.finalize_signature_properties(tuple, room_version, signer)?;
        }

        Ok(())
    }

    /// The event types every room version's authorization rules condition
    /// on (spec.md GLOSSARY "Auth events"): the room's create event, its
    /// power levels, its join rules, the sender's own membership, and -
    /// for a membership event about someone else - the target's existing
    /// membership. Resolved against present state, since that's the
    /// authorization-relevant view a writer just committed against.
    fn default_auth_events(&self, room: &RoomId, tuple: &Event) -> Vec<EventId> {
        let indices: Vec<EventIndex> = self
            .rooms
            .with_room(room, |dag| {
                let mut out = Vec::new();
                for (kind, state_key) in [("m.room.create", ""), ("m.room.power_levels", ""), ("m.room.join_rules", "")] {
                    if let Some(idx) = dag.present.get(kind, state_key) {
                        out.push(idx);
                    }
                }
                if let Some(idx) = dag.present.get("m.room.member", tuple.sender.as_str()) {
                    out.push(idx);
                }
                if tuple.kind == "m.room.member" {
                    if let Some(state_key) = &tuple.state_key {
                        if state_key.as_str() != tuple.sender.as_str() {
                            if let Some(idx) = dag.present.get("m.room.member", state_key) {
                                out.push(idx);
                            }
                        }
                    }
                }
                out
            })
            .unwrap_or_default();
        indices.into_iter().filter_map(|idx| self.store.find_id(idx)).collect()
    }

    /// Fills in `hashes`, `signatures`, and (where the room version
    /// doesn't derive it from content) `event_id`, in the one order that
    /// keeps all three consistent: a v1/v2 event needs its `event_id`
    /// before the hash and signature are computed, since both cover it;
    /// a v3+ event's `event_id` is derived from the hash only after the
    /// hash (and, harmlessly, the signature) exist, since it is absent
    /// from the signed/hashed content by definition.
    fn finalize_signature_properties(&self, tuple: &mut Event, room_version: RoomVersion, signer: &dyn Signer) -> Result<()> {
        if !room_version.event_ids_are_content_derived() && tuple.event_id.is_none() {
            tuple.event_id = Some(EventId::new(format!("${}", random_local_id())));
        }

        let hash = content_hash(tuple)?;
        tuple.hashes = Some(Hashes {
            sha256: base64::encode_config(hash, base64::STANDARD_NO_PAD),
        });

        let signable = signable_bytes(tuple)?;
        let signature = signer.sign(signable.as_bytes());
        tuple
            .signatures
            .entry(tuple.origin.clone())
            .or_default()
            .insert(signer.key_id().to_string(), base64::encode_config(signature, base64::STANDARD_NO_PAD));

        if room_version.event_ids_are_content_derived() {
            tuple.event_id = Some(derive_event_id(tuple, room_version)?);
        }

        Ok(())
    }

    /// SPEC_FULL.md §4 item 2: bootstraps membership in a room this node
    /// has no local state for. `make_join` gives the DAG position to
    /// compose the membership event against; the event is signed and
    /// handed to `send_join`, whose `auth_chain`/`state` payload is
    /// evaluated with `fetch=false` *before* the join event itself is
    /// published, per spec.md §4.8's general rule for injected events
    /// that depend on not-yet-local state.
    pub async fn inject_join(&self, origin: &ServerName, room: &RoomId, user: &UserId, signer: &dyn Signer, clock: &dyn Clock) -> Fault {
        let template = match self.fetch.federation().make_join(origin, room, user).await {
            Ok(t) => t,
            Err(e) => return Fault::General(e),
        };
        let room_version = match RoomVersion::parse(&template.room_version) {
            Some(v) => v,
            None => return Fault::General(err(format!("unknown room version {}", template.room_version))),
        };

        let mut tuple = Event {
            kind: "m.room.member".to_string(),
            sender: user.clone(),
            room_id: room.clone(),
            state_key: Some(user.as_str().to_string()),
            content: serde_json::json!({"membership": "join"}),
            depth: template.depth,
            prev_events: template.prev_events,
            auth_events: template.auth_events,
            hashes: None,
            signatures: Signatures::new(),
            origin: self.server_name.as_str().to_string(),
            origin_server_ts: clock.now_millis(),
            unsigned: None,
            event_id: None,
        };

        if let Err(e) = self.finalize_signature_properties(&mut tuple, room_version, signer) {
            return Fault::General(e);
        }
        let event_id = tuple.event_id.clone().expect("finalize_signature_properties always sets event_id");

        let signed_json = match serde_json::to_value(&tuple) {
            Ok(v) => canonicalize(&v),
            Err(e) => return Fault::General(e.into()),
        };
        let signed_source: Arc<str> = Arc::from(signed_json.as_str());

        let join_result = match self.fetch.federation().send_join(origin, room, &event_id, signed_source.clone()).await {
            Ok(r) => r,
            Err(e) => return Fault::General(e),
        };

        let mut bootstrap = Options::default();
        bootstrap.phase.fetch = false;
        bootstrap.admission.json_source = true;
        let bootstrap = Arc::new(bootstrap);

        for pdu in join_result.auth_chain.into_iter().chain(join_result.state) {
            let Ok(parsed) = serde_json::from_str::<Event>(&pdu) else {
                continue;
            };
            let source = Arc::new(EventSource {
                tuple: parsed,
                source: Some(pdu),
                room_version,
            });
            self.execute(bootstrap.clone(), source).await;
        }

        let mut join_options = Options::default();
        join_options.phase.fetch = false;
        join_options.admission.json_source = true;
        let join_source = Arc::new(EventSource {
            tuple,
            source: Some(signed_source),
            room_version,
        });
        self.execute_local(Arc::new(join_options), join_source).await
    }
}

fn random_local_id() -> String {
    use rand::Rng;
    rand::thread_rng().sample_iter(&rand::distributions::Alphanumeric).take(18).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::options::PropMask;
    use crate::teststore::MemStore;
    use submerge_model::Ed25519Signer;
    use submerge_net::FederationClient;
    use submerge_test::{FederationFake, FixedClock};
    use test_log::test;

    fn signer() -> Ed25519Signer {
        use rand::SeedableRng;
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let keypair = ed25519_dalek::Keypair::generate(&mut rng);
        Ed25519Signer::new("ed25519:1", keypair)
    }

    fn new_vm() -> Vm<MemStore> {
        Vm::new(
            MemStore::new(),
            Arc::new(FederationFake::new()) as Arc<dyn FederationClient>,
            ServerName::new("example.org"),
        )
    }

    #[test(tokio::test)]
    async fn synthesizes_a_root_create_event_with_no_prev_events() {
        let vm = new_vm();
        let room = RoomId::new("!r:example.org");
        vm.rooms.ensure(&room, RoomVersion::V11);
        let signer = signer();
        let clock = FixedClock::new(1_700_000_000_000);

        let tuple = Event {
            kind: "m.room.create".into(),
            sender: UserId::new("@alice:example.org"),
            room_id: room.clone(),
            state_key: Some(String::new()),
            content: serde_json::json!({"creator": "@alice:example.org", "room_version": "11"}),
            depth: 0,
            prev_events: vec![],
            auth_events: vec![],
            hashes: None,
            signatures: Default::default(),
            origin: String::new(),
            origin_server_ts: 0,
            unsigned: None,
            event_id: None,
        };

        let copts = Copts {
            options: Options::default(),
            client_txnid: None,
            prop_mask: PropMask::default(),
            issue: true,
        };

        let fault = vm.inject(&copts, tuple, RoomVersion::V11, &signer, &clock).await;
        assert!(matches!(fault, Fault::Accept), "{fault:?}");
    }

    #[test(tokio::test)]
    async fn issue_false_synthesizes_without_admitting() {
        let vm = new_vm();
        let room = RoomId::new("!r:example.org");
        vm.rooms.ensure(&room, RoomVersion::V11);
        let signer = signer();
        let clock = FixedClock::new(1_700_000_000_000);

        let tuple = Event {
            kind: "m.room.create".into(),
            sender: UserId::new("@alice:example.org"),
            room_id: room.clone(),
            state_key: Some(String::new()),
            content: serde_json::json!({"creator": "@alice:example.org"}),
            depth: 0,
            prev_events: vec![],
            auth_events: vec![],
            hashes: None,
            signatures: Default::default(),
            origin: String::new(),
            origin_server_ts: 0,
            unsigned: None,
            event_id: None,
        };

        let mut copts = Copts::default();
        copts.issue = false;
        let fault = vm.inject(&copts, tuple, RoomVersion::V11, &signer, &clock).await;
        assert!(matches!(fault, Fault::Accept));
        assert!(vm.registry.is_empty());
    }

    #[test]
    fn random_local_id_is_nonempty_and_varies() {
        let a = random_local_id();
        let b = random_local_id();
        assert_eq!(a.len(), 18);
        assert_ne!(a, b);
    }
}
