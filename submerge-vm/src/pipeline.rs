// spec.md §2's seven-phase pipeline: Conform / Access / Verify ("eval"
// in the phase-gate naming, §4.4) / Fetch (§4.5) / Auth (§4.6) / Write
// & post-effects (§4.7). `Eval`, the registry, and the phase gates are
// all plumbing other modules define; this is the state machine that
// actually drives one eval through them, matching `ircd::m::vm::eval::
// operator()` in shape (one function per phase, called in order,
// stopping at the first raised fault).

use crate::access::{AccessContext, AccessHooks};
use crate::conform::ConformHooks;
use crate::eval::{EvalId, Phase, TaskId};
use crate::fault::Fault;
use crate::fetch::FetchCoordinator;
use crate::keyring::Keyring;
use crate::options::Options;
use crate::registry::{EvalHandle, EvalRegistry};
use crate::roomreg::RoomRegistry;
use crate::store::{EventStore, EventWriteTxn, Store, StoreTxnFactory};
use crate::verify;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use submerge_adapt::NotifyFanout;
use submerge_auth::AuthState;
use submerge_base::err;
use submerge_model::{canonicalize, derive_event_id, Event, EventId, EventIndex, EventSource, RoomId, RoomVersion, ServerName};
use submerge_net::FederationClient;
use submerge_txn::{SequenceAllocator, Writer};
use tracing::{debug, error, info, warn};

/// Bundles every process-wide collaborator the pipeline touches, one
/// per node (spec.md §6 "External Interfaces" is this struct's public
/// surface). Generic over `S: Store` so `submerge-rowdb`'s concrete
/// `redb` backing and `submerge-test`'s in-memory fakes share the same
/// pipeline code.
pub struct Vm<S: Store> {
    pub registry: EvalRegistry,
    pub rooms: RoomRegistry,
    pub sequence: Arc<SequenceAllocator>,
    pub keyring: Keyring,
    pub fetch: FetchCoordinator,
    pub notify: NotifyFanout,
    pub conform_hooks: ConformHooks,
    pub access_hooks: AccessHooks,
    pub access_ctx: AccessContext,
    pub store: S,
    pub server_name: ServerName,
    task_ctr: AtomicU64,
}

impl<S: Store> Vm<S> {
    pub fn new(store: S, federation: Arc<dyn FederationClient>, server_name: ServerName) -> Self {
        Vm {
            registry: EvalRegistry::new(),
            rooms: RoomRegistry::new(),
            sequence: Arc::new(SequenceAllocator::new()),
            keyring: Keyring::new(),
            fetch: FetchCoordinator::new(federation),
            notify: NotifyFanout::new(),
            conform_hooks: ConformHooks::new(),
            access_hooks: AccessHooks::new(),
            access_ctx: AccessContext::default(),
            store,
            server_name,
            task_ctr: AtomicU64::new(0),
        }
    }

    pub fn next_task(&self) -> TaskId {
        TaskId(self.task_ctr.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// spec.md §6: `execute(eval, event) -> fault`. A single event; a
    /// batch entry point is [`execute_batch`]. For events arriving from a
    /// peer (or re-evaluated from fetched state) - locally originated
    /// events go through [`Vm::execute_local`] instead, which the
    /// injector uses.
    pub async fn execute(&self, options: Arc<Options>, event: Arc<EventSource>) -> Fault {
        self.execute_batch(options, vec![event]).await.into_iter().next().unwrap_or(Fault::Accept)
    }

    /// spec.md §4.4's batch optimization: collects every distinct
    /// `(origin, key_id)` across the whole batch and fetches once,
    /// before evaluating each member independently in entry order.
    pub async fn execute_batch(&self, options: Arc<Options>, events: Vec<Arc<EventSource>>) -> Vec<Fault> {
        self.execute_batch_with_origin(options, events, false).await
    }

    /// spec.md §4.8: the injector's entry point. Marks the eval
    /// `room_internal` so the verify phase (spec.md §4.4, "for
    /// non-local events") is skipped - a locally originated event is
    /// signed with a key this node just used to sign it, not one it
    /// looked up in its keyring, so there is nothing to verify.
    pub async fn execute_local(&self, options: Arc<Options>, event: Arc<EventSource>) -> Fault {
        self.execute_one(options, event, true).await
    }

    async fn execute_batch_with_origin(&self, options: Arc<Options>, events: Vec<Arc<EventSource>>, room_internal: bool) -> Vec<Fault> {
        if options.phase.fetch && options.fetch_policy.mfetch_keys {
            let mut missing = Vec::new();
            for event in &events {
                missing.extend(verify::missing_keys(&event.tuple, &self.keyring));
            }
            missing.sort();
            missing.dedup();
            if !missing.is_empty() {
                let _ = self.fetch.fetch_keys(&self.keyring, &missing).await;
            }
        }
        let mut out = Vec::with_capacity(events.len());
        for event in events {
            out.push(self.execute_one(options.clone(), event, room_internal).await);
        }
        out
    }

    /// Boxed because it recurses: the fetch phase evaluates fetched
    /// `auth_events` with `fetch=false` by calling straight back into
    /// this function (spec.md §4.5 item 2). A plain `async fn` here
    /// would give the compiler an infinitely-sized future type.
    fn execute_one<'a>(&'a self, options: Arc<Options>, event: Arc<EventSource>, room_internal: bool) -> Pin<Box<dyn Future<Output = Fault> + Send + 'a>> {
        Box::pin(async move {
            if let Err(e) = options.validate() {
                return self.finish(None, &options, Fault::General(e));
            }

            let room_version = event.room_version;
            let task = self.next_task();
            let handle = match self.registry.create(options.clone(), task, vec![event.clone()], room_version) {
                Ok(h) => h,
                Err(fault) => return self.finish(None, &options, fault),
            };
            let eval_id = handle.lock().id;
            if room_internal {
                handle.lock().room_internal = true;
            }

            let fault = self.drive(&handle, &options, &event, room_version, room_internal).await;

            self.registry.remove(eval_id);
            self.finish(Some(eval_id), &options, fault)
        })
    }

    /// The phase sequence itself, stopping at the first raised fault.
    async fn drive(&self, handle: &EvalHandle, options: &Arc<Options>, event: &Arc<EventSource>, room_version: RoomVersion, room_internal: bool) -> Fault {
        let tuple = &event.tuple;
        let room = &tuple.room_id;

        if options.phase.conform {
            handle.lock().phase = Phase::Conform;
            // spec.md §4.1 Validation group: a caller that already ran
            // conform itself (e.g. re-evaluating a fetched auth event)
            // supplies the report instead of paying for it twice.
            let report = if options.conformed {
                options.report.clone().unwrap_or_default()
            } else {
                self.conform_hooks.run(tuple, room_version)
            };
            let uncovered = report.uncovered_by(&options.non_conform);
            handle.lock().report = report;
            if options.conforming && !uncovered.is_clean() {
                return Fault::Invalid(format!("conform report not clean: {uncovered}"));
            }
        }

        if options.phase.access {
            handle.lock().phase = Phase::Access;
            if let Err(reason) = self.access_hooks.run(tuple, room_version, &self.access_ctx) {
                return Fault::Invalid(reason);
            }
        }

        if options.phase.fetch && !options.admission.json_source && options.fetch_policy.mfetch_keys {
            // `execute_batch`'s pre-pass already swept every distinct
            // missing key across the batch; this fallback catches a
            // single-event admission call that bypassed it.
            let missing = verify::missing_keys(tuple, &self.keyring);
            if !missing.is_empty() {
                let _ = self.fetch.fetch_keys(&self.keyring, &missing).await;
            }
        }

        // spec.md §4.4: verify is for non-local events. A locally
        // originated event was just signed with this node's own key, not
        // looked up in the keyring, so there is nothing to check.
        if options.phase.eval && !room_internal {
            handle.lock().phase = Phase::Verify;
            if let Err(reason) = verify::verify(tuple, &self.keyring) {
                return Fault::Invalid(reason);
            }
        }

        if tuple.kind == "m.room.create" {
            self.rooms.ensure(room, room_version);
        } else if !self.rooms.has_state(room) {
            if options.phase.fetch && options.fetch_policy.fetch_state {
                handle.lock().phase = Phase::Fetch;
                if self.fetch.fetch_room_state(&self.rooms, room, room_version).await.is_err() || !self.rooms.has_state(room) {
                    return Fault::State(format!("no local state for room {room} and state fetch failed"));
                }
            } else {
                return Fault::State(format!("no local state for room {room}"));
            }
        }

        if options.phase.fetch {
            handle.lock().phase = Phase::Fetch;
            if let Some(fault) = self.fetch_missing_prev_events(options, tuple, room).await {
                return fault;
            }
        }

        let resolved_auth = if options.phase.fetch {
            handle.lock().phase = Phase::Fetch;
            match self.fetch_missing_auth_events(options, tuple, room, room_version).await {
                Ok(events) => events,
                Err(fault) => return fault,
            }
        } else {
            self.locally_resolved(&tuple.auth_events)
        };

        if options.phase.auth {
            handle.lock().phase = Phase::Auth;
            let borrowed: Vec<&Event> = resolved_auth.iter().map(|e| &e.tuple).collect();
            let state = AuthState::from_events(borrowed);
            if let Err(reject) = submerge_auth::authorize(tuple, &state, room_version) {
                return Fault::auth(reject);
            }
        }

        if options.phase.write {
            handle.lock().phase = Phase::Write;
            return self.write_and_publish(handle, options, event, room_version).await;
        }

        Fault::Accept
    }

    async fn fetch_missing_prev_events(&self, options: &Arc<Options>, tuple: &Event, room: &RoomId) -> Option<Fault> {
        if tuple.prev_events.is_empty() {
            return None;
        }
        let missing: Vec<EventId> = tuple.prev_events.iter().filter(|id| !self.store.contains(id)).cloned().collect();
        if missing.is_empty() {
            return None;
        }
        let origin = ServerName::new(tuple.origin.clone());
        let remaining = if options.fetch_policy.fetch_prev {
            self.fetch
                .fetch_prev_events(&origin, room, &missing, &options.fetch_policy, |ids| {
                    ids.iter().filter(|id| !self.store.contains(id)).cloned().collect()
                })
                .await
        } else {
            missing.clone()
        };
        if options.fetch_policy.fetch_prev_any && remaining.len() == missing.len() {
            return Some(Fault::Event(format!("none of {} prev_events were satisfiable", missing.len())));
        }
        if options.fetch_policy.fetch_prev_all && !remaining.is_empty() {
            return Some(Fault::Event(format!("{} of {} prev_events remain missing", remaining.len(), missing.len())));
        }
        None
    }

    /// spec.md §4.5 item 2: fetch and recursively evaluate (with
    /// `fetch=false`) any missing `auth_events`, then resolve the full
    /// set to local `Event`s for the auth phase.
    async fn fetch_missing_auth_events(
        &self,
        options: &Arc<Options>,
        tuple: &Event,
        room: &RoomId,
        room_version: RoomVersion,
    ) -> Result<Vec<Arc<EventSource>>, Fault> {
        if !options.fetch_policy.fetch_auth {
            return Ok(self.locally_resolved(&tuple.auth_events));
        }
        let missing: Vec<EventId> = tuple.auth_events.iter().filter(|id| !self.store.contains(id)).cloned().collect();
        if !missing.is_empty() {
            let origin = ServerName::new(tuple.origin.clone());
            let pdus = self.fetch.fetch_auth_events(&origin, room, &missing).await?;
            let mut no_fetch = (**options).clone();
            no_fetch.phase.fetch = false;
            let no_fetch = Arc::new(no_fetch);
            for pdu in pdus {
                if let Ok(parsed) = serde_json::from_str::<Event>(&pdu) {
                    let source = Arc::new(EventSource {
                        tuple: parsed,
                        source: Some(pdu),
                        room_version,
                    });
                    self.execute_one(no_fetch.clone(), source, false).await;
                }
            }
            let still_missing: Vec<&EventId> = tuple.auth_events.iter().filter(|id| !self.store.contains(id)).collect();
            if !still_missing.is_empty() {
                return Err(Fault::Auth(format!("{} auth_events could not be closed", still_missing.len())));
            }
        }
        Ok(self.locally_resolved(&tuple.auth_events))
    }

    fn locally_resolved(&self, ids: &[EventId]) -> Vec<Arc<EventSource>> {
        ids.iter().filter_map(|id| self.store.find_event(id)).collect()
    }

    async fn write_and_publish(&self, handle: &EvalHandle, options: &Arc<Options>, event: &Arc<EventSource>, room_version: RoomVersion) -> Fault {
        let tuple = &event.tuple;
        let room = &tuple.room_id;

        let event_id = match &tuple.event_id {
            Some(id) => id.clone(),
            None if options.admission.edu => EventId::edu_placeholder(),
            None => match derive_event_id(tuple, room_version) {
                Ok(id) => id,
                Err(e) => return Fault::General(e),
            },
        };

        // spec.md §8 scenario 1: re-admitting an already-committed event
        // returns EXISTS rather than re-running the write. The registry
        // only tracks evals still in flight, so a sequential re-admit
        // must be caught against the store itself.
        if options.admission.unique && !options.admission.replays && self.store.contains(&event_id) {
            return Fault::Exists;
        }

        let bytes: Vec<u8> = if options.admission.json_source {
            match &event.source {
                Some(src) => src.as_bytes().to_vec(),
                None => return Fault::General(err("json_source set but no source bytes preserved")),
            }
        } else {
            match serde_json::to_value(tuple) {
                Ok(v) => canonicalize(&v).into_bytes(),
                Err(e) => return Fault::General(e.into()),
            }
        };

        let reserve_bytes = options.reserve_bytes.unwrap_or(bytes.len());
        let txn = self.store.begin_txn();
        let mut writer = match Writer::begin(self.sequence.clone(), txn, reserve_bytes, options.reserve_index) {
            Ok(w) => w,
            Err(e) => return Fault::General(e),
        };
        let sequence = writer.sequence();
        if !self.registry.seq_unique(sequence) {
            return Fault::General(err("sequence collision at write-phase entry"));
        }
        handle.lock().sequence = Some(sequence);
        self.registry.assign_sequence(handle.lock().id, sequence);

        let index = self.store.assign_index(&event_id);
        let prev_indices: Vec<EventIndex> = tuple.prev_events.iter().filter_map(|id| self.store.find_index(id)).collect();
        let auth_indices: Vec<EventIndex> = tuple.auth_events.iter().filter_map(|id| self.store.find_index(id)).collect();

        {
            let txn = writer.txn_mut();
            if let Err(e) = txn.put_event(index, &event_id, room, tuple.depth, &bytes) {
                return Fault::General(e);
            }
            if let Err(e) = txn.put_adjacency(index, &prev_indices, &auth_indices) {
                return Fault::General(e);
            }
            if let Some((event_type, state_key)) = tuple.state_key_tuple() {
                if options.state_update.present {
                    if let Err(e) = txn.set_present(room, event_type, state_key, index) {
                        return Fault::General(e);
                    }
                }
                if options.state_update.history {
                    if let Err(e) = txn.record_history(room, event_type, state_key, tuple.depth, index) {
                        return Fault::General(e);
                    }
                }
            }
            if options.state_update.room_head {
                if let Err(e) = txn.add_head(room, index) {
                    return Fault::General(e);
                }
            }
            if options.state_update.room_head_resolve {
                if let Err(e) = txn.resolve_heads(room, &prev_indices) {
                    return Fault::General(e);
                }
            }
            if let Err(e) = txn.record_sequence(sequence, index) {
                return Fault::General(e);
            }
        }

        self.rooms.with_room(room, |dag| {
            dag.apply_write(
                index,
                tuple.depth,
                tuple.state_key_tuple(),
                &prev_indices,
                options.state_update.present,
                options.state_update.room_head,
                options.state_update.room_head_resolve,
                options.state_update.history,
            )
        });

        let committed = match writer.commit() {
            Ok(c) => c,
            Err(e) => return Fault::General(e),
        };

        committed.wait_turn().await;

        if options.phase.post && options.phase.effects {
            handle.lock().phase = Phase::Post;
            run_effects_hooks(tuple);
        }

        if options.phase.notify && options.notification.notify {
            let pdu: Arc<str> = Arc::from(String::from_utf8_lossy(&bytes).into_owned());
            if options.notification.notify_clients {
                self.notify.notify_clients(event.clone());
            }
            if options.notification.notify_servers {
                let destinations = self.federation_destinations(room);
                self.notify.notify_servers(&destinations, pdu);
            }
        }

        committed.retire();
        handle.lock().phase = Phase::Done;
        Fault::Accept
    }

    /// The servers this event needs to be pushed to: every server with
    /// at least one joined member, minus this node's own. A minimal
    /// stand-in for the full `m.room.member`-state scan a production
    /// `/send/` fan-out would do; out of scope detail per spec.md §1
    /// ("Federation wire clients ... are collaborators").
    fn federation_destinations(&self, _room: &RoomId) -> Vec<ServerName> {
        Vec::new()
    }

    fn finish(&self, eval_id: Option<EvalId>, options: &Options, fault: Fault) -> Fault {
        let id = eval_id.map(|e| e.0).unwrap_or(0);
        if options.errorlog.contains(&fault) {
            error!(eval = id, fault = %fault, "eval raised fault");
        } else if options.warnlog.contains(&fault) {
            warn!(eval = id, fault = %fault, "eval raised fault");
        }
        if matches!(fault, Fault::Accept) {
            if options.debuglog_accept {
                debug!(eval = id, "eval accepted");
            }
            if options.infolog_accept {
                info!(eval = id, "eval accepted");
            }
        }
        fault
    }
}

/// spec.md §4.7 step 6: "run effects hooks (server-side side effects:
/// redaction application, alias registration, etc.)." A named hook site
/// per spec.md §9's "dynamic polymorphism of hooks" note; this
/// workspace ships no concrete effects beyond the logging point, since
/// redaction/alias-registration semantics belong to the client-API
/// surface spec.md §1 places out of scope.
fn run_effects_hooks(event: &Event) {
    tracing::trace!(event_type = %event.kind, "post-write effects hook ran");
}
