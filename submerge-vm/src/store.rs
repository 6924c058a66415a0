// spec.md §1: "the core writes through a transaction abstraction and
// queries via index lookups; the storage engine itself is a
// collaborator." `submerge-txn::StoreTxn` is the write side; this is
// the read side plus the factory that hands out a fresh transaction per
// write phase. `submerge-rowdb` implements this over `redb`;
// `submerge-test`'s in-memory fakes cover `StoreTxn` alone, since the
// read side here is specific enough to `submerge-vm` to not be worth
// sharing as a dev-only dependency.

use std::sync::Arc;
use submerge_base::Result;
use submerge_model::{EventId, EventIndex, EventSource, RoomId};
use submerge_txn::StoreTxn;

/// The query collaborator the fetch, auth, and inject phases read
/// through. Every method is synchronous: a local lookup miss is itself
/// the signal to go fetch, not a suspension point by itself (spec.md §5
/// lists "any database read miss that goes to disk" as the suspension
/// point, which a real backed implementation would model by awaiting
/// inside these calls if it ever stopped being fully in-memory - the
/// trait stays sync here because every implementation this workspace
/// ships keeps its working set in memory).
pub trait EventStore: Send + Sync {
    fn find_index(&self, id: &EventId) -> Option<EventIndex>;
    fn find_event(&self, id: &EventId) -> Option<Arc<EventSource>>;
    fn assign_index(&self, id: &EventId) -> EventIndex;

    /// The inverse of `find_index`. The injector needs this to turn a
    /// room's head set and present-state slots (both keyed by
    /// `EventIndex`) back into the `EventId`s a synthesized event's
    /// `prev_events`/`auth_events` must carry.
    fn find_id(&self, index: EventIndex) -> Option<EventId>;

    fn contains(&self, id: &EventId) -> bool {
        self.find_index(id).is_some()
    }
}

/// spec.md §4.7 step 3 and §6's "Persisted state layout": the durable
/// half of the index writes the writer stages before `StoreTxn::commit`.
/// `submerge_vers::RoomDag` keeps the same information in memory for
/// the auth engine's hot path; this trait is what makes it durable
/// across a restart. Every method is gated by the matching
/// `Options::state_update`/`admission` flag in `pipeline.rs`, never
/// unconditionally called.
pub trait EventWriteTxn: StoreTxn {
    /// event-by-id, room-by-event, and the depth index, in one call
    /// since `submerge-rowdb` keys all three off the same row.
    fn put_event(&mut self, index: EventIndex, id: &EventId, room: &RoomId, depth: i64, bytes: &[u8]) -> Result<()>;

    /// prev/auth adjacency columns (spec.md §6).
    fn put_adjacency(&mut self, index: EventIndex, prev: &[EventIndex], auth: &[EventIndex]) -> Result<()>;

    fn set_present(&mut self, room: &RoomId, event_type: &str, state_key: &str, index: EventIndex) -> Result<()>;

    fn record_history(&mut self, room: &RoomId, event_type: &str, state_key: &str, depth: i64, index: EventIndex) -> Result<()>;

    fn add_head(&mut self, room: &RoomId, index: EventIndex) -> Result<()>;

    fn resolve_heads(&mut self, room: &RoomId, resolved: &[EventIndex]) -> Result<()>;

    /// The sequence journal (spec.md §6): records that `sequence` wrote
    /// `index`, so a restart can replay `(committed, uncommitted]` gaps.
    fn record_sequence(&mut self, sequence: u64, index: EventIndex) -> Result<()>;
}

pub trait StoreTxnFactory: Send + Sync {
    type Txn: EventWriteTxn;

    fn begin_txn(&self) -> Self::Txn;
}

pub trait Store: EventStore + StoreTxnFactory {}
impl<T: EventStore + StoreTxnFactory> Store for T {}
