// spec.md §3 Eval. `Eval` itself never runs a phase; `pipeline.rs` reads
// and mutates it as it drives an event through the seven phases, and
// `registry.rs` is what tracks the live set for duplicate suppression
// and sequence enumeration.

use crate::options::Options;
use std::sync::Arc;
use submerge_model::{ConformReport, EventId, EventSource, RoomVersion};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct EvalId(pub u64);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TaskId(pub u64);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Conform,
    Access,
    Verify,
    Fetch,
    Auth,
    Write,
    Post,
    Done,
}

/// A per-evaluation record (spec.md §3). Holds one event, or a batch:
/// `events` is the parsed tuple view for each, `pdus` the optional
/// preserved-source view the verify phase needs when `json_source` is
/// set. `sequence`/`sequence_shared_min`/`sequence_shared_max` are
/// `None` until the write phase allocates them.
pub struct Eval {
    pub id: EvalId,
    pub options: Arc<Options>,
    pub task: TaskId,
    pub phase: Phase,
    pub events: Vec<Arc<EventSource>>,
    pub pdus: Option<Vec<std::sync::Arc<str>>>,
    pub room_version: RoomVersion,
    /// True when the event originated on this node (via `inject`) rather
    /// than arriving from a peer.
    pub room_internal: bool,
    pub report: ConformReport,
    pub sequence: Option<u64>,
    pub sequence_shared_min: Option<u64>,
    pub sequence_shared_max: Option<u64>,
}

impl Eval {
    pub fn new(id: EvalId, options: Arc<Options>, task: TaskId, events: Vec<Arc<EventSource>>, room_version: RoomVersion) -> Self {
        Eval {
            id,
            options,
            task,
            phase: Phase::Conform,
            events,
            pdus: None,
            room_version,
            room_internal: false,
            report: ConformReport::new(),
            sequence: None,
            sequence_shared_min: None,
            sequence_shared_max: None,
        }
    }

    /// The lead event's id; batches and singletons alike are enumerated
    /// in the registry by this value.
    pub fn event_id(&self) -> Option<&EventId> {
        self.events.first().and_then(|e| e.event_id())
    }

    pub fn is_batch(&self) -> bool {
        self.events.len() > 1
    }
}
