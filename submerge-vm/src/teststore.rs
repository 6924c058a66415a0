// A minimal in-memory `Store` used only by this crate's own
// `#[cfg(test)]` modules (pipeline.rs, inject.rs). `submerge-rowdb` is
// the real `redb`-backed implementation; this one exists so the
// pipeline and injector can be exercised without a disk backend, the
// same role `submerge-test`'s `StoreTxn` fake plays for `submerge-txn`'s
// own tests. Writes are staged as closures and only applied to the
// shared table on `commit`, so a dropped, uncommitted `MemTxn` leaves no
// trace - matching the abort-on-drop contract `StoreTxn` documents.

use crate::store::{EventStore, EventWriteTxn, StoreTxnFactory};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use submerge_base::{err, Result};
use submerge_model::{EventId, EventIndex, EventSource, RoomId, RoomVersion};
use submerge_txn::StoreTxn;

#[derive(Default)]
struct Inner {
    by_id: HashMap<EventId, EventIndex>,
    by_index: HashMap<EventIndex, EventId>,
    events: HashMap<EventId, Arc<EventSource>>,
}

pub struct MemStore {
    inner: Arc<Mutex<Inner>>,
    next_index: AtomicU64,
    room_version: RoomVersion,
}

impl MemStore {
    pub fn new() -> Self {
        MemStore::with_room_version(RoomVersion::default())
    }

    pub fn with_room_version(room_version: RoomVersion) -> Self {
        MemStore {
            inner: Arc::new(Mutex::new(Inner::default())),
            next_index: AtomicU64::new(0),
            room_version,
        }
    }

    /// Seeds the store with an already-"written" event, as if some
    /// earlier eval had committed it, so fetch/auth-phase tests don't
    /// need to drive the whole pipeline just to put a dependency in place.
    pub fn seed(&self, source: Arc<EventSource>) -> EventIndex {
        let id = source.tuple.event_id.clone().expect("seeded events must carry an event_id");
        let index = self.assign_index(&id);
        let mut inner = self.inner.lock();
        inner.events.insert(id, source);
        index
    }
}

impl Default for MemStore {
    fn default() -> Self {
        MemStore::new()
    }
}

impl EventStore for MemStore {
    fn find_index(&self, id: &EventId) -> Option<EventIndex> {
        self.inner.lock().by_id.get(id).copied()
    }

    fn find_event(&self, id: &EventId) -> Option<Arc<EventSource>> {
        self.inner.lock().events.get(id).cloned()
    }

    fn assign_index(&self, id: &EventId) -> EventIndex {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.by_id.get(id) {
            return *existing;
        }
        let index = EventIndex(self.next_index.fetch_add(1, Ordering::SeqCst) + 1);
        inner.by_id.insert(id.clone(), index);
        inner.by_index.insert(index, id.clone());
        index
    }

    fn find_id(&self, index: EventIndex) -> Option<EventId> {
        self.inner.lock().by_index.get(&index).cloned()
    }
}

type Op = Box<dyn FnOnce(&mut Inner) + Send>;

pub struct MemTxn {
    inner: Arc<Mutex<Inner>>,
    room_version: RoomVersion,
    ops: Vec<Op>,
}

impl StoreTxn for MemTxn {
    fn reserve(&mut self, _bytes: usize, _indices: usize) -> Result<()> {
        Ok(())
    }

    fn commit(self) -> Result<()> {
        let mut inner = self.inner.lock();
        for op in self.ops {
            op(&mut inner);
        }
        Ok(())
    }
}

impl EventWriteTxn for MemTxn {
    fn put_event(&mut self, index: EventIndex, id: &EventId, _room: &RoomId, _depth: i64, bytes: &[u8]) -> Result<()> {
        let tuple = serde_json::from_slice(bytes).map_err(|e| err(format!("mem store: undecodable event bytes: {e}")))?;
        let id = id.clone();
        let room_version = self.room_version;
        self.ops.push(Box::new(move |inner: &mut Inner| {
            inner.by_id.insert(id.clone(), index);
            inner.by_index.insert(index, id.clone());
            inner.events.insert(id, Arc::new(EventSource { tuple, source: None, room_version }));
        }));
        Ok(())
    }

    fn put_adjacency(&mut self, _index: EventIndex, _prev: &[EventIndex], _auth: &[EventIndex]) -> Result<()> {
        Ok(())
    }

    fn set_present(&mut self, _room: &RoomId, _event_type: &str, _state_key: &str, _index: EventIndex) -> Result<()> {
        Ok(())
    }

    fn record_history(&mut self, _room: &RoomId, _event_type: &str, _state_key: &str, _depth: i64, _index: EventIndex) -> Result<()> {
        Ok(())
    }

    fn add_head(&mut self, _room: &RoomId, _index: EventIndex) -> Result<()> {
        Ok(())
    }

    fn resolve_heads(&mut self, _room: &RoomId, _resolved: &[EventIndex]) -> Result<()> {
        Ok(())
    }

    fn record_sequence(&mut self, _sequence: u64, _index: EventIndex) -> Result<()> {
        Ok(())
    }
}

impl StoreTxnFactory for MemStore {
    type Txn = MemTxn;

    fn begin_txn(&self) -> MemTxn {
        MemTxn {
            inner: self.inner.clone(),
            room_version: self.room_version,
            ops: Vec::new(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use submerge_model::Event;
    use test_log::test;

    fn member_event(id: &str) -> Event {
        Event {
            kind: "m.room.member".into(),
            sender: submerge_model::UserId::new("@alice:example.org"),
            room_id: RoomId::new("!r:example.org"),
            state_key: Some("@alice:example.org".into()),
            content: serde_json::json!({"membership": "join"}),
            depth: 1,
            prev_events: vec![],
            auth_events: vec![],
            hashes: None,
            signatures: Default::default(),
            origin: "example.org".into(),
            origin_server_ts: 0,
            unsigned: None,
            event_id: Some(EventId::new(id)),
        }
    }

    #[test]
    fn assign_index_is_idempotent_per_id() {
        let store = MemStore::new();
        let id = EventId::new("$a");
        let a = store.assign_index(&id);
        let b = store.assign_index(&id);
        assert_eq!(a, b);
        assert_eq!(store.find_id(a), Some(id));
    }

    #[test]
    fn uncommitted_txn_leaves_no_trace() {
        let store = MemStore::new();
        let id = EventId::new("$a");
        let index = store.assign_index(&id);
        let mut txn = store.begin_txn();
        let bytes = serde_json::to_vec(&member_event("$a")).unwrap();
        txn.put_event(index, &id, &RoomId::new("!r:example.org"), 1, &bytes).unwrap();
        drop(txn);
        assert!(store.find_event(&id).is_none());
    }

    #[test]
    fn committed_txn_is_visible_afterward() {
        let store = MemStore::new();
        let id = EventId::new("$a");
        let index = store.assign_index(&id);
        let mut txn = store.begin_txn();
        let bytes = serde_json::to_vec(&member_event("$a")).unwrap();
        txn.put_event(index, &id, &RoomId::new("!r:example.org"), 1, &bytes).unwrap();
        txn.commit().unwrap();
        assert!(store.find_event(&id).is_some());
    }
}
