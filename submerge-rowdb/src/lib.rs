//! `redb`-backed implementation of `submerge_txn::StoreTxn` and
//! `submerge_vm::{EventStore, EventWriteTxn, StoreTxnFactory}` (spec.md
//! §6 "Persisted state layout", §1: "the underlying key/value store: the
//! core writes through a transaction abstraction and queries via index
//! lookups; the storage engine itself is a collaborator").
//!
//! One `redb::Database`, six tables: events (by index), the id<->index
//! bijection, prev/auth adjacency, present-state-by-`(room,type,
//! state_key)`, the historical state BTree, the sequence journal, and a
//! multimap of room head-sets. Rows that hold more than one field are
//! encoded with `rmp-serde` (the workspace's on-disk serialization
//! format, as opposed to the canonical JSON the wire protocol and
//! `submerge-model` use) rather than re-parsed JSON, since nothing
//! downstream of this crate needs the row shape to be human-readable.

mod keys;
mod txn;

pub use txn::RowTxn;

use redb::{Database, MultimapTableDefinition, ReadableMultimapTable, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use submerge_base::{err, Result};
use submerge_model::{Event, EventId, EventIndex, EventSource, RoomId, RoomVersion};
use submerge_vm::{EventStore, StoreTxnFactory};

pub(crate) const EVENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("events");
pub(crate) const BY_ID: TableDefinition<&str, u64> = TableDefinition::new("by_id");
pub(crate) const BY_INDEX: TableDefinition<u64, &str> = TableDefinition::new("by_index");
pub(crate) const ADJACENCY: TableDefinition<u64, &[u8]> = TableDefinition::new("adjacency");
pub(crate) const PRESENT: TableDefinition<&str, u64> = TableDefinition::new("present");
pub(crate) const HISTORY: TableDefinition<&str, u64> = TableDefinition::new("history");
pub(crate) const SEQUENCE: TableDefinition<u64, u64> = TableDefinition::new("sequence");
pub(crate) const HEADS: MultimapTableDefinition<&str, u64> = MultimapTableDefinition::new("heads");

/// The on-disk row for one event: the tuple form's serialized bytes
/// plus just enough sidecar fields (`room`, `depth`, `room_version`) to
/// answer `EventStore`/adjacency queries without re-parsing every row's
/// JSON on every lookup.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
struct EventRow {
    room: String,
    depth: i64,
    room_version: u8,
    bytes: Vec<u8>,
}

fn encode_room_version(v: RoomVersion) -> u8 {
    match v {
        RoomVersion::V1 => 1,
        RoomVersion::V2 => 2,
        RoomVersion::V3 => 3,
        RoomVersion::V4 => 4,
        RoomVersion::V5 => 5,
        RoomVersion::V6 => 6,
        RoomVersion::V9 => 9,
        RoomVersion::V10 => 10,
        RoomVersion::V11 => 11,
    }
}

fn decode_room_version(tag: u8) -> RoomVersion {
    RoomVersion::parse(&tag.to_string()).unwrap_or_default()
}

/// Prev/auth adjacency for one event, rmp-encoded (spec.md §6: "prev-
/// and auth-reference are all mutually consistent").
#[derive(Clone, serde::Serialize, serde::Deserialize, Default)]
struct Adjacency {
    prev: Vec<u64>,
    auth: Vec<u64>,
}

/// One `RowDb` serves one node, which evaluates every room under a
/// single configured room version (matching `submerge_vm::teststore::
/// MemStore`'s `with_room_version`) - `put_event` itself carries no
/// per-call room version, so this is the one place that choice is made
/// for rows this instance writes.
pub struct RowDb {
    db: Arc<Database>,
    next_index: AtomicU64,
    room_version: RoomVersion,
}

impl RowDb {
    pub fn open(path: impl AsRef<Path>) -> Result<RowDb> {
        RowDb::open_with_room_version(path, RoomVersion::default())
    }

    /// Opens (creating if absent) a `redb` database at `path` and
    /// ensures every table this crate uses exists, the way `redb`'s own
    /// examples bootstrap a fresh file: one write transaction that just
    /// calls `open_table` on everything and commits.
    pub fn open_with_room_version(path: impl AsRef<Path>, room_version: RoomVersion) -> Result<RowDb> {
        let db = Database::create(path.as_ref()).map_err(|e| err(format!("opening rowdb at {}: {e}", path.as_ref().display())))?;
        {
            let txn = db.begin_write()?;
            txn.open_table(EVENTS)?;
            txn.open_table(BY_ID)?;
            txn.open_table(BY_INDEX)?;
            txn.open_table(ADJACENCY)?;
            txn.open_table(PRESENT)?;
            txn.open_table(HISTORY)?;
            txn.open_table(SEQUENCE)?;
            txn.open_multimap_table(HEADS)?;
            txn.commit()?;
        }
        let next_index = {
            let read = db.begin_read()?;
            let table = read.open_table(BY_INDEX)?;
            table.iter()?.next_back().transpose()?.map(|(k, _)| k.value()).unwrap_or(0)
        };
        Ok(RowDb {
            db: Arc::new(db),
            next_index: AtomicU64::new(next_index),
            room_version,
        })
    }

    pub(crate) fn database(&self) -> Arc<Database> {
        self.db.clone()
    }
}

impl EventStore for RowDb {
    fn find_index(&self, id: &EventId) -> Option<EventIndex> {
        let read = self.db.begin_read().ok()?;
        let table = read.open_table(BY_ID).ok()?;
        table.get(id.as_str()).ok()?.map(|v| EventIndex(v.value()))
    }

    fn find_event(&self, id: &EventId) -> Option<Arc<EventSource>> {
        let index = self.find_index(id)?;
        let read = self.db.begin_read().ok()?;
        let table = read.open_table(EVENTS).ok()?;
        let raw = table.get(index.0).ok()??;
        let row: EventRow = rmp_serde::from_slice(raw.value()).ok()?;
        let tuple: Event = serde_json::from_slice(&row.bytes).ok()?;
        let source = std::str::from_utf8(&row.bytes).ok().map(Arc::<str>::from);
        Some(Arc::new(EventSource {
            tuple,
            source,
            room_version: decode_room_version(row.room_version),
        }))
    }

    fn assign_index(&self, id: &EventId) -> EventIndex {
        if let Some(existing) = self.find_index(id) {
            return existing;
        }
        // `begin_write` blocks until any other writer (including a live
        // `RowTxn`) releases the database's single write slot, which is
        // what keeps this read-check-insert sequence race-free across
        // concurrent `assign_index` callers: whichever caller's write
        // transaction commits first wins the id, and the loser re-reads
        // that winner's index instead of writing its own tentative one.
        let tentative = EventIndex(self.next_index.fetch_add(1, Ordering::SeqCst) + 1);
        let assigned = (|| -> Result<EventIndex> {
            let txn = self.db.begin_write()?;
            let index = {
                let mut by_id = txn.open_table(BY_ID)?;
                if let Some(existing) = by_id.get(id.as_str())? {
                    EventIndex(existing.value())
                } else {
                    by_id.insert(id.as_str(), tentative.0)?;
                    let mut by_index = txn.open_table(BY_INDEX)?;
                    by_index.insert(tentative.0, id.as_str())?;
                    tentative
                }
            };
            txn.commit()?;
            Ok(index)
        })();
        match assigned {
            Ok(index) => index,
            Err(e) => {
                tracing::error!(%id, error = %format!("{e:?}"), "rowdb: assign_index failed to persist, returning in-memory index anyway");
                tentative
            }
        }
    }

    fn find_id(&self, index: EventIndex) -> Option<EventId> {
        let read = self.db.begin_read().ok()?;
        let table = read.open_table(BY_INDEX).ok()?;
        table.get(index.0).ok()?.map(|v| EventId::new(v.value()))
    }
}

impl StoreTxnFactory for RowDb {
    type Txn = RowTxn;

    fn begin_txn(&self) -> RowTxn {
        RowTxn::new(self.database(), self.room_version)
    }
}

/// Reads a room's current head set, for callers (the injector) that
/// need to turn it back into `prev_events` without going through a
/// `RowTxn`. Not part of `EventStore`/`EventWriteTxn` since those model
/// the write-phase's view; this is a plain query helper.
pub fn room_heads(db: &RowDb, room: &RoomId) -> Result<Vec<EventIndex>> {
    let read = db.db.begin_read()?;
    let table = read.open_multimap_table(HEADS)?;
    let mut out = Vec::new();
    for item in table.get(room.as_str())? {
        out.push(EventIndex(item?.value()));
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use submerge_model::UserId;
    use submerge_vm::{EventWriteTxn, StoreTxnFactory};
    use test_log::test;

    fn member_event(id: &str) -> Event {
        Event {
            kind: "m.room.member".into(),
            sender: UserId::new("@alice:example.org"),
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
    fn assign_index_is_idempotent_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.redb");
        let id = EventId::new("$a");
        {
            let db = RowDb::open(&path).unwrap();
            let a = db.assign_index(&id);
            let b = db.assign_index(&id);
            assert_eq!(a, b);
        }
        let db = RowDb::open(&path).unwrap();
        assert!(db.find_index(&id).is_some());
        let next = db.assign_index(&EventId::new("$b"));
        assert_ne!(next, db.find_index(&id).unwrap());
    }

    #[test]
    fn uncommitted_txn_leaves_no_trace() {
        let dir = tempfile::tempdir().unwrap();
        let db = RowDb::open(dir.path().join("test.redb")).unwrap();
        let id = EventId::new("$a");
        let index = db.assign_index(&id);
        let mut txn = db.begin_txn();
        let bytes = serde_json::to_vec(&member_event("$a")).unwrap();
        txn.put_event(index, &id, &RoomId::new("!r:example.org"), 1, &bytes).unwrap();
        drop(txn);
        assert!(db.find_event(&id).is_none());
    }

    #[test]
    fn committed_event_round_trips_through_find_event() {
        let dir = tempfile::tempdir().unwrap();
        let db = RowDb::open(dir.path().join("test.redb")).unwrap();
        let id = EventId::new("$a");
        let index = db.assign_index(&id);
        let mut txn = db.begin_txn();
        let bytes = serde_json::to_vec(&member_event("$a")).unwrap();
        txn.put_event(index, &id, &RoomId::new("!r:example.org"), 1, &bytes).unwrap();
        txn.commit().unwrap();
        let found = db.find_event(&id).unwrap();
        assert_eq!(found.event_id(), Some(&id));
        assert_eq!(found.tuple.kind, "m.room.member");
    }

    #[test]
    fn heads_are_added_and_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let db = RowDb::open(dir.path().join("test.redb")).unwrap();
        let room = RoomId::new("!r:example.org");
        let a = db.assign_index(&EventId::new("$a"));
        let b = db.assign_index(&EventId::new("$b"));
        let mut txn = db.begin_txn();
        txn.add_head(&room, a).unwrap();
        txn.add_head(&room, b).unwrap();
        txn.commit().unwrap();
        assert_eq!(room_heads(&db, &room).unwrap().len(), 2);

        let mut txn = db.begin_txn();
        txn.resolve_heads(&room, &[a]).unwrap();
        txn.commit().unwrap();
        let remaining = room_heads(&db, &room).unwrap();
        assert_eq!(remaining, vec![b]);
    }
}
