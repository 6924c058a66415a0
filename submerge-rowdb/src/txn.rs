//! `RowTxn`: the `redb`-backed `StoreTxn`/`EventWriteTxn`. Wraps exactly
//! one `redb::WriteTransaction`; every `EventWriteTxn` method opens the
//! table(s) it needs against that transaction and stages an insert,
//! `StoreTxn::commit` hands the whole thing to `redb` atomically, and
//! dropping a `RowTxn` without committing aborts it (redb's own `Drop`
//! impl), matching the "uncommitted is not rolled back, the transaction
//! simply never existed" contract `submerge_txn::StoreTxn` documents.

use crate::{keys, Adjacency, EventRow, ADJACENCY, BY_ID, BY_INDEX, EVENTS, HEADS, HISTORY, PRESENT, SEQUENCE};
use redb::{Database, WriteTransaction};
use std::sync::Arc;
use submerge_base::Result;
use submerge_model::{EventId, EventIndex, RoomId, RoomVersion};
use submerge_txn::StoreTxn;
use submerge_vm::EventWriteTxn;

pub struct RowTxn {
    txn: WriteTransaction,
    room_version: RoomVersion,
    reserved_bytes: usize,
    reserved_indices: usize,
}

impl RowTxn {
    pub(crate) fn new(db: Arc<Database>, room_version: RoomVersion) -> RowTxn {
        // `begin_write` blocks the calling task until `redb`'s single
        // write slot is free. Under the workspace's single-threaded
        // cooperative model (spec.md §5) this is never contended within
        // one eval; across evals it is exactly the serialization the
        // writer phase wants.
        let txn = db.begin_write().expect("rowdb: failed to begin write transaction");
        RowTxn {
            txn,
            room_version,
            reserved_bytes: 0,
            reserved_indices: 0,
        }
    }
}

impl StoreTxn for RowTxn {
    fn reserve(&mut self, bytes: usize, indices: usize) -> Result<()> {
        self.reserved_bytes = bytes;
        self.reserved_indices = indices;
        tracing::debug!(bytes, indices, "rowdb: reserved transaction capacity (advisory only)");
        Ok(())
    }

    fn commit(self) -> Result<()> {
        self.txn.commit()?;
        Ok(())
    }
}

impl EventWriteTxn for RowTxn {
    fn put_event(&mut self, index: EventIndex, id: &EventId, room: &RoomId, depth: i64, bytes: &[u8]) -> Result<()> {
        let row = EventRow {
            room: room.as_str().to_string(),
            depth,
            room_version: crate::encode_room_version(self.room_version),
            bytes: bytes.to_vec(),
        };
        let encoded = rmp_serde::to_vec(&row)?;
        {
            let mut events = self.txn.open_table(EVENTS)?;
            events.insert(index.0, encoded.as_slice())?;
        }
        {
            let mut by_id = self.txn.open_table(BY_ID)?;
            by_id.insert(id.as_str(), index.0)?;
        }
        {
            let mut by_index = self.txn.open_table(BY_INDEX)?;
            by_index.insert(index.0, id.as_str())?;
        }
        Ok(())
    }

    fn put_adjacency(&mut self, index: EventIndex, prev: &[EventIndex], auth: &[EventIndex]) -> Result<()> {
        let adj = Adjacency {
            prev: prev.iter().map(|i| i.0).collect(),
            auth: auth.iter().map(|i| i.0).collect(),
        };
        let encoded = rmp_serde::to_vec(&adj)?;
        let mut table = self.txn.open_table(ADJACENCY)?;
        table.insert(index.0, encoded.as_slice())?;
        Ok(())
    }

    fn set_present(&mut self, room: &RoomId, event_type: &str, state_key: &str, index: EventIndex) -> Result<()> {
        let key = keys::present_key(room.as_str(), event_type, state_key);
        let mut table = self.txn.open_table(PRESENT)?;
        table.insert(key.as_str(), index.0)?;
        Ok(())
    }

    fn record_history(&mut self, room: &RoomId, event_type: &str, state_key: &str, depth: i64, index: EventIndex) -> Result<()> {
        let key = keys::history_key(room.as_str(), event_type, state_key, depth, index.0);
        let mut table = self.txn.open_table(HISTORY)?;
        table.insert(key.as_str(), index.0)?;
        Ok(())
    }

    fn add_head(&mut self, room: &RoomId, index: EventIndex) -> Result<()> {
        let mut table = self.txn.open_multimap_table(HEADS)?;
        table.insert(room.as_str(), index.0)?;
        Ok(())
    }

    fn resolve_heads(&mut self, room: &RoomId, resolved: &[EventIndex]) -> Result<()> {
        let mut table = self.txn.open_multimap_table(HEADS)?;
        for index in resolved {
            table.remove(room.as_str(), index.0)?;
        }
        Ok(())
    }

    fn record_sequence(&mut self, sequence: u64, index: EventIndex) -> Result<()> {
        let mut table = self.txn.open_table(SEQUENCE)?;
        table.insert(sequence, index.0)?;
        Ok(())
    }
}
