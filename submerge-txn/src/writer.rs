// spec.md §4.7 Writer & Post-Effects, stages 1-2 and 4-5 (stage 3 index
// writes are staged by the caller against `Writer::txn_mut` before
// calling `commit`; stages 6-8, the post-hooks/notify/retire sequence,
// are driven by `submerge-vm` since they call into hook registries and
// the notify fan-out this crate has no business depending on).

use crate::sequence::SequenceAllocator;
use crate::storetxn::StoreTxn;
use std::sync::Arc;
use submerge_base::Result;

/// Owns a transaction from allocation through commit. `begin` performs
/// stage 1 (allocate) and the `reserve` half of stage 2; the caller
/// stages stage 3's index writes against `txn_mut()`, then `commit`
/// performs the rest of stage 2 (serialize is the caller's job, done
/// before index writes) and stage 4.
///
/// Holds the allocator by `Arc` rather than borrowing it so an eval can
/// carry its `Writer`/`CommittedWrite` across await points and into a
/// registry entry without threading a lifetime through everything that
/// touches it.
pub struct Writer<T: StoreTxn> {
    txn: Option<T>,
    sequence: u64,
    alloc: Arc<SequenceAllocator>,
}

impl<T: StoreTxn> Writer<T> {
    pub fn begin(alloc: Arc<SequenceAllocator>, mut txn: T, reserve_bytes: usize, reserve_index: usize) -> Result<Self> {
        txn.reserve(reserve_bytes, reserve_index)?;
        let sequence = alloc.allocate();
        Ok(Writer {
            txn: Some(txn),
            sequence,
            alloc,
        })
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// The staged transaction. Panics if called after `commit` (the
    /// type already prevents that by consuming `self` there).
    pub fn txn_mut(&mut self) -> &mut T {
        self.txn.as_mut().expect("writer transaction already committed")
    }

    /// Stage 4: apply the DB transaction; on success advance
    /// `committed` to this sequence. On failure, dropping `self.txn`
    /// (via the `Writer`'s own drop once this function returns) aborts
    /// whatever was staged; `uncommitted` is intentionally left
    /// advanced (spec.md §4.7: "gaps are permitted").
    pub fn commit(mut self) -> Result<CommittedWrite> {
        let txn = self.txn.take().expect("writer transaction already committed");
        txn.commit()?;
        self.alloc.mark_committed(self.sequence);
        Ok(CommittedWrite {
            sequence: self.sequence,
            alloc: self.alloc,
        })
    }
}

/// Stages 5-8 minus the hook/notify calls themselves: waiting for the
/// dock, and retiring once the caller has run them.
pub struct CommittedWrite {
    sequence: u64,
    alloc: Arc<SequenceAllocator>,
}

impl CommittedWrite {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Stage 5: block until every eval with a lower sequence has
    /// retired, i.e. published its post-effects.
    pub async fn wait_turn(&self) {
        self.alloc.wait_until_retired(self.sequence.saturating_sub(1)).await;
    }

    /// Stage 8: advance `retired` and wake the dock. The caller must
    /// have already run stages 6 (post-hooks) and 7 (notify) for this
    /// sequence before calling this, or downstream observers could see
    /// gaps in published effects even though sequence order held.
    pub fn retire(self) {
        self.alloc.mark_retired(self.sequence);
    }
}
