// spec.md §6: "The writer gets a scoped transaction handle with
// `reserve(bytes, indices)`; all index writes are staged against the
// handle; `commit` is all-or-nothing; the handle must be released on
// all exit paths." This crate only states the contract; `submerge-rowdb`
// implements it over `redb`, and `submerge-test` implements it over an
// in-memory map for fixtures.

use submerge_base::Result;

/// A scoped, single-writer storage transaction. Implementors are
/// expected to abort (release all staged writes) if dropped without a
/// call to `commit` - `Writer` relies on this for the "uncommitted is
/// not rolled back; gaps are permitted" rule (spec.md §4.7): it is the
/// *sequence counter* that keeps the gap, not the transaction, which
/// simply never existed from the store's point of view.
pub trait StoreTxn: Send {
    /// Advisory size hint for the transaction's backing allocation.
    /// `bytes` is the serialized event size (or the caller's estimate);
    /// `indices` is per-index overhead (spec.md §4.1 `reserve_bytes` /
    /// `reserve_index`).
    fn reserve(&mut self, bytes: usize, indices: usize) -> Result<()>;

    /// Applies every staged write durably. All-or-nothing.
    fn commit(self) -> Result<()>;
}
