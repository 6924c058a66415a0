//! The sequence allocator, the dock that orders writes by it, and the
//! storage-transaction contract the writer stages index updates
//! against (spec.md §3 Sequence Counters, §4.3, §4.7, §6 "Storage
//! transaction contract"). `submerge-vm` drives a `Writer` through one
//! eval's write phase; `submerge-rowdb` supplies the concrete `StoreTxn`.

mod sequence;
mod storetxn;
mod writer;

#[cfg(test)]
mod test;

pub use sequence::{Dock, SequenceAllocator};
pub use storetxn::StoreTxn;
pub use writer::{CommittedWrite, Writer};
