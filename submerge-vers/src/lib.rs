//! Per-room bookkeeping the writer maintains on every committed event:
//! present state, the DAG head set, and the historical state BTree
//! (spec.md §4.7 step 3), plus the room-version-to-auth-rule-set table
//! (spec.md §4.6) shared with `submerge-auth`.

mod head;
mod history;
mod resolution;
mod room;
mod state;

#[cfg(test)]
mod test;

pub use head::HeadSet;
pub use history::HistoryTree;
pub use resolution::AuthRuleSet;
pub use room::RoomDag;
pub use state::PresentState;
