//! Shared test-only fixtures: a deterministic clock, a scriptable
//! `FederationClient` fake, an in-memory `StoreTxn` fake, and minimal
//! room-event builders, so every crate's test modules stop reinventing
//! the same handful of fixtures (`submerge-auth`'s and `submerge-vm`'s
//! having separately grown near-identical ones before this crate existed).

mod clock;
mod federation_fake;
mod fixtures;
mod store_txn_fake;

pub use clock::FixedClock;
pub use federation_fake::{CallCounts, FederationFake};
pub use fixtures::{create_event, member_event, power_levels_event, sign_event, test_keypair};
pub use store_txn_fake::FakeStoreTxn;
