//! The Event Evaluation Core (spec.md's "VM"): the pipeline that admits
//! a single event, locally generated or received from a peer, into the
//! node's authoritative state. `Vm<S>` (in `pipeline.rs`) is the entry
//! point; everything else in this crate is plumbing it drives through
//! the seven phases - `Eval`/`EvalRegistry` (§4.2), `Options`/`Copts`
//! (§4.1), `Fault` (§3/§7), the conform/access/verify hooks (§4.4), the
//! fetch coordinator (§4.5), and the injector (§4.8).

mod access;
mod conform;
mod eval;
mod fault;
mod fetch;
mod inject;
mod keyring;
mod options;
mod pipeline;
mod registry;
mod roomreg;
mod store;
mod verify;

#[cfg(test)]
mod teststore;

pub use access::{AccessContext, AccessHooks};
pub use conform::ConformHooks;
pub use eval::{Eval, EvalId, Phase, TaskId};
pub use fault::{Fault, FaultMask, AUTH, EVENT, EXISTS, GENERAL, INVALID, STATE};
pub use fetch::FetchCoordinator;
pub use keyring::Keyring;
pub use options::{
    Admission, Copts, FetchPolicy, FetchPrevWait, Notification, Options, PhaseGate, PropMask, StateUpdate,
};
pub use pipeline::Vm;
pub use registry::{EvalHandle, EvalRegistry};
pub use roomreg::RoomRegistry;
pub use store::{EventStore, EventWriteTxn, Store, StoreTxnFactory};
