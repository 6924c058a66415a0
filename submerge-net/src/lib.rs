//! Federation collaborator surface (spec.md §1: "Federation wire clients
//! ... are collaborators invoked through a narrow RPC interface", §6
//! External Interfaces). `submerge-vm`'s fetch coordinator drives these
//! traits; this crate owns only the request/response shape, the
//! X-Matrix request-signing scheme (SPEC_FULL.md §4 item 1), and the
//! duplicate-request coalescing map (spec.md §4.5: "duplicate concurrent
//! requests ... coalesce onto one outstanding task via a futures map").

mod coalesce;
mod federation;
mod xmatrix;

pub use coalesce::FetchCoalesce;
pub use federation::{FederationClient, JoinResult, JoinTemplate, PduJson, VerifyKeys};
pub use xmatrix::XMatrixAuth;
