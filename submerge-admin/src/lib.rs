//! Node-wide admin concerns the core pipeline doesn't own itself
//! (SPEC_FULL.md §3.2-3.3): typed TOML config, `tracing` subscriber
//! init, and Prometheus metrics. Nothing in this crate is on
//! `submerge-vm`'s hot path - it is consumed only by the `submerge`
//! binary and by anything standing up an admin/ops surface on top of it.

mod config;
mod logging;
mod metrics;

pub use config::NodeConfig;
pub use logging::{init as init_logging, LogFormat};
pub use metrics::Metrics;
