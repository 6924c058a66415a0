//! Process-wide `tracing` subscriber initialization (SPEC_FULL.md §3.2).
//! Only the `submerge` binary calls this; every library crate only ever
//! emits through `tracing`'s macros, the split `aptos-logger` and sui's
//! `telemetry-subscribers` both draw between "owns the subscriber" and
//! "just logs".

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Installs the global `tracing` subscriber. Panics if called twice
/// (`tracing`'s own `set_global_default` contract) - this is only ever
/// called once, at binary startup, never from library code or tests
/// (which use `test_log::test` instead, per SPEC_FULL.md §3.4).
pub fn init(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
}
