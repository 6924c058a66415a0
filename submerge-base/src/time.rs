//! Wall-clock access behind a trait so evaluation-core tests can supply a
//! [`FixedClock`] (see `submerge-test`) and get deterministic `event_id`s
//! out of the injector (spec.md §4.8: "deterministic given a fixed clock
//! and fixed head-set").

/// Milliseconds since the Unix epoch, the unit Matrix uses for
/// `origin_server_ts`.
pub type MillisSinceEpoch = i64;

pub trait Clock: Send + Sync {
    fn now_millis(&self) -> MillisSinceEpoch;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> MillisSinceEpoch {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before epoch")
            .as_millis() as i64
    }
}
