// spec.md §4.8: "Property synthesis is deterministic given a fixed
// clock and fixed head-set so a retry produces an identical event-id."
// This is the fixed clock half of that contract.

use parking_lot::Mutex;
use submerge_base::{Clock, MillisSinceEpoch};

pub struct FixedClock(Mutex<MillisSinceEpoch>);

impl FixedClock {
    pub fn new(millis: MillisSinceEpoch) -> Self {
        FixedClock(Mutex::new(millis))
    }

    pub fn set(&self, millis: MillisSinceEpoch) {
        *self.0.lock() = millis;
    }

    pub fn advance(&self, millis: MillisSinceEpoch) {
        *self.0.lock() += millis;
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        FixedClock::new(1_700_000_000_000)
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> MillisSinceEpoch {
        *self.0.lock()
    }
}
