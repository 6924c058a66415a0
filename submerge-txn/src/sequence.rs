// spec.md §3 "Sequence Counters": three process-wide monotone counters
// - uncommitted, committed, retired - with the invariant
// `retired <= committed <= uncommitted`. §4.3 names the dock that lets
// a writer "wait on the dock until retired == sequence - 1 before
// publishing post-effects". Design note §9: "atomics are unnecessary
// under single-threaded cooperative scheduling but become mandatory if
// the runtime is ever made multithreaded" - we use them from the start
// so the type is `Sync` without relying on the executor's threading
// model, at negligible cost.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;

/// A suspend/notify primitive (spec.md GLOSSARY: "Dock"). Uses the
/// create-then-check-then-await ordering `tokio::sync::Notify` requires
/// to avoid losing a wakeup that lands between the check and the await.
pub struct Dock {
    notify: Notify,
}

impl Default for Dock {
    fn default() -> Self {
        Dock { notify: Notify::new() }
    }
}

impl Dock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn wait_while(&self, mut pending: impl FnMut() -> bool) {
        loop {
            let notified = self.notify.notified();
            if !pending() {
                return;
            }
            notified.await;
        }
    }

    pub fn wake_all(&self) {
        self.notify.notify_waiters();
    }
}

/// spec.md §3 / §4.3. `allocate` happens "at entry to the write phase":
/// it atomically increments `uncommitted` and returns the new value as
/// the eval's `sequence`. `mark_committed`/`mark_retired` are
/// monotonic-max updates so that a late-arriving lower sequence
/// (shouldn't happen, but is not load-bearing to forbid) can't regress
/// the counter.
pub struct SequenceAllocator {
    uncommitted: AtomicU64,
    committed: AtomicU64,
    retired: AtomicU64,
    dock: Dock,
}

impl Default for SequenceAllocator {
    fn default() -> Self {
        SequenceAllocator {
            uncommitted: AtomicU64::new(0),
            committed: AtomicU64::new(0),
            retired: AtomicU64::new(0),
            dock: Dock::new(),
        }
    }
}

impl SequenceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next sequence number. Sequences start at 1; 0 means
    /// "nothing admitted yet" for all three counters.
    pub fn allocate(&self) -> u64 {
        self.uncommitted.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn mark_committed(&self, sequence: u64) {
        self.committed.fetch_max(sequence, Ordering::SeqCst);
    }

    pub fn mark_retired(&self, sequence: u64) {
        self.retired.fetch_max(sequence, Ordering::SeqCst);
        self.dock.wake_all();
    }

    pub fn uncommitted(&self) -> u64 {
        self.uncommitted.load(Ordering::SeqCst)
    }

    pub fn committed(&self) -> u64 {
        self.committed.load(Ordering::SeqCst)
    }

    pub fn retired(&self) -> u64 {
        self.retired.load(Ordering::SeqCst)
    }

    /// Blocks the calling task until `retired >= target`, i.e. until
    /// every eval with a lower sequence has published its post-effects
    /// (spec.md §4.3: "an eval must wait on the dock until
    /// `retired == sequence - 1` before publishing post-effects").
    pub async fn wait_until_retired(&self, target: u64) {
        self.dock
            .wait_while(|| self.retired.load(Ordering::SeqCst) < target)
            .await;
    }

    pub fn invariant_holds(&self) -> bool {
        self.retired() <= self.committed() && self.committed() <= self.uncommitted()
    }
}
