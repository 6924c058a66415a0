//! Process-wide Prometheus metrics (SPEC_FULL.md's ambient stack,
//! `aptos-core`'s and `sui`'s own `prometheus`-backed metrics modules).
//! One `Metrics` per node, handed to `submerge-vm`'s call sites that
//! already log faults (`Options::errorlog`/`warnlog`) so the two stay
//! in sync rather than drifting into separate counters.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use submerge_base::{err, Result};
use submerge_vm::Fault;

pub struct Metrics {
    registry: Registry,
    pub faults_total: IntCounterVec,
    pub evals_total: IntCounter,
    pub write_latency_seconds: Histogram,
    pub sequence_uncommitted: IntGauge,
    pub sequence_committed: IntGauge,
    pub sequence_retired: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Metrics> {
        let registry = Registry::new();

        let faults_total = IntCounterVec::new(
            Opts::new("submerge_faults_total", "Evaluation faults raised by the event evaluation core"),
            &["fault"],
        )
        .map_err(|e| err(format!("registering submerge_faults_total: {e}")))?;
        let evals_total = IntCounter::new("submerge_evals_total", "Evaluations admitted into the pipeline")
            .map_err(|e| err(format!("registering submerge_evals_total: {e}")))?;
        let write_latency_seconds = Histogram::with_opts(HistogramOpts::new(
            "submerge_write_latency_seconds",
            "Time spent in the writer phase (allocate through commit)",
        ))
        .map_err(|e| err(format!("registering submerge_write_latency_seconds: {e}")))?;
        let sequence_uncommitted = IntGauge::new("submerge_sequence_uncommitted", "Highest sequence allocated")
            .map_err(|e| err(format!("registering submerge_sequence_uncommitted: {e}")))?;
        let sequence_committed = IntGauge::new("submerge_sequence_committed", "Highest sequence durable")
            .map_err(|e| err(format!("registering submerge_sequence_committed: {e}")))?;
        let sequence_retired = IntGauge::new("submerge_sequence_retired", "Highest sequence fully published")
            .map_err(|e| err(format!("registering submerge_sequence_retired: {e}")))?;

        for collector in [
            Box::new(faults_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(evals_total.clone()),
            Box::new(write_latency_seconds.clone()),
            Box::new(sequence_uncommitted.clone()),
            Box::new(sequence_committed.clone()),
            Box::new(sequence_retired.clone()),
        ] {
            registry.register(collector).map_err(|e| err(format!("registering collector: {e}")))?;
        }

        Ok(Metrics {
            registry,
            faults_total,
            evals_total,
            write_latency_seconds,
            sequence_uncommitted,
            sequence_committed,
            sequence_retired,
        })
    }

    /// Tags the fault with `Fault::reflect()`'s label (the same string
    /// `Fault::Display` surfaces), so a dashboard's legend matches a
    /// grepped log line for the same event.
    pub fn record_fault(&self, fault: &Fault) {
        self.faults_total.with_label_values(&[fault.reflect()]).inc();
    }

    pub fn record_sequence(&self, uncommitted: u64, committed: u64, retired: u64) {
        self.sequence_uncommitted.set(uncommitted as i64);
        self.sequence_committed.set(committed as i64);
        self.sequence_retired.set(retired as i64);
    }

    /// Renders the current snapshot in Prometheus text exposition
    /// format, the payload a `/metrics` HTTP handler (out of scope per
    /// spec.md §1) would serve verbatim.
    pub fn gather_text(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&families, &mut buf).map_err(|e| err(format!("encoding metrics: {e}")))?;
        String::from_utf8(buf).map_err(|e| err(format!("metrics output was not valid utf-8: {e}")))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn fault_counter_increments_by_label() {
        let metrics = Metrics::new().unwrap();
        metrics.record_fault(&Fault::Exists);
        metrics.record_fault(&Fault::Exists);
        metrics.record_fault(&Fault::Auth("denied".into()));
        let text = metrics.gather_text().unwrap();
        assert!(text.contains("submerge_faults_total"));
    }

    #[test]
    fn sequence_gauges_reflect_latest_values() {
        let metrics = Metrics::new().unwrap();
        metrics.record_sequence(10, 9, 8);
        assert_eq!(metrics.sequence_uncommitted.get(), 10);
        assert_eq!(metrics.sequence_committed.get(), 9);
        assert_eq!(metrics.sequence_retired.get(), 8);
    }
}
