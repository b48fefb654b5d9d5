use super::MetricsSnapshot;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counters for one stage, shared between the stage task and observers.
#[derive(Debug)]
pub struct StageMetrics {
    stage: String,
    samples_in: AtomicU64,
    samples_out: AtomicU64,
    faults: AtomicU64,
    total_latency_ns: AtomicU64,
    latency_samples: AtomicU64,
}

impl StageMetrics {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            samples_in: AtomicU64::new(0),
            samples_out: AtomicU64::new(0),
            faults: AtomicU64::new(0),
            total_latency_ns: AtomicU64::new(0),
            latency_samples: AtomicU64::new(0),
        }
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn samples_in(&self) -> u64 {
        self.samples_in.load(Ordering::Relaxed)
    }

    pub fn samples_out(&self) -> u64 {
        self.samples_out.load(Ordering::Relaxed)
    }

    pub fn faults(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }

    pub fn record_sample_in(&self) {
        self.samples_in.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_samples_out(&self, count: u64) {
        self.samples_out.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_fault(&self) {
        self.faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn start_processing(&self) -> Instant {
        Instant::now()
    }

    pub fn finish_processing(&self, start: Instant) {
        let latency_ns = start.elapsed().as_nanos() as u64;
        self.total_latency_ns.fetch_add(latency_ns, Ordering::Relaxed);
        self.latency_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            stage: self.stage.clone(),
            samples_in: self.samples_in(),
            samples_out: self.samples_out(),
            faults: self.faults(),
            avg_latency_ns: self.avg_latency_ns(),
        }
    }

    pub fn avg_latency_ns(&self) -> u64 {
        let samples = self.latency_samples.load(Ordering::Relaxed);
        if samples == 0 {
            return 0;
        }
        self.total_latency_ns.load(Ordering::Relaxed) / samples
    }
}
