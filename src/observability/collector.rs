use super::StageMetrics;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub stage: String,
    pub samples_in: u64,
    pub samples_out: u64,
    pub faults: u64,
    pub avg_latency_ns: u64,
}

/// Registry of per-stage metrics, keyed by stage name.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    metrics: BTreeMap<String, Arc<StageMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, metrics: Arc<StageMetrics>) {
        self.metrics.insert(metrics.stage().to_string(), metrics);
    }

    pub fn snapshot(&self) -> BTreeMap<String, MetricsSnapshot> {
        self.metrics
            .iter()
            .map(|(stage, metrics)| (stage.clone(), metrics.snapshot()))
            .collect()
    }

    pub fn get(&self, stage: &str) -> Option<Arc<StageMetrics>> {
        self.metrics.get(stage).cloned()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
