use super::MetricsSnapshot;
use serde::Serialize;
use std::fmt::Write;

/// Metrics of one stage together with where it sits in the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub kind: &'static str,
    pub state: &'static str,
    pub metrics: MetricsSnapshot,
}

/// Text view over a pipeline's stages, in source-to-sink order.
#[derive(Debug, Clone, Default)]
pub struct PipelineMonitor {
    stages: Vec<StageReport>,
}

impl PipelineMonitor {
    pub fn new(stages: Vec<StageReport>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[StageReport] {
        &self.stages
    }

    /// Stages that recorded at least one fault.
    pub fn faulty(&self) -> impl Iterator<Item = &StageReport> {
        self.stages.iter().filter(|stage| stage.metrics.faults > 0)
    }

    /// One row per stage, followed by a fault summary.
    pub fn generate_report(&self) -> String {
        if self.stages.is_empty() {
            return "pipeline has no stages".to_string();
        }

        let width = self
            .stages
            .iter()
            .map(|stage| stage.metrics.stage.len())
            .max()
            .unwrap_or(0)
            .max("stage".len());

        let mut report = format!(
            "{:<width$}  {:<10}  {:<10}  {:>8}  {:>8}  {:>6}  {:>10}\n",
            "stage", "kind", "state", "in", "out", "faults", "latency"
        );
        for stage in &self.stages {
            let m = &stage.metrics;
            // Writing to a String cannot fail.
            let _ = writeln!(
                report,
                "{:<width$}  {:<10}  {:<10}  {:>8}  {:>8}  {:>6}  {:>7.1} us",
                m.stage,
                stage.kind,
                stage.state,
                m.samples_in,
                m.samples_out,
                m.faults,
                m.avg_latency_ns as f64 / 1000.0,
            );
        }

        let faulty: Vec<&str> = self.faulty().map(|stage| stage.metrics.stage.as_str()).collect();
        if faulty.is_empty() {
            report.push_str("no faults");
        } else {
            let total: u64 = self.faulty().map(|stage| stage.metrics.faults).sum();
            let _ = write!(report, "{total} fault(s) in {}", faulty.join(", "));
        }
        report
    }
}
