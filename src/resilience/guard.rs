use super::FaultPolicy;
use crate::error::StageError;
use crate::observability::StageMetrics;
use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;
use std::sync::Arc;

/// Out-of-band report of an error raised inside a stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageFault {
    pub stage: String,
    /// Timestamp of the sample being handled, if any.
    pub timestamp: Option<f64>,
    #[serde(serialize_with = "serialize_display")]
    pub error: StageError,
    /// Whether the stage terminated because of it.
    pub fatal: bool,
}

fn serialize_display<S: serde::Serializer>(err: &StageError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(err)
}

/// Create the channel stages report faults on.
pub fn fault_channel() -> (Sender<StageFault>, Receiver<StageFault>) {
    crossbeam_channel::unbounded()
}

/// Applies the fault policy to the outcome of handling one sample, records
/// metrics, and reports faults.
#[derive(Clone)]
pub struct FaultGuard {
    stage: String,
    policy: FaultPolicy,
    faults: Sender<StageFault>,
    metrics: Arc<StageMetrics>,
}

impl FaultGuard {
    pub fn new(
        stage: impl Into<String>,
        policy: FaultPolicy,
        faults: Sender<StageFault>,
        metrics: Arc<StageMetrics>,
    ) -> Self {
        Self {
            stage: stage.into(),
            policy,
            faults,
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<StageMetrics> {
        &self.metrics
    }

    /// Returns `Err` only when the stage must stop.
    pub fn check(&self, timestamp: Option<f64>, outcome: Result<(), StageError>) -> Result<(), StageError> {
        let error = match outcome {
            Ok(()) => return Ok(()),
            Err(error) => error,
        };
        self.metrics.record_fault();

        let fatal = !error.is_recoverable() || self.policy == FaultPolicy::Propagate;
        if fatal {
            tracing::error!(stage = %self.stage, ?timestamp, %error, "stage failed");
        } else {
            tracing::warn!(stage = %self.stage, ?timestamp, %error, "sample skipped");
        }

        // Nobody listening is fine; the log line above still records it.
        let _ = self.faults.send(StageFault {
            stage: self.stage.clone(),
            timestamp,
            error: error.clone(),
            fatal,
        });

        if fatal {
            Err(error)
        } else {
            Ok(())
        }
    }
}
