use serde::{Deserialize, Serialize};

/// What a stage does when a transform reports a recoverable hazard.
///
/// Unrecoverable errors always end the stage regardless of policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Report the hazard out-of-band, drop the offending sample or merge
    /// cycle, and keep running.
    #[default]
    SkipSample,

    /// Report the hazard and fail the stage.
    Propagate,
}
