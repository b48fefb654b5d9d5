//! Error types for stage construction, stage execution and pipeline control.
//!
//! Construction problems are [`BuildError`]s and surface synchronously before
//! any task is spawned. Problems met while samples flow are [`StageError`]s;
//! whether they end the stage is decided by the pipeline's
//! [`FaultPolicy`](crate::resilience::FaultPolicy).

use thiserror::Error;

/// Errors raised while wiring a stage. No stage exists when one is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("unknown channel '{name}' (available: {available:?})")]
    UnknownChannel { name: String, available: Vec<String> },

    #[error("duplicate channel name '{0}'")]
    DuplicateChannel(String),

    #[error("{stage} expects {expected} channel(s), input has {found}")]
    ChannelCount {
        stage: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid parameter for {stage}: {reason}")]
    InvalidParameter { stage: &'static str, reason: String },

    #[error("{stage} needs at least one input stream")]
    NoInputs { stage: &'static str },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised by a running stage while handling a sample.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StageError {
    #[error("timestamp mismatch on input {input}: expected {expected}, found {found}")]
    TimestampMismatch {
        input: usize,
        expected: f64,
        found: f64,
    },

    #[error("zero time interval between events at t={timestamp}")]
    ZeroInterval { timestamp: f64 },

    #[error("channel {channel} carries an unsupported value: {reason}")]
    InvalidValue { channel: usize, reason: String },

    #[error("sample arity {found} does not match {expected} channel(s)")]
    Arity { expected: usize, found: usize },

    #[error("no output port {0}")]
    NoSuchPort(usize),

    #[error("stage panicked: {0}")]
    Panicked(String),
}

impl StageError {
    /// Runtime hazards the fault policy may skip. Arity and port errors are
    /// wiring bugs and a panic leaves the stage state unknown; both always
    /// end the stage.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::TimestampMismatch { .. } | Self::ZeroInterval { .. } | Self::InvalidValue { .. }
        )
    }
}

/// Errors returned by stage and pipeline control operations.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("stage {stage} failed: {source}")]
    Stage {
        stage: String,
        #[source]
        source: StageError,
    },

    #[error("invalid state transition for {stage}: {from} -> {to}")]
    InvalidTransition {
        stage: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("stage {stage} task aborted: {message}")]
    Join { stage: String, message: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
