pub mod config;
pub mod core;
pub mod devices;
pub mod engine;
pub mod error;
pub mod filters;
pub mod observability;
pub mod resilience;
pub mod sink;
pub mod source;

pub use crate::config::{PipelineConfig, StageConfig};
pub use crate::core::{ChannelList, Edge, Sample, StreamReader, StreamWriter, Value};
pub use crate::engine::{Pipeline, Stage, StageState};
pub use crate::error::{BuildError, PipelineError, StageError};
pub use crate::resilience::{FaultPolicy, StageFault};
