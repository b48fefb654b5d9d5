//! Composite sensor devices.
//!
//! A device appends a fixed wiring of filter stages to a pipeline and ends it
//! with a derivation stage that turns digitised signals into physical
//! quantities.

pub mod lm335;
pub mod spike_wheel;
pub mod time_interval;

pub use lm335::Lm335;
pub use spike_wheel::{SpikeWheel, WheelKinematics, WheelPhase};
pub use time_interval::{IntervalTimer, TimeInterval};

use crate::core::StreamReader;
use crate::engine::Pipeline;
use crate::error::BuildError;

pub trait Device {
    /// Wire the device behind `input` and return the derived stream.
    fn attach(&self, pipeline: &mut Pipeline, input: StreamReader) -> Result<StreamReader, BuildError>;
}
