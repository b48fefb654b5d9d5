//! JSON description of a linear processing chain.
//!
//! ```json
//! {
//!   "fault_policy": "skip_sample",
//!   "stages": [
//!     { "type": "OutlierBuster", "threshold": 1.5 },
//!     { "type": "SpikeWheel", "spikes": 20, "diameter_mm": 25.0 }
//!   ]
//! }
//! ```

use crate::core::StreamReader;
use crate::devices::{Device, Lm335, SpikeWheel, TimeInterval};
use crate::engine::Pipeline;
use crate::error::BuildError;
use crate::filters::{ChannelSelector, EdgeFinder, Inverter, OutlierBuster, SchmittTrigger};
use crate::resilience::FaultPolicy;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub fault_policy: FaultPolicy,
    pub stages: Vec<StageConfig>,
}

fn default_rising() -> f64 {
    SchmittTrigger::DEFAULT_RISING
}

fn default_falling() -> f64 {
    SchmittTrigger::DEFAULT_FALLING
}

fn default_threshold() -> f64 {
    OutlierBuster::DEFAULT_THRESHOLD
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StageConfig {
    SchmittTrigger {
        #[serde(default = "default_rising")]
        rising: f64,
        #[serde(default = "default_falling")]
        falling: f64,
    },
    EdgeFinder {
        #[serde(default)]
        heartbeat: bool,
    },
    OutlierBuster {
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    Inverter,
    ChannelSelector {
        channel: String,
    },
    SpikeWheel(SpikeWheel),
    TimeInterval(TimeInterval),
    #[serde(rename = "LM335")]
    Lm335(Lm335),
}

impl StageConfig {
    /// Append this stage (or device wiring) behind `input`.
    pub fn attach(&self, pipeline: &mut Pipeline, input: StreamReader) -> Result<StreamReader, BuildError> {
        match self {
            StageConfig::SchmittTrigger { rising, falling } => {
                pipeline.add(input, SchmittTrigger::new(*rising, *falling)?)
            }
            StageConfig::EdgeFinder { heartbeat } => pipeline.add(input, EdgeFinder::new(*heartbeat)),
            StageConfig::OutlierBuster { threshold } => pipeline.add(input, OutlierBuster::new(*threshold)?),
            StageConfig::Inverter => pipeline.add(input, Inverter),
            StageConfig::ChannelSelector { channel } => {
                let selector = ChannelSelector::new(input.channels(), channel.as_str())?;
                pipeline.add(input, selector)
            }
            StageConfig::SpikeWheel(wheel) => wheel.attach(pipeline, input),
            StageConfig::TimeInterval(timer) => timer.attach(pipeline, input),
            StageConfig::Lm335(sensor) => sensor.attach(pipeline, input),
        }
    }
}

impl PipelineConfig {
    pub fn from_json(value: serde_json::Value) -> Result<Self, BuildError> {
        serde_json::from_value(value).map_err(|e| BuildError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read pipeline config {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("invalid pipeline config {}", path.display()))?;
        Ok(config)
    }
}

impl Pipeline {
    /// Build the chain described by `config` behind `input`. Returns the
    /// pipeline and the stream at the end of the chain.
    pub fn from_config(
        config: &PipelineConfig,
        input: StreamReader,
    ) -> Result<(Pipeline, StreamReader), BuildError> {
        let mut pipeline = Pipeline::with_policy(config.fault_policy);
        let mut stream = input;
        for stage in &config.stages {
            stream = stage.attach(&mut pipeline, stream)?;
        }
        Ok((pipeline, stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_with_defaults() {
        let config = PipelineConfig::from_json(json!({
            "stages": [
                { "type": "SchmittTrigger" },
                { "type": "EdgeFinder", "heartbeat": true },
                { "type": "SpikeWheel", "spikes": 40 },
                { "type": "LM335", "celsius": false }
            ]
        }))
        .unwrap();

        assert_eq!(config.fault_policy, FaultPolicy::SkipSample);
        assert_eq!(
            config.stages[0],
            StageConfig::SchmittTrigger {
                rising: 4.0,
                falling: 1.0
            }
        );
        assert_eq!(
            config.stages[2],
            StageConfig::SpikeWheel(SpikeWheel {
                spikes: 40,
                ..SpikeWheel::default()
            })
        );
        assert_eq!(
            config.stages[3],
            StageConfig::Lm335(Lm335 {
                divider: 2.0,
                celsius: false
            })
        );
    }

    #[test]
    fn test_unknown_stage_type() {
        let err = PipelineConfig::from_json(json!({ "stages": [{ "type": "Gain" }] })).unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
    }

    #[test]
    fn test_policy_names() {
        let config = PipelineConfig::from_json(json!({ "fault_policy": "propagate", "stages": [] })).unwrap();
        assert_eq!(config.fault_policy, FaultPolicy::Propagate);
    }
}
