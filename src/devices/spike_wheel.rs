use super::Device;
use crate::core::{ChannelList, Outputs, Sample, StreamReader, Transform, Value};
use crate::engine::Pipeline;
use crate::error::{BuildError, StageError};
use crate::filters::{EdgeFinder, SchmittTrigger};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A toothed wheel spinning through a light barrier.
///
/// Takes one analog channel and derives distance, velocity and acceleration
/// (`s`, `v`, `a`) from the spacing of the barrier's edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpikeWheel {
    pub spikes: u32,
    pub diameter_mm: f64,
    /// Spike spacings travelled from one edge to the next. Need not be
    /// whole, e.g. `0.5` when both flanks of every spike are counted.
    pub edge_fraction: f64,
}

impl Default for SpikeWheel {
    fn default() -> Self {
        Self {
            spikes: 20,
            diameter_mm: 25.0,
            edge_fraction: 2.0,
        }
    }
}

impl SpikeWheel {
    /// Distance in metres travelled between two edges.
    pub fn step_distance(&self) -> f64 {
        let perimeter = PI * self.diameter_mm / 1000.0;
        perimeter / f64::from(self.spikes) * self.edge_fraction
    }

    pub fn kinematics(&self) -> Result<WheelKinematics, BuildError> {
        if self.spikes == 0 {
            return Err(BuildError::InvalidParameter {
                stage: "SpikeWheel",
                reason: "spikes must be positive".to_string(),
            });
        }
        if !(self.edge_fraction.is_finite() && self.edge_fraction > 0.0) {
            return Err(BuildError::InvalidParameter {
                stage: "SpikeWheel",
                reason: format!("edge_fraction must be positive, got {}", self.edge_fraction),
            });
        }
        if !(self.diameter_mm.is_finite() && self.diameter_mm > 0.0) {
            return Err(BuildError::InvalidParameter {
                stage: "SpikeWheel",
                reason: format!("diameter must be positive, got {}", self.diameter_mm),
            });
        }
        Ok(WheelKinematics::new(self.step_distance()))
    }
}

impl Device for SpikeWheel {
    fn attach(&self, pipeline: &mut Pipeline, input: StreamReader) -> Result<StreamReader, BuildError> {
        if input.channels().len() != 1 {
            return Err(BuildError::ChannelCount {
                stage: "SpikeWheel",
                expected: 1,
                found: input.channels().len(),
            });
        }
        let kinematics = self.kinematics()?;

        let digital = pipeline.add(input, SchmittTrigger::default())?;
        let edges = pipeline.add(digital, EdgeFinder::heartbeat())?;
        pipeline.add(edges, kinematics)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub t: f64,
    pub s: f64,
}

/// Progress of the kinematic derivation. Each phase knows exactly which
/// quantities are derivable.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum WheelPhase {
    #[default]
    AwaitingFirstEdge,
    /// Position is known.
    Started { last: Position },
    /// Position and velocity are known.
    Moving {
        two_ago: Position,
        last: Position,
        velocity: f64,
    },
}

impl WheelPhase {
    /// Advance by one edge at time `t`, travelling `ds`.
    ///
    /// Returns the next phase and the `(s, v, a)` values to emit. The current
    /// phase is untouched on error.
    pub fn step(self, t: f64, ds: f64) -> Result<(WheelPhase, [Value; 3]), StageError> {
        match self {
            WheelPhase::AwaitingFirstEdge => Ok((
                WheelPhase::Started {
                    last: Position { t, s: 0.0 },
                },
                [Value::Numeric(0.0), Value::Null, Value::Null],
            )),
            WheelPhase::Started { last } => {
                let dt = interval(last.t, t)?;
                let here = Position { t, s: last.s + ds };
                let velocity = ds / dt;
                Ok((
                    WheelPhase::Moving {
                        two_ago: last,
                        last: here,
                        velocity,
                    },
                    [Value::Numeric(here.s), Value::Numeric(velocity), Value::Null],
                ))
            }
            WheelPhase::Moving {
                two_ago,
                last,
                velocity: previous,
            } => {
                let dt = interval(last.t, t)?;
                let span = interval(two_ago.t, t)?;
                let here = Position { t, s: last.s + ds };
                let velocity = (here.s - two_ago.s) / span;
                let acceleration = (velocity - previous) / dt;
                Ok((
                    WheelPhase::Moving {
                        two_ago: last,
                        last: here,
                        velocity,
                    },
                    [
                        Value::Numeric(here.s),
                        Value::Numeric(velocity),
                        Value::Numeric(acceleration),
                    ],
                ))
            }
        }
    }
}

fn interval(from: f64, to: f64) -> Result<f64, StageError> {
    let dt = to - from;
    if dt <= 0.0 {
        return Err(StageError::ZeroInterval { timestamp: to });
    }
    Ok(dt)
}

/// Derivation stage of [`SpikeWheel`]: edge tags in, `(s, v, a)` out.
#[derive(Debug, Clone)]
pub struct WheelKinematics {
    step_distance: f64,
    phase: WheelPhase,
}

impl WheelKinematics {
    pub fn new(step_distance: f64) -> Self {
        Self {
            step_distance,
            phase: WheelPhase::default(),
        }
    }

    pub fn phase(&self) -> WheelPhase {
        self.phase
    }
}

impl Transform for WheelKinematics {
    fn kind(&self) -> &'static str {
        "kinematics"
    }

    fn output_channels(&self, input: &ChannelList) -> Result<Vec<ChannelList>, BuildError> {
        if input.len() != 1 {
            return Err(BuildError::ChannelCount {
                stage: "WheelKinematics",
                expected: 1,
                found: input.len(),
            });
        }
        Ok(vec![ChannelList::new(["s", "v", "a"])?])
    }

    fn process(&mut self, sample: Sample, out: &mut Outputs) -> Result<(), StageError> {
        match sample.values.first() {
            Some(Value::Edge(_)) => {}
            // no edge this sample
            Some(Value::Null) => return Ok(()),
            Some(other) => {
                return Err(StageError::InvalidValue {
                    channel: 0,
                    reason: format!("expected an edge tag, got {}", other.type_name()),
                })
            }
            None => {
                return Err(StageError::Arity {
                    expected: 1,
                    found: 0,
                })
            }
        }

        let (next, values) = self.phase.step(sample.timestamp, self.step_distance)?;
        out.emit(Sample::new(sample.timestamp, values.to_vec()))?;
        self.phase = next;
        Ok(())
    }
}
