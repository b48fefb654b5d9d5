use super::Device;
use crate::core::{ChannelList, Edge, Outputs, Sample, StreamReader, Transform, Value};
use crate::engine::Pipeline;
use crate::error::{BuildError, StageError};
use crate::filters::{EdgeFinder, Inverter, SchmittTrigger};
use serde::{Deserialize, Serialize};

/// Measures how long each channel stays active, e.g. light barriers timing
/// a passing flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeInterval {
    /// An interval starts on a rising edge and stops on a falling one. When
    /// false the roles are swapped.
    pub active_high: bool,
    /// Channels to invert after digitising, one flag per input channel.
    pub invert: Option<Vec<bool>>,
}

impl Default for TimeInterval {
    fn default() -> Self {
        Self {
            active_high: true,
            invert: None,
        }
    }
}

impl TimeInterval {
    pub fn timer(&self) -> IntervalTimer {
        IntervalTimer::new(self.active_high)
    }
}

impl Device for TimeInterval {
    fn attach(&self, pipeline: &mut Pipeline, input: StreamReader) -> Result<StreamReader, BuildError> {
        let channel_count = input.channels().len();
        if let Some(invert) = &self.invert {
            if invert.len() != channel_count {
                return Err(BuildError::InvalidParameter {
                    stage: "TimeInterval",
                    reason: format!(
                        "invert has {} flag(s) for {channel_count} channel(s)",
                        invert.len()
                    ),
                });
            }
        }

        let mut digital = pipeline.add(input, SchmittTrigger::default())?;

        if let Some(invert) = &self.invert {
            let mut branches = Vec::with_capacity(channel_count);
            for (branch, flip) in pipeline.split(digital)?.into_iter().zip(invert) {
                branches.push(if *flip {
                    pipeline.add(branch, Inverter)?
                } else {
                    branch
                });
            }
            digital = pipeline.merge(branches)?;
        }

        let edges = pipeline.add(digital, EdgeFinder::default())?;
        pipeline.add(edges, self.timer())
    }
}

/// Derivation stage of [`TimeInterval`]: edge tags in, interval lengths out.
///
/// Each channel remembers its last edge. When a channel sees the stop edge
/// right after a start edge, the time between the two is emitted in that
/// channel's slot with `Null` elsewhere.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    start: Edge,
    stop: Edge,
    last_edges: Vec<Option<(Edge, f64)>>,
}

impl IntervalTimer {
    pub fn new(active_high: bool) -> Self {
        let (start, stop) = if active_high {
            (Edge::Rise, Edge::Fall)
        } else {
            (Edge::Fall, Edge::Rise)
        };
        Self {
            start,
            stop,
            last_edges: Vec::new(),
        }
    }
}

impl Transform for IntervalTimer {
    fn kind(&self) -> &'static str {
        "interval"
    }

    fn output_channels(&self, input: &ChannelList) -> Result<Vec<ChannelList>, BuildError> {
        Ok(vec![input.clone()])
    }

    fn process(&mut self, sample: Sample, out: &mut Outputs) -> Result<(), StageError> {
        if self.last_edges.len() < sample.arity() {
            self.last_edges.resize(sample.arity(), None);
        }

        let t = sample.timestamp;
        let mut completed = false;
        let mut intervals = vec![Value::Null; sample.arity()];

        for (channel, value) in sample.values.iter().enumerate() {
            let Some(edge) = value.as_edge() else {
                continue;
            };
            if let Some((previous, since)) = self.last_edges[channel] {
                if previous == self.start && edge == self.stop {
                    intervals[channel] = Value::Numeric(t - since);
                    completed = true;
                }
            }
            self.last_edges[channel] = Some((edge, t));
        }

        if completed {
            out.emit(Sample::new(t, intervals))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::process_batch;

    fn tags(t: f64, values: &[Option<Edge>]) -> Sample {
        Sample::new(t, values.iter().map(|e| e.map_or(Value::Null, Value::Edge)).collect())
    }

    #[test]
    fn test_active_high_interval() {
        let channels = ChannelList::new(["gate0", "gate1"]).unwrap();
        let samples = vec![
            tags(1.0, &[Some(Edge::Rise), None]),
            tags(1.5, &[None, Some(Edge::Rise)]),
            tags(1.75, &[Some(Edge::Fall), None]),
            tags(3.0, &[None, Some(Edge::Fall)]),
        ];
        let out = process_batch(&mut IntervalTimer::new(true), &channels, samples).unwrap();

        assert_eq!(
            out[0],
            vec![
                Sample::new(1.75, vec![Value::Numeric(0.75), Value::Null]),
                Sample::new(3.0, vec![Value::Null, Value::Numeric(1.5)]),
            ]
        );
    }

    #[test]
    fn test_active_low_swaps_edges() {
        let channels = ChannelList::single("gate0");
        let samples = vec![
            tags(0.0, &[Some(Edge::Rise)]),
            tags(1.0, &[Some(Edge::Fall)]),
            tags(3.0, &[Some(Edge::Rise)]),
        ];
        let out = process_batch(&mut IntervalTimer::new(false), &channels, samples).unwrap();
        assert_eq!(out[0], vec![Sample::new(3.0, vec![Value::Numeric(2.0)])]);
    }

    #[test]
    fn test_stop_without_start_is_silent() {
        let channels = ChannelList::single("gate0");
        let samples = vec![tags(0.0, &[Some(Edge::Fall)]), tags(1.0, &[None])];
        let out = process_batch(&mut IntervalTimer::new(true), &channels, samples).unwrap();
        assert!(out[0].is_empty());
    }
}
