use crate::core::{ChannelList, Outputs, Sample, Transform, Value};
use crate::error::{BuildError, StageError};
use std::collections::VecDeque;

const WINDOW: usize = 3;

/// Removes single-sample spikes.
///
/// Keeps a window of three samples and emits the middle one, delayed by one
/// sample. A channel whose middle value exceeds both neighbours by more than
/// the threshold, in the same direction, is replaced by `Null`.
pub struct OutlierBuster {
    threshold: f64,
    window: VecDeque<Sample>,
}

impl OutlierBuster {
    pub const DEFAULT_THRESHOLD: f64 = 2.0;

    pub fn new(threshold: f64) -> Result<Self, BuildError> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(BuildError::InvalidParameter {
                stage: "OutlierBuster",
                reason: format!("threshold must be a non-negative number, got {threshold}"),
            });
        }
        Ok(Self {
            threshold,
            window: VecDeque::with_capacity(WINDOW),
        })
    }

    fn is_spike(&self, left: f64, middle: f64, right: f64) -> bool {
        let th = self.threshold;
        (middle - left > th && middle - right > th) || (left - middle > th && right - middle > th)
    }

    fn filter_middle(&self) -> Option<Sample> {
        let [left, middle, right] = [self.window.front()?, self.window.get(1)?, self.window.get(2)?];
        let values = middle
            .values
            .iter()
            .enumerate()
            .map(|(channel, value)| {
                let neighbours = (
                    left.get(channel).and_then(Value::as_f64),
                    value.as_f64(),
                    right.get(channel).and_then(Value::as_f64),
                );
                match neighbours {
                    (Some(l), Some(m), Some(r)) if self.is_spike(l, m, r) => Value::Null,
                    _ => *value,
                }
            })
            .collect();
        Some(Sample::new(middle.timestamp, values))
    }
}

impl Default for OutlierBuster {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            window: VecDeque::with_capacity(WINDOW),
        }
    }
}

impl Transform for OutlierBuster {
    fn kind(&self) -> &'static str {
        "outlier"
    }

    fn output_channels(&self, input: &ChannelList) -> Result<Vec<ChannelList>, BuildError> {
        Ok(vec![input.clone()])
    }

    fn process(&mut self, sample: Sample, out: &mut Outputs) -> Result<(), StageError> {
        self.window.push_back(sample);
        if self.window.len() < WINDOW {
            return Ok(());
        }

        let filtered = self.filter_middle();
        self.window.pop_front();
        match filtered {
            Some(sample) => out.emit(sample),
            None => Ok(()),
        }
    }
}
