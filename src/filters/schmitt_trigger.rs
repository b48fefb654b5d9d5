use crate::core::{ChannelList, Outputs, Sample, Transform, Value};
use crate::error::{BuildError, StageError};

/// Converts analog values to booleans with hysteresis, on every channel.
///
/// The first sample is seeded against the midpoint of the two levels. After
/// that a channel only turns true at or above `rising` and only turns false
/// at or below `falling`; anything in between keeps the previous state.
pub struct SchmittTrigger {
    rising: f64,
    falling: f64,
    state: Option<Vec<bool>>,
}

impl SchmittTrigger {
    pub const DEFAULT_RISING: f64 = 4.0;
    pub const DEFAULT_FALLING: f64 = 1.0;

    pub fn new(rising: f64, falling: f64) -> Result<Self, BuildError> {
        if !(falling < rising) {
            return Err(BuildError::InvalidParameter {
                stage: "SchmittTrigger",
                reason: format!("falling level {falling} must be below rising level {rising}"),
            });
        }
        Ok(Self {
            rising,
            falling,
            state: None,
        })
    }

    fn midpoint(&self) -> f64 {
        (self.rising + self.falling) / 2.0
    }

    fn next_level(&self, previous: Option<bool>, value: &Value, channel: usize) -> Result<bool, StageError> {
        let level = match (value, previous) {
            (Value::Numeric(v), None) => *v >= self.midpoint(),
            (Value::Numeric(v), Some(_)) if *v >= self.rising => true,
            (Value::Numeric(v), Some(_)) if *v <= self.falling => false,
            (Value::Numeric(_), Some(prev)) => prev,
            // already digital
            (Value::Boolean(b), _) => *b,
            (Value::Null, prev) => prev.unwrap_or(false),
            (Value::Edge(_), _) => {
                return Err(StageError::InvalidValue {
                    channel,
                    reason: "edge tag cannot be digitised".to_string(),
                })
            }
        };
        Ok(level)
    }
}

impl Default for SchmittTrigger {
    fn default() -> Self {
        Self {
            rising: Self::DEFAULT_RISING,
            falling: Self::DEFAULT_FALLING,
            state: None,
        }
    }
}

impl Transform for SchmittTrigger {
    fn kind(&self) -> &'static str {
        "schmitt"
    }

    fn output_channels(&self, input: &ChannelList) -> Result<Vec<ChannelList>, BuildError> {
        Ok(vec![input.clone()])
    }

    fn process(&mut self, sample: Sample, out: &mut Outputs) -> Result<(), StageError> {
        let levels = sample
            .values
            .iter()
            .enumerate()
            .map(|(channel, value)| {
                let previous = self.state.as_ref().and_then(|s| s.get(channel).copied());
                self.next_level(previous, value, channel)
            })
            .collect::<Result<Vec<bool>, _>>()?;

        out.emit(Sample::boolean(sample.timestamp, &levels))?;
        self.state = Some(levels);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::process_batch;

    fn run(trigger: &mut SchmittTrigger, values: &[f64]) -> Vec<bool> {
        let channels = ChannelList::single("AIN0");
        let samples = values
            .iter()
            .enumerate()
            .map(|(i, v)| Sample::numeric(i as f64, &[*v]));
        process_batch(trigger, &channels, samples).unwrap()[0]
            .iter()
            .map(|s| s.values[0].as_bool().unwrap())
            .collect()
    }

    #[test]
    fn test_first_sample_seeds_against_midpoint() {
        assert_eq!(run(&mut SchmittTrigger::default(), &[2.5]), vec![true]);
        assert_eq!(run(&mut SchmittTrigger::default(), &[2.49]), vec![false]);
    }

    #[test]
    fn test_hysteresis_holds_inside_band() {
        let levels = run(&mut SchmittTrigger::default(), &[0.0, 3.9, 4.0, 1.1, 2.0, 1.0, 3.0]);
        assert_eq!(levels, vec![false, false, true, true, true, false, false]);
    }

    #[test]
    fn test_channels_are_independent() {
        let channels = ChannelList::new(["AIN0", "AIN1"]).unwrap();
        let samples = vec![Sample::numeric(0.0, &[5.0, 0.0]), Sample::numeric(1.0, &[2.0, 4.5])];
        let out = process_batch(&mut SchmittTrigger::default(), &channels, samples).unwrap();
        assert_eq!(out[0][1].values, vec![Value::Boolean(true), Value::Boolean(true)]);
    }

    #[test]
    fn test_null_holds_previous_state() {
        let channels = ChannelList::single("AIN0");
        let samples = vec![
            Sample::numeric(0.0, &[5.0]),
            Sample::new(1.0, vec![Value::Null]),
        ];
        let out = process_batch(&mut SchmittTrigger::default(), &channels, samples).unwrap();
        assert_eq!(out[0][1].values, vec![Value::Boolean(true)]);
    }

    #[test]
    fn test_rejects_inverted_levels() {
        assert!(SchmittTrigger::new(1.0, 4.0).is_err());
        assert!(SchmittTrigger::new(2.0, 2.0).is_err());
    }
}
