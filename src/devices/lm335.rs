use super::Device;
use crate::core::{ChannelList, Outputs, Sample, StreamReader, Transform, Value};
use crate::engine::Pipeline;
use crate::error::{BuildError, StageError};
use serde::{Deserialize, Serialize};

const ABSOLUTE_ZERO_CELSIUS: f64 = -273.15;

/// LM335 temperature sensor: 10 mV per kelvin, read through a voltage divider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lm335 {
    /// Factor the measured voltage is multiplied by to undo the divider.
    pub divider: f64,
    pub celsius: bool,
}

impl Default for Lm335 {
    fn default() -> Self {
        Self {
            divider: 2.0,
            celsius: true,
        }
    }
}

impl Lm335 {
    pub fn temperature(&self, volts: f64) -> f64 {
        let kelvin = volts * 100.0 * self.divider;
        if self.celsius {
            kelvin + ABSOLUTE_ZERO_CELSIUS
        } else {
            kelvin
        }
    }
}

impl Device for Lm335 {
    fn attach(&self, pipeline: &mut Pipeline, input: StreamReader) -> Result<StreamReader, BuildError> {
        if !(self.divider.is_finite() && self.divider > 0.0) {
            return Err(BuildError::InvalidParameter {
                stage: "LM335",
                reason: format!("divider must be positive, got {}", self.divider),
            });
        }
        pipeline.add(input, self.clone())
    }
}

impl Transform for Lm335 {
    fn kind(&self) -> &'static str {
        "lm335"
    }

    fn output_channels(&self, input: &ChannelList) -> Result<Vec<ChannelList>, BuildError> {
        Ok(vec![input.clone()])
    }

    fn process(&mut self, mut sample: Sample, out: &mut Outputs) -> Result<(), StageError> {
        for (channel, value) in sample.values.iter_mut().enumerate() {
            *value = match *value {
                Value::Numeric(volts) => Value::Numeric(self.temperature(volts)),
                Value::Null => Value::Null,
                other => {
                    return Err(StageError::InvalidValue {
                        channel,
                        reason: format!("expected a voltage, got {}", other.type_name()),
                    })
                }
            };
        }
        out.emit(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::process_batch;

    #[test]
    fn test_celsius_conversion() {
        let channels = ChannelList::new(["T1", "T2"]).unwrap();
        let sample = Sample::new(0.0, vec![Value::Numeric(1.5), Value::Null]);
        let out = process_batch(&mut Lm335::default(), &channels, [sample]).unwrap();

        let celsius = out[0][0].values[0].as_f64().unwrap();
        assert!((celsius - 26.85).abs() < 1e-9);
        assert_eq!(out[0][0].values[1], Value::Null);
    }

    #[test]
    fn test_kelvin_without_divider() {
        let sensor = Lm335 {
            divider: 1.0,
            celsius: false,
        };
        assert!((sensor.temperature(2.98) - 298.0).abs() < 1e-9);
    }

    #[test]
    fn test_boolean_is_rejected() {
        let channels = ChannelList::single("T1");
        let err = process_batch(&mut Lm335::default(), &channels, [Sample::boolean(0.0, &[true])]);
        assert!(err.is_err());
    }
}
