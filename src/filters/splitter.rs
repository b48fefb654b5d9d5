use crate::core::{ChannelList, Outputs, Sample, Transform};
use crate::error::{BuildError, StageError};

/// Splits a k-channel stream into k single-channel streams.
#[derive(Debug, Default, Clone, Copy)]
pub struct Splitter;

impl Transform for Splitter {
    fn kind(&self) -> &'static str {
        "splitter"
    }

    fn output_channels(&self, input: &ChannelList) -> Result<Vec<ChannelList>, BuildError> {
        if input.is_empty() {
            return Err(BuildError::ChannelCount {
                stage: "Splitter",
                expected: 1,
                found: 0,
            });
        }
        Ok(input.names().iter().cloned().map(ChannelList::single).collect())
    }

    fn process(&mut self, sample: Sample, out: &mut Outputs) -> Result<(), StageError> {
        if sample.arity() != out.ports() {
            return Err(StageError::Arity {
                expected: out.ports(),
                found: sample.arity(),
            });
        }
        let timestamp = sample.timestamp;
        for (port, value) in sample.values.into_iter().enumerate() {
            out.emit_to(port, Sample::new(timestamp, vec![value]))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{process_batch, Value};

    #[test]
    fn test_each_branch_gets_one_channel() {
        let channels = ChannelList::new(["x", "y", "z"]).unwrap();
        let samples = vec![Sample::numeric(0.0, &[1.0, 2.0, 3.0]), Sample::numeric(1.0, &[4.0, 5.0, 6.0])];
        let out = process_batch(&mut Splitter, &channels, samples).unwrap();

        assert_eq!(out.len(), 3);
        assert_eq!(out[1], vec![Sample::numeric(0.0, &[2.0]), Sample::numeric(1.0, &[5.0])]);
        assert_eq!(out[2][1].values, vec![Value::Numeric(6.0)]);
    }
}
