use crate::core::{ChannelList, Outputs, Sample, Transform};
use crate::error::{BuildError, StageError};

/// Copies every sample verbatim to `n` output streams.
#[derive(Debug, Clone, Copy)]
pub struct Multiplexer {
    fan_out: usize,
}

impl Multiplexer {
    pub fn new(fan_out: usize) -> Result<Self, BuildError> {
        if fan_out == 0 {
            return Err(BuildError::InvalidParameter {
                stage: "Multiplexer",
                reason: "needs at least one output".to_string(),
            });
        }
        Ok(Self { fan_out })
    }

    pub fn fan_out(&self) -> usize {
        self.fan_out
    }
}

impl Transform for Multiplexer {
    fn kind(&self) -> &'static str {
        "mux"
    }

    fn output_channels(&self, input: &ChannelList) -> Result<Vec<ChannelList>, BuildError> {
        Ok(vec![input.clone(); self.fan_out])
    }

    fn process(&mut self, sample: Sample, out: &mut Outputs) -> Result<(), StageError> {
        out.broadcast(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::process_batch;

    #[test]
    fn test_every_branch_sees_every_sample() {
        let channels = ChannelList::new(["AIN0", "AIN1"]).unwrap();
        let samples: Vec<Sample> = (0..4).map(|i| Sample::numeric(i as f64, &[i as f64, 0.0])).collect();
        let out = process_batch(&mut Multiplexer::new(3).unwrap(), &channels, samples.clone()).unwrap();

        assert_eq!(out.len(), 3);
        for branch in out {
            assert_eq!(branch, samples);
        }
    }

    #[test]
    fn test_zero_outputs_rejected() {
        assert!(Multiplexer::new(0).is_err());
    }
}
