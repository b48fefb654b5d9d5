use crate::core::{ChannelList, Outputs, Sample, Transform};
use crate::error::{BuildError, StageError};

/// Picks one named channel out of a multi-channel stream.
#[derive(Debug, Clone)]
pub struct ChannelSelector {
    name: String,
    index: usize,
}

impl ChannelSelector {
    /// Resolve `name` against the channels of the stream it will read.
    pub fn new(input: &ChannelList, name: impl Into<String>) -> Result<Self, BuildError> {
        let name = name.into();
        let index = input.index_of(&name).ok_or_else(|| BuildError::UnknownChannel {
            name: name.clone(),
            available: input.names().to_vec(),
        })?;
        Ok(Self { name, index })
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl Transform for ChannelSelector {
    fn kind(&self) -> &'static str {
        "select"
    }

    fn output_channels(&self, input: &ChannelList) -> Result<Vec<ChannelList>, BuildError> {
        // The stage may be wired to a different stream than it was resolved on.
        if input.get(self.index) != Some(self.name.as_str()) {
            return Err(BuildError::UnknownChannel {
                name: self.name.clone(),
                available: input.names().to_vec(),
            });
        }
        Ok(vec![ChannelList::single(self.name.clone())])
    }

    fn process(&mut self, sample: Sample, out: &mut Outputs) -> Result<(), StageError> {
        let value = *sample.get(self.index).ok_or(StageError::Arity {
            expected: self.index + 1,
            found: sample.arity(),
        })?;
        out.emit(Sample::new(sample.timestamp, vec![value]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::process_batch;

    #[test]
    fn test_selects_named_channel() {
        let channels = ChannelList::new(["AIN0", "AIN1", "AIN2"]).unwrap();
        let mut selector = ChannelSelector::new(&channels, "AIN1").unwrap();
        assert_eq!(selector.index(), 1);

        let out = process_batch(&mut selector, &channels, [Sample::numeric(3.0, &[1.0, 2.0, 3.0])]).unwrap();
        assert_eq!(out[0], vec![Sample::numeric(3.0, &[2.0])]);
    }

    #[test]
    fn test_unknown_channel_is_build_error() {
        let channels = ChannelList::new(["AIN0", "AIN1"]).unwrap();
        let err = ChannelSelector::new(&channels, "AIN7").unwrap_err();
        assert!(matches!(err, BuildError::UnknownChannel { ref name, .. } if name == "AIN7"));
    }
}
