use crate::core::{ChannelList, Outputs, Sample, Transform, Value};
use crate::error::{BuildError, StageError};

/// Negates boolean values; every other value passes unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct Inverter;

impl Transform for Inverter {
    fn kind(&self) -> &'static str {
        "inverter"
    }

    fn output_channels(&self, input: &ChannelList) -> Result<Vec<ChannelList>, BuildError> {
        Ok(vec![input.clone()])
    }

    fn process(&mut self, mut sample: Sample, out: &mut Outputs) -> Result<(), StageError> {
        for value in &mut sample.values {
            if let Value::Boolean(b) = value {
                *b = !*b;
            }
        }
        out.emit(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{process_batch, Edge};

    #[test]
    fn test_only_booleans_flip() {
        let channels = ChannelList::new(["a", "b", "c", "d"]).unwrap();
        let sample = Sample::new(
            0.5,
            vec![
                Value::Boolean(true),
                Value::Numeric(1.0),
                Value::Edge(Edge::Rise),
                Value::Null,
            ],
        );
        let out = process_batch(&mut Inverter, &channels, [sample]).unwrap();
        assert_eq!(
            out[0][0].values,
            vec![
                Value::Boolean(false),
                Value::Numeric(1.0),
                Value::Edge(Edge::Rise),
                Value::Null,
            ]
        );
        assert_eq!(out[0][0].timestamp, 0.5);
    }
}
