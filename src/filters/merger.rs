//! Fan-in of several synchronised streams into one.

use crate::core::{sample_stream, ChannelList, Outputs, Sample, StreamReader, Value};
use crate::engine::stage::{contain, next_step, Launcher, StageContext, StageTask, Step};
use crate::engine::{Stage, StageEnv};
use crate::error::{BuildError, StageError};
use std::sync::Arc;
use tracing::debug;

/// Joins one sample from each input into a single wider sample.
///
/// Inputs must carry the same timestamps. The output channel list is the
/// concatenation of the input lists, in input order.
///
/// A mismatched cycle is dropped as a whole, but the parts carrying the
/// newest timestamp are held over to the next cycle while the lagging
/// inputs catch up. One lost sample therefore costs one merged sample.
#[derive(Debug, Clone)]
pub struct Merger {
    channels: ChannelList,
    arities: Vec<usize>,
}

impl Merger {
    pub fn new<'a>(inputs: impl IntoIterator<Item = &'a ChannelList>) -> Result<Self, BuildError> {
        let inputs: Vec<&ChannelList> = inputs.into_iter().collect();
        if inputs.is_empty() {
            return Err(BuildError::NoInputs { stage: "Merger" });
        }
        Ok(Self {
            channels: ChannelList::concat(inputs.iter().copied())?,
            arities: inputs.iter().map(|list| list.len()).collect(),
        })
    }

    pub fn channels(&self) -> &ChannelList {
        &self.channels
    }

    pub fn inputs(&self) -> usize {
        self.arities.len()
    }

    /// Combine one merge cycle. `None` marks an input that has finished; its
    /// slots are filled with `Null`. Returns `Ok(None)` when every input
    /// has finished.
    pub fn combine(&self, parts: Vec<Option<Sample>>) -> Result<Option<Sample>, StageError> {
        if parts.len() != self.arities.len() {
            return Err(StageError::Arity {
                expected: self.arities.len(),
                found: parts.len(),
            });
        }
        let Some(timestamp) = parts.iter().flatten().map(|s| s.timestamp).next() else {
            return Ok(None);
        };

        let mut values = Vec::with_capacity(self.channels.len());
        for (input, (part, arity)) in parts.into_iter().zip(&self.arities).enumerate() {
            match part {
                Some(sample) if sample.timestamp != timestamp => {
                    return Err(StageError::TimestampMismatch {
                        input,
                        expected: timestamp,
                        found: sample.timestamp,
                    });
                }
                Some(sample) if sample.arity() != *arity => {
                    return Err(StageError::Arity {
                        expected: *arity,
                        found: sample.arity(),
                    });
                }
                Some(sample) => values.extend(sample.values),
                None => values.extend(std::iter::repeat(Value::Null).take(*arity)),
            }
        }
        Ok(Some(Sample::new(timestamp, values)))
    }

    /// Build the merge stage over `inputs`.
    pub fn stage(
        self,
        name: impl Into<Arc<str>>,
        inputs: Vec<StreamReader>,
        env: &StageEnv,
    ) -> Result<(Stage, StreamReader), BuildError> {
        if inputs.len() != self.inputs() {
            return Err(BuildError::ChannelCount {
                stage: "Merger",
                expected: self.inputs(),
                found: inputs.len(),
            });
        }
        let name = name.into();
        let (writer, reader) = sample_stream(name.clone(), self.channels.clone());
        let outputs = Outputs::new(vec![writer]);

        let launcher: Launcher = Box::new(move |ctx: StageContext| {
            outputs.activate();
            let task: StageTask = Box::pin(drive_merger(self, inputs, outputs, ctx));
            task
        });
        Ok((Stage::with_launcher(name, "merger", env, launcher), reader))
    }
}

async fn drive_merger(
    merger: Merger,
    inputs: Vec<StreamReader>,
    mut outputs: Outputs,
    ctx: StageContext,
) -> Result<(), StageError> {
    let metrics = ctx.guard.metrics().clone();
    let mut live: Vec<Option<StreamReader>> = inputs.into_iter().map(Some).collect();
    // Newest parts of a mismatched cycle, reused so the inputs line up again.
    let mut carried: Vec<Option<Sample>> = vec![None; live.len()];

    let outcome = 'cycle: loop {
        let mut parts = Vec::with_capacity(live.len());
        for (slot, kept) in live.iter_mut().zip(carried.iter_mut()) {
            if let Some(sample) = kept.take() {
                parts.push(Some(sample));
                continue;
            }
            let Some(reader) = slot.as_mut() else {
                parts.push(None);
                continue;
            };
            let step = next_step(&ctx.cancel, reader).await;
            match step {
                Step::Sample(sample) => parts.push(Some(sample)),
                Step::Drained => {
                    debug!(stage = %ctx.name, upstream = reader.producer(), "merge input drained");
                    *slot = None;
                    parts.push(None);
                }
                Step::Cancelled => {
                    debug!(stage = %ctx.name, "stage cancelled");
                    break 'cycle Ok(());
                }
            }
        }

        let timestamp = parts.iter().flatten().map(|s| s.timestamp).next();
        if timestamp.is_none() {
            debug!(stage = %ctx.name, "all inputs drained");
            break Ok(());
        }

        let newest = parts
            .iter()
            .flatten()
            .map(|s| s.timestamp)
            .fold(f64::NEG_INFINITY, f64::max);
        if parts.iter().flatten().any(|s| s.timestamp != newest) {
            for (kept, part) in carried.iter_mut().zip(&parts) {
                *kept = part.as_ref().filter(|s| s.timestamp == newest).cloned();
            }
        }

        metrics.record_sample_in();
        let started = metrics.start_processing();
        let before = outputs.emitted();

        let result = contain(|| match merger.combine(parts)? {
            Some(sample) => outputs.emit(sample),
            None => Ok(()),
        });

        metrics.finish_processing(started);
        metrics.record_samples_out(outputs.emitted() - before);
        if let Err(err) = ctx.guard.check(timestamp, result) {
            break Err(err);
        }
    };

    ctx.settle(&outcome);
    outputs.finish();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merger() -> Merger {
        let a = ChannelList::new(["x", "y"]).unwrap();
        let b = ChannelList::single("z");
        Merger::new([&a, &b]).unwrap()
    }

    #[test]
    fn test_concatenates_in_input_order() {
        let merged = merger()
            .combine(vec![
                Some(Sample::numeric(1.0, &[1.0, 2.0])),
                Some(Sample::numeric(1.0, &[3.0])),
            ])
            .unwrap();
        assert_eq!(merged, Some(Sample::numeric(1.0, &[1.0, 2.0, 3.0])));
    }

    #[test]
    fn test_mismatch_never_concatenates() {
        let err = merger()
            .combine(vec![
                Some(Sample::numeric(1.0, &[1.0, 2.0])),
                Some(Sample::numeric(1.5, &[3.0])),
            ])
            .unwrap_err();
        assert_eq!(
            err,
            StageError::TimestampMismatch {
                input: 1,
                expected: 1.0,
                found: 1.5
            }
        );
    }

    #[test]
    fn test_finished_input_fills_nulls() {
        let merged = merger()
            .combine(vec![None, Some(Sample::numeric(2.0, &[3.0]))])
            .unwrap()
            .unwrap();
        assert_eq!(merged.values, vec![Value::Null, Value::Null, Value::Numeric(3.0)]);
        assert_eq!(merged.timestamp, 2.0);
    }

    #[test]
    fn test_all_finished_yields_nothing() {
        assert_eq!(merger().combine(vec![None, None]).unwrap(), None);
    }

    #[test]
    fn test_construction_errors() {
        assert_eq!(
            Merger::new(std::iter::empty::<&ChannelList>()).unwrap_err(),
            BuildError::NoInputs { stage: "Merger" }
        );
        let a = ChannelList::single("x");
        assert_eq!(
            Merger::new([&a, &a]).unwrap_err(),
            BuildError::DuplicateChannel("x".into())
        );
    }
}
