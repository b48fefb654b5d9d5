use crate::core::{ChannelList, Edge, Outputs, Sample, Transform, Value};
use crate::error::{BuildError, StageError};

/// Tags boolean transitions per channel: `Rise`, `Fall`, or `Null` when the
/// channel did not change.
///
/// The first sample only primes the comparison. By default a sample is only
/// emitted when some channel changed; in heartbeat mode every later input
/// produces exactly one output, keeping the time base uniform for consumers
/// that integrate over it.
#[derive(Default)]
pub struct EdgeFinder {
    heartbeat: bool,
    previous: Option<Vec<Value>>,
}

impl EdgeFinder {
    pub fn new(heartbeat: bool) -> Self {
        Self {
            heartbeat,
            previous: None,
        }
    }

    pub fn heartbeat() -> Self {
        Self::new(true)
    }
}

fn edge_between(previous: &Value, current: &Value) -> Value {
    match (previous.as_bool(), current.as_bool()) {
        (Some(false), Some(true)) => Value::Edge(Edge::Rise),
        (Some(true), Some(false)) => Value::Edge(Edge::Fall),
        _ => Value::Null,
    }
}

impl Transform for EdgeFinder {
    fn kind(&self) -> &'static str {
        "edges"
    }

    fn output_channels(&self, input: &ChannelList) -> Result<Vec<ChannelList>, BuildError> {
        Ok(vec![input.clone()])
    }

    fn process(&mut self, sample: Sample, out: &mut Outputs) -> Result<(), StageError> {
        let Some(previous) = self.previous.replace(sample.values.clone()) else {
            return Ok(());
        };

        let tags: Vec<Value> = previous
            .iter()
            .zip(&sample.values)
            .map(|(prev, cur)| edge_between(prev, cur))
            .collect();

        let touched = tags.iter().any(|tag| !tag.is_null());
        if touched || self.heartbeat {
            out.emit(Sample::new(sample.timestamp, tags))?;
        }
        Ok(())
    }
}
