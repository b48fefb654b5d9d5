use super::sample::{ChannelList, Sample};
use super::stream::{sample_stream, StreamReader, StreamWriter};
use crate::error::{BuildError, PipelineError, StageError};

/// Per-sample processing behaviour of a single-input stage.
///
/// The engine owns the loop and the streams; a transform only sees one
/// sample at a time and writes whatever it produces into [`Outputs`].
pub trait Transform: Send + 'static {
    /// Short kind name, used to name stages and in log lines.
    fn kind(&self) -> &'static str;

    /// Channel lists of the output streams, derived from the input's list.
    /// Validation of the input layout happens here.
    fn output_channels(&self, input: &ChannelList) -> Result<Vec<ChannelList>, BuildError>;

    /// Handle one input sample, emitting zero or more output samples.
    ///
    /// A recoverable error must leave the transform's state as it was
    /// before the call.
    fn process(&mut self, sample: Sample, out: &mut Outputs) -> Result<(), StageError>;
}

/// Output streams of a stage.
pub struct Outputs {
    writers: Vec<StreamWriter>,
    emitted: u64,
}

impl Outputs {
    pub fn new(writers: Vec<StreamWriter>) -> Self {
        Self {
            writers,
            emitted: 0,
        }
    }

    pub fn ports(&self) -> usize {
        self.writers.len()
    }

    /// Total samples written across all ports.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Emit on the first (usually only) port.
    pub fn emit(&mut self, sample: Sample) -> Result<(), StageError> {
        self.emit_to(0, sample)
    }

    pub fn emit_to(&mut self, port: usize, sample: Sample) -> Result<(), StageError> {
        let writer = self.writers.get(port).ok_or(StageError::NoSuchPort(port))?;
        writer.push(sample)?;
        self.emitted += 1;
        Ok(())
    }

    /// Copy the sample to every port.
    pub fn broadcast(&mut self, sample: Sample) -> Result<(), StageError> {
        let last = self.writers.len().saturating_sub(1);
        for port in 0..last {
            self.emit_to(port, sample.clone())?;
        }
        if !self.writers.is_empty() {
            self.emit_to(last, sample)?;
        }
        Ok(())
    }

    pub(crate) fn activate(&self) {
        for writer in &self.writers {
            writer.activate();
        }
    }

    /// Finish every output stream.
    pub(crate) fn finish(self) {
        for writer in self.writers {
            writer.finish();
        }
    }
}

/// Create the output streams a transform declares for `input`.
pub(crate) fn open_outputs<T: Transform>(
    producer: &str,
    transform: &T,
    input: &ChannelList,
) -> Result<(Outputs, Vec<StreamReader>), BuildError> {
    let (writers, readers) = transform
        .output_channels(input)?
        .into_iter()
        .map(|channels| sample_stream(producer, channels))
        .unzip();
    Ok((Outputs::new(writers), readers))
}

/// Run a transform synchronously over a batch of samples, without spawning
/// a stage. Returns the samples emitted on each port.
pub fn process_batch<T, I>(
    transform: &mut T,
    input: &ChannelList,
    samples: I,
) -> Result<Vec<Vec<Sample>>, PipelineError>
where
    T: Transform,
    I: IntoIterator<Item = Sample>,
{
    let (mut outputs, mut readers) = open_outputs(transform.kind(), transform, input)?;
    for sample in samples {
        transform
            .process(sample, &mut outputs)
            .map_err(|source| PipelineError::Stage {
                stage: transform.kind().to_string(),
                source,
            })?;
    }
    outputs.finish();

    Ok(readers
        .iter_mut()
        .map(|reader| std::iter::from_fn(|| reader.try_recv()).collect())
        .collect())
}
