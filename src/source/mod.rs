//! Measurement sources: the leaf producers of sample streams.
//!
//! Real acquisition hardware lives outside this crate; anything that can
//! fill a [`StreamWriter`] implements [`MeasurementSource`]. The simulated
//! sources here stand in for it in tests and the demo binary.

pub mod replay;
pub mod waveform;

pub use replay::ReplaySource;
pub use waveform::{Waveform, WaveformSource};

use crate::core::{sample_stream, ChannelList, StreamReader, StreamWriter};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[async_trait]
pub trait MeasurementSource: Send + 'static {
    /// Name recorded as the producer of the stream.
    fn name(&self) -> &str;

    /// Channel names, fixed for the lifetime of the source.
    fn channels(&self) -> ChannelList;

    /// Push samples until the measurement is complete or `cancel` fires.
    ///
    /// The caller activates the writer before and finishes it after.
    async fn acquire(&mut self, writer: &StreamWriter, cancel: &CancellationToken) -> Result<()>;
}

/// A source running on its own task.
pub struct SourceHandle {
    name: String,
    cancel: CancellationToken,
    handle: JoinHandle<Result<()>>,
}

impl SourceHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Ask the source to stop early and wait for it.
    pub async fn stop(self) -> Result<()> {
        self.cancel.cancel();
        self.wait().await
    }

    /// Wait for the measurement to complete.
    pub async fn wait(self) -> Result<()> {
        self.handle
            .await
            .map_err(|e| anyhow!("source {} aborted: {}", self.name, e))?
    }
}

/// Spawn `source` and return its handle plus the stream it fills.
///
/// The stream is marked finished when acquisition ends, whether it
/// completed, was cancelled or failed.
pub fn spawn_source<S: MeasurementSource>(mut source: S) -> (SourceHandle, StreamReader) {
    let name = source.name().to_string();
    let (writer, reader) = sample_stream(name.clone(), source.channels());
    let cancel = CancellationToken::new();

    let token = cancel.clone();
    let task_name = name.clone();
    let handle = tokio::spawn(async move {
        writer.activate();
        debug!(source = %task_name, "acquisition started");
        let result = source.acquire(&writer, &token).await;
        writer.finish();
        match &result {
            Ok(()) => debug!(source = %task_name, "acquisition finished"),
            Err(e) => warn!(source = %task_name, error = %e, "acquisition failed"),
        }
        result
    });

    (SourceHandle { name, cancel, handle }, reader)
}

/// Sleep for `period` unless cancelled first. Returns false on cancellation.
pub(crate) async fn pace(period: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(period) => true,
    }
}
