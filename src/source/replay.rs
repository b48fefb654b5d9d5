use super::{pace, MeasurementSource};
use crate::core::{ChannelList, Sample, StreamWriter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Plays back a fixed table of samples.
pub struct ReplaySource {
    name: String,
    channels: ChannelList,
    samples: Vec<Sample>,
    pacing: Option<Duration>,
}

impl ReplaySource {
    pub fn new(channels: ChannelList, samples: Vec<Sample>) -> Self {
        Self {
            name: "replay".to_string(),
            channels,
            samples,
            pacing: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Wait `period` between samples instead of pushing them all at once.
    pub fn with_pacing(mut self, period: Duration) -> Self {
        self.pacing = Some(period);
        self
    }
}

#[async_trait]
impl MeasurementSource for ReplaySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn channels(&self) -> ChannelList {
        self.channels.clone()
    }

    async fn acquire(&mut self, writer: &StreamWriter, cancel: &CancellationToken) -> Result<()> {
        for (row, sample) in std::mem::take(&mut self.samples).into_iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            writer
                .push(sample)
                .with_context(|| format!("replay row {row}"))?;
            if let Some(period) = self.pacing {
                if !pace(period, cancel).await {
                    break;
                }
            }
        }
        Ok(())
    }
}
