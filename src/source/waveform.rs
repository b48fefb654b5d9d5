use super::{pace, MeasurementSource};
use crate::core::{ChannelList, Sample, StreamWriter};
use anyhow::{ensure, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// Samples generated between cooperative yields when not paced.
const YIELD_EVERY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Waveform {
    /// A light barrier: `high` while the beam is blocked for `duty` of each period.
    Square { low: f64, high: f64, duty: f64 },
    Sine { offset: f64, amplitude: f64 },
}

impl Waveform {
    pub fn value_at(&self, t: f64, frequency: f64) -> f64 {
        match *self {
            Waveform::Square { low, high, duty } => {
                if (t * frequency).fract() < duty {
                    high
                } else {
                    low
                }
            }
            Waveform::Sine { offset, amplitude } => offset + amplitude * (2.0 * PI * frequency * t).sin(),
        }
    }
}

/// Simulated single-channel analog input.
pub struct WaveformSource {
    name: String,
    channel: String,
    waveform: Waveform,
    frequency: f64,
    sample_rate: f64,
    count: usize,
    realtime: bool,
}

impl WaveformSource {
    pub fn new(waveform: Waveform, frequency: f64, sample_rate: f64, count: usize) -> Self {
        Self {
            name: "waveform".to_string(),
            channel: "AIN0".to_string(),
            waveform,
            frequency,
            sample_rate,
            count,
            realtime: false,
        }
    }

    /// A 0 V / 5 V light barrier signal with 50 % duty cycle.
    pub fn light_barrier(frequency: f64, sample_rate: f64, count: usize) -> Self {
        let square = Waveform::Square {
            low: 0.0,
            high: 5.0,
            duty: 0.5,
        };
        Self::new(square, frequency, sample_rate, count)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Emit samples at the sample rate in wall-clock time.
    pub fn realtime(mut self) -> Self {
        self.realtime = true;
        self
    }
}

#[async_trait]
impl MeasurementSource for WaveformSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn channels(&self) -> ChannelList {
        ChannelList::single(self.channel.clone())
    }

    async fn acquire(&mut self, writer: &StreamWriter, cancel: &CancellationToken) -> Result<()> {
        ensure!(
            self.sample_rate > 0.0,
            "sample rate must be positive, got {}",
            self.sample_rate
        );
        let period = Duration::from_secs_f64(1.0 / self.sample_rate);

        for i in 0..self.count {
            if cancel.is_cancelled() {
                break;
            }
            let t = i as f64 / self.sample_rate;
            writer.push(Sample::numeric(t, &[self.waveform.value_at(t, self.frequency)]))?;

            if self.realtime {
                if !pace(period, cancel).await {
                    break;
                }
            } else if i % YIELD_EVERY == YIELD_EVERY - 1 {
                tokio::task::yield_now().await;
            }
        }
        Ok(())
    }
}
