//! Sample streams: an unbounded FIFO plus a liveness flag.
//!
//! A stream has exactly one [`StreamWriter`] and one [`StreamReader`]. The
//! writer owns the liveness flag. Finishing (or dropping) the writer flips the
//! flag to [`Liveness::Finished`] first and closes the queue second, so a
//! reader that observes the closed queue can rely on the flag already being
//! final.

use super::sample::{ChannelList, Sample};
use crate::error::StageError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Lifetime of a stream's producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Liveness {
    NotStarted,
    Active,
    Finished,
}

/// Create a connected writer/reader pair.
pub fn sample_stream(
    producer: impl Into<Arc<str>>,
    channels: ChannelList,
) -> (StreamWriter, StreamReader) {
    let producer = producer.into();
    let (tx, rx) = mpsc::unbounded_channel();
    let (liveness_tx, liveness_rx) = watch::channel(Liveness::NotStarted);

    let writer = StreamWriter {
        producer: producer.clone(),
        channels: channels.clone(),
        tx: Some(tx),
        liveness: liveness_tx,
    };
    let reader = StreamReader {
        producer,
        channels,
        rx,
        liveness: liveness_rx,
    };
    (writer, reader)
}

/// Producer end of a stream.
pub struct StreamWriter {
    producer: Arc<str>,
    channels: ChannelList,
    tx: Option<mpsc::UnboundedSender<Sample>>,
    liveness: watch::Sender<Liveness>,
}

impl StreamWriter {
    pub fn producer(&self) -> &str {
        &self.producer
    }

    pub fn channels(&self) -> &ChannelList {
        &self.channels
    }

    pub fn liveness(&self) -> Liveness {
        *self.liveness.borrow()
    }

    /// Mark the stream active. Has no effect once finished.
    pub fn activate(&self) {
        self.liveness.send_if_modified(|state| {
            if *state == Liveness::NotStarted {
                *state = Liveness::Active;
                true
            } else {
                false
            }
        });
    }

    /// Enqueue a sample. The queue is unbounded, so this never waits.
    ///
    /// A sample whose arity differs from the channel list is rejected. If the
    /// consumer has gone away the sample is discarded.
    pub fn push(&self, sample: Sample) -> Result<(), StageError> {
        if sample.arity() != self.channels.len() {
            return Err(StageError::Arity {
                expected: self.channels.len(),
                found: sample.arity(),
            });
        }
        if let Some(tx) = &self.tx {
            let _ = tx.send(sample);
        }
        Ok(())
    }

    /// Permanently finish the stream.
    pub fn finish(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if self.tx.is_some() {
            self.liveness.send_replace(Liveness::Finished);
            // Dropping the sender closes the queue once the reader drains it.
            self.tx = None;
        }
    }
}

impl Drop for StreamWriter {
    fn drop(&mut self) {
        self.close();
    }
}

/// Consumer end of a stream.
pub struct StreamReader {
    producer: Arc<str>,
    channels: ChannelList,
    rx: mpsc::UnboundedReceiver<Sample>,
    liveness: watch::Receiver<Liveness>,
}

impl StreamReader {
    /// Name of the stage or source writing this stream.
    pub fn producer(&self) -> &str {
        &self.producer
    }

    pub fn channels(&self) -> &ChannelList {
        &self.channels
    }

    pub fn liveness(&self) -> Liveness {
        *self.liveness.borrow()
    }

    /// True once the producer finished and every queued sample was taken.
    pub fn is_drained(&self) -> bool {
        self.liveness() == Liveness::Finished && self.rx.is_empty()
    }

    /// Number of samples waiting in the queue.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Next sample, waiting as long as the producer may still enqueue.
    ///
    /// Returns `None` only when the queue is empty and the producer finished.
    pub async fn recv(&mut self) -> Option<Sample> {
        self.rx.recv().await
    }

    /// Next sample if one is queued right now.
    pub fn try_recv(&mut self) -> Option<Sample> {
        self.rx.try_recv().ok()
    }

    /// Blocking variant of [`recv`](Self::recv) for sinks living on plain threads.
    ///
    /// Panics if called from within an async execution context.
    pub fn blocking_recv(&mut self) -> Option<Sample> {
        self.rx.blocking_recv()
    }

    /// Wait until the producer reports [`Liveness::Finished`].
    pub async fn finished(&mut self) {
        let _ = self
            .liveness
            .wait_for(|state| *state == Liveness::Finished)
            .await;
    }

    /// Drain the stream to completion.
    pub async fn collect(mut self) -> Vec<Sample> {
        let mut samples = Vec::new();
        while let Some(sample) = self.recv().await {
            samples.push(sample);
        }
        samples
    }
}
