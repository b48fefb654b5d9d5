use crate::core::{ChannelList, Sample, StreamReader};
use tokio::task::JoinHandle;
use tracing::info;

/// Console sink: drains a stream and logs its samples.
pub struct SampleLog {
    label: String,
    every: usize,
}

impl SampleLog {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            every: 1,
        }
    }

    /// Only log every `n`-th sample. All samples are still consumed.
    pub fn every(mut self, n: usize) -> Self {
        self.every = n.max(1);
        self
    }

    /// Render a sample as `t=… name=value …`.
    pub fn format(channels: &ChannelList, sample: &Sample) -> String {
        let mut line = format!("t={:.6}", sample.timestamp);
        for (name, value) in channels.names().iter().zip(&sample.values) {
            line.push_str(&format!(" {name}={value}"));
        }
        line
    }

    /// Drain `reader` to completion. Returns the number of samples seen.
    pub async fn run(self, mut reader: StreamReader) -> usize {
        let channels = reader.channels().clone();
        let mut seen = 0;
        while let Some(sample) = reader.recv().await {
            if seen % self.every == 0 {
                info!(sink = %self.label, from = reader.producer(), "{}", Self::format(&channels, &sample));
            }
            seen += 1;
        }
        info!(sink = %self.label, samples = seen, "stream finished");
        seen
    }

    pub fn spawn(self, reader: StreamReader) -> JoinHandle<usize> {
        tokio::spawn(self.run(reader))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Edge, Value};

    #[test]
    fn test_format_names_each_channel() {
        let channels = ChannelList::new(["s", "v", "a"]).unwrap();
        let sample = Sample::new(0.5, vec![Value::Numeric(0.25), Value::Edge(Edge::Rise), Value::Null]);
        assert_eq!(SampleLog::format(&channels, &sample), "t=0.500000 s=0.25 v=LH a=-");
    }
}
