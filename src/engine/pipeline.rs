use super::stage::{Stage, StageEnv};
use super::state::StageState;
use crate::core::{StreamReader, Transform};
use crate::error::{BuildError, Result};
use crate::filters::{ChannelSelector, Merger, Multiplexer, Splitter};
use crate::observability::{MetricsCollector, MetricsSnapshot, PipelineMonitor, StageReport};
use crate::resilience::{fault_channel, FaultPolicy, StageFault};
use crossbeam_channel::Receiver;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// A graph of stages wired through sample streams.
///
/// Stages are kept in creation order, which is always source-to-sink since a
/// stage can only be added behind a stream that already exists.
pub struct Pipeline {
    stages: Vec<Stage>,
    env: StageEnv,
    faults: Receiver<StageFault>,
    metrics_collector: MetricsCollector,
    counters: HashMap<&'static str, usize>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_policy(FaultPolicy::default())
    }

    pub fn with_policy(policy: FaultPolicy) -> Self {
        let (tx, rx) = fault_channel();
        Self {
            stages: Vec::new(),
            env: StageEnv::new(policy, tx),
            faults: rx,
            metrics_collector: MetricsCollector::new(),
            counters: HashMap::new(),
        }
    }

    pub fn policy(&self) -> FaultPolicy {
        self.env.policy
    }

    fn next_name(&mut self, kind: &'static str) -> String {
        let counter = self.counters.entry(kind).or_insert(0);
        let name = format!("{kind}-{counter}");
        *counter += 1;
        name
    }

    fn register(&mut self, stage: Stage) {
        debug!(stage = stage.name(), kind = stage.kind(), "stage added");
        self.metrics_collector.register(stage.metrics());
        self.stages.push(stage);
    }

    /// Add a stage behind `input` and return all of its output streams.
    pub fn add_fan_out<T: Transform>(
        &mut self,
        input: StreamReader,
        transform: T,
    ) -> std::result::Result<Vec<StreamReader>, BuildError> {
        let name = self.next_name(transform.kind());
        let (stage, outputs) = Stage::new(name, input, transform, &self.env)?;
        self.register(stage);
        Ok(outputs)
    }

    /// Add a single-output stage behind `input`.
    pub fn add<T: Transform>(
        &mut self,
        input: StreamReader,
        transform: T,
    ) -> std::result::Result<StreamReader, BuildError> {
        let ports = transform.output_channels(input.channels())?.len();
        if ports != 1 {
            return Err(BuildError::InvalidParameter {
                stage: transform.kind(),
                reason: format!("has {ports} outputs, use add_fan_out"),
            });
        }
        let mut outputs = self.add_fan_out(input, transform)?;
        outputs.pop().ok_or(BuildError::NoInputs {
            stage: "Pipeline",
        })
    }

    /// One single-channel stream per input channel.
    pub fn split(&mut self, input: StreamReader) -> std::result::Result<Vec<StreamReader>, BuildError> {
        self.add_fan_out(input, Splitter)
    }

    /// `n` verbatim copies of `input`.
    pub fn multiplex(
        &mut self,
        input: StreamReader,
        n: usize,
    ) -> std::result::Result<Vec<StreamReader>, BuildError> {
        self.add_fan_out(input, Multiplexer::new(n)?)
    }

    /// Merge synchronised streams into one, channels concatenated in order.
    pub fn merge(&mut self, inputs: Vec<StreamReader>) -> std::result::Result<StreamReader, BuildError> {
        let merger = Merger::new(inputs.iter().map(StreamReader::channels))?;
        let name = self.next_name("merger");
        let (stage, output) = merger.stage(name, inputs, &self.env)?;
        self.register(stage);
        Ok(output)
    }

    /// Keep only the channel called `name`.
    pub fn select(&mut self, input: StreamReader, name: &str) -> std::result::Result<StreamReader, BuildError> {
        let selector = ChannelSelector::new(input.channels(), name)?;
        self.add(input, selector)
    }

    /// Start every stage. Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        for stage in &mut self.stages {
            stage.start()?;
        }
        info!(stages = self.stages.len(), "pipeline started");
        Ok(())
    }

    /// Cancel every stage and wait for all of them to exit.
    ///
    /// All stages are stopped even if some fail; the first error is returned.
    pub async fn stop(&mut self) -> Result<()> {
        let mut first_error = None;
        for stage in &mut self.stages {
            if let Err(err) = stage.stop().await {
                first_error.get_or_insert(err);
            }
        }
        info!("pipeline stopped");
        first_error.map_or(Ok(()), Err)
    }

    /// Wait until every stage drained its input and exited on its own.
    ///
    /// Returns the first stage error after all stages have terminated.
    pub async fn join(&mut self) -> Result<()> {
        let mut first_error = None;
        for stage in &mut self.stages {
            if let Err(err) = stage.join().await {
                first_error.get_or_insert(err);
            }
        }
        info!("pipeline drained");
        first_error.map_or(Ok(()), Err)
    }

    /// Out-of-band fault reports from all stages.
    pub fn faults(&self) -> Receiver<StageFault> {
        self.faults.clone()
    }

    pub fn metrics(&self) -> BTreeMap<String, MetricsSnapshot> {
        self.metrics_collector.snapshot()
    }

    /// Report over every stage in source-to-sink order.
    pub fn monitor(&self) -> PipelineMonitor {
        let stages = self
            .stages
            .iter()
            .map(|stage| StageReport {
                kind: stage.kind(),
                state: stage.state().name(),
                metrics: stage.metrics().snapshot(),
            })
            .collect();
        PipelineMonitor::new(stages)
    }

    /// Stage names in source-to-sink order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::name).collect()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|stage| stage.name() == name)
    }

    pub fn states(&self) -> Vec<(String, StageState)> {
        self.stages
            .iter()
            .map(|stage| (stage.name().to_string(), stage.state()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
