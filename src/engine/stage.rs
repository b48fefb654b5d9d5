//! A stage drives one transform on its own tokio task.
//!
//! The loop waits on "next sample or cancellation". A closed input queue
//! means the upstream producer finished and everything it wrote was
//! consumed, which is the only natural exit. On exit the stage records its
//! terminal state first and finishes its outputs second, so termination
//! ripples strictly from source to sink.

use super::state::StageState;
use crate::core::transform::open_outputs;
use crate::core::{Outputs, Sample, StreamReader, Transform};
use crate::error::{BuildError, PipelineError, Result, StageError};
use crate::observability::StageMetrics;
use crate::resilience::{fault_channel, FaultGuard, FaultPolicy, StageFault};
use crossbeam_channel::Sender;
use std::any::Any;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Settings shared by every stage of a pipeline.
#[derive(Clone)]
pub struct StageEnv {
    pub policy: FaultPolicy,
    pub faults: Sender<StageFault>,
}

impl StageEnv {
    pub fn new(policy: FaultPolicy, faults: Sender<StageFault>) -> Self {
        Self { policy, faults }
    }
}

impl Default for StageEnv {
    /// Default policy, faults only logged.
    fn default() -> Self {
        let (faults, _) = fault_channel();
        Self::new(FaultPolicy::default(), faults)
    }
}

pub(crate) type StageTask = Pin<Box<dyn Future<Output = std::result::Result<(), StageError>> + Send>>;
pub(crate) type Launcher = Box<dyn FnOnce(StageContext) -> StageTask + Send>;

/// Everything a running stage loop needs besides its streams.
pub(crate) struct StageContext {
    pub name: Arc<str>,
    pub cancel: CancellationToken,
    pub guard: FaultGuard,
    state: Arc<watch::Sender<StageState>>,
}

impl StageContext {
    /// Record how the loop ended. Must run before the outputs are finished.
    pub fn settle(&self, outcome: &std::result::Result<(), StageError>) {
        let target = match outcome {
            Ok(()) => StageState::Stopped,
            Err(err) => StageState::Failed {
                error_msg: err.to_string(),
            },
        };
        advance(&self.state, target);
        debug!(stage = %self.name, ok = outcome.is_ok(), "stage loop exited");
    }
}

pub(crate) enum Step {
    Sample(Sample),
    Drained,
    Cancelled,
}

/// Wait for the next sample, upstream completion, or cancellation.
pub(crate) async fn next_step(cancel: &CancellationToken, input: &mut StreamReader) -> Step {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Step::Cancelled,
        next = input.recv() => match next {
            Some(sample) => Step::Sample(sample),
            None => Step::Drained,
        },
    }
}

/// Run one unit of per-sample work, turning a panic into a fatal
/// [`StageError::Panicked`] so the loop still settles and reports it.
pub(crate) fn contain<F>(work: F) -> std::result::Result<(), StageError>
where
    F: FnOnce() -> std::result::Result<(), StageError>,
{
    catch_unwind(AssertUnwindSafe(work))
        .unwrap_or_else(|payload| Err(StageError::Panicked(panic_message(&*payload))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn advance(state: &watch::Sender<StageState>, target: StageState) -> bool {
    state.send_if_modified(|current| {
        if current.can_transition_to(&target) {
            *current = target;
            true
        } else {
            false
        }
    })
}

pub struct Stage {
    name: Arc<str>,
    kind: &'static str,
    state: Arc<watch::Sender<StageState>>,
    cancel: CancellationToken,
    guard: FaultGuard,
    launcher: Option<Launcher>,
    handle: Option<JoinHandle<std::result::Result<(), StageError>>>,
}

impl Stage {
    /// Wire `transform` behind `input`. Returns the stage and the readers of
    /// its output streams, in port order.
    pub fn new<T: Transform>(
        name: impl Into<Arc<str>>,
        input: StreamReader,
        transform: T,
        env: &StageEnv,
    ) -> std::result::Result<(Self, Vec<StreamReader>), BuildError> {
        let name = name.into();
        let kind = transform.kind();
        let (outputs, readers) = open_outputs(&name, &transform, input.channels())?;

        let launcher: Launcher = Box::new(move |ctx: StageContext| {
            outputs.activate();
            let task: StageTask = Box::pin(drive(transform, input, outputs, ctx));
            task
        });
        Ok((Self::with_launcher(name, kind, env, launcher), readers))
    }

    pub(crate) fn with_launcher(
        name: Arc<str>,
        kind: &'static str,
        env: &StageEnv,
        launcher: Launcher,
    ) -> Self {
        let metrics = Arc::new(StageMetrics::new(name.to_string()));
        let guard = FaultGuard::new(name.to_string(), env.policy, env.faults.clone(), metrics);
        let (state, _) = watch::channel(StageState::NotStarted);
        Self {
            name,
            kind,
            state: Arc::new(state),
            cancel: CancellationToken::new(),
            guard,
            launcher: Some(launcher),
            handle: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn state(&self) -> StageState {
        self.state.borrow().clone()
    }

    pub fn metrics(&self) -> Arc<StageMetrics> {
        self.guard.metrics().clone()
    }

    /// Resolves once the stage reached `Stopped` or `Failed`.
    pub fn terminated(&self) -> impl Future<Output = StageState> + Send + 'static {
        let mut rx = self.state.subscribe();
        async move {
            let reached = rx
                .wait_for(StageState::is_terminal)
                .await
                .map(|state| state.clone());
            reached.unwrap_or_else(|_| rx.borrow().clone())
        }
    }

    /// Mark the outputs active and spawn the stage loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        let launcher = match self.launcher.take() {
            Some(launcher) => launcher,
            None => return Err(self.invalid_transition(StageState::Running)),
        };
        advance(&self.state, StageState::Running);

        let ctx = StageContext {
            name: self.name.clone(),
            cancel: self.cancel.clone(),
            guard: self.guard.clone(),
            state: self.state.clone(),
        };
        self.handle = Some(tokio::spawn(launcher(ctx)));
        debug!(stage = %self.name, kind = self.kind, "stage started");
        Ok(())
    }

    /// Request cancellation and wait for the loop to exit.
    ///
    /// Once this returns the stage no longer touches any stream. A stage that
    /// was never started finishes its outputs without running.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(launcher) = self.launcher.take() {
            advance(&self.state, StageState::Stopped);
            drop(launcher);
            debug!(stage = %self.name, "stage stopped before start");
            return Ok(());
        }
        advance(&self.state, StageState::Stopping);
        self.cancel.cancel();
        self.wait().await
    }

    /// Wait for the stage to drain its input and exit on its own.
    pub async fn join(&mut self) -> Result<()> {
        if self.launcher.is_some() {
            return Err(self.invalid_transition(StageState::Stopped));
        }
        self.wait().await
    }

    async fn wait(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        match handle.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(PipelineError::Stage {
                stage: self.name.to_string(),
                source,
            }),
            Err(join_error) => {
                let message = join_error.to_string();
                advance(
                    &self.state,
                    StageState::Failed {
                        error_msg: message.clone(),
                    },
                );
                Err(PipelineError::Join {
                    stage: self.name.to_string(),
                    message,
                })
            }
        }
    }

    fn invalid_transition(&self, to: StageState) -> PipelineError {
        PipelineError::InvalidTransition {
            stage: self.name.to_string(),
            from: self.state.borrow().name(),
            to: to.name(),
        }
    }
}

impl Drop for Stage {
    fn drop(&mut self) {
        // A running loop cannot be awaited here; make sure it winds down.
        self.cancel.cancel();
    }
}

async fn drive<T: Transform>(
    mut transform: T,
    mut input: StreamReader,
    mut outputs: Outputs,
    ctx: StageContext,
) -> std::result::Result<(), StageError> {
    debug!(stage = %ctx.name, upstream = input.producer(), "stage loop running");
    let metrics = ctx.guard.metrics().clone();

    let outcome = loop {
        let sample = match next_step(&ctx.cancel, &mut input).await {
            Step::Sample(sample) => sample,
            Step::Drained => {
                debug!(stage = %ctx.name, "input drained");
                break Ok(());
            }
            Step::Cancelled => {
                debug!(stage = %ctx.name, "stage cancelled");
                break Ok(());
            }
        };

        metrics.record_sample_in();
        let timestamp = sample.timestamp;
        let started = metrics.start_processing();
        let before = outputs.emitted();

        let result = contain(|| transform.process(sample, &mut outputs));

        metrics.finish_processing(started);
        metrics.record_samples_out(outputs.emitted() - before);
        if let Err(err) = ctx.guard.check(Some(timestamp), result) {
            break Err(err);
        }
    };

    ctx.settle(&outcome);
    outputs.finish();
    outcome
}
