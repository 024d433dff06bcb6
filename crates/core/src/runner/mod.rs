//! Autonomous run loop driving one engine.
//!
//! A runner repeatedly steps its engine, dispatches each decided action to
//! a handler, and reports progress as events. Step and handler errors are
//! retried with linearly increasing backoff; exhausting the retry budget
//! aborts the run with its full per-step error history preserved in the
//! last run report.

pub mod handlers;
pub mod telemetry;

pub use handlers::{ActionHandler, HandlerOutcome, HandlerRegistry, StepContext};
pub use telemetry::{RunRecord, Telemetry, TelemetrySnapshot};

use crate::engine::{Engine, SummonOptions};
use crate::error::RunnerError;
use chrono::{DateTime, Utc};
use sk_protocol::action_models::{ActionKind, CandidateAction};
use sk_protocol::config_models::RunnerDefaults;
use sk_protocol::ipc::Event;
use sk_protocol::runtime_models::{LifecycleState, RunnerStatus};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

/// Knobs for one runner.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Hard step cap; `None` runs until a stop condition fires.
    pub max_steps: Option<u64>,

    /// Delay inserted between successful steps.
    pub step_delay: Duration,

    /// Retries allowed per step before the run aborts.
    pub max_retries: u32,

    /// Base backoff; attempt `n` waits `retry_base * n`.
    pub retry_base: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::from(&RunnerDefaults::default())
    }
}

impl From<&RunnerDefaults> for RunnerConfig {
    fn from(defaults: &RunnerDefaults) -> Self {
        Self {
            max_steps: None,
            step_delay: Duration::from_millis(defaults.step_delay_ms),
            max_retries: defaults.max_retries,
            retry_base: Duration::from_millis(defaults.retry_base_ms),
        }
    }
}

/// One successful step.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: u64,
    pub kind: ActionKind,
    pub free_energy: f64,
    pub entropy: f64,

    /// Retries consumed before this step succeeded.
    pub retries: u32,

    pub duration: Duration,

    /// Note produced by the action handler.
    pub note: String,
}

/// One failed attempt, kept across the whole run.
#[derive(Debug, Clone)]
pub struct StepFailure {
    pub step: u64,
    pub attempt: u32,
    pub error: String,
}

/// Everything that happened during one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub agent_id: Uuid,
    pub status: RunnerStatus,
    pub steps: Vec<StepReport>,
    pub errors: Vec<StepFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Produces the observation for step `n` when no handler supplied one.
pub type ObservationGenerator = Box<dyn FnMut(u64) -> String + Send>;

/// Stops the run when it returns true for a completed step.
pub type StopCondition = Box<dyn Fn(&StepReport) -> bool + Send + Sync>;

/// Remote pause/resume control for a running runner.
#[derive(Clone)]
pub struct RunnerHandle {
    pause: Arc<watch::Sender<bool>>,
}

impl RunnerHandle {
    pub fn pause(&self) {
        self.pause.send_replace(true);
    }

    pub fn resume(&self) {
        self.pause.send_replace(false);
    }
}

/// Drives one engine through repeated full steps.
pub struct Runner {
    engine: Arc<Mutex<Engine>>,
    candidates: Vec<CandidateAction>,
    handlers: HandlerRegistry,
    config: RunnerConfig,
    generator: Option<ObservationGenerator>,
    stop_when: Option<StopCondition>,
    pause: Arc<watch::Sender<bool>>,
    status: RunnerStatus,
    telemetry: Telemetry,
    last_run: Option<RunReport>,
    events_tx: Option<mpsc::Sender<Event>>,
}

impl Runner {
    /// Runner over `engine` with the given candidate action menu and
    /// built-in handlers.
    pub fn new(engine: Arc<Mutex<Engine>>, candidates: Vec<CandidateAction>) -> Self {
        let (pause, _) = watch::channel(false);
        Self {
            engine,
            candidates,
            handlers: HandlerRegistry::with_builtins(),
            config: RunnerConfig::default(),
            generator: None,
            stop_when: None,
            pause: Arc::new(pause),
            status: RunnerStatus::Idle,
            telemetry: Telemetry::new(),
            last_run: None,
            events_tx: None,
        }
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn with_generator(mut self, generator: ObservationGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_stop_condition(mut self, stop_when: StopCondition) -> Self {
        self.stop_when = Some(stop_when);
        self
    }

    pub fn with_events(mut self, events_tx: mpsc::Sender<Event>) -> Self {
        self.events_tx = Some(events_tx);
        self
    }

    pub fn status(&self) -> RunnerStatus {
        self.status
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn telemetry_mut(&mut self) -> &mut Telemetry {
        &mut self.telemetry
    }

    /// The report of the most recent run, including aborted ones.
    pub fn last_run(&self) -> Option<&RunReport> {
        self.last_run.as_ref()
    }

    /// Pause/resume handle, usable from another task.
    pub fn handle(&self) -> RunnerHandle {
        RunnerHandle {
            pause: Arc::clone(&self.pause),
        }
    }

    /// Run until a stop condition, the step cap, or an aborting error.
    ///
    /// Summons the engine first if it is dormant. The full report of the
    /// run, successful or aborted, is also retained in [`Runner::last_run`].
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::NoHandler`] when a decided kind has no
    /// handler and [`RunnerError::RetriesExhausted`] when a step kept
    /// failing past the retry budget.
    pub async fn run(&mut self, initial_observation: &str) -> Result<RunReport, RunnerError> {
        let run_id = Uuid::new_v4();
        let agent_id = {
            let mut engine = self.engine.lock().await;
            if engine.state() == LifecycleState::Dormant {
                engine.summon(SummonOptions::default())?;
            }
            engine.definition().id
        };

        self.status = RunnerStatus::Running;
        self.emit(Event::RunStarted { run_id, agent_id }).await;

        let started_at = Utc::now();
        let mut pause_rx = self.pause.subscribe();
        let mut observation = initial_observation.to_string();
        let mut steps: Vec<StepReport> = Vec::new();
        let mut errors: Vec<StepFailure> = Vec::new();
        let mut step: u64 = 0;

        let status = 'run: loop {
            while *pause_rx.borrow() {
                self.status = RunnerStatus::Paused;
                if pause_rx.changed().await.is_err() {
                    break;
                }
            }
            self.status = RunnerStatus::Running;

            if let Some(max) = self.config.max_steps {
                if step >= max {
                    debug!(run_id = %run_id, steps = step, "step cap reached");
                    break 'run RunnerStatus::Stopped;
                }
            }
            step += 1;

            // Retry loop for this step.
            let mut attempt: u32 = 0;
            let (report, next_observation) = loop {
                match self.try_step(run_id, step, &observation, attempt).await {
                    Ok(result) => break result,
                    Err(RunnerError::NoHandler(kind)) => {
                        self.abort(run_id, agent_id, started_at, steps, errors).await;
                        return Err(RunnerError::NoHandler(kind));
                    }
                    Err(e) => {
                        attempt += 1;
                        self.telemetry.record_error();
                        let failure = StepFailure {
                            step,
                            attempt,
                            error: e.to_string(),
                        };
                        warn!(run_id = %run_id, step, attempt, error = %failure.error, "step failed");
                        self.emit(Event::StepError {
                            run_id,
                            step,
                            error: failure.error.clone(),
                        })
                        .await;
                        errors.push(failure);

                        if attempt > self.config.max_retries {
                            let last_error = e.to_string();
                            self.abort(run_id, agent_id, started_at, steps, errors).await;
                            return Err(RunnerError::RetriesExhausted {
                                step,
                                attempts: attempt,
                                last_error,
                            });
                        }
                        // Linear backoff.
                        tokio::time::sleep(self.config.retry_base * attempt).await;
                    }
                }
            };

            let stop_requested = self
                .stop_when
                .as_ref()
                .map(|stop| stop(&report))
                .unwrap_or(false);
            let waited = report.kind == ActionKind::Wait;
            steps.push(report);

            if stop_requested {
                break 'run RunnerStatus::Stopped;
            }

            match next_observation {
                Some(next) => observation = next,
                None => match self.generator.as_mut() {
                    Some(generate) => observation = generate(step),
                    // A wait with nothing to observe next ends the run.
                    None if waited => break 'run RunnerStatus::Stopped,
                    None => {}
                },
            }

            if !self.config.step_delay.is_zero() {
                tokio::time::sleep(self.config.step_delay).await;
            }
        };

        self.status = status;
        let report = RunReport {
            run_id,
            agent_id,
            status,
            steps,
            errors,
            started_at,
            finished_at: Utc::now(),
        };
        self.finish(&report).await;
        self.last_run = Some(report.clone());
        Ok(report)
    }

    async fn try_step(
        &mut self,
        run_id: Uuid,
        step: u64,
        observation: &str,
        retries: u32,
    ) -> Result<(StepReport, Option<String>), RunnerError> {
        let begun = Instant::now();

        let (outcome, beliefs) = {
            let mut engine = self.engine.lock().await;
            let outcome = engine.full_step(observation, &self.candidates)?;
            let beliefs = engine
                .session()
                .map(|s| s.beliefs.clone())
                .unwrap_or_default();
            (outcome, beliefs)
        };

        let handler = self.handlers.get(outcome.decision.action.kind)?;
        let ctx = StepContext {
            step,
            observation: observation.to_string(),
            decision: outcome.decision.clone(),
            beliefs,
        };
        let handled = handler.handle(&ctx).await?;

        let duration = begun.elapsed();
        self.telemetry.record_step(duration);
        self.emit(Event::StepCompleted {
            run_id,
            step,
            kind: outcome.decision.action.kind,
            duration_ms: duration.as_millis() as u64,
        })
        .await;

        let report = StepReport {
            step,
            kind: outcome.decision.action.kind,
            free_energy: outcome.decision.free_energy,
            entropy: outcome.entropy,
            retries,
            duration,
            note: handled.note,
        };
        Ok((report, handled.next_observation))
    }

    async fn abort(
        &mut self,
        run_id: Uuid,
        agent_id: Uuid,
        started_at: DateTime<Utc>,
        steps: Vec<StepReport>,
        errors: Vec<StepFailure>,
    ) {
        self.status = RunnerStatus::Error;
        let report = RunReport {
            run_id,
            agent_id,
            status: RunnerStatus::Error,
            steps,
            errors,
            started_at,
            finished_at: Utc::now(),
        };
        self.finish(&report).await;
        self.last_run = Some(report);
    }

    async fn finish(&mut self, report: &RunReport) {
        self.telemetry.record_run(RunRecord {
            run_id: report.run_id,
            agent_id: report.agent_id,
            status: report.status,
            steps: report.steps.len() as u64,
            errors: report.errors.len() as u64,
            finished_at: report.finished_at,
        });
        self.emit(Event::RunCompleted {
            run_id: report.run_id,
            status: report.status,
            steps: report.steps.len() as u64,
        })
        .await;
    }

    async fn emit(&self, event: Event) {
        if let Some(tx) = &self.events_tx {
            let _ = tx.send(event).await;
        }
    }
}
