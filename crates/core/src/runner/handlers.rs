//! Action handlers: the side-effecting half of a runner step.
//!
//! The engine decides *what* to do; a handler does it. The registry is
//! keyed by [`ActionKind`] and dispatch is explicit: a decided kind with no
//! registered handler is a [`RunnerError::NoHandler`], never a silent no-op.

use crate::error::{HandlerError, RunnerError};
use async_trait::async_trait;
use sk_protocol::action_models::{ActionKind, Decision};
use sk_protocol::runtime_models::Belief;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Everything a handler may consult when executing a decided action.
#[derive(Debug, Clone)]
pub struct StepContext {
    /// 1-based step number within the current run.
    pub step: u64,

    /// The observation this step perceived.
    pub observation: String,

    pub decision: Decision,

    /// The session's belief distribution after the step settled.
    pub beliefs: Vec<Belief>,
}

/// What a handler produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerOutcome {
    /// Human-readable note recorded in the step report.
    pub note: String,

    /// Observation to feed into the next step, taking precedence over the
    /// runner's observation generator.
    pub next_observation: Option<String>,
}

impl HandlerOutcome {
    pub fn note(note: impl Into<String>) -> Self {
        Self {
            note: note.into(),
            next_observation: None,
        }
    }

    pub fn with_observation(mut self, observation: impl Into<String>) -> Self {
        self.next_observation = Some(observation.into());
        self
    }
}

/// Executes one decided action.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, ctx: &StepContext) -> Result<HandlerOutcome, HandlerError>;
}

/// Enum-keyed handler registry with built-in defaults for every kind.
pub struct HandlerRegistry {
    handlers: HashMap<ActionKind, Arc<dyn ActionHandler>>,
}

impl HandlerRegistry {
    /// Empty registry; every dispatch fails until handlers are registered.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry covering all eight kinds with logging built-ins.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for kind in ActionKind::ALL {
            registry.register(kind, Arc::new(LoggingHandler { kind }));
        }
        registry
    }

    /// Add or replace the handler for `kind`.
    pub fn register(&mut self, kind: ActionKind, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(kind, handler);
    }

    /// Look up the handler for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::NoHandler`] when the kind is unregistered.
    pub fn get(&self, kind: ActionKind) -> Result<Arc<dyn ActionHandler>, RunnerError> {
        self.handlers
            .get(&kind)
            .map(Arc::clone)
            .ok_or(RunnerError::NoHandler(kind))
    }

    pub fn covers(&self, kind: ActionKind) -> bool {
        self.handlers.contains_key(&kind)
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Default handler: logs the action and records a note.
struct LoggingHandler {
    kind: ActionKind,
}

#[async_trait]
impl ActionHandler for LoggingHandler {
    async fn handle(&self, ctx: &StepContext) -> Result<HandlerOutcome, HandlerError> {
        info!(
            kind = %self.kind,
            step = ctx.step,
            free_energy = ctx.decision.free_energy,
            description = %ctx.decision.action.description,
            "executing action"
        );
        Ok(HandlerOutcome::note(format!(
            "{}: {}",
            self.kind, ctx.decision.action.description
        )))
    }
}
