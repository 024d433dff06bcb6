//! Runtime error types.
//!
//! Expected domain failures (illegal lifecycle transitions, weak resonance,
//! exhausted retries) are typed `Err` variants carrying the data a caller
//! needs to react. Programmer errors (empty basis, no members) surface as
//! validation variants raised at construction time.

use sk_protocol::action_models::ActionKind;
use sk_protocol::runtime_models::LifecycleState;
use thiserror::Error;
use uuid::Uuid;

/// Errors produced by a single engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The operation is not legal in the engine's current lifecycle state,
    /// e.g. a second `dismiss()` without an intervening `summon()`.
    #[error("operation `{op}` is invalid in state {state:?}")]
    InvalidState {
        op: &'static str,
        state: LifecycleState,
    },

    /// The resonance key scored below the activation threshold. The engine
    /// stays dormant with no state mutation; `strength` is reported for
    /// retry tuning.
    #[error("resonance too weak: {strength:.3} < {threshold:.3}")]
    ResonanceTooWeak { strength: f64, threshold: f64 },

    /// `full_step` was called with an empty candidate menu.
    #[error("no candidate actions supplied")]
    NoCandidates,

    /// The definition is not a valid engine construction input.
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),

    /// Snapshot serialization or restoration failed.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Errors produced by the agent/team managers.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("no definition with id {0}")]
    NotFound(Uuid),

    #[error("unknown template `{0}`")]
    UnknownTemplate(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors produced by a multi-agent network.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("a network needs at least 2 members, got {0}")]
    TooFewMembers(usize),

    /// No member produced a usable decision during a collective step.
    #[error("collective step failed: {0}")]
    CollectiveStep(String),
}

/// Errors produced by an action handler.
#[derive(Debug, Error)]
#[error("handler for `{kind}` failed: {message}")]
pub struct HandlerError {
    pub kind: ActionKind,
    pub message: String,
}

impl HandlerError {
    pub fn new(kind: ActionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Errors produced by the runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The decided action kind has no registered handler.
    #[error("no handler registered for action kind `{0}`")]
    NoHandler(ActionKind),

    /// Retries were exhausted; the run aborts with its error history.
    #[error("step {step} exhausted {attempts} retries: {last_error}")]
    RetriesExhausted {
        step: u64,
        attempts: u32,
        last_error: String,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// Errors produced by a persistence backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed at {}: {source}", path.display())]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("storage serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage backend rejected the operation: {0}")]
    Backend(String),
}
