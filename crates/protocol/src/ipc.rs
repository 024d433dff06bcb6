//! Lifecycle event surface.
//!
//! The core emits `Event`s on a `tokio::sync::mpsc` channel for external
//! observability, UI, or platform integration. Delivery is synchronous,
//! in-process, and best-effort: a full or closed channel drops the event,
//! the operation that produced it is unaffected.
//!
//! Uses tagged enum serialization:
//! ```json
//! {
//!   "type": "decided",
//!   "payload": {
//!     "agent_id": "uuid-here",
//!     "kind": "response",
//!     "free_energy": 1.25
//!   }
//! }
//! ```

use crate::action_models::ActionKind;
use crate::layer::Layer;
use crate::runtime_models::RunnerStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events emitted by engines, managers, networks, and runners.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Event {
    /// An agent's summon succeeded.
    Summoned {
        agent_id: Uuid,
        resonance_strength: f64,
    },

    /// An observation was encoded; the dominant layer was selected.
    Perceived {
        agent_id: Uuid,
        dominant_layer: Layer,
        entropy: f64,
    },

    /// Free-energy minimization selected an action.
    Decided {
        agent_id: Uuid,
        kind: ActionKind,
        free_energy: f64,
    },

    /// The selected action was recorded into the session history.
    Acted { agent_id: Uuid, kind: ActionKind },

    /// Phase memory and quaternion were updated.
    Learned { agent_id: Uuid, epoch: u64 },

    /// The epoch counter rolled over (once per 10 recorded actions).
    EpochAdvanced { agent_id: Uuid, epoch: u64 },

    /// A beacon was appended to the append-only log.
    BeaconEmitted { agent_id: Uuid, fingerprint: String },

    /// An agent's session ended; the engine is dormant again.
    Dismissed { agent_id: Uuid },

    /// An agent definition was created.
    AgentCreated { agent_id: Uuid, name: String },

    /// An agent definition was updated; any cached engine was discarded.
    AgentUpdated { agent_id: Uuid, name: String },

    /// An agent definition was deleted.
    AgentDeleted { agent_id: Uuid },

    /// A team definition was created.
    TeamCreated { team_id: Uuid, name: String },

    /// A team definition was updated; any cached network was discarded.
    TeamUpdated { team_id: Uuid, name: String },

    /// A team definition was deleted.
    TeamDeleted { team_id: Uuid },

    /// A network finished summoning its members (possibly partially).
    NetworkSummoned {
        team_id: Uuid,
        summoned: usize,
        failed: usize,
    },

    /// A collective step completed.
    CollectiveStep {
        team_id: Uuid,
        kind: ActionKind,
        free_energy: f64,
    },

    /// A network finished dismissing its members.
    NetworkDismissed { team_id: Uuid },

    /// A runner started a new run.
    RunStarted { run_id: Uuid, agent_id: Uuid },

    /// One runner step completed.
    StepCompleted {
        run_id: Uuid,
        step: u64,
        kind: ActionKind,
        duration_ms: u64,
    },

    /// One runner step errored (may be retried).
    StepError {
        run_id: Uuid,
        step: u64,
        error: String,
    },

    /// A run finished, by stop condition, step cap, or error.
    RunCompleted {
        run_id: Uuid,
        status: RunnerStatus,
        steps: u64,
    },

    /// A persistence backend rejected a write. The in-memory change has
    /// already been applied and is not rolled back.
    StorageError { error: String },
}
