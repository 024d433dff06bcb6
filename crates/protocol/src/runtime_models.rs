//! Runtime state models: lifecycle states, beliefs, percepts, beacons,
//! and the outcome/snapshot types returned by engine operations.

use crate::action_models::{ActionKind, Decision};
use crate::layer::Layer;
use crate::quaternion::Quaternion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Lifecycle state of an engine.
///
/// Normal traversal:
/// Dormant -> Awakening -> Perceiving -> Deciding -> Acting -> Learning,
/// then either back to Perceiving or on to Consolidating -> Sleeping ->
/// Dormant. Perceiving and Deciding may also exit early to Consolidating.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Dormant,
    Awakening,
    Perceiving,
    Deciding,
    Acting,
    Learning,
    Consolidating,
    Sleeping,
}

/// One weighted hypothesis in an agent's belief distribution.
///
/// A belief set is a probability distribution: probabilities are
/// non-negative and sum to 1.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Belief {
    /// State label, e.g. "ready" or "acted:response".
    pub label: String,

    pub probability: f64,

    /// Basis elements this belief is associated with.
    pub basis: Vec<u64>,

    pub entropy: f64,

    /// Orientation carried by this belief.
    pub orientation: Quaternion,
}

/// Per-layer encoded observation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LayerPercept {
    pub layer: Layer,

    /// Phase angles the observation was encoded to on this layer.
    pub phases: Vec<f64>,

    /// Basis elements touched by this encoding.
    pub basis: Vec<u64>,

    /// Aggregate magnitude of the encoded phases.
    pub magnitude: f64,
}

/// A full percept: one encoding per configured input layer plus the
/// attention-selected dominant layer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Percept {
    pub layers: Vec<LayerPercept>,
    pub dominant: Layer,
}

impl Percept {
    /// The dominant layer's encoding.
    pub fn dominant_percept(&self) -> Option<&LayerPercept> {
        self.layers.iter().find(|lp| lp.layer == self.dominant)
    }
}

/// Summary of phase memory at consolidation time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MemorySummary {
    /// Total phase entries across all basis elements.
    pub total_phases: usize,

    /// The (up to) three basis elements holding the most phases.
    pub most_active: Vec<u64>,

    /// First minus last entropy-trajectory value for the closed session.
    pub entropy_reduction: f64,
}

/// Immutable fingerprint appended on dismiss or epoch rollover.
///
/// The beacon log is append-only; the engine never mutates or deletes
/// entries.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Beacon {
    /// Stable hex digest of epoch, body basis, phase-state summary, and
    /// the top-3 beliefs.
    pub fingerprint: String,

    pub epoch: u64,
    pub emitted_at: DateTime<Utc>,
    pub memory: MemorySummary,

    /// Top-5 beliefs by probability at emission time.
    pub top_beliefs: Vec<Belief>,
}

/// One recorded action inside a session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActionRecord {
    pub kind: ActionKind,
    pub free_energy: f64,
    pub taken_at: DateTime<Utc>,
}

/// Result of a successful summon.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SummonOutcome {
    pub session_id: Uuid,
    pub resonance_strength: f64,
    pub state: LifecycleState,
    pub beliefs: Vec<Belief>,
}

/// Result of one full perceive -> decide -> act -> learn step.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub percept: Percept,
    pub decision: Decision,

    /// Entropy estimate of the dominant layer for this step.
    pub entropy: f64,

    pub epoch: u64,
    pub state: LifecycleState,
}

/// Result of a successful dismiss.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DismissOutcome {
    pub beacon: Beacon,
    pub state: LifecycleState,
}

/// Serializable snapshot of an engine's durable runtime state.
///
/// Sessions are ephemeral and deliberately excluded: a restored engine is
/// always dormant. Live session state never survives a restart.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub definition_id: Uuid,
    pub body_basis: Vec<u64>,

    /// Phase memory per basis element, oldest first, at most 10 entries.
    pub memory: HashMap<u64, Vec<f64>>,

    pub quaternion: Quaternion,
    pub epoch: u64,
    pub actions_recorded: u64,
    pub beacons: Vec<Beacon>,
}

/// Runner lifecycle status.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunnerStatus {
    Idle,
    Running,
    Paused,
    Stopped,
    Error,
}
