//! Agent and team definitions.
//!
//! A definition is the persisted, manager-owned description of an agent or
//! team. Engines and networks are derived runtime objects: rebuilding one
//! from an updated definition starts from fresh default memory.

use crate::action_models::ActionKind;
use crate::layer::Layer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Which input/output layers an agent uses, and where its attention rests.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PerceptionConfig {
    /// Layers observations are encoded onto.
    pub input_layers: Vec<Layer>,

    /// Layers actions may target.
    pub output_layers: Vec<Layer>,

    /// The layer attention starts on when a session opens.
    pub attention_span: Layer,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            input_layers: vec![Layer::Data, Layer::Semantic],
            output_layers: vec![Layer::Semantic],
            attention_span: Layer::Semantic,
        }
    }
}

/// The cost dimension a goal prior speaks to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CostKind {
    Safety,
    Alignment,
    Efficiency,
    Creativity,
}

/// A weighted goal contributing to the pragmatic term of free energy.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GoalPrior {
    pub name: String,
    pub weight: f64,
    pub cost_kind: CostKind,
}

/// Preferred and avoided basis elements, with per-element weight multipliers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct AttractorBias {
    /// Basis elements the agent gravitates towards.
    #[serde(default)]
    pub preferred: Vec<u64>,

    /// Basis elements the agent avoids.
    #[serde(default)]
    pub avoided: Vec<u64>,

    /// Per-element weight multipliers applied on top of preferred/avoided.
    #[serde(default)]
    pub weights: HashMap<u64, f64>,
}

/// Collapse dynamics: per-agent tunables for belief decay and decision
/// weighting. All of these are configuration, not compiled constants.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CollapseDynamics {
    /// Multiplier applied to each belief probability after a decision.
    #[serde(default = "default_entropy_decay_rate")]
    pub entropy_decay_rate: f64,

    /// Coherence level a session aims for; consulted when consolidating.
    #[serde(default = "default_coherence_threshold")]
    pub coherence_threshold: f64,

    /// Strength of the pull towards preferred basis elements.
    #[serde(default = "default_attractor_strength")]
    pub attractor_strength: f64,

    /// λ: weight of the epistemic term in the free-energy sum.
    #[serde(default = "default_epistemic_weight")]
    pub epistemic_weight: f64,

    /// γ: weight of the pragmatic term in the free-energy sum.
    #[serde(default = "default_pragmatic_weight")]
    pub pragmatic_weight: f64,
}

fn default_entropy_decay_rate() -> f64 {
    0.95
}

fn default_coherence_threshold() -> f64 {
    0.7
}

fn default_attractor_strength() -> f64 {
    0.5
}

fn default_epistemic_weight() -> f64 {
    0.3
}

fn default_pragmatic_weight() -> f64 {
    0.5
}

impl Default for CollapseDynamics {
    fn default() -> Self {
        Self {
            entropy_decay_rate: default_entropy_decay_rate(),
            coherence_threshold: default_coherence_threshold(),
            attractor_strength: default_attractor_strength(),
            epistemic_weight: default_epistemic_weight(),
            pragmatic_weight: default_pragmatic_weight(),
        }
    }
}

/// A single safety constraint applied during decisions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SafetyConstraint {
    /// Action kinds that incur a flat +10 energy penalty.
    ActionFilter { blocked: Vec<ActionKind> },

    /// Substrings that must not appear in an action's description.
    ContentFilter { patterns: Vec<String> },

    /// Entropy-cost ceiling; excess cost is added to energy proportionally.
    RateLimit { max_entropy_cost: f64 },
}

/// Persisted description of a single agent.
///
/// Owned by the agent manager. An `Engine` is a derived, ephemeral runtime
/// object bound to a definition id while cached; editing a definition
/// discards the cached engine together with its accumulated runtime memory.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AgentDefinition {
    pub id: Uuid,
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Fixed set of distinct positive integers identifying the agent.
    /// Immutable once an engine has been built from this definition.
    pub body_basis: Vec<u64>,

    #[serde(default)]
    pub perception: PerceptionConfig,

    #[serde(default)]
    pub goals: Vec<GoalPrior>,

    #[serde(default)]
    pub biases: AttractorBias,

    #[serde(default)]
    pub dynamics: CollapseDynamics,

    #[serde(default)]
    pub safety: Vec<SafetyConstraint>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentDefinition {
    /// Create a definition with fresh id and timestamps from a name and basis.
    pub fn new(name: impl Into<String>, body_basis: Vec<u64>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            body_basis,
            perception: PerceptionConfig::default(),
            goals: Vec::new(),
            biases: AttractorBias::default(),
            dynamics: CollapseDynamics::default(),
            safety: Vec::new(),
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// How a network merges its members' independent decisions.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionMode {
    /// Per-kind confidences are averaged across all members; the kind with
    /// the highest mean wins, represented by the lowest-energy member
    /// decision of that kind.
    Average,

    /// The highest-confidence member's action wins.
    Dominant,

    /// A configured majority must agree on the action kind; falls back to
    /// dominant when no majority forms.
    Consensus,

    /// Free-energy tournament: the minimal-energy decision wins outright.
    Competitive,
}

/// Coupling and propagation settings for a team's network.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct NetworkConfig {
    /// Pairwise coupling strength in [0, 1].
    #[serde(default = "default_coupling_strength")]
    pub coupling_strength: f64,

    /// Whether beliefs propagate between members after each collective step.
    #[serde(default = "default_propagate_beliefs")]
    pub propagate_beliefs: bool,

    /// Attenuation applied to propagated probabilities, multiplied with
    /// the coupling strength.
    #[serde(default = "default_propagation_rate")]
    pub propagation_rate: f64,

    #[serde(default = "default_decision_mode")]
    pub decision_mode: DecisionMode,

    /// Fraction of members that constitutes a consensus majority.
    #[serde(default = "default_consensus_threshold")]
    pub consensus_threshold: f64,
}

fn default_coupling_strength() -> f64 {
    0.5
}

fn default_propagate_beliefs() -> bool {
    true
}

fn default_propagation_rate() -> f64 {
    0.3
}

fn default_decision_mode() -> DecisionMode {
    DecisionMode::Dominant
}

fn default_consensus_threshold() -> f64 {
    0.5
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            coupling_strength: default_coupling_strength(),
            propagate_beliefs: default_propagate_beliefs(),
            propagation_rate: default_propagation_rate(),
            decision_mode: default_decision_mode(),
            consensus_threshold: default_consensus_threshold(),
        }
    }
}

/// Persisted description of a multi-agent team.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TeamDefinition {
    pub id: Uuid,
    pub name: String,

    /// Member agent definition ids. Validated against the agent manager on
    /// create/update; unknown ids are dropped with a warning.
    pub member_ids: Vec<Uuid>,

    #[serde(default)]
    pub network: NetworkConfig,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TeamDefinition {
    /// Create a team with fresh id and timestamps.
    pub fn new(name: impl Into<String>, member_ids: Vec<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            member_ids,
            network: NetworkConfig::default(),
            created_at: now,
            updated_at: now,
        }
    }
}
