//! Candidate actions and decisions.
//!
//! The decision algorithm is agnostic to where the candidate menu comes
//! from: callers supply an array of candidates, the engine returns the
//! minimum-free-energy pick with its alternatives and a per-kind confidence
//! distribution.

use crate::layer::Layer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The eight recognized action kinds.
///
/// Runner handlers are keyed by this enum; an action kind without a
/// registered handler is an explicit error, never a silent no-op.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Query,
    Response,
    MemoryWrite,
    MemoryRead,
    LayerShift,
    Wait,
    Delegate,
    ToolCall,
}

impl ActionKind {
    /// All kinds in canonical order.
    pub const ALL: [ActionKind; 8] = [
        ActionKind::Query,
        ActionKind::Response,
        ActionKind::MemoryWrite,
        ActionKind::MemoryRead,
        ActionKind::LayerShift,
        ActionKind::Wait,
        ActionKind::Delegate,
        ActionKind::ToolCall,
    ];

    /// Coefficient applied to the belief-weighted entropy when computing
    /// the epistemic term. Queries are cheap epistemic probes; responses
    /// commit more strongly.
    pub fn epistemic_coefficient(self) -> f64 {
        match self {
            ActionKind::Query => 0.3,
            ActionKind::Response => 0.7,
            ActionKind::MemoryWrite => 0.5,
            _ => 1.0,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionKind::Query => "query",
            ActionKind::Response => "response",
            ActionKind::MemoryWrite => "memory_write",
            ActionKind::MemoryRead => "memory_read",
            ActionKind::LayerShift => "layer_shift",
            ActionKind::Wait => "wait",
            ActionKind::Delegate => "delegate",
            ActionKind::ToolCall => "tool_call",
        };
        f.write_str(s)
    }
}

/// One entry of a caller-supplied action menu.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CandidateAction {
    pub kind: ActionKind,
    pub description: String,

    /// Declared raw cost of taking this action.
    pub entropy_cost: f64,

    /// Caller's prior confidence in the action, in [0, 1].
    #[serde(default)]
    pub confidence: f64,

    /// The layer the action operates on; defaults to the dominant percept
    /// layer when absent.
    #[serde(default)]
    pub target_layer: Option<Layer>,
}

impl CandidateAction {
    /// Convenience constructor for a candidate with no target layer.
    pub fn new(kind: ActionKind, description: impl Into<String>, entropy_cost: f64) -> Self {
        Self {
            kind,
            description: description.into(),
            entropy_cost,
            confidence: 0.5,
            target_layer: None,
        }
    }
}

/// Outcome of one free-energy minimization over a candidate menu.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Decision {
    /// The minimum-energy action.
    pub action: CandidateAction,

    /// Free energy of the selected action.
    pub free_energy: f64,

    /// The next (up to) three candidates in ascending energy order.
    pub alternatives: Vec<CandidateAction>,

    /// Per-kind confidence: `1 - energy / Σ energy` over the evaluated menu.
    pub confidence: HashMap<ActionKind, f64>,
}
