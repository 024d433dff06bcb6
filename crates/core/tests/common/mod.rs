//! Shared fixtures for sk-core integration tests.

use sk_protocol::action_models::{ActionKind, CandidateAction};
use sk_protocol::agent_models::AgentDefinition;

/// A menu covering the six everyday action kinds.
pub fn default_actions() -> Vec<CandidateAction> {
    vec![
        CandidateAction::new(ActionKind::Response, "answer directly", 0.5),
        CandidateAction::new(ActionKind::Query, "ask a clarifying question", 0.3),
        CandidateAction::new(ActionKind::MemoryWrite, "note this down", 0.4),
        CandidateAction::new(ActionKind::LayerShift, "reframe the problem", 0.6),
        CandidateAction::new(ActionKind::MemoryRead, "recall prior notes", 0.2),
        CandidateAction::new(ActionKind::Wait, "hold", 0.05),
    ]
}

pub fn definition(name: &str, basis: Vec<u64>) -> AgentDefinition {
    AgentDefinition::new(name, basis)
}
