//! Decision: free-energy minimization over a caller-supplied action menu.
//!
//! For each candidate:
//!
//! ```text
//! energy = entropy_term
//!        + λ * epistemic_term
//!        + γ * pragmatic_term
//!        + safety_penalty
//! ```
//!
//! The action with minimum energy is selected; the next three lowest are
//! alternatives. λ and γ come from the agent's collapse dynamics — they are
//! configuration, not constants.

use super::{awaken::normalize_beliefs, BELIEF_PRUNE_FLOOR};
use crate::error::EngineError;
use sk_protocol::action_models::{ActionKind, CandidateAction, Decision};
use sk_protocol::agent_models::{CollapseDynamics, CostKind, GoalPrior, SafetyConstraint};
use sk_protocol::layer::Layer;
use sk_protocol::quaternion::Quaternion;
use sk_protocol::runtime_models::Belief;
use std::collections::HashMap;

/// Flat energy penalty for an action blocked by a safety constraint.
const BLOCKED_PENALTY: f64 = 10.0;

/// Free energy of a single candidate against the current beliefs.
pub fn free_energy(
    action: &CandidateAction,
    beliefs: &[Belief],
    dominant_layer: Layer,
    dynamics: &CollapseDynamics,
    goals: &[GoalPrior],
    safety: &[SafetyConstraint],
) -> f64 {
    let target = action.target_layer.unwrap_or(dominant_layer);
    let entropy_term = action.entropy_cost * target.params().entropy_weight;

    let epistemic_term = belief_weighted_entropy(beliefs) * action.kind.epistemic_coefficient();

    let pragmatic_term = goals
        .iter()
        .map(|goal| goal_contribution(goal, action))
        .sum::<f64>()
        .max(0.0);

    let penalty = safety_penalty(action, safety);

    entropy_term
        + dynamics.epistemic_weight * epistemic_term
        + dynamics.pragmatic_weight * pragmatic_term
        + penalty
}

fn belief_weighted_entropy(beliefs: &[Belief]) -> f64 {
    beliefs
        .iter()
        .map(|b| b.probability * b.entropy)
        .sum::<f64>()
}

fn goal_contribution(goal: &GoalPrior, action: &CandidateAction) -> f64 {
    match goal.cost_kind {
        CostKind::Safety => {
            if action.kind == ActionKind::MemoryWrite {
                goal.weight
            } else {
                0.0
            }
        }
        CostKind::Alignment => {
            if action.kind == ActionKind::Response {
                -goal.weight
            } else {
                0.0
            }
        }
        CostKind::Efficiency => goal.weight * action.entropy_cost,
        CostKind::Creativity => {
            if action.kind == ActionKind::LayerShift {
                -goal.weight
            } else {
                0.0
            }
        }
    }
}

fn safety_penalty(action: &CandidateAction, safety: &[SafetyConstraint]) -> f64 {
    let mut penalty = 0.0;
    for constraint in safety {
        match constraint {
            SafetyConstraint::ActionFilter { blocked } => {
                if blocked.contains(&action.kind) {
                    penalty += BLOCKED_PENALTY;
                }
            }
            SafetyConstraint::ContentFilter { patterns } => {
                if patterns.iter().any(|p| action.description.contains(p)) {
                    penalty += BLOCKED_PENALTY;
                }
            }
            SafetyConstraint::RateLimit { max_entropy_cost } => {
                if action.entropy_cost > *max_entropy_cost {
                    penalty += action.entropy_cost - max_entropy_cost;
                }
            }
        }
    }
    penalty
}

/// Run free-energy minimization over the candidate menu.
pub fn decide(
    candidates: &[CandidateAction],
    beliefs: &[Belief],
    dominant_layer: Layer,
    dynamics: &CollapseDynamics,
    goals: &[GoalPrior],
    safety: &[SafetyConstraint],
) -> Result<Decision, EngineError> {
    if candidates.is_empty() {
        return Err(EngineError::NoCandidates);
    }

    let mut scored: Vec<(f64, &CandidateAction)> = candidates
        .iter()
        .map(|c| {
            (
                free_energy(c, beliefs, dominant_layer, dynamics, goals, safety),
                c,
            )
        })
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));

    let total_energy: f64 = scored.iter().map(|(e, _)| e).sum();
    let mut confidence: HashMap<ActionKind, f64> = HashMap::new();
    for (energy, candidate) in &scored {
        let score = if total_energy.abs() < super::EPSILON {
            1.0 / scored.len() as f64
        } else {
            1.0 - energy / total_energy
        };
        // First occurrence per kind is the lowest-energy one.
        confidence.entry(candidate.kind).or_insert(score);
    }

    let (best_energy, best) = scored[0];
    let alternatives = scored
        .iter()
        .skip(1)
        .take(3)
        .map(|(_, c)| (*c).clone())
        .collect();

    Ok(Decision {
        action: best.clone(),
        free_energy: best_energy,
        alternatives,
        confidence,
    })
}

/// Post-decision belief update.
///
/// Probabilities decay by the entropy decay rate, entropies shrink with the
/// attractor strength, beliefs under 1% are pruned, the rest renormalized.
/// Response and query decisions additionally seed an action-derived belief
/// over the basis elements the step touched.
pub fn settle_beliefs(
    beliefs: &mut Vec<Belief>,
    decision: &Decision,
    touched: &[u64],
    dynamics: &CollapseDynamics,
) {
    for belief in beliefs.iter_mut() {
        belief.probability *= dynamics.entropy_decay_rate;
        belief.entropy *= 1.0 - dynamics.attractor_strength * 0.1;
    }
    beliefs.retain(|b| b.probability >= BELIEF_PRUNE_FLOOR);
    normalize_beliefs(beliefs);

    if matches!(
        decision.action.kind,
        ActionKind::Response | ActionKind::Query
    ) {
        let confidence = decision
            .confidence
            .get(&decision.action.kind)
            .copied()
            .unwrap_or(0.5);
        beliefs.push(Belief {
            label: format!("acted:{}", decision.action.kind),
            probability: 0.1 * confidence.max(0.1),
            basis: touched.to_vec(),
            entropy: decision.action.entropy_cost.min(1.0),
            orientation: Quaternion::identity(),
        });
        normalize_beliefs(beliefs);
    }
}
