//! Awakening: resonance matching and initial belief generation.

use super::{EPSILON, RESONANCE_THRESHOLD};
use sk_protocol::agent_models::AttractorBias;
use sk_protocol::quaternion::Quaternion;
use sk_protocol::runtime_models::Belief;
use std::collections::BTreeSet;

/// Resonance strength between a candidate key and the body basis.
///
/// Primary score is the Jaccard overlap of the two integer sets. When the
/// intersection is empty the harmonic fallback applies: the mean of
/// `1 / (1 + |key mod basis - basis/2|)` over all pairs, capped at 0.5.
/// The fallback shape is a replicated heuristic; do not re-derive it.
pub fn resonance_strength(key: &[u64], basis: &[u64]) -> f64 {
    let key_set: BTreeSet<u64> = key.iter().copied().collect();
    let basis_set: BTreeSet<u64> = basis.iter().copied().collect();
    if key_set.is_empty() || basis_set.is_empty() {
        return 0.0;
    }

    let intersection = key_set.intersection(&basis_set).count();
    if intersection > 0 {
        let union = key_set.union(&basis_set).count();
        return intersection as f64 / union as f64;
    }

    harmonic_score(&key_set, &basis_set)
}

fn harmonic_score(key: &BTreeSet<u64>, basis: &BTreeSet<u64>) -> f64 {
    let mut sum = 0.0;
    let mut pairs = 0usize;
    for &k in key {
        for &b in basis {
            let half = b as f64 / 2.0;
            let distance = ((k % b) as f64 - half).abs();
            sum += 1.0 / (1.0 + distance);
            pairs += 1;
        }
    }
    if pairs == 0 {
        return 0.0;
    }
    (sum / pairs as f64).min(0.5)
}

/// Whether a resonance strength clears the activation threshold.
pub fn clears_threshold(strength: f64) -> bool {
    strength >= RESONANCE_THRESHOLD
}

/// Initial beliefs for a fresh session.
///
/// One belief per preferred basis element (weighted by the per-element bias
/// multiplier) plus a default "ready" belief, normalized to a probability
/// distribution.
pub fn initial_beliefs(biases: &AttractorBias) -> Vec<Belief> {
    let mut beliefs = Vec::with_capacity(biases.preferred.len() + 1);

    for &element in &biases.preferred {
        let weight = biases.weights.get(&element).copied().unwrap_or(1.0);
        beliefs.push(Belief {
            label: format!("attracted:{element}"),
            probability: weight.max(EPSILON),
            basis: vec![element],
            entropy: 0.5,
            orientation: Quaternion::identity(),
        });
    }

    beliefs.push(Belief {
        label: "ready".to_string(),
        probability: 1.0,
        basis: Vec::new(),
        entropy: 0.3,
        orientation: Quaternion::identity(),
    });

    normalize_beliefs(&mut beliefs);
    beliefs
}

/// Rescale probabilities so they sum to 1. A degenerate all-zero set
/// collapses to a uniform distribution.
pub fn normalize_beliefs(beliefs: &mut [Belief]) {
    if beliefs.is_empty() {
        return;
    }
    let total: f64 = beliefs.iter().map(|b| b.probability.max(0.0)).sum();
    if total < EPSILON {
        let uniform = 1.0 / beliefs.len() as f64;
        for belief in beliefs.iter_mut() {
            belief.probability = uniform;
        }
        return;
    }
    for belief in beliefs.iter_mut() {
        belief.probability = belief.probability.max(0.0) / total;
    }
}
