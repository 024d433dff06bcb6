//! Consolidation: beacon fingerprints and memory summaries at session end.

use chrono::Utc;
use sha2::{Digest, Sha256};
use sk_protocol::quaternion::Quaternion;
use sk_protocol::runtime_models::{Beacon, Belief, MemorySummary};
use std::collections::{HashMap, VecDeque};

/// Summarize phase memory: total phase count, the (up to) three most active
/// basis elements, and the session's entropy reduction (first minus last
/// trajectory value).
pub fn memory_summary(
    memory: &HashMap<u64, VecDeque<f64>>,
    entropy_trajectory: &[f64],
) -> MemorySummary {
    let total_phases = memory.values().map(VecDeque::len).sum();

    let mut by_activity: Vec<(u64, usize)> =
        memory.iter().map(|(&k, v)| (k, v.len())).collect();
    // Count descending, element ascending for a stable order.
    by_activity.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let most_active = by_activity.iter().take(3).map(|(k, _)| *k).collect();

    let entropy_reduction = match (entropy_trajectory.first(), entropy_trajectory.last()) {
        (Some(first), Some(last)) => first - last,
        _ => 0.0,
    };

    MemorySummary {
        total_phases,
        most_active,
        entropy_reduction,
    }
}

/// The (up to) `n` highest-probability beliefs, descending.
pub fn top_beliefs(beliefs: &[Belief], n: usize) -> Vec<Belief> {
    let mut sorted: Vec<Belief> = beliefs.to_vec();
    sorted.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    sorted.truncate(n);
    sorted
}

/// Build the beacon emitted on dismiss or epoch rollover.
///
/// The fingerprint is a SHA-256 hex digest over epoch, body basis,
/// quaternion, per-element phase counts, and the top-3 belief labels with
/// their probabilities. Equal durable state yields an equal fingerprint.
pub fn beacon(
    epoch: u64,
    basis: &[u64],
    quaternion: Quaternion,
    memory: &HashMap<u64, VecDeque<f64>>,
    entropy_trajectory: &[f64],
    beliefs: &[Belief],
) -> Beacon {
    let summary = memory_summary(memory, entropy_trajectory);

    let mut hasher = Sha256::new();
    hasher.update(epoch.to_be_bytes());
    for &element in basis {
        hasher.update(element.to_be_bytes());
    }
    for component in quaternion.to_array() {
        hasher.update(component.to_be_bytes());
    }
    let mut elements: Vec<&u64> = memory.keys().collect();
    elements.sort();
    for element in elements {
        hasher.update(element.to_be_bytes());
        hasher.update((memory[element].len() as u64).to_be_bytes());
    }
    for belief in top_beliefs(beliefs, 3) {
        hasher.update(belief.label.as_bytes());
        hasher.update(belief.probability.to_be_bytes());
    }
    let fingerprint = format!("{:x}", hasher.finalize());

    Beacon {
        fingerprint,
        epoch,
        emitted_at: Utc::now(),
        memory: summary,
        top_beliefs: top_beliefs(beliefs, 5),
    }
}
