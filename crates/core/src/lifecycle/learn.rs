//! Learning: phase memory writes, quaternion updates, epoch accounting.

use super::{EPOCH_PERIOD, MEMORY_CAP};
use sk_protocol::quaternion::Quaternion;
use sk_protocol::runtime_models::LayerPercept;
use std::collections::{HashMap, VecDeque};

/// Append the dominant percept's phases to each touched basis element's
/// memory. Each element holds at most [`MEMORY_CAP`] phases, oldest evicted
/// first.
pub fn record_phases(memory: &mut HashMap<u64, VecDeque<f64>>, dominant: &LayerPercept) {
    for &element in &dominant.basis {
        let slot = memory.entry(element).or_default();
        for &phase in &dominant.phases {
            if slot.len() == MEMORY_CAP {
                slot.pop_front();
            }
            slot.push_back(phase);
        }
    }
}

/// Quaternion delta from the entropy gradient plus small contributions from
/// the first three percept phases, renormalized to unit length.
///
/// The gradient is `entropy_term - previous free energy`: a step that
/// lowered free energy rotates the orientation forward, one that raised it
/// rotates back.
pub fn update_quaternion(
    quaternion: Quaternion,
    entropy_term: f64,
    previous_free_energy: f64,
    phases: &[f64],
) -> Quaternion {
    let gradient = entropy_term - previous_free_energy;
    let dw = gradient * 0.1;
    let dx = phases.first().map(|p| 0.05 * p.sin()).unwrap_or(0.0);
    let dy = phases.get(1).map(|p| 0.05 * p.sin()).unwrap_or(0.0);
    let dz = phases.get(2).map(|p| 0.05 * p.sin()).unwrap_or(0.0);
    quaternion.nudged(dw, dx, dy, dz)
}

/// Epoch for a running count of recorded actions: advances exactly once per
/// [`EPOCH_PERIOD`] actions and never decreases.
pub fn epoch_for(actions_recorded: u64) -> u64 {
    actions_recorded / EPOCH_PERIOD
}
