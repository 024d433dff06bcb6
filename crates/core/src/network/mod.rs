//! Multi-agent belief-propagating networks.
//!
//! A network composes 2..N engines without merging their private memories.
//! Link computation only reads member quaternions and bases; belief
//! propagation writes only into the *receiving* member's own session.

use crate::engine::{Engine, SummonOptions};
use crate::error::{EngineError, NetworkError};
use crate::lifecycle::awaken;
use sha2::{Digest, Sha256};
use sk_protocol::action_models::{ActionKind, CandidateAction, Decision};
use sk_protocol::agent_models::{DecisionMode, NetworkConfig};
use sk_protocol::runtime_models::{Belief, DismissOutcome, StepOutcome, SummonOutcome};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// The union identity of a network.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorBody {
    /// Sorted union of all member bases.
    pub basis_union: Vec<u64>,

    /// Member count.
    pub rank: usize,

    /// Stable SHA-256 hex digest of the sorted union.
    pub fingerprint: String,
}

/// Resonance between one pair of members.
#[derive(Debug, Clone, PartialEq)]
pub struct ResonanceLink {
    pub a: Uuid,
    pub b: Uuid,

    /// Configured coupling strength.
    pub coupling: f64,

    /// Quaternion alignment of the two members, in [0, 1].
    pub phase_alignment: f64,

    /// Intersection of the two bases.
    pub basis_overlap: Vec<u64>,

    /// Harmonic mean of the overlapping elements; 0 when disjoint.
    pub resonance_frequency: f64,
}

/// Per-member result of a fan-out operation. One member's failure never
/// aborts the others.
#[derive(Debug)]
pub struct MemberReport<T> {
    pub agent_id: Uuid,
    pub result: Result<T, EngineError>,
}

/// Result of one collective step.
#[derive(Debug)]
pub struct CollectiveOutcome {
    /// The merged network-level decision.
    pub decision: Decision,

    pub mode: DecisionMode,

    /// Each member's independent step result.
    pub members: Vec<MemberReport<StepOutcome>>,

    /// Pairwise links at the time of the step.
    pub links: Vec<ResonanceLink>,
}

struct Member {
    id: Uuid,
    engine: Arc<Mutex<Engine>>,
}

/// Ephemeral runtime composition of a team.
pub struct AgentNetwork {
    members: Vec<Member>,
    config: NetworkConfig,
    tensor: TensorBody,
}

impl AgentNetwork {
    /// Compose a network over already-built engines.
    pub async fn new(
        engines: Vec<Arc<Mutex<Engine>>>,
        config: NetworkConfig,
    ) -> Result<Self, NetworkError> {
        if engines.len() < 2 {
            return Err(NetworkError::TooFewMembers(engines.len()));
        }

        let mut members = Vec::with_capacity(engines.len());
        let mut union: BTreeSet<u64> = BTreeSet::new();
        for engine in engines {
            let (id, basis) = {
                let guard = engine.lock().await;
                (
                    guard.definition().id,
                    guard.definition().body_basis.clone(),
                )
            };
            union.extend(basis);
            members.push(Member { id, engine });
        }

        let basis_union: Vec<u64> = union.into_iter().collect();
        let mut hasher = Sha256::new();
        for &element in &basis_union {
            hasher.update(element.to_be_bytes());
        }
        let tensor = TensorBody {
            rank: members.len(),
            fingerprint: format!("{:x}", hasher.finalize()),
            basis_union,
        };

        Ok(Self {
            members,
            config,
            tensor,
        })
    }

    pub fn tensor(&self) -> &TensorBody {
        &self.tensor
    }

    pub fn member_ids(&self) -> Vec<Uuid> {
        self.members.iter().map(|m| m.id).collect()
    }

    /// Current pairwise resonance links.
    pub async fn links(&self) -> Vec<ResonanceLink> {
        let mut states = Vec::with_capacity(self.members.len());
        for member in &self.members {
            let guard = member.engine.lock().await;
            states.push((
                member.id,
                guard.definition().body_basis.clone(),
                guard.quaternion(),
            ));
        }

        let mut links = Vec::new();
        for i in 0..states.len() {
            for j in (i + 1)..states.len() {
                let (id_a, ref basis_a, quat_a) = states[i];
                let (id_b, ref basis_b, quat_b) = states[j];
                let set_a: BTreeSet<u64> = basis_a.iter().copied().collect();
                let overlap: Vec<u64> = basis_b
                    .iter()
                    .copied()
                    .filter(|b| set_a.contains(b))
                    .collect();
                links.push(ResonanceLink {
                    a: id_a,
                    b: id_b,
                    coupling: self.config.coupling_strength,
                    phase_alignment: quat_a.alignment(quat_b),
                    resonance_frequency: harmonic_frequency(&overlap),
                    basis_overlap: overlap,
                });
            }
        }
        links
    }

    /// Summon every member independently; partial failures are reported
    /// per agent.
    pub async fn summon_all(&self, options: SummonOptions) -> Vec<MemberReport<SummonOutcome>> {
        let mut reports = Vec::with_capacity(self.members.len());
        for member in &self.members {
            let mut engine = member.engine.lock().await;
            let result = engine.summon(options.clone());
            reports.push(MemberReport {
                agent_id: member.id,
                result,
            });
        }
        reports
    }

    /// Dismiss every member independently.
    pub async fn dismiss_all(&self) -> Vec<MemberReport<DismissOutcome>> {
        let mut reports = Vec::with_capacity(self.members.len());
        for member in &self.members {
            let mut engine = member.engine.lock().await;
            reports.push(MemberReport {
                agent_id: member.id,
                result: engine.dismiss(),
            });
        }
        reports
    }

    /// Broadcast one observation to all members, let each decide
    /// independently, propagate beliefs pairwise, and merge the decisions
    /// per the configured mode.
    pub async fn collective_step(
        &self,
        observation: &str,
        candidates: &[CandidateAction],
    ) -> Result<CollectiveOutcome, NetworkError> {
        let mut reports = Vec::with_capacity(self.members.len());
        for member in &self.members {
            let mut engine = member.engine.lock().await;
            let result = engine.full_step(observation, candidates);
            reports.push(MemberReport {
                agent_id: member.id,
                result,
            });
        }

        if self.config.propagate_beliefs {
            self.propagate_beliefs(&reports).await;
        }

        let decided: Vec<(Uuid, &StepOutcome)> = reports
            .iter()
            .filter_map(|r| r.result.as_ref().ok().map(|o| (r.agent_id, o)))
            .collect();
        if decided.is_empty() {
            return Err(NetworkError::CollectiveStep(
                "no member produced a decision".to_string(),
            ));
        }

        let decision = merge_decisions(
            &decided,
            self.config.decision_mode,
            self.config.consensus_threshold,
        );
        debug!(
            mode = ?self.config.decision_mode,
            kind = %decision.action.kind,
            "collective step merged"
        );

        Ok(CollectiveOutcome {
            decision,
            mode: self.config.decision_mode,
            links: self.links().await,
            members: reports,
        })
    }

    /// Pairwise propagation: each successful member's beliefs are written,
    /// attenuated by coupling x propagation rate, into every *other*
    /// successful member's session.
    async fn propagate_beliefs(&self, reports: &[MemberReport<StepOutcome>]) {
        let succeeded: Vec<Uuid> = reports
            .iter()
            .filter(|r| r.result.is_ok())
            .map(|r| r.agent_id)
            .collect();
        if succeeded.len() < 2 {
            return;
        }
        let attenuation = self.config.coupling_strength * self.config.propagation_rate;

        // Snapshot sender beliefs first so propagation is order-independent.
        let mut snapshots: HashMap<Uuid, Vec<Belief>> = HashMap::new();
        for member in &self.members {
            if !succeeded.contains(&member.id) {
                continue;
            }
            let engine = member.engine.lock().await;
            if let Some(session) = engine.session() {
                snapshots.insert(member.id, session.beliefs.clone());
            }
        }

        for receiver in &self.members {
            if !snapshots.contains_key(&receiver.id) {
                continue;
            }
            let mut engine = receiver.engine.lock().await;
            let Some(session) = engine.session_mut() else {
                continue;
            };
            for (&sender_id, sender_beliefs) in &snapshots {
                if sender_id == receiver.id {
                    continue;
                }
                for belief in sender_beliefs {
                    let incoming = belief.probability * attenuation;
                    if incoming <= 0.0 {
                        continue;
                    }
                    match session
                        .beliefs
                        .iter_mut()
                        .find(|b| b.label == belief.label)
                    {
                        Some(existing) => existing.probability += incoming,
                        None => {
                            let mut propagated = belief.clone();
                            propagated.probability = incoming;
                            session.beliefs.push(propagated);
                        }
                    }
                }
            }
            awaken::normalize_beliefs(&mut session.beliefs);
        }
    }
}

fn harmonic_frequency(overlap: &[u64]) -> f64 {
    if overlap.is_empty() {
        return 0.0;
    }
    let reciprocal_sum: f64 = overlap.iter().map(|&b| 1.0 / b as f64).sum();
    overlap.len() as f64 / reciprocal_sum
}

fn merge_decisions(
    decided: &[(Uuid, &StepOutcome)],
    mode: DecisionMode,
    consensus_threshold: f64,
) -> Decision {
    match mode {
        DecisionMode::Competitive => decided
            .iter()
            .map(|(_, o)| &o.decision)
            .min_by(|a, b| a.free_energy.total_cmp(&b.free_energy))
            .cloned()
            .unwrap_or_else(|| decided[0].1.decision.clone()),
        DecisionMode::Dominant => dominant_decision(decided),
        DecisionMode::Consensus => {
            let mut votes: HashMap<ActionKind, usize> = HashMap::new();
            for (_, outcome) in decided {
                *votes.entry(outcome.decision.action.kind).or_insert(0) += 1;
            }
            let needed = (decided.len() as f64 * consensus_threshold).ceil() as usize;
            let winner = votes
                .iter()
                .filter(|(_, &count)| count >= needed.max(1))
                .max_by_key(|(_, &count)| count)
                .map(|(&kind, _)| kind);
            match winner {
                Some(kind) => decided
                    .iter()
                    .map(|(_, o)| &o.decision)
                    .filter(|d| d.action.kind == kind)
                    .min_by(|a, b| a.free_energy.total_cmp(&b.free_energy))
                    .cloned()
                    .unwrap_or_else(|| dominant_decision(decided)),
                // No majority: fall back to dominant.
                None => dominant_decision(decided),
            }
        }
        DecisionMode::Average => {
            // Mean confidence per kind across members; the winning kind's
            // lowest-energy decision represents the collective.
            let mut sums: HashMap<ActionKind, (f64, usize)> = HashMap::new();
            for (_, outcome) in decided {
                for (&kind, &score) in &outcome.decision.confidence {
                    let entry = sums.entry(kind).or_insert((0.0, 0));
                    entry.0 += score;
                    entry.1 += 1;
                }
            }
            let winner = sums
                .iter()
                .map(|(&kind, &(sum, n))| (kind, sum / n as f64))
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(kind, _)| kind);
            match winner {
                Some(kind) => decided
                    .iter()
                    .map(|(_, o)| &o.decision)
                    .filter(|d| d.action.kind == kind)
                    .min_by(|a, b| a.free_energy.total_cmp(&b.free_energy))
                    .cloned()
                    .unwrap_or_else(|| dominant_decision(decided)),
                None => dominant_decision(decided),
            }
        }
    }
}

fn dominant_decision(decided: &[(Uuid, &StepOutcome)]) -> Decision {
    decided
        .iter()
        .map(|(_, o)| &o.decision)
        .max_by(|a, b| {
            let conf_a = a.confidence.get(&a.action.kind).copied().unwrap_or(0.0);
            let conf_b = b.confidence.get(&b.action.kind).copied().unwrap_or(0.0);
            conf_a.total_cmp(&conf_b)
        })
        .cloned()
        .unwrap_or_else(|| decided[0].1.decision.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sk_protocol::agent_models::AgentDefinition;

    async fn network_of(bases: &[Vec<u64>]) -> AgentNetwork {
        let engines: Vec<Arc<Mutex<Engine>>> = bases
            .iter()
            .enumerate()
            .map(|(i, basis)| {
                let def = AgentDefinition::new(format!("member-{i}"), basis.clone());
                Arc::new(Mutex::new(Engine::new(def).unwrap()))
            })
            .collect();
        AgentNetwork::new(engines, NetworkConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_single_member_rejected() {
        let def = AgentDefinition::new("solo", vec![2, 3]);
        let engines = vec![Arc::new(Mutex::new(Engine::new(def).unwrap()))];
        let err = AgentNetwork::new(engines, NetworkConfig::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, NetworkError::TooFewMembers(1)));
    }

    #[tokio::test]
    async fn test_tensor_body_is_sorted_union() {
        let network = network_of(&[vec![5, 2, 7], vec![3, 5, 11]]).await;
        assert_eq!(network.tensor().basis_union, vec![2, 3, 5, 7, 11]);
        assert_eq!(network.tensor().rank, 2);
        assert!(!network.tensor().fingerprint.is_empty());
    }

    #[tokio::test]
    async fn test_links_carry_overlap() {
        let network = network_of(&[vec![2, 3, 5], vec![5, 7, 11], vec![2, 5, 13]]).await;
        let links = network.links().await;
        // Three members, three pairs.
        assert_eq!(links.len(), 3);
        for link in &links {
            assert!(!link.basis_overlap.is_empty());
            assert!(link.resonance_frequency > 0.0);
            assert!((0.0..=1.0).contains(&link.phase_alignment));
        }
    }

    #[tokio::test]
    async fn test_harmonic_frequency() {
        // Harmonic mean of {2, 5}: 2 / (1/2 + 1/5) = 20/7.
        assert!((harmonic_frequency(&[2, 5]) - 20.0 / 7.0).abs() < 1e-12);
        assert_eq!(harmonic_frequency(&[]), 0.0);
    }

    #[tokio::test]
    async fn test_summon_all_partial_failure() {
        let network = network_of(&[vec![2, 3, 5], vec![3, 5, 7, 11, 13, 17]]).await;
        // Jaccard 2/3 for the first member, 1/7 for the second.
        let reports = network
            .summon_all(SummonOptions {
                resonance_key: Some(vec![2, 3]),
                initial_context: None,
            })
            .await;
        assert_eq!(reports.len(), 2);
        assert!(reports[0].result.is_ok());
        assert!(matches!(
            reports[1].result,
            Err(EngineError::ResonanceTooWeak { .. })
        ));
    }
}
