//! The per-agent engine.
//!
//! An `Engine` owns exactly one agent's body basis, phase memory,
//! quaternion, epoch counter, and append-only beacon log, plus the
//! ephemeral session while summoned. It sequences the pure lifecycle
//! functions; it performs no I/O and emits no events itself (managers and
//! runners do that).
//!
//! `full_step` is not reentrant: concurrent calls on the same engine are
//! unsafe and must be serialized by the caller. The managers wrap each
//! cached engine in a `tokio::sync::Mutex` for exactly this reason.

pub mod session;

use crate::error::EngineError;
use crate::lifecycle::transitions::{transition, LifecycleEvent};
use crate::lifecycle::{awaken, consolidate, decide, learn, perceive};
use serde::{Deserialize, Serialize};
use session::Session;
use sk_protocol::action_models::CandidateAction;
use sk_protocol::agent_models::AgentDefinition;
use sk_protocol::layer::Layer;
use sk_protocol::quaternion::Quaternion;
use sk_protocol::runtime_models::{
    ActionRecord, Beacon, DismissOutcome, EngineSnapshot, LifecycleState, StepOutcome,
    SummonOutcome,
};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::debug;

/// How long a cached per-layer activation stays valid.
const ACTIVATION_TTL: Duration = Duration::from_secs(60);

/// Options accepted by [`Engine::summon`].
#[derive(Debug, Clone, Default)]
pub struct SummonOptions {
    /// Integer set compared against the body basis to gate activation.
    /// Defaults to the body basis itself, which always resonates fully.
    pub resonance_key: Option<Vec<u64>>,

    /// Observation perceived immediately after awakening.
    pub initial_context: Option<String>,
}

/// Compact status view returned by `state()` pass-throughs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineStatus {
    pub definition_id: uuid::Uuid,
    pub state: LifecycleState,
    pub epoch: u64,
    pub actions_recorded: u64,
    pub beacon_count: usize,
    pub session_steps: usize,
}

#[derive(Debug, Clone, Copy)]
struct CachedActivation {
    value: f64,
    at: Instant,
}

/// Stateful runtime for one agent.
#[derive(Debug)]
pub struct Engine {
    definition: AgentDefinition,
    state: LifecycleState,
    memory: HashMap<u64, VecDeque<f64>>,
    quaternion: Quaternion,
    epoch: u64,
    actions_recorded: u64,
    beacons: Vec<Beacon>,
    session: Option<Session>,
    activation_cache: HashMap<Layer, CachedActivation>,
}

impl Engine {
    /// Build an engine from a definition. Construction parameters are a
    /// value type: a changed definition means discarding this engine and
    /// building a new one with fresh default memory, never mutating in
    /// place.
    pub fn new(definition: AgentDefinition) -> Result<Self, EngineError> {
        validate_definition(&definition)?;
        Ok(Self {
            definition,
            state: LifecycleState::Dormant,
            memory: HashMap::new(),
            quaternion: Quaternion::identity(),
            epoch: 0,
            actions_recorded: 0,
            beacons: Vec::new(),
            session: None,
            activation_cache: HashMap::new(),
        })
    }

    /// Restore an engine from a snapshot. The restored engine is dormant;
    /// session state never survives.
    pub fn restore(
        definition: AgentDefinition,
        snapshot: EngineSnapshot,
    ) -> Result<Self, EngineError> {
        if snapshot.definition_id != definition.id {
            return Err(EngineError::InvalidDefinition(format!(
                "snapshot belongs to {}, not {}",
                snapshot.definition_id, definition.id
            )));
        }
        if snapshot.body_basis != definition.body_basis {
            return Err(EngineError::InvalidDefinition(
                "snapshot basis differs from definition basis".to_string(),
            ));
        }
        let mut engine = Self::new(definition)?;
        engine.memory = snapshot
            .memory
            .into_iter()
            .map(|(k, v)| (k, v.into_iter().collect()))
            .collect();
        engine.quaternion = snapshot.quaternion;
        engine.epoch = snapshot.epoch;
        engine.actions_recorded = snapshot.actions_recorded;
        engine.beacons = snapshot.beacons;
        Ok(engine)
    }

    /// Serializable snapshot of the durable runtime state.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            definition_id: self.definition.id,
            body_basis: self.definition.body_basis.clone(),
            memory: self
                .memory
                .iter()
                .map(|(&k, v)| (k, v.iter().copied().collect()))
                .collect(),
            quaternion: self.quaternion,
            epoch: self.epoch,
            actions_recorded: self.actions_recorded,
            beacons: self.beacons.clone(),
        }
    }

    /// Activate the agent.
    ///
    /// Succeeds only when the resonance key scores at least the activation
    /// threshold against the body basis. On failure the engine stays
    /// dormant with zero state mutation and reports the numeric strength
    /// for retry tuning. On success the engine runs through awakening into
    /// `Perceiving` with a fresh session.
    pub fn summon(&mut self, options: SummonOptions) -> Result<SummonOutcome, EngineError> {
        if self.state != LifecycleState::Dormant {
            return Err(EngineError::InvalidState {
                op: "summon",
                state: self.state,
            });
        }

        let key = options
            .resonance_key
            .unwrap_or_else(|| self.definition.body_basis.clone());
        let strength = awaken::resonance_strength(&key, &self.definition.body_basis);
        if !awaken::clears_threshold(strength) {
            return Err(EngineError::ResonanceTooWeak {
                strength,
                threshold: crate::lifecycle::RESONANCE_THRESHOLD,
            });
        }

        self.state = transition(self.state, LifecycleEvent::Summon)?;

        let beliefs = awaken::initial_beliefs(&self.definition.biases);
        let attention = perceive::initial_attention(
            &self.definition.perception.input_layers,
            self.definition.perception.attention_span,
        );
        let mut session = Session::new(beliefs, attention);

        // The awakening percept primes attention and the percept slot but
        // does not count towards the entropy trajectory.
        if let Some(context) = options.initial_context {
            let percept = perceive::perceive(
                &context,
                &self.definition.perception.input_layers,
                &session.attention,
                &self.definition.body_basis,
            );
            session.last_percept = Some(percept);
        }

        self.state = transition(self.state, LifecycleEvent::Percept)?;
        let outcome = SummonOutcome {
            session_id: session.id,
            resonance_strength: strength,
            state: self.state,
            beliefs: session.beliefs.clone(),
        };
        self.session = Some(session);

        debug!(
            agent = %self.definition.name,
            strength,
            "summoned"
        );
        Ok(outcome)
    }

    /// Run one perceive -> decide -> act -> learn cycle as a single logical
    /// unit. Legal only while the engine rests in `Perceiving`.
    pub fn full_step(
        &mut self,
        observation: &str,
        candidates: &[CandidateAction],
    ) -> Result<StepOutcome, EngineError> {
        if self.state != LifecycleState::Perceiving {
            return Err(EngineError::InvalidState {
                op: "full_step",
                state: self.state,
            });
        }
        let definition = &self.definition;
        let session = self
            .session
            .as_mut()
            .ok_or(EngineError::InvalidState {
                op: "full_step",
                state: LifecycleState::Dormant,
            })?;

        // Perceive.
        let percept = perceive::perceive(
            observation,
            &definition.perception.input_layers,
            &session.attention,
            &definition.body_basis,
        );
        let mean_magnitude = if percept.layers.is_empty() {
            0.0
        } else {
            percept.layers.iter().map(|lp| lp.magnitude).sum::<f64>()
                / percept.layers.len() as f64
        };
        let active: Vec<Layer> = percept
            .layers
            .iter()
            .filter(|lp| lp.magnitude >= mean_magnitude)
            .map(|lp| lp.layer)
            .collect();
        perceive::update_attention(&mut session.attention, &active);

        let dominant = percept
            .dominant_percept()
            .cloned()
            .unwrap_or(sk_protocol::runtime_models::LayerPercept {
                layer: percept.dominant,
                phases: Vec::new(),
                basis: Vec::new(),
                magnitude: 0.0,
            });
        let entropy = perceive::phase_entropy(&dominant.phases);
        session.entropy_trajectory.push(entropy);

        // Decide.
        self.state = transition(self.state, LifecycleEvent::Decide)?;
        let decision = decide::decide(
            candidates,
            &session.beliefs,
            percept.dominant,
            &definition.dynamics,
            &definition.goals,
            &definition.safety,
        )?;

        // Act: record the selection and settle beliefs.
        self.state = transition(self.state, LifecycleEvent::Act)?;
        session.action_history.push(ActionRecord {
            kind: decision.action.kind,
            free_energy: decision.free_energy,
            taken_at: chrono::Utc::now(),
        });
        self.actions_recorded += 1;
        decide::settle_beliefs(
            &mut session.beliefs,
            &decision,
            &dominant.basis,
            &definition.dynamics,
        );

        // Learn.
        self.state = transition(self.state, LifecycleEvent::Learn)?;
        learn::record_phases(&mut self.memory, &dominant);
        let target = decision.action.target_layer.unwrap_or(percept.dominant);
        let entropy_term = decision.action.entropy_cost * target.params().entropy_weight;
        let previous = session.last_free_energy.unwrap_or(0.0);
        self.quaternion =
            learn::update_quaternion(self.quaternion, entropy_term, previous, &dominant.phases);
        session.last_free_energy = Some(decision.free_energy);

        let new_epoch = learn::epoch_for(self.actions_recorded);
        if new_epoch > self.epoch {
            self.epoch = new_epoch;
            let beacon = consolidate::beacon(
                self.epoch,
                &definition.body_basis,
                self.quaternion,
                &self.memory,
                &session.entropy_trajectory,
                &session.beliefs,
            );
            self.beacons.push(beacon);
        }

        let activation = session
            .attention
            .get(&percept.dominant)
            .copied()
            .unwrap_or(0.0)
            * dominant.magnitude;
        cache_activation(&mut self.activation_cache, percept.dominant, activation);
        session.last_percept = Some(percept.clone());

        // Back to perceiving for the next step.
        self.state = transition(self.state, LifecycleEvent::Percept)?;

        Ok(StepOutcome {
            percept,
            decision,
            entropy,
            epoch: self.epoch,
            state: self.state,
        })
    }

    /// End the session: consolidate, emit a beacon, clear the session, and
    /// return to dormant. A second dismiss without an intervening summon is
    /// an `InvalidState` error.
    pub fn dismiss(&mut self) -> Result<DismissOutcome, EngineError> {
        // Legal early-exit from perceiving/deciding; anything else errors.
        if !matches!(
            self.state,
            LifecycleState::Perceiving | LifecycleState::Deciding
        ) {
            return Err(EngineError::InvalidState {
                op: "dismiss",
                state: self.state,
            });
        }
        self.state = transition(self.state, LifecycleEvent::Sleep)?;

        let session = self.session.take().ok_or(EngineError::InvalidState {
            op: "dismiss",
            state: self.state,
        })?;

        let beacon = consolidate::beacon(
            self.epoch,
            &self.definition.body_basis,
            self.quaternion,
            &self.memory,
            &session.entropy_trajectory,
            &session.beliefs,
        );
        self.beacons.push(beacon.clone());

        self.state = transition(self.state, LifecycleEvent::Sleep)?;
        self.state = transition(self.state, LifecycleEvent::Wake)?;

        debug!(agent = %self.definition.name, "dismissed");
        Ok(DismissOutcome {
            beacon,
            state: self.state,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Compact status for pass-through queries.
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            definition_id: self.definition.id,
            state: self.state,
            epoch: self.epoch,
            actions_recorded: self.actions_recorded,
            beacon_count: self.beacons.len(),
            session_steps: self
                .session
                .as_ref()
                .map(|s| s.entropy_trajectory.len())
                .unwrap_or(0),
        }
    }

    pub fn definition(&self) -> &AgentDefinition {
        &self.definition
    }

    pub fn quaternion(&self) -> Quaternion {
        self.quaternion
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Append-only beacon log.
    pub fn beacons(&self) -> &[Beacon] {
        &self.beacons
    }

    /// The live session, while summoned.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub(crate) fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    /// Cached activation for a layer, if recorded within the last 60s.
    pub fn layer_activation(&self, layer: Layer) -> Option<f64> {
        self.activation_cache
            .get(&layer)
            .filter(|c| c.at.elapsed() < ACTIVATION_TTL)
            .map(|c| c.value)
    }
}

fn cache_activation(cache: &mut HashMap<Layer, CachedActivation>, layer: Layer, value: f64) {
    cache.retain(|_, c| c.at.elapsed() < ACTIVATION_TTL);
    cache.insert(
        layer,
        CachedActivation {
            value,
            at: Instant::now(),
        },
    );
}

pub(crate) fn validate_definition(definition: &AgentDefinition) -> Result<(), EngineError> {
    if definition.body_basis.is_empty() {
        return Err(EngineError::InvalidDefinition(
            "body basis must not be empty".to_string(),
        ));
    }
    if definition.body_basis.iter().any(|&b| b == 0) {
        return Err(EngineError::InvalidDefinition(
            "body basis elements must be positive".to_string(),
        ));
    }
    let mut seen = std::collections::BTreeSet::new();
    for &element in &definition.body_basis {
        if !seen.insert(element) {
            return Err(EngineError::InvalidDefinition(format!(
                "duplicate basis element {element}"
            )));
        }
    }
    if definition.perception.input_layers.is_empty() {
        return Err(EngineError::InvalidDefinition(
            "at least one input layer is required".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sk_protocol::action_models::{ActionKind, CandidateAction};

    fn definition() -> AgentDefinition {
        AgentDefinition::new("test-agent", vec![2, 3, 5, 7, 11, 13, 17])
    }

    fn menu() -> Vec<CandidateAction> {
        vec![
            CandidateAction::new(ActionKind::Query, "ask", 0.2),
            CandidateAction::new(ActionKind::Response, "answer", 0.5),
            CandidateAction::new(ActionKind::Wait, "idle", 0.0),
        ]
    }

    #[test]
    fn test_new_rejects_empty_basis() {
        let err = Engine::new(AgentDefinition::new("bad", vec![])).unwrap_err();
        assert!(matches!(err, EngineError::InvalidDefinition(_)));
    }

    #[test]
    fn test_new_rejects_duplicate_basis() {
        let err = Engine::new(AgentDefinition::new("bad", vec![2, 3, 2])).unwrap_err();
        assert!(matches!(err, EngineError::InvalidDefinition(_)));
    }

    #[test]
    fn test_summon_default_key_reaches_perceiving() {
        let mut engine = Engine::new(definition()).unwrap();
        let outcome = engine.summon(SummonOptions::default()).unwrap();
        assert!((outcome.resonance_strength - 1.0).abs() < 1e-12);
        assert_eq!(engine.state(), LifecycleState::Perceiving);

        let total: f64 = outcome.beliefs.iter().map(|b| b.probability).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_summon_weak_key_mutates_nothing() {
        let mut engine = Engine::new(definition()).unwrap();
        let before = engine.snapshot();
        // One shared element out of ten in the union: Jaccard lands at 0.1.
        let err = engine
            .summon(SummonOptions {
                resonance_key: Some(vec![2, 1001, 1002, 1003]),
                initial_context: None,
            })
            .unwrap_err();
        match err {
            EngineError::ResonanceTooWeak { strength, .. } => assert!(strength < 0.2),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(engine.state(), LifecycleState::Dormant);
        assert_eq!(engine.snapshot(), before);
        assert!(engine.session().is_none());
    }

    #[test]
    fn test_double_summon_fails() {
        let mut engine = Engine::new(definition()).unwrap();
        engine.summon(SummonOptions::default()).unwrap();
        let err = engine.summon(SummonOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { op: "summon", .. }));
    }

    #[test]
    fn test_full_step_requires_summon() {
        let mut engine = Engine::new(definition()).unwrap();
        let err = engine.full_step("hello", &menu()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { .. }));
    }

    #[test]
    fn test_full_step_outcome() {
        let mut engine = Engine::new(definition()).unwrap();
        engine.summon(SummonOptions::default()).unwrap();
        let outcome = engine.full_step("hello", &menu()).unwrap();

        assert!(outcome.decision.free_energy.is_finite());
        assert!(menu().iter().any(|c| c.kind == outcome.decision.action.kind));
        assert_eq!(outcome.state, LifecycleState::Perceiving);

        let session = engine.session().unwrap();
        assert_eq!(session.entropy_trajectory.len(), 1);
        assert_eq!(session.action_history.len(), 1);
    }

    #[test]
    fn test_beliefs_remain_distribution_after_learning() {
        let mut engine = Engine::new(definition()).unwrap();
        engine.summon(SummonOptions::default()).unwrap();
        for i in 0..5 {
            engine.full_step(&format!("observation {i}"), &menu()).unwrap();
            let total: f64 = engine
                .session()
                .unwrap()
                .beliefs
                .iter()
                .map(|b| b.probability)
                .sum();
            assert!((total - 1.0).abs() < 1e-9, "step {i}: sum {total}");
        }
    }

    #[test]
    fn test_quaternion_unit_after_every_learn() {
        let mut engine = Engine::new(definition()).unwrap();
        engine.summon(SummonOptions::default()).unwrap();
        for i in 0..12 {
            engine.full_step(&format!("obs {i}"), &menu()).unwrap();
            assert!((engine.quaternion().norm() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_epoch_advances_after_ten_steps() {
        let mut engine = Engine::new(definition()).unwrap();
        engine.summon(SummonOptions::default()).unwrap();
        for i in 0..9 {
            let outcome = engine.full_step("obs", &menu()).unwrap();
            assert_eq!(outcome.epoch, 0, "epoch advanced early at step {i}");
        }
        let outcome = engine.full_step("obs", &menu()).unwrap();
        assert_eq!(outcome.epoch, 1);
        // Epoch rollover appended a beacon.
        assert_eq!(engine.beacons().len(), 1);
    }

    #[test]
    fn test_memory_never_exceeds_cap() {
        let mut engine = Engine::new(definition()).unwrap();
        engine.summon(SummonOptions::default()).unwrap();
        for i in 0..20 {
            engine
                .full_step(&format!("a fairly long observation number {i}"), &menu())
                .unwrap();
        }
        for phases in engine.snapshot().memory.values() {
            assert!(phases.len() <= crate::lifecycle::MEMORY_CAP);
        }
    }

    #[test]
    fn test_dismiss_emits_beacon_and_double_dismiss_fails() {
        let mut engine = Engine::new(definition()).unwrap();
        engine.summon(SummonOptions::default()).unwrap();
        engine.full_step("hello", &menu()).unwrap();

        let outcome = engine.dismiss().unwrap();
        assert_eq!(outcome.state, LifecycleState::Dormant);
        assert!(!outcome.beacon.fingerprint.is_empty());
        assert_eq!(engine.state(), LifecycleState::Dormant);
        assert!(engine.session().is_none());

        let err = engine.dismiss().unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { .. }));
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let def = definition();
        let mut engine = Engine::new(def.clone()).unwrap();
        engine.summon(SummonOptions::default()).unwrap();
        for i in 0..11 {
            engine.full_step(&format!("obs {i}"), &menu()).unwrap();
        }
        engine.dismiss().unwrap();

        let snapshot = engine.snapshot();
        let restored = Engine::restore(def, snapshot.clone()).unwrap();
        assert_eq!(restored.state(), LifecycleState::Dormant);
        assert_eq!(restored.snapshot(), snapshot);
    }

    #[test]
    fn test_restore_rejects_foreign_snapshot() {
        let mut engine = Engine::new(definition()).unwrap();
        engine.summon(SummonOptions::default()).unwrap();
        let snapshot = engine.snapshot();

        let other = AgentDefinition::new("other", vec![2, 3, 5, 7, 11, 13, 17]);
        let err = Engine::restore(other, snapshot).unwrap_err();
        assert!(matches!(err, EngineError::InvalidDefinition(_)));
    }

    #[test]
    fn test_activation_cache_populated_by_step() {
        let mut engine = Engine::new(definition()).unwrap();
        engine.summon(SummonOptions::default()).unwrap();
        let outcome = engine.full_step("hello world", &menu()).unwrap();
        assert!(engine.layer_activation(outcome.percept.dominant).is_some());
    }
}
