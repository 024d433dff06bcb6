//! Ephemeral session state, one per active summon.

use chrono::{DateTime, Utc};
use sk_protocol::layer::Layer;
use sk_protocol::runtime_models::{ActionRecord, Belief, Percept};
use std::collections::HashMap;
use uuid::Uuid;

/// Per-summon state. Created by `summon`, destroyed by `dismiss`; never
/// serialized with the engine snapshot.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,

    /// Current belief distribution: non-negative, sums to 1.
    pub beliefs: Vec<Belief>,

    /// Per-layer attention weights, renormalized after every perception.
    pub attention: HashMap<Layer, f64>,

    /// Append-only entropy history, one entry per full step.
    pub entropy_trajectory: Vec<f64>,

    /// Actions taken during this session, oldest first.
    pub action_history: Vec<ActionRecord>,

    /// Free energy of the most recent decision.
    pub last_free_energy: Option<f64>,

    /// Most recent percept (including the one taken at summon time).
    pub last_percept: Option<Percept>,
}

impl Session {
    pub fn new(beliefs: Vec<Belief>, attention: HashMap<Layer, f64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            beliefs,
            attention,
            entropy_trajectory: Vec::new(),
            action_history: Vec::new(),
            last_free_energy: None,
            last_percept: None,
        }
    }
}
