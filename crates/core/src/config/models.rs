//! File-facing configuration models.
//!
//! Agent and team YAML files describe definitions without runtime identity;
//! ids and timestamps are assigned when a spec is turned into a definition.

use serde::{Deserialize, Serialize};
use sk_protocol::agent_models::{
    AgentDefinition, AttractorBias, CollapseDynamics, GoalPrior, NetworkConfig, PerceptionConfig,
    SafetyConstraint,
};
use sk_protocol::config_models::GlobalConfig;
use std::collections::HashMap;

/// One `agents/*.yaml` file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AgentSpec {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub body_basis: Vec<u64>,

    #[serde(default)]
    pub perception: Option<PerceptionConfig>,

    #[serde(default)]
    pub goals: Vec<GoalPrior>,

    #[serde(default)]
    pub biases: AttractorBias,

    /// When omitted, the global `[dynamics]` defaults apply.
    #[serde(default)]
    pub dynamics: Option<CollapseDynamics>,

    #[serde(default)]
    pub safety: Vec<SafetyConstraint>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl AgentSpec {
    /// Build a definition with fresh identity, filling omitted sections
    /// from the global defaults.
    pub fn into_definition(self, global: &GlobalConfig) -> AgentDefinition {
        let mut definition = AgentDefinition::new(self.name, self.body_basis);
        definition.description = self.description;
        if let Some(perception) = self.perception {
            definition.perception = perception;
        }
        definition.goals = self.goals;
        definition.biases = self.biases;
        definition.dynamics = self.dynamics.unwrap_or(global.dynamics);
        definition.safety = self.safety;
        definition.metadata = self.metadata;
        definition
    }
}

/// One `teams/*.yaml` file. Members are referenced by agent name and
/// resolved against the loaded agents when the team is created.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TeamSpec {
    pub name: String,
    pub members: Vec<String>,

    #[serde(default)]
    pub network: NetworkConfig,
}

/// Everything `.summoner-kit/` describes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    pub global: GlobalConfig,
    pub agents: Vec<AgentSpec>,
    pub teams: Vec<TeamSpec>,
}
