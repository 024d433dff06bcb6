//! Global configuration models for `.summoner-kit/config.toml`.
//!
//! Project-wide defaults merged into definitions that omit the matching
//! sections, plus runner defaults.

use crate::agent_models::CollapseDynamics;
use serde::{Deserialize, Serialize};

/// Runner defaults from `.summoner-kit/config.toml`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct RunnerDefaults {
    /// Delay between steps, in milliseconds.
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,

    /// Maximum consecutive retries before a run aborts.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff unit; attempt `n` waits `n * retry_base_ms`.
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
}

fn default_step_delay_ms() -> u64 {
    250
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_ms() -> u64 {
    100
}

impl Default for RunnerDefaults {
    fn default() -> Self {
        Self {
            step_delay_ms: default_step_delay_ms(),
            max_retries: default_max_retries(),
            retry_base_ms: default_retry_base_ms(),
        }
    }
}

/// Represents global settings from `.summoner-kit/config.toml`.
///
/// # Example
///
/// ```toml
/// # .summoner-kit/config.toml
/// [dynamics]
/// epistemic_weight = 0.3
/// pragmatic_weight = 0.5
///
/// [runner]
/// step_delay_ms = 250
/// max_retries = 3
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct GlobalConfig {
    /// Default collapse dynamics for definitions created without their own.
    #[serde(default)]
    pub dynamics: CollapseDynamics,

    #[serde(default)]
    pub runner: RunnerDefaults,
}
