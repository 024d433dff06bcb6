//! Durable persistence for agent and team definitions.
//!
//! Managers talk to storage through the [`StorageAdapter`] trait so the
//! backend can be swapped; [`JsonFileStore`] is the default file-based
//! implementation. Engines and sessions are never persisted here; only
//! definitions are.

mod json_file;

pub use json_file::JsonFileStore;

use crate::error::StorageError;
use async_trait::async_trait;
use sk_protocol::agent_models::{AgentDefinition, TeamDefinition};
use uuid::Uuid;

/// Persistence seam for definitions.
///
/// All methods are fallible; callers decide whether a storage failure is
/// fatal. The in-memory registries remain the source of truth while the
/// process is alive.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Persist one agent definition, replacing any previous version.
    async fn save_agent(&self, definition: &AgentDefinition) -> Result<(), StorageError>;

    /// Remove one agent definition. Deleting an absent definition is not an
    /// error.
    async fn delete_agent(&self, id: Uuid) -> Result<(), StorageError>;

    /// Load every persisted agent definition.
    async fn load_all_agents(&self) -> Result<Vec<AgentDefinition>, StorageError>;

    /// Persist one team definition, replacing any previous version.
    async fn save_team(&self, definition: &TeamDefinition) -> Result<(), StorageError>;

    /// Remove one team definition.
    async fn delete_team(&self, id: Uuid) -> Result<(), StorageError>;

    /// Load every persisted team definition.
    async fn load_all_teams(&self) -> Result<Vec<TeamDefinition>, StorageError>;
}
