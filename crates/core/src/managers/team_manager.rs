//! Team definition registry with cached networks.

use crate::engine::SummonOptions;
use crate::error::ManagerError;
use crate::managers::agent_manager::AgentManager;
use crate::managers::cache::RuntimeCache;
use crate::network::{AgentNetwork, CollectiveOutcome, MemberReport};
use crate::storage::StorageAdapter;
use chrono::Utc;
use sk_protocol::action_models::CandidateAction;
use sk_protocol::agent_models::TeamDefinition;
use sk_protocol::ipc::Event;
use sk_protocol::runtime_models::{DismissOutcome, SummonOutcome};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::warn;
use uuid::Uuid;

/// Manages team definitions and the networks derived from them.
///
/// Networks are ephemeral compositions over the agent manager's cached
/// engines; a team update discards the cached network but leaves member
/// engines untouched.
pub struct TeamManager {
    definitions: Arc<Mutex<HashMap<Uuid, TeamDefinition>>>,
    networks: RuntimeCache<AgentNetwork>,
    agents: Arc<AgentManager>,
    storage: Option<Arc<dyn StorageAdapter>>,
    events_tx: Option<mpsc::Sender<Event>>,
}

impl TeamManager {
    pub fn new(agents: Arc<AgentManager>) -> Self {
        Self {
            definitions: Arc::new(Mutex::new(HashMap::new())),
            networks: RuntimeCache::new(),
            agents,
            storage: None,
            events_tx: None,
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn StorageAdapter>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_events(mut self, events_tx: mpsc::Sender<Event>) -> Self {
        self.events_tx = Some(events_tx);
        self
    }

    pub async fn load_persisted(&self) -> Result<usize, ManagerError> {
        let Some(storage) = &self.storage else {
            return Ok(0);
        };
        let loaded = storage.load_all_teams().await?;
        let count = loaded.len();
        let mut definitions = self.definitions.lock().await;
        for definition in loaded {
            definitions.insert(definition.id, definition);
        }
        Ok(count)
    }

    /// Register a team. Member ids that don't resolve to a known agent are
    /// dropped with a warning rather than failing the create.
    pub async fn create(
        &self,
        mut definition: TeamDefinition,
    ) -> Result<TeamDefinition, ManagerError> {
        definition.member_ids = self.known_members(definition.member_ids).await;
        if definition.member_ids.len() < 2 {
            return Err(ManagerError::Validation(
                "a team needs at least 2 known members".to_string(),
            ));
        }

        self.definitions
            .lock()
            .await
            .insert(definition.id, definition.clone());
        self.persist(&definition).await;
        self.emit(Event::TeamCreated {
            team_id: definition.id,
            name: definition.name.clone(),
        })
        .await;
        Ok(definition)
    }

    pub async fn get(&self, id: Uuid) -> Result<TeamDefinition, ManagerError> {
        self.definitions
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(ManagerError::NotFound(id))
    }

    pub async fn list(&self) -> Vec<TeamDefinition> {
        let mut all: Vec<TeamDefinition> =
            self.definitions.lock().await.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Replace a team definition; the cached network is discarded.
    pub async fn update(
        &self,
        mut definition: TeamDefinition,
    ) -> Result<TeamDefinition, ManagerError> {
        definition.member_ids = self.known_members(definition.member_ids).await;
        if definition.member_ids.len() < 2 {
            return Err(ManagerError::Validation(
                "a team needs at least 2 known members".to_string(),
            ));
        }
        {
            let mut definitions = self.definitions.lock().await;
            if !definitions.contains_key(&definition.id) {
                return Err(ManagerError::NotFound(definition.id));
            }
            definition.updated_at = Utc::now();
            definitions.insert(definition.id, definition.clone());
        }

        self.networks.invalidate(definition.id).await;
        self.persist(&definition).await;
        self.emit(Event::TeamUpdated {
            team_id: definition.id,
            name: definition.name.clone(),
        })
        .await;
        Ok(definition)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ManagerError> {
        if self.definitions.lock().await.remove(&id).is_none() {
            return Err(ManagerError::NotFound(id));
        }
        self.networks.invalidate(id).await;

        if let Some(storage) = &self.storage {
            if let Err(e) = storage.delete_team(id).await {
                self.emit(Event::StorageError {
                    error: e.to_string(),
                })
                .await;
            }
        }
        self.emit(Event::TeamDeleted { team_id: id }).await;
        Ok(())
    }

    /// The cached network for `id`, composing member engines if needed.
    pub async fn network(&self, id: Uuid) -> Result<Arc<Mutex<AgentNetwork>>, ManagerError> {
        if let Some(cached) = self.networks.get(id).await {
            return Ok(cached);
        }

        let definition = self.get(id).await?;
        let mut engines = Vec::with_capacity(definition.member_ids.len());
        for member_id in &definition.member_ids {
            engines.push(self.agents.engine(*member_id).await?);
        }
        let network = AgentNetwork::new(engines, definition.network).await?;

        // A concurrent build may have won the race; reuse whichever landed.
        self.networks
            .get_or_create(id, || Ok::<_, ManagerError>(network))
            .await
    }

    /// Summon every member of the team.
    pub async fn summon_team(
        &self,
        id: Uuid,
        options: SummonOptions,
    ) -> Result<Vec<MemberReport<SummonOutcome>>, ManagerError> {
        let network = self.network(id).await?;
        let reports = network.lock().await.summon_all(options).await;

        let summoned = reports.iter().filter(|r| r.result.is_ok()).count();
        self.emit(Event::NetworkSummoned {
            team_id: id,
            summoned,
            failed: reports.len() - summoned,
        })
        .await;
        Ok(reports)
    }

    /// Run one collective step across the team.
    pub async fn collective_step(
        &self,
        id: Uuid,
        observation: &str,
        candidates: &[CandidateAction],
    ) -> Result<CollectiveOutcome, ManagerError> {
        let network = self.network(id).await?;
        let outcome = network
            .lock()
            .await
            .collective_step(observation, candidates)
            .await?;

        self.emit(Event::CollectiveStep {
            team_id: id,
            kind: outcome.decision.action.kind,
            free_energy: outcome.decision.free_energy,
        })
        .await;
        Ok(outcome)
    }

    /// Dismiss every member of the team.
    pub async fn dismiss_team(
        &self,
        id: Uuid,
    ) -> Result<Vec<MemberReport<DismissOutcome>>, ManagerError> {
        let network = self.network(id).await?;
        let reports = network.lock().await.dismiss_all().await;
        self.emit(Event::NetworkDismissed { team_id: id }).await;
        Ok(reports)
    }

    async fn known_members(&self, member_ids: Vec<Uuid>) -> Vec<Uuid> {
        let mut known = Vec::with_capacity(member_ids.len());
        for member_id in member_ids {
            if self.agents.get(member_id).await.is_ok() {
                known.push(member_id);
            } else {
                warn!(%member_id, "dropping unknown team member");
            }
        }
        known
    }

    async fn persist(&self, definition: &TeamDefinition) {
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.save_team(definition).await {
                warn!(team_id = %definition.id, error = %e, "storage write failed; in-memory change kept");
                self.emit(Event::StorageError {
                    error: e.to_string(),
                })
                .await;
            }
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(tx) = &self.events_tx {
            let _ = tx.send(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sk_protocol::agent_models::AgentDefinition;

    async fn manager_with_agents(n: usize) -> (Arc<AgentManager>, Vec<Uuid>) {
        let agents = Arc::new(AgentManager::new());
        let mut ids = Vec::new();
        for i in 0..n {
            let basis = vec![2 + i as u64 * 2, 3 + i as u64 * 2, 5 + i as u64 * 2];
            let created = agents
                .create(AgentDefinition::new(format!("member-{i}"), basis))
                .await
                .unwrap();
            ids.push(created.id);
        }
        (agents, ids)
    }

    #[tokio::test]
    async fn test_unknown_members_dropped_not_fatal() {
        let (agents, ids) = manager_with_agents(2).await;
        let teams = TeamManager::new(agents);

        let mut member_ids = ids.clone();
        member_ids.push(Uuid::new_v4());
        let created = teams
            .create(TeamDefinition::new("survey", member_ids))
            .await
            .unwrap();
        assert_eq!(created.member_ids, ids);
    }

    #[tokio::test]
    async fn test_too_few_known_members_rejected() {
        let (agents, ids) = manager_with_agents(1).await;
        let teams = TeamManager::new(agents);

        let err = teams
            .create(TeamDefinition::new("tiny", vec![ids[0], Uuid::new_v4()]))
            .await
            .unwrap_err();
        assert!(matches!(err, ManagerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_network_cached_until_update() {
        let (agents, ids) = manager_with_agents(2).await;
        let teams = TeamManager::new(agents);
        let created = teams
            .create(TeamDefinition::new("survey", ids.clone()))
            .await
            .unwrap();

        let first = teams.network(created.id).await.unwrap();
        let second = teams.network(created.id).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        teams.update(created.clone()).await.unwrap();
        let rebuilt = teams.network(created.id).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
    }

    #[tokio::test]
    async fn test_summon_team_reports_members() {
        let (agents, ids) = manager_with_agents(2).await;
        let teams = TeamManager::new(agents);
        let created = teams
            .create(TeamDefinition::new("survey", ids))
            .await
            .unwrap();

        let reports = teams
            .summon_team(created.id, SummonOptions::default())
            .await
            .unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.result.is_ok()));
    }

    #[tokio::test]
    async fn test_delete_then_network_is_not_found() {
        let (agents, ids) = manager_with_agents(2).await;
        let teams = TeamManager::new(agents);
        let created = teams
            .create(TeamDefinition::new("survey", ids))
            .await
            .unwrap();

        teams.delete(created.id).await.unwrap();
        let err = teams.network(created.id).await.err().unwrap();
        assert!(matches!(err, ManagerError::NotFound(_)));
    }
}
