//! Agent definition registry with cached engines.
//!
//! The manager owns the definitions; engines are derived runtime objects
//! built lazily and held in a [`RuntimeCache`]. Updating or deleting a
//! definition discards the cached engine, which loses any live session and
//! accumulated runtime memory.

use crate::engine::{self, Engine, EngineStatus, SummonOptions};
use crate::error::ManagerError;
use crate::managers::cache::RuntimeCache;
use crate::managers::templates::TemplateRegistry;
use crate::storage::StorageAdapter;
use chrono::Utc;
use sk_protocol::action_models::CandidateAction;
use sk_protocol::agent_models::AgentDefinition;
use sk_protocol::ipc::Event;
use sk_protocol::runtime_models::{DismissOutcome, StepOutcome, SummonOutcome};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

/// Manages all agent definitions and their cached engines.
pub struct AgentManager {
    /// Definition registry, the in-process source of truth.
    definitions: Arc<Mutex<HashMap<Uuid, AgentDefinition>>>,

    /// One engine per definition id, built on first use.
    engines: RuntimeCache<Engine>,

    templates: TemplateRegistry,

    /// Optional durable backend. Write failures emit an event; the applied
    /// in-memory change is not rolled back.
    storage: Option<Arc<dyn StorageAdapter>>,

    /// Best-effort event channel.
    events_tx: Option<mpsc::Sender<Event>>,
}

impl AgentManager {
    pub fn new() -> Self {
        Self {
            definitions: Arc::new(Mutex::new(HashMap::new())),
            engines: RuntimeCache::new(),
            templates: TemplateRegistry::with_builtins(),
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

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    pub fn templates_mut(&mut self) -> &mut TemplateRegistry {
        &mut self.templates
    }

    /// Load all persisted definitions into the registry. Returns how many
    /// were loaded.
    pub async fn load_persisted(&self) -> Result<usize, ManagerError> {
        let Some(storage) = &self.storage else {
            return Ok(0);
        };
        let loaded = storage.load_all_agents().await?;
        let count = loaded.len();
        let mut definitions = self.definitions.lock().await;
        for definition in loaded {
            definitions.insert(definition.id, definition);
        }
        info!(count, "loaded persisted agent definitions");
        Ok(count)
    }

    /// Register a definition built by the caller.
    pub async fn create(
        &self,
        definition: AgentDefinition,
    ) -> Result<AgentDefinition, ManagerError> {
        engine::validate_definition(&definition)?;
        self.definitions
            .lock()
            .await
            .insert(definition.id, definition.clone());

        self.persist(&definition).await;
        self.emit(Event::AgentCreated {
            agent_id: definition.id,
            name: definition.name.clone(),
        })
        .await;
        Ok(definition)
    }

    /// Instantiate a template and register the clone.
    pub async fn create_from_template(
        &self,
        template: &str,
    ) -> Result<AgentDefinition, ManagerError> {
        let definition = self.templates.instantiate(template)?;
        self.create(definition).await
    }

    pub async fn get(&self, id: Uuid) -> Result<AgentDefinition, ManagerError> {
        self.definitions
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(ManagerError::NotFound(id))
    }

    /// All definitions, sorted by name for stable listings.
    pub async fn list(&self) -> Vec<AgentDefinition> {
        let mut all: Vec<AgentDefinition> =
            self.definitions.lock().await.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Replace a definition. The cached engine (and any live session) is
    /// discarded; the next runtime call rebuilds from fresh memory.
    pub async fn update(
        &self,
        mut definition: AgentDefinition,
    ) -> Result<AgentDefinition, ManagerError> {
        engine::validate_definition(&definition)?;
        {
            let mut definitions = self.definitions.lock().await;
            if !definitions.contains_key(&definition.id) {
                return Err(ManagerError::NotFound(definition.id));
            }
            definition.updated_at = Utc::now();
            definitions.insert(definition.id, definition.clone());
        }

        if self.engines.invalidate(definition.id).await {
            warn!(agent_id = %definition.id, "definition updated; cached engine and its runtime memory discarded");
        }
        self.persist(&definition).await;
        self.emit(Event::AgentUpdated {
            agent_id: definition.id,
            name: definition.name.clone(),
        })
        .await;
        Ok(definition)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ManagerError> {
        if self.definitions.lock().await.remove(&id).is_none() {
            return Err(ManagerError::NotFound(id));
        }
        self.engines.invalidate(id).await;

        if let Some(storage) = &self.storage {
            if let Err(e) = storage.delete_agent(id).await {
                self.emit(Event::StorageError {
                    error: e.to_string(),
                })
                .await;
            }
        }
        self.emit(Event::AgentDeleted { agent_id: id }).await;
        Ok(())
    }

    /// The cached engine for `id`, building one if needed.
    pub async fn engine(&self, id: Uuid) -> Result<Arc<Mutex<Engine>>, ManagerError> {
        let definition = self.get(id).await?;
        self.engines
            .get_or_create(id, || Engine::new(definition))
            .await
            .map_err(ManagerError::Engine)
    }

    /// Summon the agent, auto-creating its engine.
    pub async fn summon(
        &self,
        id: Uuid,
        options: SummonOptions,
    ) -> Result<SummonOutcome, ManagerError> {
        let engine = self.engine(id).await?;
        let mut engine = engine.lock().await;
        let outcome = engine.summon(options)?;
        self.emit(Event::Summoned {
            agent_id: id,
            resonance_strength: outcome.resonance_strength,
        })
        .await;
        Ok(outcome)
    }

    /// Run one full perceive-decide-act-learn step.
    pub async fn step(
        &self,
        id: Uuid,
        observation: &str,
        candidates: &[CandidateAction],
    ) -> Result<StepOutcome, ManagerError> {
        let engine = self.engine(id).await?;
        let mut engine = engine.lock().await;
        let before = engine.epoch();
        let outcome = engine.full_step(observation, candidates)?;

        self.emit(Event::Perceived {
            agent_id: id,
            dominant_layer: outcome.percept.dominant,
            entropy: outcome.entropy,
        })
        .await;
        self.emit(Event::Decided {
            agent_id: id,
            kind: outcome.decision.action.kind,
            free_energy: outcome.decision.free_energy,
        })
        .await;
        self.emit(Event::Acted {
            agent_id: id,
            kind: outcome.decision.action.kind,
        })
        .await;
        self.emit(Event::Learned {
            agent_id: id,
            epoch: outcome.epoch,
        })
        .await;
        if outcome.epoch > before {
            self.emit(Event::EpochAdvanced {
                agent_id: id,
                epoch: outcome.epoch,
            })
            .await;
        }
        Ok(outcome)
    }

    /// Dismiss the agent's session.
    pub async fn dismiss(&self, id: Uuid) -> Result<DismissOutcome, ManagerError> {
        let engine = self.engine(id).await?;
        let mut engine = engine.lock().await;
        let outcome = engine.dismiss()?;
        self.emit(Event::BeaconEmitted {
            agent_id: id,
            fingerprint: outcome.beacon.fingerprint.clone(),
        })
        .await;
        self.emit(Event::Dismissed { agent_id: id }).await;
        Ok(outcome)
    }

    /// Current engine status, auto-creating the engine.
    pub async fn state(&self, id: Uuid) -> Result<EngineStatus, ManagerError> {
        let engine = self.engine(id).await?;
        let engine = engine.lock().await;
        Ok(engine.status())
    }

    async fn persist(&self, definition: &AgentDefinition) {
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.save_agent(definition).await {
                warn!(agent_id = %definition.id, error = %e, "storage write failed; in-memory change kept");
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

impl Default for AgentManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sk_protocol::runtime_models::LifecycleState;

    #[tokio::test]
    async fn test_create_and_get() {
        let manager = AgentManager::new();
        let created = manager
            .create(AgentDefinition::new("scout", vec![2, 3, 5]))
            .await
            .unwrap();

        let fetched = manager.get(created.id).await.unwrap();
        assert_eq!(fetched.name, "scout");
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_basis() {
        let manager = AgentManager::new();
        let err = manager
            .create(AgentDefinition::new("broken", vec![2, 2]))
            .await
            .unwrap_err();
        assert!(matches!(err, ManagerError::Engine(_)));
    }

    #[tokio::test]
    async fn test_create_from_template() {
        let manager = AgentManager::new();
        let created = manager.create_from_template("data-analyst").await.unwrap();
        assert_eq!(created.body_basis, vec![2, 3, 5, 7, 11, 13, 17]);
        assert!(manager.get(created.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let manager = AgentManager::new();
        let err = manager
            .update(AgentDefinition::new("ghost", vec![2]))
            .await
            .unwrap_err();
        assert!(matches!(err, ManagerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_discards_cached_engine() {
        let manager = AgentManager::new();
        let created = manager
            .create(AgentDefinition::new("scout", vec![2, 3, 5]))
            .await
            .unwrap();

        manager.summon(created.id, SummonOptions::default()).await.unwrap();
        assert_eq!(
            manager.state(created.id).await.unwrap().state,
            LifecycleState::Perceiving
        );

        let mut updated = created.clone();
        updated.description = "renamed".to_string();
        manager.update(updated).await.unwrap();

        // Rebuilt engine starts dormant with no session.
        let status = manager.state(created.id).await.unwrap();
        assert_eq!(status.state, LifecycleState::Dormant);
        assert_eq!(status.session_steps, 0);
    }

    #[tokio::test]
    async fn test_delete_then_state_is_not_found() {
        let manager = AgentManager::new();
        let created = manager
            .create(AgentDefinition::new("scout", vec![2, 3]))
            .await
            .unwrap();
        manager.delete(created.id).await.unwrap();

        let err = manager.state(created.id).await.unwrap_err();
        assert!(matches!(err, ManagerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_events_emitted_on_crud() {
        let (tx, mut rx) = mpsc::channel(16);
        let manager = AgentManager::new().with_events(tx);

        let created = manager
            .create(AgentDefinition::new("scout", vec![2, 3]))
            .await
            .unwrap();
        manager.delete(created.id).await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::AgentCreated { agent_id, .. } if *agent_id == created.id)));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::AgentDeleted { agent_id } if *agent_id == created.id)));
    }

    #[tokio::test]
    async fn test_step_emits_full_cycle_events() {
        use sk_protocol::action_models::ActionKind;

        let (tx, mut rx) = mpsc::channel(32);
        let manager = AgentManager::new().with_events(tx);
        let created = manager
            .create(AgentDefinition::new("scout", vec![2, 3, 5]))
            .await
            .unwrap();
        manager.summon(created.id, SummonOptions::default()).await.unwrap();

        let menu = vec![
            CandidateAction::new(ActionKind::Query, "ask", 0.2),
            CandidateAction::new(ActionKind::Wait, "idle", 0.0),
        ];
        manager.step(created.id, "first observation", &menu).await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Perceived { agent_id, .. } if *agent_id == created.id)));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Decided { agent_id, .. } if *agent_id == created.id)));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Acted { agent_id, .. } if *agent_id == created.id)));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Learned { agent_id, .. } if *agent_id == created.id)));
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let manager = AgentManager::new();
        manager
            .create(AgentDefinition::new("zeta", vec![2]))
            .await
            .unwrap();
        manager
            .create(AgentDefinition::new("alpha", vec![3]))
            .await
            .unwrap();

        let names: Vec<String> = manager.list().await.into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
