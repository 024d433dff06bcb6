//! JSON-per-definition file store.

use crate::error::StorageError;
use crate::storage::StorageAdapter;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sk_protocol::agent_models::{AgentDefinition, TeamDefinition};
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;
use walkdir::WalkDir;

/// Stores each definition as `<root>/agents/<uuid>.json` or
/// `<root>/teams/<uuid>.json`. Directories are created lazily on first
/// write.
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn agents_dir(&self) -> PathBuf {
        self.root.join("agents")
    }

    fn teams_dir(&self) -> PathBuf {
        self.root.join("teams")
    }

    fn write_json<T: Serialize>(dir: &Path, id: Uuid, value: &T) -> Result<(), StorageError> {
        std::fs::create_dir_all(dir).map_err(|source| StorageError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(format!("{id}.json"));
        let json = serde_json::to_string_pretty(value).map_err(StorageError::Serialization)?;
        std::fs::write(&path, json).map_err(|source| StorageError::Io { path, source })
    }

    fn remove_json(dir: &Path, id: Uuid) -> Result<(), StorageError> {
        let path = dir.join(format!("{id}.json"));
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn load_all<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, StorageError> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut loaded = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| StorageError::Backend(e.to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let content =
                std::fs::read_to_string(path).map_err(|source| StorageError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            match serde_json::from_str(&content) {
                Ok(value) => loaded.push(value),
                // A corrupt file must not take the whole registry down.
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable definition"),
            }
        }
        Ok(loaded)
    }
}

#[async_trait]
impl StorageAdapter for JsonFileStore {
    async fn save_agent(&self, definition: &AgentDefinition) -> Result<(), StorageError> {
        Self::write_json(&self.agents_dir(), definition.id, definition)
    }

    async fn delete_agent(&self, id: Uuid) -> Result<(), StorageError> {
        Self::remove_json(&self.agents_dir(), id)
    }

    async fn load_all_agents(&self) -> Result<Vec<AgentDefinition>, StorageError> {
        Self::load_all(&self.agents_dir())
    }

    async fn save_team(&self, definition: &TeamDefinition) -> Result<(), StorageError> {
        Self::write_json(&self.teams_dir(), definition.id, definition)
    }

    async fn delete_team(&self, id: Uuid) -> Result<(), StorageError> {
        Self::remove_json(&self.teams_dir(), id)
    }

    async fn load_all_teams(&self) -> Result<Vec<TeamDefinition>, StorageError> {
        Self::load_all(&self.teams_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempdir().expect("temp dir");
        let store = JsonFileStore::new(dir.path());

        let definition = AgentDefinition::new("scout", vec![2, 3, 5]);
        store.save_agent(&definition).await.expect("save");

        let loaded = store.load_all_agents().await.expect("load");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, definition.id);
        assert_eq!(loaded[0].body_basis, vec![2, 3, 5]);
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_version() {
        let dir = tempdir().expect("temp dir");
        let store = JsonFileStore::new(dir.path());

        let mut definition = AgentDefinition::new("scout", vec![2, 3]);
        store.save_agent(&definition).await.expect("save");
        definition.name = "sentinel".to_string();
        store.save_agent(&definition).await.expect("save again");

        let loaded = store.load_all_agents().await.expect("load");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "sentinel");
    }

    #[tokio::test]
    async fn test_delete_absent_is_ok() {
        let dir = tempdir().expect("temp dir");
        let store = JsonFileStore::new(dir.path());
        store.delete_agent(Uuid::new_v4()).await.expect("delete");
    }

    #[tokio::test]
    async fn test_delete_removes_file() {
        let dir = tempdir().expect("temp dir");
        let store = JsonFileStore::new(dir.path());

        let definition = AgentDefinition::new("scout", vec![2, 3]);
        store.save_agent(&definition).await.expect("save");
        store.delete_agent(definition.id).await.expect("delete");

        assert!(store.load_all_agents().await.expect("load").is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_skipped() {
        let dir = tempdir().expect("temp dir");
        let store = JsonFileStore::new(dir.path());

        let definition = AgentDefinition::new("scout", vec![2, 3]);
        store.save_agent(&definition).await.expect("save");
        std::fs::write(dir.path().join("agents/garbage.json"), "{not json")
            .expect("write garbage");

        let loaded = store.load_all_agents().await.expect("load");
        assert_eq!(loaded.len(), 1);
    }

    #[tokio::test]
    async fn test_teams_round_trip() {
        let dir = tempdir().expect("temp dir");
        let store = JsonFileStore::new(dir.path());

        let team = TeamDefinition::new("survey", vec![Uuid::new_v4(), Uuid::new_v4()]);
        store.save_team(&team).await.expect("save");

        let loaded = store.load_all_teams().await.expect("load");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].member_ids.len(), 2);
    }
}
