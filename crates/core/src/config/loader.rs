//! Configuration loader for the `.summoner-kit/` directory structure.
//!
//! Loads:
//! - `config.toml`: global settings
//! - `agents/*.yaml`: agent specs
//! - `teams/*.yaml`: team specs

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::models::{AgentSpec, AppConfig, TeamSpec};
use serde::de::DeserializeOwned;
use sk_protocol::config_models::GlobalConfig;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Loads all configuration from the `.summoner-kit/` directory under `root`.
///
/// Missing directories or files yield defaults rather than errors; files
/// that exist but fail to parse are errors.
///
/// # Errors
///
/// Returns `ConfigError` when a file cannot be read or has invalid TOML or
/// YAML syntax.
pub async fn load_config(root: &Path) -> ConfigResult<AppConfig> {
    let kit_dir = root.join(".summoner-kit");

    if !kit_dir.exists() {
        debug!(root = %root.display(), "no .summoner-kit directory; using defaults");
        return Ok(AppConfig::default());
    }

    let global = load_global_config(&kit_dir)?;
    let agents: Vec<AgentSpec> = load_yaml_dir(&kit_dir.join("agents"))?;
    let teams: Vec<TeamSpec> = load_yaml_dir(&kit_dir.join("teams"))?;

    Ok(AppConfig {
        global,
        agents,
        teams,
    })
}

fn load_global_config(kit_dir: &Path) -> ConfigResult<GlobalConfig> {
    let config_path = kit_dir.join("config.toml");
    if !config_path.exists() {
        return Ok(GlobalConfig::default());
    }

    let content =
        std::fs::read_to_string(&config_path).map_err(|source| ConfigError::FileRead {
            path: config_path.clone(),
            source,
        })?;
    toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: config_path,
        source,
    })
}

fn load_yaml_dir<T: DeserializeOwned>(dir: &Path) -> ConfigResult<Vec<T>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut loaded = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| ConfigError::DirectoryWalk {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();

        let ext = path.extension().and_then(|s| s.to_str());
        if ext != Some("yaml") && ext != Some("yml") {
            continue;
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let value = serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlParse {
            path: path.to_path_buf(),
            source,
        })?;
        loaded.push(value);
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_config_acceptance() {
        let dir = tempdir().expect("temp dir");
        let root = dir.path();
        let kit_dir = root.join(".summoner-kit");

        fs::create_dir_all(kit_dir.join("agents")).expect("agents dir");
        fs::create_dir_all(kit_dir.join("teams")).expect("teams dir");

        fs::write(
            kit_dir.join("config.toml"),
            r#"
[dynamics]
epistemic_weight = 0.4

[runner]
step_delay_ms = 100
"#,
        )
        .expect("config.toml");

        fs::write(
            kit_dir.join("agents/scout.yaml"),
            r#"
name: scout
description: forward observer
body_basis: [2, 3, 5, 7]
goals:
  - name: careful
    weight: 0.8
    cost_kind: safety
"#,
        )
        .expect("agent file");

        fs::write(
            kit_dir.join("teams/survey.yaml"),
            r#"
name: survey
members:
  - scout
  - sentinel
"#,
        )
        .expect("team file");

        let config = load_config(root).await.expect("load");

        assert_eq!(config.global.dynamics.epistemic_weight, 0.4);
        assert_eq!(config.global.runner.step_delay_ms, 100);
        // Unset runner fields keep their defaults.
        assert_eq!(config.global.runner.max_retries, 3);

        assert_eq!(config.agents.len(), 1);
        assert_eq!(config.agents[0].name, "scout");
        assert_eq!(config.agents[0].body_basis, vec![2, 3, 5, 7]);
        assert_eq!(config.agents[0].goals.len(), 1);

        assert_eq!(config.teams.len(), 1);
        assert_eq!(config.teams[0].members, vec!["scout", "sentinel"]);
    }

    #[tokio::test]
    async fn test_load_config_missing_directory() {
        let dir = tempdir().expect("temp dir");
        let config = load_config(dir.path()).await.expect("load");
        assert_eq!(config, AppConfig::default());
    }

    #[tokio::test]
    async fn test_load_config_partial() {
        let dir = tempdir().expect("temp dir");
        let kit_dir = dir.path().join(".summoner-kit");
        fs::create_dir_all(&kit_dir).expect("kit dir");
        fs::write(kit_dir.join("config.toml"), "").expect("config.toml");

        let config = load_config(dir.path()).await.expect("load");
        assert_eq!(config.global, GlobalConfig::default());
        assert!(config.agents.is_empty());
        assert!(config.teams.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_toml_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let kit_dir = dir.path().join(".summoner-kit");
        fs::create_dir_all(&kit_dir).expect("kit dir");
        fs::write(kit_dir.join("config.toml"), "[runner\nstep_delay_ms = ]")
            .expect("config.toml");

        let err = load_config(dir.path()).await.unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse { path, .. } if path.ends_with("config.toml")));
    }

    #[tokio::test]
    async fn test_invalid_yaml_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let kit_dir = dir.path().join(".summoner-kit");
        fs::create_dir_all(kit_dir.join("agents")).expect("agents dir");
        fs::write(kit_dir.join("agents/bad.yaml"), "name: [broken")
            .expect("agent file");

        let err = load_config(dir.path()).await.unwrap_err();
        assert!(matches!(err, ConfigError::YamlParse { path, .. } if path.ends_with("bad.yaml")));
    }

    #[tokio::test]
    async fn test_non_yaml_files_ignored() {
        let dir = tempdir().expect("temp dir");
        let kit_dir = dir.path().join(".summoner-kit");
        fs::create_dir_all(kit_dir.join("agents")).expect("agents dir");
        fs::write(kit_dir.join("agents/notes.txt"), "not yaml").expect("txt file");
        fs::write(
            kit_dir.join("agents/scout.yml"),
            "name: scout\nbody_basis: [2, 3]",
        )
        .expect("yml file");

        let config = load_config(dir.path()).await.expect("load");
        assert_eq!(config.agents.len(), 1);
    }
}
