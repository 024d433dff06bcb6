//! Configuration loading errors.

use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading `.summoner-kit/` configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML in {}: {source}", path.display())]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid YAML in {}: {source}", path.display())]
    YamlParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("failed to walk {}: {source}", path.display())]
    DirectoryWalk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
