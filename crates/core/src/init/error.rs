//! Error types for initialization operations.

use std::path::PathBuf;
use thiserror::Error;

pub type InitResult<T> = Result<T, InitError>;

/// Errors that can occur while scaffolding `.summoner-kit/`.
#[derive(Debug, Error)]
pub enum InitError {
    /// The directory already exists and `--force` was not given.
    #[error(".summoner-kit directory already exists at {0:?}. Use --force to overwrite.")]
    DirectoryExists(PathBuf),

    /// A required template file was not found in the embedded assets.
    #[error("template file not found: {0}")]
    TemplateNotFound(String),

    #[error("failed to create directory {path:?}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write file {path:?}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}
