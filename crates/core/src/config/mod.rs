//! Loading and modeling of the `.summoner-kit/` configuration directory.

pub mod error;
pub mod loader;
pub mod models;

pub use error::{ConfigError, ConfigResult};
pub use loader::load_config;
pub use models::{AgentSpec, AppConfig, TeamSpec};
