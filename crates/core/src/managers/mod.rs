//! Registries coordinating definitions, cached engines, and networks.

pub mod agent_manager;
pub mod cache;
pub mod team_manager;
pub mod templates;

pub use agent_manager::AgentManager;
pub use cache::RuntimeCache;
pub use team_manager::TeamManager;
pub use templates::TemplateRegistry;
