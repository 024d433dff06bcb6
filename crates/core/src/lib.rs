//! # sk-core
//!
//! Summonable agent runtime for summoner-kit.
//!
//! This crate provides:
//! - Configuration loading from the `.summoner-kit/` directory
//! - The pure lifecycle functions (resonance, perception, free-energy
//!   decisions, learning, consolidation)
//! - The per-agent [`engine::Engine`] with summon/full_step/dismiss
//! - Multi-agent [`network::AgentNetwork`] composition
//! - Agent and team managers with lazy engine/network caching
//! - The unattended [`runner::Runner`] execution loop
//! - A pluggable [`storage::StorageAdapter`] for definition persistence
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and management
//! - [`init`]: Project scaffolding for `.summoner-kit/`
//! - [`lifecycle`]: Pure phase-transition and decision functions
//! - [`engine`]: The per-agent stateful engine
//! - [`network`]: Multi-agent belief-propagating networks
//! - [`managers`]: Definition CRUD, templates, runtime caches
//! - [`runner`]: Continuous execution loop with retry and telemetry
//! - [`storage`]: Definition persistence adapters

pub mod config;
pub mod engine;
pub mod error;
pub mod init;
pub mod lifecycle;
pub mod managers;
pub mod network;
pub mod runner;
pub mod storage;
