//! # sk-protocol
//!
//! Shared data models for summoner-kit.
//!
//! This crate defines the value types exchanged between the core runtime,
//! the CLI, and external integrations:
//! - Agent and team definitions with their perception/goal/bias/dynamics
//!   configuration
//! - Runtime observations: beliefs, percepts, beacons, lifecycle states
//! - Candidate actions and decisions
//! - The `Event` enum carried on the observability channel
//!
//! All types are plain serde-serializable data. Business logic lives in
//! `sk-core`; the only computation here is small value-type math on
//! [`quaternion::Quaternion`].

pub mod action_models;
pub mod agent_models;
pub mod config_models;
pub mod ipc;
pub mod layer;
pub mod quaternion;
pub mod runtime_models;
