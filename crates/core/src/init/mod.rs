//! `.summoner-kit/` project scaffolding.

pub mod error;
pub mod generator;
pub mod templates;

pub use error::{InitError, InitResult};
pub use generator::{generate_summoner_kit_structure, InitOptions};
