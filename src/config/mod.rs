// src/config/mod.rs

//! Workspace configuration for winedeck.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate and resolve it into a [`ConfigFile`] (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, DetectionSection, DetectionSettings, EnvironmentSection, FamilySection,
    RawConfigFile, WorkspaceSection,
};
pub use validate::parse_duration;
