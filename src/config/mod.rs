// src/config/mod.rs

//! Configuration loading and validation for asmpipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate stage wiring and compile stages (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_from_str, project_root};
pub use model::{
    CatalogSection, ConfigFile, ConfigSection, InputsSpec, RawConfigFile, ResourceSection,
    RuleSpec, SlurmSection, StageConfig,
};
pub use validate::validate_config;
