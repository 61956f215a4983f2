// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Configuration error in stage '{stage}': {message}")]
    StageConfig { stage: String, message: String },

    #[error("Configuration error in stage '{stage}': template placeholder '{{{key}}}' has no matching capture")]
    MissingPlaceholder { stage: String, key: String },

    #[error("Configuration error: output '{path}' is declared by both task {first} and task {second}")]
    OverlappingOutputs {
        path: String,
        first: String,
        second: String,
    },

    #[error("Configuration error: cycle detected involving {0}")]
    DagCycle(String),

    #[error("Stage not found: {0}")]
    StageNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Shorthand for a [`PipelineError::StageConfig`].
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::StageConfig {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
