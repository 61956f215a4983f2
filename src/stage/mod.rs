// src/stage/mod.rs

//! Stages and the task instances derived from them.
//!
//! - [`definition`] compiles `[[stage]]` entries into [`StageDef`]s.
//! - [`builder`] groups candidate inputs into [`TaskInstance`]s per stage kind.
//! - [`task`] holds the task instance, script and resource types.

pub mod builder;
pub mod definition;
pub mod task;

pub use builder::build_stage;
pub use definition::{StageDef, StageInputs};
pub use task::{ResourceRequest, ScriptRef, TaskInstance};
