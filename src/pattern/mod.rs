// src/pattern/mod.rs

//! Matching input paths and rendering output paths.
//!
//! - [`rule`] compiles `match` rules and extracts [`CaptureSet`]s.
//! - [`template`] renders output paths from captured fields.

pub mod rule;
pub mod template;

pub use rule::{CaptureSet, MatchRule, IMPLICIT_FIELDS};
pub use template::OutputTemplate;
