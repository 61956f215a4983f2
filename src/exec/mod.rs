// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running stage scripts, using
//! `tokio::process::Command`, and reporting back to the orchestration
//! runtime via `RuntimeEvent`s.
//!
//! - [`launcher`] turns a dispatched task into a local or `sbatch` command.
//! - [`executor_loop`] owns the loop that spawns one runner per task.
//! - [`task_runner`] handles individual task process execution.
//! - [`backend`] provides the `ExecutorBackend` trait and the
//!   `ProcessBackend` the runtime uses in production, and which tests can
//!   replace with a fake implementation.

pub mod backend;
pub mod executor_loop;
pub mod launcher;
pub mod task_runner;

pub use backend::{BoxedBackend, ExecutorBackend, ProcessBackend};
pub use launcher::{Launcher, LocalLauncher, SlurmLauncher};
