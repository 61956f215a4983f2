// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the scheduler (per-task run states)
//! - the ready queue with its bounded worker slots
//! - the main runtime event loop that reacts to:
//!   - task completion events from the backend
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use crate::dag::TaskId;

/// Outcome of a task for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// Non-zero exit code, or `-1` when the task could not be launched.
    Failed(i32),
}

/// Events flowing into the runtime from backends and signal handlers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A dispatched task finished with a concrete outcome.
    TaskCompleted { task: TaskId, outcome: TaskOutcome },
    /// Graceful shutdown requested (e.g. Ctrl-C): dispatch nothing new and
    /// exit once running tasks report back.
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::ReadyQueue;
pub use runtime::Runtime;
