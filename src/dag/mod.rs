// src/dag/mod.rs

//! Task graph, staleness and scheduling.
//!
//! - [`graph`] holds the task-level DAG with data and order-only edges.
//! - [`assembler`] builds that graph from compiled stages and the catalog.
//! - [`staleness`] decides which tasks are up to date.
//! - [`scheduler`] contains the per-run state machine that decides
//!   which tasks may run, and skips consumers of failed tasks.
//! - [`task_info`] provides run states and the dispatch record.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod assembler;
pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod staleness;
pub mod state_manager;
pub mod task_info;

pub use assembler::assemble;
pub use graph::{EdgeKind, PipelineGraph, TaskId};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use staleness::{Freshness, StaleReason, StalenessEvaluator};
pub use task_info::{RunState, ScheduledTask};
