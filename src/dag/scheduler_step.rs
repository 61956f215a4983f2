// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::graph::TaskId;

/// Structured result of a single scheduler "step".
///
/// Tests use this to step the graph by hand and assert on what changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStep {
    /// Tasks that became `Runnable` in this step, in discovery order.
    pub newly_runnable: Vec<TaskId>,
    /// Tasks found `UpToDate` in this step.
    pub newly_up_to_date: Vec<TaskId>,
    /// The task that failed in this step, if any.
    pub newly_failed: Vec<TaskId>,
    /// Consumers marked `Skipped` because of that failure.
    pub newly_skipped: Vec<TaskId>,
    /// Every task is now terminal.
    pub run_just_finished: bool,
}
