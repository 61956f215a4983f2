// src/dag/task_info.rs

//! Per-task run state and the dispatch record handed to a backend.

use std::fmt;

use crate::dag::graph::TaskId;
use crate::stage::{ResourceRequest, ScriptRef, TaskInstance};
use crate::types::FilePath;

/// State of one task instance within a single run.
///
/// `Pending -> {UpToDate | Runnable} -> Running -> {Succeeded | Failed}`,
/// plus `Skipped` for consumers of a failed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Waiting for upstream tasks to resolve.
    Pending,
    /// Outputs are current; nothing to do.
    UpToDate,
    /// Must run; waiting for a worker slot.
    Runnable,
    /// Handed to the execution backend.
    Running,
    Succeeded,
    Failed,
    /// Never attempted because an upstream task failed.
    Skipped,
}

impl RunState {
    /// No further transitions in this run.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::UpToDate | RunState::Succeeded | RunState::Failed | RunState::Skipped
        )
    }

    /// Downstream work may proceed past this task.
    pub fn is_resolved_ok(self) -> bool {
        matches!(self, RunState::UpToDate | RunState::Succeeded)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Pending => "pending",
            RunState::UpToDate => "up-to-date",
            RunState::Runnable => "runnable",
            RunState::Running => "running",
            RunState::Succeeded => "succeeded",
            RunState::Failed => "failed",
            RunState::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Mutable per-run bookkeeping for one task.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub state: RunState,
    /// Exit code reported by the backend, if the task failed.
    pub exit_code: Option<i32>,
}

impl Default for TaskInfo {
    fn default() -> Self {
        Self {
            state: RunState::Pending,
            exit_code: None,
        }
    }
}

/// Description of a task the engine wants the backend to run now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub id: TaskId,
    /// `stage[index]`, used in logs.
    pub label: String,
    pub stage: String,
    pub script: ScriptRef,
    pub inputs: Vec<FilePath>,
    pub outputs: Vec<FilePath>,
    pub resources: ResourceRequest,
}

impl ScheduledTask {
    pub fn from_instance(id: TaskId, task: &TaskInstance) -> Self {
        Self {
            id,
            label: task.to_string(),
            stage: task.stage.clone(),
            script: task.script.clone(),
            inputs: task.inputs.clone(),
            outputs: task.outputs.clone(),
            resources: task.resources.clone(),
        }
    }
}
