// src/dag/staleness.rs

//! Staleness evaluation: decides whether a task's outputs are current.
//!
//! A task is up to date when every output exists, every input is strictly
//! older than the oldest output, (with history enabled) its fingerprint
//! has a completion record, and every upstream task is itself resolved
//! successfully.

use std::fmt;
use std::time::SystemTime;

use tracing::debug;

use crate::dag::graph::{PipelineGraph, TaskId};
use crate::dag::task_info::RunState;
use crate::fs::FileSystem;
use crate::history::{fingerprint, HistoryStore};
use crate::stage::TaskInstance;
use crate::types::FilePath;

/// Why a task has to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    MissingOutput(FilePath),
    MissingInput(FilePath),
    /// The input is as new as or newer than the oldest output.
    InputNewer { input: FilePath, output: FilePath },
    /// Modification time could not be read.
    Unreadable(FilePath),
    /// History is enabled and holds no record of this task.
    NotRecorded,
    /// An upstream task is going to run first.
    UpstreamRuns,
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::MissingOutput(p) => write!(f, "output {p} is missing"),
            StaleReason::MissingInput(p) => write!(f, "input {p} is missing"),
            StaleReason::InputNewer { input, output } => {
                write!(f, "input {input} is not older than output {output}")
            }
            StaleReason::Unreadable(p) => write!(f, "cannot read modification time of {p}"),
            StaleReason::NotRecorded => f.write_str("no completion record"),
            StaleReason::UpstreamRuns => f.write_str("an upstream task runs first"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    Current,
    Stale(StaleReason),
}

impl Freshness {
    pub fn is_current(&self) -> bool {
        matches!(self, Freshness::Current)
    }
}

/// Read-only view over the filesystem (and optional history) used to
/// classify tasks.
#[derive(Debug, Clone, Copy)]
pub struct StalenessEvaluator<'a> {
    fs: &'a dyn FileSystem,
    history: Option<&'a dyn HistoryStore>,
}

impl<'a> StalenessEvaluator<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self { fs, history: None }
    }

    pub fn with_history(mut self, history: Option<&'a dyn HistoryStore>) -> Self {
        self.history = history;
        self
    }

    /// File-level check of one task, ignoring upstream state.
    pub fn freshness(&self, task: &TaskInstance) -> Freshness {
        let mut oldest: Option<(SystemTime, &FilePath)> = None;
        for out in &task.outputs {
            if !self.fs.exists(out.as_path()) {
                return Freshness::Stale(StaleReason::MissingOutput(out.clone()));
            }
            let Ok(mtime) = self.fs.modified(out.as_path()) else {
                return Freshness::Stale(StaleReason::Unreadable(out.clone()));
            };
            if oldest.is_none_or(|(t, _)| mtime < t) {
                oldest = Some((mtime, out));
            }
        }

        if let Some((oldest_time, oldest_out)) = oldest {
            for input in &task.inputs {
                if !self.fs.exists(input.as_path()) {
                    return Freshness::Stale(StaleReason::MissingInput(input.clone()));
                }
                let Ok(mtime) = self.fs.modified(input.as_path()) else {
                    return Freshness::Stale(StaleReason::Unreadable(input.clone()));
                };
                if mtime >= oldest_time {
                    return Freshness::Stale(StaleReason::InputNewer {
                        input: input.clone(),
                        output: oldest_out.clone(),
                    });
                }
            }
        }

        if let Some(history) = self.history {
            if !history.contains(&fingerprint(task)) {
                return Freshness::Stale(StaleReason::NotRecorded);
            }
        }

        Freshness::Current
    }

    /// Classify one task given the current state of its predecessors.
    ///
    /// Returns `Pending` while any predecessor is unresolved (or failed;
    /// skipping is the scheduler's decision), otherwise `UpToDate` or
    /// `Runnable`.
    pub fn evaluate_task<F>(&self, graph: &PipelineGraph, id: TaskId, state_of: F) -> RunState
    where
        F: Fn(TaskId) -> RunState,
    {
        if !graph
            .dependencies_of(id)
            .into_iter()
            .all(|dep| state_of(dep).is_resolved_ok())
        {
            return RunState::Pending;
        }

        let task = graph.task(id);
        match self.freshness(task) {
            Freshness::Current => {
                debug!(task = %task, "up to date");
                RunState::UpToDate
            }
            Freshness::Stale(reason) => {
                debug!(task = %task, %reason, "needs to run");
                RunState::Runnable
            }
        }
    }

    /// Initial classification of every task, indexed by `TaskId::index()`.
    ///
    /// Tasks downstream of a `Runnable` task stay `Pending`.
    pub fn evaluate(&self, graph: &PipelineGraph) -> Vec<RunState> {
        let mut states = vec![RunState::Pending; graph.len()];
        // Ids are a topological order, so predecessors are already classified.
        for id in graph.task_ids() {
            let state = self.evaluate_task(graph, id, |dep| states[dep.index()]);
            states[id.index()] = state;
        }
        states
    }

    /// Predicted outcome for every task assuming each `Runnable` task will
    /// succeed: anything downstream of work to do is `Runnable` as well.
    pub fn plan(&self, graph: &PipelineGraph) -> Vec<(RunState, Option<StaleReason>)> {
        let mut plan: Vec<(RunState, Option<StaleReason>)> =
            vec![(RunState::Pending, None); graph.len()];
        for id in graph.task_ids() {
            let upstream_runs = graph
                .dependencies_of(id)
                .into_iter()
                .any(|dep| plan[dep.index()].0 == RunState::Runnable);
            plan[id.index()] = if upstream_runs {
                (RunState::Runnable, Some(StaleReason::UpstreamRuns))
            } else {
                match self.freshness(graph.task(id)) {
                    Freshness::Current => (RunState::UpToDate, None),
                    Freshness::Stale(reason) => (RunState::Runnable, Some(reason)),
                }
            };
        }
        plan
    }
}
