// src/dag/scheduler.rs

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::graph::{PipelineGraph, TaskId};
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::staleness::StalenessEvaluator;
use crate::dag::state_manager::StateManager;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::engine::TaskOutcome;
use crate::fs::FileSystem;
use crate::history::{fingerprint, HistoryStore};
use crate::report::RunSummary;

/// Scheduler holds the immutable task graph plus mutable per-run state.
///
/// It is responsible for:
/// - the initial staleness classification of every task
/// - moving tasks to `Running` when the engine dispatches them
/// - recording successes and failures
/// - re-evaluating consumers once their producers resolve
/// - skipping consumers of failed tasks
///
/// It does not bound concurrency; the engine core owns the worker slots.
#[derive(Debug)]
pub struct Scheduler {
    graph: PipelineGraph,
    tasks: Vec<TaskInfo>,
    fs: Arc<dyn FileSystem>,
    history: Option<Box<dyn HistoryStore>>,
    started: bool,
    finished: bool,
}

impl Scheduler {
    pub fn new(graph: PipelineGraph, fs: Arc<dyn FileSystem>) -> Self {
        let tasks = vec![TaskInfo::default(); graph.len()];
        Self {
            graph,
            tasks,
            fs,
            history: None,
            started: false,
            finished: false,
        }
    }

    /// Require a completion record, in addition to timestamps, for a task
    /// to count as up to date. Successes are recorded into `history`.
    pub fn with_history(mut self, history: Option<Box<dyn HistoryStore>>) -> Self {
        self.history = history;
        self
    }

    pub fn graph(&self) -> &PipelineGraph {
        &self.graph
    }

    pub fn state_of(&self, id: TaskId) -> Option<RunState> {
        self.tasks.get(id.index()).map(|t| t.state)
    }

    /// States indexed by `TaskId::index()`.
    pub fn states(&self) -> Vec<RunState> {
        self.tasks.iter().map(|t| t.state).collect()
    }

    pub fn exit_code_of(&self, id: TaskId) -> Option<i32> {
        self.tasks.get(id.index()).and_then(|t| t.exit_code)
    }

    /// Every task is terminal.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Dispatch record for a task.
    pub fn scheduled_task(&self, id: TaskId) -> ScheduledTask {
        ScheduledTask::from_instance(id, self.graph.task(id))
    }

    /// Classify every task. Idempotent: later calls return an empty step.
    pub fn start(&mut self) -> SchedulerStep {
        if self.started {
            warn!("scheduler already started; ignoring");
            return SchedulerStep::default();
        }
        self.started = true;

        let evaluator = StalenessEvaluator::new(&*self.fs).with_history(self.history.as_deref());
        let states = evaluator.evaluate(&self.graph);

        let mut step = SchedulerStep::default();
        for (i, state) in states.into_iter().enumerate() {
            self.tasks[i].state = state;
            let id = TaskId::new(i);
            match state {
                RunState::Runnable => step.newly_runnable.push(id),
                RunState::UpToDate => step.newly_up_to_date.push(id),
                _ => {}
            }
        }

        info!(
            tasks = self.graph.len(),
            runnable = step.newly_runnable.len(),
            up_to_date = step.newly_up_to_date.len(),
            "initial staleness evaluation"
        );

        step.run_just_finished = self.maybe_finish_run();
        step
    }

    /// `Runnable -> Running`. Returns `false` (and changes nothing) for a
    /// task in any other state.
    pub fn mark_running(&mut self, id: TaskId) -> bool {
        match self.tasks.get_mut(id.index()) {
            Some(info) if info.state == RunState::Runnable => {
                info.state = RunState::Running;
                debug!(task = %self.graph.task(id), "dispatched; marking Running");
                true
            }
            Some(info) => {
                warn!(task = %self.graph.task(id), state = %info.state, "cannot dispatch task");
                false
            }
            None => {
                warn!(task = id.index(), "dispatch for unknown task; ignoring");
                false
            }
        }
    }

    /// Apply a task's outcome and report what changed as a [`SchedulerStep`].
    pub fn step_completion(&mut self, id: TaskId, outcome: TaskOutcome) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        match self.tasks.get(id.index()).map(|t| t.state) {
            Some(RunState::Running) => {}
            Some(state) => {
                warn!(task = %self.graph.task(id), %state, "completion for task that is not running; ignoring");
                return step;
            }
            None => {
                warn!(task = id.index(), "completion for unknown task; ignoring");
                return step;
            }
        }

        match outcome {
            TaskOutcome::Success => {
                self.tasks[id.index()].state = RunState::Succeeded;
                info!(task = %self.graph.task(id), "task succeeded");
                self.record_success(id);

                let evaluator =
                    StalenessEvaluator::new(&*self.fs).with_history(self.history.as_deref());
                let mut manager = StateManager::new(&self.graph, &mut self.tasks);
                manager.resolve_dependents(id, &evaluator, &mut step);
            }
            TaskOutcome::Failed(code) => {
                let info = &mut self.tasks[id.index()];
                info.state = RunState::Failed;
                info.exit_code = Some(code);
                step.newly_failed.push(id);

                let mut manager = StateManager::new(&self.graph, &mut self.tasks);
                step.newly_skipped = manager.mark_dependents_skipped(id);
                warn!(
                    task = %self.graph.task(id),
                    exit_code = code,
                    skipped = step.newly_skipped.len(),
                    "task failed; skipping its consumers"
                );
            }
        }

        step.run_just_finished = self.maybe_finish_run();
        step
    }

    /// Per-stage tally of the current states.
    pub fn summary(&self) -> RunSummary {
        RunSummary::from_states(&self.graph, &self.states())
    }

    fn record_success(&mut self, id: TaskId) {
        let Some(history) = self.history.as_mut() else {
            return;
        };
        let task = self.graph.task(id);
        if let Err(e) = history.record(&fingerprint(task), &task.to_string()) {
            // Losing a record only costs a re-run next time.
            warn!(task = %task, error = %e, "failed to record completion");
        }
    }

    fn maybe_finish_run(&mut self) -> bool {
        if self.finished {
            return false;
        }
        let manager = StateManager::new(&self.graph, &mut self.tasks);
        if manager.all_tasks_terminal() {
            info!("scheduler: all tasks terminal; run finished");
            self.finished = true;
            true
        } else {
            false
        }
    }
}
