// src/dag/state_manager.rs

//! Per-run state transitions for tasks in the scheduler.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::dag::graph::{PipelineGraph, TaskId};
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::staleness::StalenessEvaluator;
use crate::dag::task_info::{RunState, TaskInfo};

/// Mutable view over the per-task states of one run.
pub struct StateManager<'a> {
    graph: &'a PipelineGraph,
    tasks: &'a mut [TaskInfo],
}

impl<'a> StateManager<'a> {
    pub fn new(graph: &'a PipelineGraph, tasks: &'a mut [TaskInfo]) -> Self {
        Self { graph, tasks }
    }

    fn state(&self, id: TaskId) -> RunState {
        self.tasks[id.index()].state
    }

    fn set(&mut self, id: TaskId, state: RunState) {
        self.tasks[id.index()].state = state;
    }

    /// Mark every transitive consumer of `failed` that has not started as
    /// `Skipped`. Returns them in discovery order.
    pub fn mark_dependents_skipped(&mut self, failed: TaskId) -> Vec<TaskId> {
        let mut stack = self.graph.dependents_of(failed);
        let mut visited: HashSet<TaskId> = HashSet::new();
        let mut skipped = Vec::new();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            match self.state(id) {
                RunState::Pending | RunState::Runnable => {
                    self.set(id, RunState::Skipped);
                    debug!(
                        task = %self.graph.task(id),
                        upstream = %self.graph.task(failed),
                        "skipping task due to upstream failure"
                    );
                    skipped.push(id);
                    stack.extend(self.graph.dependents_of(id));
                }
                RunState::Skipped => {}
                // Consumers of a failed task cannot have started.
                RunState::UpToDate | RunState::Running | RunState::Succeeded | RunState::Failed => {}
            }
        }

        skipped.sort();
        skipped
    }

    /// Re-evaluate the `Pending` consumers of `resolved` whose predecessors
    /// are now all resolved. Consumers found `UpToDate` resolve in turn, so
    /// this walks forward until it hits `Runnable` or still-blocked tasks.
    pub fn resolve_dependents(
        &mut self,
        resolved: TaskId,
        evaluator: &StalenessEvaluator<'_>,
        step: &mut SchedulerStep,
    ) {
        let mut stack = vec![resolved];

        while let Some(done) = stack.pop() {
            for id in self.graph.dependents_of(done) {
                if self.state(id) != RunState::Pending {
                    continue;
                }
                let next = {
                    let tasks = &*self.tasks;
                    evaluator.evaluate_task(self.graph, id, |dep| tasks[dep.index()].state)
                };
                match next {
                    RunState::UpToDate => {
                        self.set(id, RunState::UpToDate);
                        step.newly_up_to_date.push(id);
                        stack.push(id);
                    }
                    RunState::Runnable => {
                        info!(task = %self.graph.task(id), "inputs ready; task is runnable");
                        self.set(id, RunState::Runnable);
                        step.newly_runnable.push(id);
                    }
                    _ => {}
                }
            }
        }

        step.newly_runnable.sort();
        step.newly_up_to_date.sort();
    }

    /// `true` once no task can change state any more.
    pub fn all_tasks_terminal(&self) -> bool {
        self.tasks.iter().all(|t| t.state.is_terminal())
    }
}
