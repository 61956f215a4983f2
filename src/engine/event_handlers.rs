// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{info, warn};

use crate::dag::{RunState, ScheduledTask, Scheduler, TaskId};
use crate::engine::queue::ReadyQueue;
use crate::engine::TaskOutcome;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// The run is over; the shell should stop.
    RequestExit,
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

/// Classify every task and dispatch the first batch.
pub fn handle_start(scheduler: &mut Scheduler, queue: &mut ReadyQueue) -> CoreStep {
    let step = scheduler.start();
    queue.push_all(step.newly_runnable);
    finish_step(scheduler, queue, false)
}

/// Handle a task completion event.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    queue: &mut ReadyQueue,
    draining: bool,
    task: TaskId,
    outcome: TaskOutcome,
) -> CoreStep {
    if scheduler.state_of(task) == Some(RunState::Running) {
        queue.release();
    }

    let step = scheduler.step_completion(task, outcome);
    if !draining {
        queue.push_all(step.newly_runnable);
    }

    finish_step(scheduler, queue, draining)
}

/// Stop dispatching; keep running only while tasks are still in flight.
pub fn handle_shutdown(scheduler: &mut Scheduler, queue: &mut ReadyQueue) -> CoreStep {
    let dropped = queue.clear_waiting();
    info!(
        in_flight = queue.in_flight(),
        dropped,
        "shutdown requested; waiting for running tasks"
    );
    finish_step(scheduler, queue, true)
}

/// Fill free worker slots and decide whether the run is over.
fn finish_step(scheduler: &mut Scheduler, queue: &mut ReadyQueue, draining: bool) -> CoreStep {
    let mut commands = Vec::new();

    if !draining {
        let mut batch = Vec::new();
        for id in queue.take_dispatchable() {
            if scheduler.mark_running(id) {
                batch.push(scheduler.scheduled_task(id));
            } else {
                warn!(task = id.index(), "queued task no longer runnable");
                queue.release();
            }
        }
        if !batch.is_empty() {
            commands.push(CoreCommand::DispatchTasks(batch));
        }
    }

    let done = scheduler.is_finished() || (draining && queue.in_flight() == 0);
    if done {
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running: !done,
    }
}
