// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `ScheduledTask`s to the executor
//!
//! The core is unit tested without any Tokio, channels, or processes.

use crate::dag::Scheduler;
use crate::engine::event_handlers::{
    handle_shutdown, handle_start, handle_task_completion, CoreStep,
};
use crate::engine::queue::ReadyQueue;
use crate::engine::RuntimeEvent;
use crate::report::RunSummary;

/// Pure core runtime state.
///
/// This owns:
/// - the scheduler
/// - the ready queue (bounded worker slots)
/// - whether a shutdown is in progress
///
/// It has **no** channels, no Tokio types, and does not perform any IO
/// beyond the staleness checks the scheduler makes.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    queue: ReadyQueue,
    draining: bool,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler, max_jobs: usize) -> Self {
        Self {
            scheduler,
            queue: ReadyQueue::new(max_jobs),
            draining: false,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Tasks currently handed to the backend (for tests).
    pub fn in_flight(&self) -> usize {
        self.queue.in_flight()
    }

    /// Runnable tasks waiting for a slot (for tests).
    pub fn waiting(&self) -> usize {
        self.queue.waiting()
    }

    /// Evaluate the graph and dispatch the first batch.
    pub fn start(&mut self) -> CoreStep {
        handle_start(&mut self.scheduler, &mut self.queue)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskCompleted { task, outcome } => handle_task_completion(
                &mut self.scheduler,
                &mut self.queue,
                self.draining,
                task,
                outcome,
            ),
            RuntimeEvent::ShutdownRequested => {
                self.draining = true;
                handle_shutdown(&mut self.scheduler, &mut self.queue)
            }
        }
    }

    pub fn summary(&self) -> RunSummary {
        self.scheduler.summary()
    }

    pub fn into_scheduler(self) -> Scheduler {
        self.scheduler
    }
}
