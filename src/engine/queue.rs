// src/engine/queue.rs

use std::collections::BTreeSet;

use tracing::debug;

use crate::dag::TaskId;

/// Runnable tasks waiting for a worker slot.
///
/// Semantics:
/// - At most `max_jobs` tasks are in flight at any time.
/// - Among waiting tasks the lowest id (earliest discovered) goes first, so
///   dispatch order is deterministic for a given graph.
/// - A task enters at most once; pushing a queued id again is a no-op.
#[derive(Debug)]
pub struct ReadyQueue {
    waiting: BTreeSet<TaskId>,
    max_jobs: usize,
    in_flight: usize,
}

impl ReadyQueue {
    /// `max_jobs` is clamped to at least 1.
    pub fn new(max_jobs: usize) -> Self {
        Self {
            waiting: BTreeSet::new(),
            max_jobs: max_jobs.max(1),
            in_flight: 0,
        }
    }

    pub fn max_jobs(&self) -> usize {
        self.max_jobs
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn waiting(&self) -> usize {
        self.waiting.len()
    }

    /// Nothing waiting and nothing in flight.
    pub fn is_idle(&self) -> bool {
        self.waiting.is_empty() && self.in_flight == 0
    }

    pub fn push_all<I: IntoIterator<Item = TaskId>>(&mut self, ids: I) {
        for id in ids {
            self.waiting.insert(id);
        }
    }

    /// Take as many waiting tasks as there are free slots, counting them
    /// as in flight.
    pub fn take_dispatchable(&mut self) -> Vec<TaskId> {
        let free = self.max_jobs.saturating_sub(self.in_flight);
        let mut out = Vec::with_capacity(free.min(self.waiting.len()));
        while out.len() < free {
            let Some(id) = self.waiting.pop_first() else {
                break;
            };
            out.push(id);
        }
        self.in_flight += out.len();
        if !out.is_empty() {
            debug!(
                dispatched = out.len(),
                in_flight = self.in_flight,
                waiting = self.waiting.len(),
                "filled worker slots"
            );
        }
        out
    }

    /// A dispatched task reported back.
    pub fn release(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    /// Drop every waiting task (used on shutdown); returns how many.
    pub fn clear_waiting(&mut self) -> usize {
        let n = self.waiting.len();
        self.waiting.clear();
        n
    }
}
