// src/report.rs

//! End-of-run summary.

use std::fmt;

use crate::dag::graph::PipelineGraph;
use crate::dag::task_info::RunState;

/// Task counts for one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageTally {
    pub stage: String,
    pub up_to_date: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Tasks left `Pending`/`Runnable`/`Running` (interrupted run).
    pub not_finished: usize,
}

impl StageTally {
    pub fn total(&self) -> usize {
        self.up_to_date + self.succeeded + self.failed + self.skipped + self.not_finished
    }

    fn add(&mut self, state: RunState) {
        match state {
            RunState::UpToDate => self.up_to_date += 1,
            RunState::Succeeded => self.succeeded += 1,
            RunState::Failed => self.failed += 1,
            RunState::Skipped => self.skipped += 1,
            RunState::Pending | RunState::Runnable | RunState::Running => self.not_finished += 1,
        }
    }
}

/// Per-stage tallies in resolved stage order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub stages: Vec<StageTally>,
}

impl RunSummary {
    /// `states` is indexed by `TaskId::index()`.
    pub fn from_states(graph: &PipelineGraph, states: &[RunState]) -> Self {
        let mut stages: Vec<StageTally> = graph
            .stages()
            .iter()
            .map(|s| StageTally {
                stage: s.clone(),
                ..StageTally::default()
            })
            .collect();

        for id in graph.task_ids() {
            let stage = &graph.task(id).stage;
            let state = states.get(id.index()).copied().unwrap_or(RunState::Pending);
            if let Some(tally) = stages.iter_mut().find(|t| &t.stage == stage) {
                tally.add(state);
            }
        }

        Self { stages }
    }

    pub fn stage(&self, name: &str) -> Option<&StageTally> {
        self.stages.iter().find(|t| t.stage == name)
    }

    pub fn total(&self) -> StageTally {
        let mut all = StageTally {
            stage: "total".to_string(),
            ..StageTally::default()
        };
        for t in &self.stages {
            all.up_to_date += t.up_to_date;
            all.succeeded += t.succeeded;
            all.failed += t.failed;
            all.skipped += t.skipped;
            all.not_finished += t.not_finished;
        }
        all
    }

    /// Any task ended `Failed` or `Skipped`, or never finished.
    pub fn has_failures(&self) -> bool {
        let all = self.total();
        all.failed > 0 || all.skipped > 0 || all.not_finished > 0
    }

    /// Process exit code for this run.
    pub fn exit_code(&self) -> i32 {
        if self.has_failures() { 1 } else { 0 }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .stages
            .iter()
            .map(|t| t.stage.len())
            .chain(std::iter::once("stage".len()))
            .max()
            .unwrap_or(5);

        writeln!(
            f,
            "{:<width$}  {:>10}  {:>9}  {:>6}  {:>7}",
            "stage", "up-to-date", "succeeded", "failed", "skipped"
        )?;
        let total = self.total();
        for t in self.stages.iter().chain(std::iter::once(&total)) {
            write!(
                f,
                "{:<width$}  {:>10}  {:>9}  {:>6}  {:>7}",
                t.stage, t.up_to_date, t.succeeded, t.failed, t.skipped
            )?;
            if t.not_finished > 0 {
                write!(f, "  ({} not finished)", t.not_finished)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
