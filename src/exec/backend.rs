// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of a raw mpsc sender,
//! so tests can swap in a fake executor while production uses
//! [`ProcessBackend`].
//!
//! - `ProcessBackend<LocalLauncher>` runs scripts as local processes.
//! - `ProcessBackend<SlurmLauncher>` submits them with `sbatch --wait`.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which tasks were dispatched and directly emits `TaskCompleted` events.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::errors::{Error, Result};
use crate::exec::executor_loop::spawn_executor;
use crate::exec::launcher::Launcher;

/// Trait abstracting how dispatched tasks are executed.
///
/// Submitting only hands the tasks over; each task's completion arrives
/// later as a `RuntimeEvent::TaskCompleted` on the runtime channel.
pub trait ExecutorBackend: Send {
    fn submit(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: one child process per task, built by `L`.
pub struct ProcessBackend<L: Launcher> {
    tx: mpsc::Sender<ScheduledTask>,
    launcher: Arc<L>,
}

impl<L: Launcher> ProcessBackend<L> {
    /// Spawns the background executor loop immediately.
    pub fn new(launcher: L, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Result<Self> {
        launcher.prepare()?;
        let launcher = Arc::new(launcher);
        let tx = spawn_executor(launcher.clone(), runtime_tx);
        Ok(Self { tx, launcher })
    }
}

impl<L: Launcher> ExecutorBackend for ProcessBackend<L> {
    fn submit(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();
        debug!(backend = self.launcher.name(), count = tasks.len(), "submitting tasks");

        Box::pin(async move {
            for task in tasks {
                tx.send(task).await.map_err(Error::from)?;
            }
            Ok(())
        })
    }
}

/// Backend selected at runtime from `[config].backend`.
pub type BoxedBackend = Box<dyn ExecutorBackend>;

impl ExecutorBackend for Box<dyn ExecutorBackend> {
    fn submit(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        (**self).submit(tasks)
    }
}
