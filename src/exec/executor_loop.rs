// src/exec/executor_loop.rs

//! Main executor loop that manages running task processes.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::exec::launcher::Launcher;
use crate::exec::task_runner::run_task;

/// Spawn the background executor loop.
///
/// The returned `mpsc::Sender<ScheduledTask>` is what `ProcessBackend`
/// forwards dispatched tasks to. Each task is executed in its own Tokio
/// task; the engine core already bounds how many are in flight, so the
/// loop never queues or drops work itself.
pub fn spawn_executor<L: Launcher>(
    launcher: Arc<L>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    tokio::spawn(async move {
        info!(backend = launcher.name(), "executor loop started");

        while let Some(task) = rx.recv().await {
            let launcher = launcher.clone();
            let rt_tx = runtime_tx.clone();
            tokio::spawn(async move {
                let label = task.label.clone();
                run_task(task, launcher.as_ref(), rt_tx).await;
                debug!(task = %label, "task runner future finished");
            });
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}
