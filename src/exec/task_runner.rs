// src/exec/task_runner.rs

//! Individual task process runner.

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::exec::launcher::Launcher;

/// Run a single task process and emit exactly one `TaskCompleted` event.
///
/// Launch errors (unwritable output directory, missing script, ...) are
/// reported as `Failed(-1)`; there are no retries.
pub async fn run_task<L: Launcher + ?Sized>(
    task: ScheduledTask,
    launcher: &L,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    let id = task.id;
    let outcome = match run_task_inner(&task, launcher).await {
        Ok(outcome) => outcome,
        Err(err) => {
            let chain = format!("{err:#}");
            error!(task = %task.label, error = %chain, "task execution error");
            TaskOutcome::Failed(-1)
        }
    };

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted { task: id, outcome })
        .await
        .is_err()
    {
        debug!(task = %task.label, "runtime gone; dropping completion");
    }
}

async fn run_task_inner<L: Launcher + ?Sized>(task: &ScheduledTask, launcher: &L) -> Result<TaskOutcome> {
    for out in &task.outputs {
        if let Some(parent) = out.as_path().parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating output directory {:?}", parent))?;
        }
    }

    let mut cmd = launcher.command(task)?;
    info!(
        task = %task.label,
        stage = %task.stage,
        backend = launcher.name(),
        script = %task.script.path,
        inputs = task.inputs.len(),
        outputs = task.outputs.len(),
        "starting task process"
    );

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for task '{}'", task.label))?;

    // Always consume both pipes so buffers don't fill; log at debug.
    if let Some(stdout) = child.stdout.take() {
        forward_lines(task.label.clone(), "stdout", stdout);
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(task.label.clone(), "stderr", stderr);
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of task '{}'", task.label))?;

    let code = status.code().unwrap_or(-1);
    info!(
        task = %task.label,
        exit_code = code,
        success = status.success(),
        "task process exited"
    );

    Ok(if status.success() {
        TaskOutcome::Success
    } else {
        TaskOutcome::Failed(code)
    })
}

fn forward_lines<R>(label: String, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(task = %label, stream, "{}", line);
        }
    });
}
