use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use asmpipe::dag::ScheduledTask;
use asmpipe::engine::{RuntimeEvent, TaskOutcome};
use asmpipe::errors::Result;
use asmpipe::exec::ExecutorBackend;
use asmpipe::fs::mock::MockFileSystem;

/// A fake backend that:
/// - records every dispatched task
/// - "runs" it by writing each declared output into the mock filesystem
/// - immediately reports `TaskCompleted` for it
///
/// Tasks of stages listed in `failing_stages` report `Failed(1)` and write
/// nothing.
pub struct FakeBackend {
    runtime_tx: tokio::sync::mpsc::Sender<RuntimeEvent>,
    fs: MockFileSystem,
    executed: Arc<Mutex<Vec<ScheduledTask>>>,
    failing_stages: HashSet<String>,
}

impl FakeBackend {
    pub fn new(
        runtime_tx: tokio::sync::mpsc::Sender<RuntimeEvent>,
        fs: MockFileSystem,
        executed: Arc<Mutex<Vec<ScheduledTask>>>,
    ) -> Self {
        Self {
            runtime_tx,
            fs,
            executed,
            failing_stages: HashSet::new(),
        }
    }

    pub fn failing(mut self, stage: &str) -> Self {
        self.failing_stages.insert(stage.to_string());
        self
    }
}

impl ExecutorBackend for FakeBackend {
    fn submit(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let fs = self.fs.clone();
        let executed = Arc::clone(&self.executed);
        let failing = self.failing_stages.clone();

        Box::pin(async move {
            for t in tasks {
                let outcome = if failing.contains(&t.stage) {
                    TaskOutcome::Failed(1)
                } else {
                    for out in &t.outputs {
                        fs.add_file(out.as_path(), t.label.clone());
                    }
                    TaskOutcome::Success
                };

                executed.lock().unwrap().push(t.clone());

                tx.send(RuntimeEvent::TaskCompleted { task: t.id, outcome })
                    .await
                    .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
