pub mod builders;
pub mod fake_executor;

use std::sync::{Arc, Mutex, Once};

use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

use asmpipe::config::ConfigFile;
use asmpipe::dag::{ScheduledTask, Scheduler};
use asmpipe::engine::{CoreRuntime, Runtime, RuntimeEvent};
use asmpipe::fs::mock::MockFileSystem;
use asmpipe::fs::FileSystem;

use crate::fake_executor::FakeBackend;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Result of one pipeline run against the mock filesystem.
pub struct FakeRun {
    pub scheduler: Scheduler,
    /// Dispatched tasks in dispatch order.
    pub executed: Vec<ScheduledTask>,
}

impl FakeRun {
    pub fn executed_labels(&self) -> Vec<String> {
        self.executed.iter().map(|t| t.label.clone()).collect()
    }
}

/// Discover, assemble and run `cfg` over `fs` with a [`FakeBackend`];
/// tasks of `failing` stages fail.
pub async fn run_with_fake_backend(
    cfg: &ConfigFile,
    fs: &MockFileSystem,
    failing: &[&str],
) -> FakeRun {
    let graph = asmpipe::build_graph(cfg, fs, None).expect("graph assembly failed");

    let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let mut backend = FakeBackend::new(tx, fs.clone(), Arc::clone(&executed));
    for stage in failing {
        backend = backend.failing(stage);
    }

    let shared: Arc<dyn FileSystem> = Arc::new(fs.clone());
    let scheduler = Scheduler::new(graph, shared);
    let core = CoreRuntime::new(scheduler, cfg.config.max_jobs);
    let runtime = Runtime::new(core, rx, backend);

    let scheduler = with_timeout(runtime.run()).await.expect("runtime failed");
    let executed = executed.lock().unwrap().clone();
    FakeRun { scheduler, executed }
}
