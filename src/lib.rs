// src/lib.rs

pub mod catalog;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod flowchart;
pub mod fs;
pub mod history;
pub mod logging;
pub mod pattern;
pub mod report;
pub mod stage;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::catalog::CatalogFilter;
use crate::cli::CliArgs;
use crate::config::{load_and_validate, project_root, ConfigFile};
use crate::dag::{assemble, PipelineGraph, RunState, Scheduler, StaleReason, StalenessEvaluator};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent};
use crate::errors::{PipelineError, Result};
use crate::exec::{BoxedBackend, LocalLauncher, ProcessBackend, SlurmLauncher};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::BackendKind;

/// High-level entry point used by `main.rs`. Returns the process exit code.
///
/// This wires together:
/// - config loading and CLI overrides
/// - catalog discovery and graph assembly
/// - scheduler / ready queue / runtime
/// - the configured execution backend
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<i32> {
    let config_path = PathBuf::from(&args.config);
    let mut cfg = load_and_validate(&config_path)?;
    apply_overrides(&mut cfg, &args)?;

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let graph = build_graph(&cfg, fs.as_ref(), args.target.as_deref())?;
    let history = history::open_store(cfg.config.history, &project_root(&config_path))?;
    let flowchart_path = args.flowchart.clone().or_else(|| cfg.config.flowchart.clone());

    if args.dry_run {
        let evaluator = StalenessEvaluator::new(fs.as_ref()).with_history(history.as_deref());
        let plan = evaluator.plan(&graph);
        if let Some(path) = &flowchart_path {
            let states: Vec<RunState> = plan.iter().map(|(s, _)| *s).collect();
            flowchart::write_flowchart(fs.as_ref(), Path::new(path), &graph, Some(&states))?;
        }
        print_dry_run(&cfg, &graph, &plan);
        return Ok(0);
    }

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let backend: BoxedBackend = match cfg.config.backend {
        BackendKind::Local => Box::new(ProcessBackend::new(LocalLauncher, rt_tx.clone())?),
        BackendKind::Slurm => {
            Box::new(ProcessBackend::new(SlurmLauncher::new(&cfg.slurm), rt_tx.clone())?)
        }
    };

    // Ctrl-C → stop dispatching, let running tasks finish.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }
    drop(rt_tx);

    let scheduler = Scheduler::new(graph, fs.clone()).with_history(history);
    let core = CoreRuntime::new(scheduler, cfg.config.max_jobs);
    let runtime = Runtime::new(core, rt_rx, backend);
    let scheduler = runtime.run().await?;
    let summary = scheduler.summary();

    if let Some(path) = &flowchart_path {
        let states = scheduler.states();
        // The summary already holds the outcome; a failed write only loses the picture.
        if let Err(e) =
            flowchart::write_flowchart(fs.as_ref(), Path::new(path), scheduler.graph(), Some(&states))
        {
            let chain = format!("{e:#}");
            warn!(error = %chain, "could not write flowchart");
        }
    }

    println!("{summary}");
    Ok(summary.exit_code())
}

/// Apply `--root` and `--jobs` on top of the loaded config.
pub fn apply_overrides(cfg: &mut ConfigFile, args: &CliArgs) -> Result<()> {
    if let Some(root) = &args.root {
        cfg.catalog.root = root.clone();
    }
    if let Some(jobs) = args.jobs {
        if jobs == 0 {
            return Err(PipelineError::ConfigError("--jobs must be >= 1".to_string()));
        }
        cfg.config.max_jobs = jobs;
    }
    Ok(())
}

/// Discover the catalog and assemble the (optionally restricted) graph.
pub fn build_graph(cfg: &ConfigFile, fs: &dyn FileSystem, target: Option<&str>) -> Result<PipelineGraph> {
    let filter = CatalogFilter::new(
        cfg.catalog.suffixes.clone(),
        cfg.catalog.include.clone(),
        &cfg.catalog.exclude,
    )
    .map_err(|e| PipelineError::ConfigError(format!("[catalog]: {e:#}")))?;
    let catalog = catalog::list(fs, Path::new(&cfg.catalog.root), &filter);
    info!(
        root = %cfg.catalog.root,
        paths = catalog.len(),
        warnings = catalog.warnings().len(),
        "catalog discovered"
    );

    let graph = assemble(cfg.stages(), &catalog)?;
    match target {
        Some(stage) => {
            let sub = graph.up_to(stage)?;
            info!(target = %stage, tasks = sub.len(), of = graph.len(), "restricted run to target");
            Ok(sub)
        }
        None => Ok(graph),
    }
}

/// Dry-run output: every task with its predicted state and reason.
fn print_dry_run(cfg: &ConfigFile, graph: &PipelineGraph, plan: &[(RunState, Option<StaleReason>)]) {
    println!("asmpipe dry-run");
    println!("  config.max_jobs = {}", cfg.config.max_jobs);
    println!("  config.backend = {:?}", cfg.config.backend);
    println!("  catalog.root = {}", cfg.catalog.root);
    println!();

    let mut to_run = 0;
    for stage in graph.stages() {
        let ids: Vec<_> = graph.tasks_of_stage(stage).collect();
        let kind = cfg
            .stage(stage)
            .map(|s| s.kind.to_string())
            .unwrap_or_default();
        println!("stage {stage} ({kind}, {} task(s)):", ids.len());
        for id in ids {
            let task = graph.task(id);
            let (state, reason) = &plan[id.index()];
            if *state == RunState::Runnable {
                to_run += 1;
            }
            match reason {
                Some(r) => println!("  - {task}: {state} ({r})"),
                None => println!("  - {task}: {state}"),
            }
            for input in &task.inputs {
                println!("      in:  {input}");
            }
            for output in &task.outputs {
                println!("      out: {output}");
            }
        }
    }

    println!();
    println!("{to_run} of {} task(s) would run", graph.len());
    debug!("dry-run complete (no execution)");
}
