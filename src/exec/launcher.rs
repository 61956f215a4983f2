// src/exec/launcher.rs

//! How one task becomes one child process.
//!
//! A [`Launcher`] turns a [`ScheduledTask`] into an argument vector. The
//! script contract is the same for every launcher: `-i` followed by the
//! ordered inputs, then `-o` followed by the ordered outputs.

use std::fmt::Debug;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::process::Command;

use crate::config::model::SlurmSection;
use crate::dag::ScheduledTask;

pub trait Launcher: Send + Sync + Debug + 'static {
    fn name(&self) -> &'static str;

    /// Program followed by its arguments.
    fn argv(&self, task: &ScheduledTask) -> Vec<String>;

    /// One-off setup before the first launch.
    fn prepare(&self) -> Result<()> {
        Ok(())
    }

    fn command(&self, task: &ScheduledTask) -> Result<Command> {
        let argv = self.argv(task);
        let (program, args) = argv
            .split_first()
            .with_context(|| format!("{} launcher produced an empty command", self.name()))?;
        let mut cmd = Command::new(program);
        cmd.args(args);
        Ok(cmd)
    }
}

/// `<script> -i <inputs>... -o <outputs>...`
pub fn script_args(task: &ScheduledTask) -> Vec<String> {
    let mut args = Vec::with_capacity(task.inputs.len() + task.outputs.len() + 3);
    args.push(task.script.path.clone());
    args.push("-i".to_string());
    args.extend(task.inputs.iter().map(|p| p.to_string()));
    args.push("-o".to_string());
    args.extend(task.outputs.iter().map(|p| p.to_string()));
    args
}

/// Runs the script directly on this machine.
#[derive(Debug, Clone, Default)]
pub struct LocalLauncher;

impl Launcher for LocalLauncher {
    fn name(&self) -> &'static str {
        "local"
    }

    fn argv(&self, task: &ScheduledTask) -> Vec<String> {
        script_args(task)
    }
}

/// Submits the script with `sbatch --wait`, so the child exits when the
/// job does and its exit status is the job's.
#[derive(Debug, Clone)]
pub struct SlurmLauncher {
    sbatch: String,
    log_dir: PathBuf,
    extra_args: Vec<String>,
}

impl SlurmLauncher {
    pub fn new(cfg: &SlurmSection) -> Self {
        Self {
            sbatch: cfg.sbatch.clone(),
            log_dir: PathBuf::from(&cfg.log_dir),
            extra_args: cfg.extra_args.clone(),
        }
    }
}

impl Launcher for SlurmLauncher {
    fn name(&self) -> &'static str {
        "slurm"
    }

    fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.log_dir)
            .with_context(|| format!("creating slurm log directory {:?}", self.log_dir))
    }

    fn argv(&self, task: &ScheduledTask) -> Vec<String> {
        let res = &task.resources;
        let job = &task.script.job_name;

        let mut argv = vec![
            self.sbatch.clone(),
            "--wait".to_string(),
            "--parsable".to_string(),
            format!("--job-name={job}"),
            format!("--ntasks={}", res.ntasks),
            format!("--cpus-per-task={}", res.cpus),
        ];
        if let Some(mem) = res.mem_mb {
            argv.push(format!("--mem-per-cpu={mem}"));
        }
        if let Some(time) = &res.time {
            argv.push(format!("--time={time}"));
        }
        argv.push(format!(
            "--output={}",
            self.log_dir.join(format!("{job}.%j.out")).to_string_lossy()
        ));
        argv.extend(self.extra_args.iter().cloned());
        argv.extend(script_args(task));
        argv
    }
}
