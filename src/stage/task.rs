// src/stage/task.rs

//! Task instances: concrete units of work derived from a stage.

use std::fmt;

use crate::config::model::ResourceSection;
use crate::types::FilePath;

/// External script plus the job name the backend reports it under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScriptRef {
    pub path: String,
    pub job_name: String,
}

/// Resources requested from the execution backend for one task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRequest {
    pub ntasks: u32,
    pub cpus: u32,
    /// Memory per CPU in megabytes.
    pub mem_mb: Option<u64>,
    /// Wall-time hint; enforcement is the backend's business.
    pub time: Option<String>,
}

impl Default for ResourceRequest {
    fn default() -> Self {
        Self {
            ntasks: 1,
            cpus: 1,
            mem_mb: None,
            time: None,
        }
    }
}

impl ResourceRequest {
    /// Resolve a stage override against the `[default]` section.
    pub fn resolve(stage: &ResourceSection, default: &ResourceSection) -> Self {
        let base = ResourceRequest::default();
        Self {
            ntasks: stage.ntasks.or(default.ntasks).unwrap_or(base.ntasks),
            cpus: stage.cpus.or(default.cpus).unwrap_or(base.cpus),
            mem_mb: stage.mem_mb.or(default.mem_mb),
            time: stage.time.clone().or_else(|| default.time.clone()),
        }
    }
}

/// One unit of work: a stage applied to one group of inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInstance {
    pub stage: String,
    /// Position of this instance within its stage (discovery order).
    pub index: usize,
    pub inputs: Vec<FilePath>,
    pub outputs: Vec<FilePath>,
    pub script: ScriptRef,
    pub resources: ResourceRequest,
}

/// Short human label, e.g. `trim_cutadapt[2]`.
impl fmt::Display for TaskInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.stage, self.index)
    }
}
