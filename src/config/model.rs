// src/config/model.rs

use serde::Deserialize;

use crate::stage::StageDef;
use crate::types::{BackendKind, HistoryMode, StageKind};

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// max_jobs = 8
/// backend = "local"
///
/// [catalog]
/// root = "data"
/// suffixes = [".fastq.gz", ".fastq"]
///
/// [default]
/// cpus = 1
///
/// [[stage]]
/// name = "merge"
/// kind = "transform"
/// inputs = "root"
/// match = [{ regex = '.+/(?P<LIB>[^_/]+)_R(?P<RN>\d)\.fastq\.gz' }]
/// outputs = ["output/merged/{LIB}_R{RN}.fastq.gz"]
/// script = "src/sh/merge_fq"
/// ```
///
/// All sections except `[[stage]]` are optional and have defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Global run behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Discovery settings from `[catalog]`.
    #[serde(default)]
    pub catalog: CatalogSection,

    /// Default resource request from `[default]`.
    #[serde(default)]
    pub default: ResourceSection,

    /// Cluster submission settings from `[slurm]`.
    #[serde(default)]
    pub slurm: SlurmSection,

    /// Stages in declaration order, from `[[stage]]`.
    #[serde(default)]
    pub stage: Vec<StageConfig>,
}

/// Validated configuration with compiled stage definitions.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub catalog: CatalogSection,
    pub slurm: SlurmSection,
    stages: Vec<StageDef>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        catalog: CatalogSection,
        slurm: SlurmSection,
        stages: Vec<StageDef>,
    ) -> Self {
        Self {
            config,
            catalog,
            slurm,
            stages,
        }
    }

    /// Compiled stages in declaration order.
    pub fn stages(&self) -> &[StageDef] {
        &self.stages
    }

    pub fn stage(&self, name: &str) -> Option<&StageDef> {
        self.stages.iter().find(|s| s.name == name)
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Maximum number of tasks dispatched concurrently.
    #[serde(default = "default_max_jobs")]
    pub max_jobs: usize,

    /// Execution backend (`"local"` or `"slurm"`).
    #[serde(default)]
    pub backend: BackendKind,

    /// Completion history mode (`"off"`, `"memory"` or `"file"`).
    #[serde(default)]
    pub history: HistoryMode,

    /// Optional path of a Graphviz DOT flowchart, written after the run with
    /// final task states (predicted states under `--dry-run`).
    #[serde(default)]
    pub flowchart: Option<String>,
}

fn default_max_jobs() -> usize {
    8
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            max_jobs: default_max_jobs(),
            backend: BackendKind::default(),
            history: HistoryMode::default(),
            flowchart: None,
        }
    }
}

/// `[catalog]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSection {
    /// Directory tree scanned for raw inputs.
    #[serde(default = "default_catalog_root")]
    pub root: String,

    /// File name suffixes that enter the catalog.
    #[serde(default = "default_suffixes")]
    pub suffixes: Vec<String>,

    /// If non-empty, only paths containing one of these substrings are kept.
    #[serde(default)]
    pub include: Vec<String>,

    /// Glob patterns (relative to `root`) removed from the catalog.
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_catalog_root() -> String {
    "data".to_string()
}

fn default_suffixes() -> Vec<String> {
    vec![".fastq.gz".to_string(), ".fastq".to_string()]
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            root: default_catalog_root(),
            suffixes: default_suffixes(),
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

/// Resource request, used both for `[default]` and `[stage.resources]`.
///
/// Unset fields fall back to `[default]`, then to 1 task / 1 CPU.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct ResourceSection {
    #[serde(default)]
    pub ntasks: Option<u32>,
    #[serde(default)]
    pub cpus: Option<u32>,
    /// Memory per CPU in megabytes.
    #[serde(default)]
    pub mem_mb: Option<u64>,
    /// Wall-time hint in the backend's format (e.g. `"02:00:00"`).
    #[serde(default)]
    pub time: Option<String>,
}

/// `[slurm]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SlurmSection {
    /// Submission command.
    #[serde(default = "default_sbatch")]
    pub sbatch: String,

    /// Directory receiving `<job>.<id>.out` logs.
    #[serde(default = "default_slurm_log_dir")]
    pub log_dir: String,

    /// Extra arguments passed verbatim to `sbatch`.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_sbatch() -> String {
    "sbatch".to_string()
}

fn default_slurm_log_dir() -> String {
    "ruffus".to_string()
}

impl Default for SlurmSection {
    fn default() -> Self {
        Self {
            sbatch: default_sbatch(),
            log_dir: default_slurm_log_dir(),
            extra_args: Vec::new(),
        }
    }
}

/// One `[[stage]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    /// Unique stage name.
    pub name: String,

    /// Grouping semantics.
    pub kind: StageKind,

    /// `"root"` for raw discovered files, or the producer stage name(s).
    #[serde(default)]
    pub inputs: Option<InputsSpec>,

    /// Match rules; an input is kept if any rule matches it.
    #[serde(default, rename = "match")]
    pub rules: Vec<RuleSpec>,

    /// Capture field that varies inside one `collate` group (e.g. read number).
    #[serde(default)]
    pub variant: Option<String>,

    /// Output templates.
    #[serde(default)]
    pub outputs: Vec<String>,

    /// External script invoked for each task.
    pub script: String,

    /// Job name for the backend; defaults to the stage name.
    #[serde(default)]
    pub job_name: Option<String>,

    /// Per-stage resource overrides.
    #[serde(default)]
    pub resources: ResourceSection,

    /// Stages that must finish first without providing inputs.
    #[serde(default)]
    pub follows: Vec<String>,

    /// Matching zero inputs is a configuration error when true.
    #[serde(default)]
    pub required: bool,
}

/// Literal value of `inputs` naming the discovery catalog.
pub const ROOT_INPUTS: &str = "root";

/// `inputs = "root"`, `inputs = "stage"` or `inputs = ["a", "b"]`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum InputsSpec {
    One(String),
    Many(Vec<String>),
}

impl InputsSpec {
    pub fn is_root(&self) -> bool {
        matches!(self, InputsSpec::One(s) if s == ROOT_INPUTS)
    }

    /// Producer stage names (empty for `"root"`).
    pub fn producers(&self) -> Vec<String> {
        match self {
            InputsSpec::One(s) if s == ROOT_INPUTS => Vec::new(),
            InputsSpec::One(s) => vec![s.clone()],
            InputsSpec::Many(v) => v.clone(),
        }
    }
}

/// One entry of `match = [...]`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleSpec {
    Regex(String),
    Suffix(String),
    Fixed(String),
}
