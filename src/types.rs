use std::fmt;
use std::path::Path;

use serde::Deserialize;

/// Grouping semantics of a stage.
///
/// - `Originate`: no inputs; a single task with a fixed output list.
/// - `Transform`: one task per matched input.
/// - `Collate`: matched inputs sharing the same non-variant captures are
///   grouped into one task (e.g. R1 + R2 of a library).
/// - `Subdivide`: one task per matched input, with several declared outputs.
/// - `Merge`: every candidate input collapses into exactly one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Originate,
    Transform,
    Collate,
    Subdivide,
    Merge,
}

impl StageKind {
    /// Kinds that derive one or more tasks from match rules.
    pub fn uses_match_rules(self) -> bool {
        matches!(
            self,
            StageKind::Transform | StageKind::Collate | StageKind::Subdivide
        )
    }

    /// Kinds whose outputs are a fixed list (no placeholders allowed).
    pub fn has_fixed_outputs(self) -> bool {
        matches!(self, StageKind::Originate | StageKind::Merge)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageKind::Originate => "originate",
            StageKind::Transform => "transform",
            StageKind::Collate => "collate",
            StageKind::Subdivide => "subdivide",
            StageKind::Merge => "merge",
        };
        f.write_str(s)
    }
}

/// Which execution backend runs the stage scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Run scripts as local child processes.
    Local,
    /// Submit scripts to a Slurm cluster with `sbatch --wait`.
    Slurm,
}

impl Default for BackendKind {
    fn default() -> Self {
        BackendKind::Local
    }
}

/// Mode for recording task completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
    /// Staleness is decided from modification times alone.
    Off,
    /// Record completions in memory only (lost on exit).
    Memory,
    /// Record completions in a file (`.asmpipe/history`).
    File,
}

impl Default for HistoryMode {
    fn default() -> Self {
        HistoryMode::Off
    }
}

/// Opaque identifier naming one filesystem artifact.
///
/// Paths are kept exactly as discovered or rendered (no normalisation), so
/// two spellings of the same file are two different artifacts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FilePath(String);

impl FilePath {
    pub fn new(path: impl Into<String>) -> Self {
        FilePath(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for FilePath {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl From<&str> for FilePath {
    fn from(s: &str) -> Self {
        FilePath(s.to_string())
    }
}

impl From<String> for FilePath {
    fn from(s: String) -> Self {
        FilePath(s)
    }
}

impl From<&Path> for FilePath {
    fn from(p: &Path) -> Self {
        FilePath(p.to_string_lossy().replace('\\', "/"))
    }
}
