// src/history.rs

//! Completion history.
//!
//! After a task succeeds its fingerprint is recorded. With history enabled
//! the staleness check also requires a matching record, so outputs left
//! behind by an interrupted job are not mistaken for finished work.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::{debug, info};

use crate::stage::TaskInstance;
use crate::types::HistoryMode;

/// Relative path (from the project root) to the history file.
pub const HISTORY_FILE_PATH: &str = ".asmpipe/history";

/// Deterministic fingerprint of what a task is: its stage, script, and
/// ordered inputs and outputs.
pub fn fingerprint(task: &TaskInstance) -> String {
    let mut hasher = Hasher::new();
    hasher.update(task.stage.as_bytes());
    hasher.update(&[0]);
    hasher.update(task.script.path.as_bytes());
    hasher.update(&[0]);
    for input in &task.inputs {
        hasher.update(b"i:");
        hasher.update(input.as_str().as_bytes());
        hasher.update(&[0]);
    }
    for output in &task.outputs {
        hasher.update(b"o:");
        hasher.update(output.as_str().as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize().to_hex().to_string()
}

/// Abstract storage for completion records.
pub trait HistoryStore: Send + Sync + std::fmt::Debug {
    fn contains(&self, fingerprint: &str) -> bool;
    /// `label` is informational only.
    fn record(&mut self, fingerprint: &str, label: &str) -> Result<()>;
}

/// Open the store selected by `mode`; `Off` yields no store.
pub fn open_store(mode: HistoryMode, project_root: &Path) -> Result<Option<Box<dyn HistoryStore>>> {
    Ok(match mode {
        HistoryMode::Off => None,
        HistoryMode::Memory => Some(Box::new(MemoryHistoryStore::new())),
        HistoryMode::File => Some(Box::new(FileHistoryStore::open(project_root)?)),
    })
}

/// Records kept for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    seen: HashSet<String>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn contains(&self, fingerprint: &str) -> bool {
        self.seen.contains(fingerprint)
    }

    fn record(&mut self, fingerprint: &str, label: &str) -> Result<()> {
        self.seen.insert(fingerprint.to_string());
        debug!(task = %label, fingerprint = %fingerprint, "recorded completion (memory)");
        Ok(())
    }
}

/// Records persisted to `<root>/.asmpipe/history`, one
/// `<fingerprint> <label>` line per completion.
#[derive(Debug)]
pub struct FileHistoryStore {
    path: PathBuf,
    seen: HashSet<String>,
}

impl FileHistoryStore {
    /// Load existing records; a missing file is an empty history.
    pub fn open(root: &Path) -> Result<Self> {
        let path = root.join(HISTORY_FILE_PATH);
        let mut seen = HashSet::new();

        if path.exists() {
            let file =
                File::open(&path).with_context(|| format!("opening history file at {:?}", path))?;
            for line in BufReader::new(file).lines() {
                let line = line.with_context(|| format!("reading history file at {:?}", path))?;
                if let Some(fp) = line.split_whitespace().next() {
                    seen.insert(fp.to_string());
                }
            }
            info!(path = ?path, records = seen.len(), "loaded completion history");
        }

        Ok(Self { path, seen })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for FileHistoryStore {
    fn contains(&self, fingerprint: &str) -> bool {
        self.seen.contains(fingerprint)
    }

    fn record(&mut self, fingerprint: &str, label: &str) -> Result<()> {
        if !self.seen.insert(fingerprint.to_string()) {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating history directory at {:?}", parent))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening history file at {:?}", self.path))?;
        writeln!(file, "{fingerprint} {label}")
            .with_context(|| format!("appending to history file at {:?}", self.path))?;
        debug!(task = %label, fingerprint = %fingerprint, "recorded completion (file)");
        Ok(())
    }
}
