// src/catalog.rs

//! Path catalog: recursive discovery of raw input artifacts.
//!
//! The walk follows symbolic links into every subdirectory, stopping only
//! where a link leads back to a directory on the current path, and keeps a deterministic
//! order: within a directory, files come first in name order, then each
//! subdirectory in name order.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info, warn};

use crate::fs::FileSystem;
use crate::types::FilePath;

/// Predicate deciding which regular files enter the catalog.
///
/// - `suffixes`: the file name must end with one of these (empty = any).
/// - `include`: if non-empty, the path must contain one of these substrings.
/// - `exclude`: glob patterns matched against the path relative to the root.
#[derive(Debug, Clone)]
pub struct CatalogFilter {
    suffixes: Vec<String>,
    include: Vec<String>,
    exclude: Option<GlobSet>,
}

impl CatalogFilter {
    pub fn new(suffixes: Vec<String>, include: Vec<String>, exclude: &[String]) -> Result<Self> {
        let exclude = if exclude.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pat in exclude {
                let glob =
                    Glob::new(pat).with_context(|| format!("invalid exclude glob pattern: {pat}"))?;
                builder.add(glob);
            }
            Some(builder.build()?)
        };

        Ok(Self {
            suffixes,
            include,
            exclude,
        })
    }

    /// Filter that accepts files ending in any of `suffixes`.
    pub fn suffixes<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            suffixes: suffixes.into_iter().map(Into::into).collect(),
            include: Vec::new(),
            exclude: None,
        }
    }

    /// Whether the file at `path` (relative form `rel`) passes the filter.
    pub fn accepts(&self, path: &Path, rel: &str) -> bool {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => return false,
        };

        if !self.suffixes.is_empty() && !self.suffixes.iter().any(|s| name.ends_with(s.as_str())) {
            return false;
        }

        let full = path.to_string_lossy();
        if !self.include.is_empty() && !self.include.iter().any(|s| full.contains(s.as_str())) {
            return false;
        }

        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel) {
                return false;
            }
        }

        true
    }
}

/// Result of a catalog walk.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    paths: Vec<FilePath>,
    warnings: Vec<String>,
}

impl Catalog {
    /// Build a catalog from an explicit path list (no filesystem access).
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<FilePath>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            warnings: Vec::new(),
        }
    }

    pub fn paths(&self) -> &[FilePath] {
        &self.paths
    }

    /// Directories that could not be read during the walk.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Recursively list `root`, keeping the regular files accepted by `filter`.
///
/// A missing root yields an empty catalog. An unreadable subdirectory is
/// logged and recorded in [`Catalog::warnings`]; its siblings are still walked.
pub fn list(fs: &dyn FileSystem, root: &Path, filter: &CatalogFilter) -> Catalog {
    let mut catalog = Catalog::default();

    if !fs.is_dir(root) {
        warn!(root = %root.display(), "discovery root does not exist; catalog is empty");
        return catalog;
    }

    // Each pending directory carries the canonical paths of its ancestors.
    // Only a link back into that chain is a loop; a second link to a
    // directory elsewhere is walked again.
    let mut stack: Vec<(PathBuf, Vec<PathBuf>)> = vec![(root.to_path_buf(), Vec::new())];

    while let Some((dir, mut ancestors)) = stack.pop() {
        let key = fs.canonicalize(&dir).unwrap_or_else(|_| dir.clone());
        if ancestors.contains(&key) {
            debug!(dir = %dir.display(), "symlink loop back to an ancestor; skipping");
            continue;
        }
        ancestors.push(key);

        let mut entries = match fs.read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                let msg = format!("cannot read directory {}: {err:#}", dir.display());
                warn!(dir = %dir.display(), error = %err, "skipping unreadable directory");
                catalog.warnings.push(msg);
                continue;
            }
        };
        entries.sort();

        let mut subdirs = Vec::new();
        for path in entries {
            if fs.is_dir(&path) {
                subdirs.push(path);
            } else if fs.is_file(&path) {
                let rel = relative_str(root, &path);
                if filter.accepts(&path, &rel) {
                    catalog.paths.push(FilePath::from(path.as_path()));
                }
            }
        }

        // Reverse so the stack pops subdirectories in name order.
        stack.extend(subdirs.into_iter().rev().map(|d| (d, ancestors.clone())));
    }

    info!(
        root = %root.display(),
        files = catalog.paths.len(),
        warnings = catalog.warnings.len(),
        "catalog walk finished"
    );

    catalog
}

/// Convert a path into a string relative to `root`, with forward slashes.
fn relative_str(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}
