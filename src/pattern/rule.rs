// src/pattern/rule.rs

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;

use crate::config::model::RuleSpec;
use crate::types::FilePath;

/// Field names resolved from the matched path itself rather than from a
/// capture group.
pub const IMPLICIT_FIELDS: &[&str] = &["path", "dir", "basename", "stem"];

/// Compiled matching rule for one stage.
#[derive(Clone)]
pub enum MatchRule {
    /// Regular expression with optional named groups.
    Regex { regex: Regex, names: Vec<String> },
    /// Matches paths ending in `literal`; captures the prefix as `prefix`.
    Suffix { literal: String },
    /// Matches paths containing `literal`; captures nothing.
    Fixed { literal: String },
}

impl fmt::Debug for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchRule::Regex { regex, names } => f
                .debug_struct("Regex")
                .field("pattern", &regex.as_str())
                .field("names", names)
                .finish(),
            MatchRule::Suffix { literal } => f.debug_struct("Suffix").field("literal", literal).finish(),
            MatchRule::Fixed { literal } => f.debug_struct("Fixed").field("literal", literal).finish(),
        }
    }
}

impl MatchRule {
    /// Compile a rule from its config form.
    ///
    /// The error string describes the invalid regex.
    pub fn compile(spec: &RuleSpec) -> Result<Self, String> {
        match spec {
            RuleSpec::Regex(pattern) => {
                let regex =
                    Regex::new(pattern).map_err(|e| format!("invalid regex `{pattern}`: {e}"))?;
                let names = regex
                    .capture_names()
                    .flatten()
                    .map(|s| s.to_string())
                    .collect();
                Ok(MatchRule::Regex { regex, names })
            }
            RuleSpec::Suffix(literal) => Ok(MatchRule::Suffix {
                literal: literal.clone(),
            }),
            RuleSpec::Fixed(literal) => Ok(MatchRule::Fixed {
                literal: literal.clone(),
            }),
        }
    }

    /// Named captures this rule produces, in group order.
    pub fn capture_names(&self) -> Vec<String> {
        match self {
            MatchRule::Regex { names, .. } => names.clone(),
            MatchRule::Suffix { .. } => vec!["prefix".to_string()],
            MatchRule::Fixed { .. } => Vec::new(),
        }
    }

    /// 1-based group position a field refers to, whether given by name or
    /// by index.
    pub fn group_position(&self, key: &str) -> Option<usize> {
        if let Ok(idx) = key.parse::<usize>() {
            return (1..=self.group_count()).contains(&idx).then_some(idx);
        }
        match self {
            MatchRule::Regex { regex, .. } => regex
                .capture_names()
                .position(|n| n == Some(key)),
            MatchRule::Suffix { .. } => (key == "prefix").then_some(1),
            MatchRule::Fixed { .. } => None,
        }
    }

    /// Number of positional groups (excluding the whole match).
    pub fn group_count(&self) -> usize {
        match self {
            MatchRule::Regex { regex, .. } => regex.captures_len() - 1,
            MatchRule::Suffix { .. } => 1,
            MatchRule::Fixed { .. } => 0,
        }
    }

    /// Apply the rule to a path, returning its captures or `None` if the
    /// path does not match.
    pub fn apply(&self, path: &FilePath) -> Option<CaptureSet> {
        let s = path.as_str();
        match self {
            MatchRule::Regex { regex, names } => {
                let caps = regex.captures(s)?;
                let positional = (1..caps.len())
                    .map(|i| caps.get(i).map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect();
                let named = names
                    .iter()
                    .map(|n| {
                        let v = caps.name(n).map(|m| m.as_str()).unwrap_or_default();
                        (n.clone(), v.to_string())
                    })
                    .collect();
                let labels = regex
                    .capture_names()
                    .enumerate()
                    .skip(1)
                    .map(|(i, n)| n.map_or_else(|| i.to_string(), str::to_string))
                    .collect();
                Some(CaptureSet {
                    named,
                    positional,
                    labels,
                    source: path.clone(),
                })
            }
            MatchRule::Suffix { literal } => {
                let prefix = s.strip_suffix(literal.as_str())?.to_string();
                let mut named = BTreeMap::new();
                named.insert("prefix".to_string(), prefix.clone());
                Some(CaptureSet {
                    named,
                    positional: vec![prefix],
                    labels: vec!["prefix".to_string()],
                    source: path.clone(),
                })
            }
            MatchRule::Fixed { literal } => {
                if s.contains(literal.as_str()) {
                    Some(CaptureSet {
                        named: BTreeMap::new(),
                        positional: Vec::new(),
                        labels: Vec::new(),
                        source: path.clone(),
                    })
                } else {
                    None
                }
            }
        }
    }
}

/// Values captured from one matched path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSet {
    named: BTreeMap<String, String>,
    positional: Vec<String>,
    /// Group name per positional slot, or its 1-based index when unnamed.
    labels: Vec<String>,
    source: FilePath,
}

impl CaptureSet {
    /// The path these captures were extracted from.
    pub fn source(&self) -> &FilePath {
        &self.source
    }

    /// Look up a field: named group, positional group (`"1"`, `"2"`, ...),
    /// then implicit path field.
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(v) = self.named.get(key) {
            return Some(v.clone());
        }
        if let Ok(idx) = key.parse::<usize>() {
            return idx
                .checked_sub(1)
                .and_then(|i| self.positional.get(i))
                .cloned();
        }
        implicit_field(&self.source, key)
    }

    /// Key used by `collate` grouping: every explicit capture except the
    /// variant field, which may be given by name or by position.
    pub fn grouping_key(&self, variant: Option<&str>) -> Vec<(String, String)> {
        self.positional
            .iter()
            .zip(&self.labels)
            .enumerate()
            .filter(|(i, (_, label))| match variant {
                Some(v) => v != label.as_str() && v != (i + 1).to_string(),
                None => true,
            })
            .map(|(_, (value, label))| (label.clone(), value.clone()))
            .collect()
    }
}

fn implicit_field(source: &FilePath, key: &str) -> Option<String> {
    let path = source.as_path();
    let basename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match key {
        "path" => Some(source.as_str().to_string()),
        "dir" => Some(
            path.parent()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default(),
        ),
        "stem" => Some(basename.split('.').next().unwrap_or_default().to_string()),
        "basename" => Some(basename),
        _ => None,
    }
}
