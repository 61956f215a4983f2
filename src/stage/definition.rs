// src/stage/definition.rs

//! Compiled stage definitions.
//!
//! A [`StageDef`] is the checked form of one `[[stage]]` entry: match
//! rules are compiled, templates parsed, and every placeholder is known to
//! resolve, so that no configuration problem surfaces after dispatch.

use std::collections::BTreeSet;

use crate::config::model::{InputsSpec, ResourceSection, StageConfig};
use crate::errors::{PipelineError, Result};
use crate::pattern::{MatchRule, OutputTemplate, IMPLICIT_FIELDS};
use crate::stage::task::{ResourceRequest, ScriptRef};
use crate::types::StageKind;

/// Implicit fields that name one member path, so a `collate` output
/// cannot use them.
const PER_MEMBER_FIELDS: &[&str] = &["path", "basename", "stem"];

/// Where a stage draws its candidate inputs from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageInputs {
    /// `originate` stages have no inputs.
    None,
    /// Raw paths from the discovery catalog.
    Root,
    /// Flattened outputs of the named producer stages, in this order.
    Stages(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct StageDef {
    pub name: String,
    pub kind: StageKind,
    pub inputs: StageInputs,
    pub rules: Vec<MatchRule>,
    pub variant: Option<String>,
    pub outputs: Vec<OutputTemplate>,
    pub script: ScriptRef,
    pub resources: ResourceRequest,
    pub follows: Vec<String>,
    pub required: bool,
}

impl StageDef {
    /// Compile and check one stage entry against the `[default]` resources.
    pub fn compile(cfg: &StageConfig, default: &ResourceSection) -> Result<Self> {
        let name = cfg.name.trim().to_string();
        if name.is_empty() {
            return Err(PipelineError::ConfigError(
                "every [[stage]] needs a non-empty `name`".to_string(),
            ));
        }
        let err = |msg: String| PipelineError::stage(name.clone(), msg);

        let inputs = compile_inputs(cfg.kind, cfg.inputs.as_ref()).map_err(err)?;

        if cfg.kind == StageKind::Originate && !cfg.rules.is_empty() {
            return Err(err("originate stages take no `match` rules".to_string()));
        }
        if cfg.kind.uses_match_rules() && cfg.rules.is_empty() {
            return Err(err(format!("{} stages need at least one `match` rule", cfg.kind)));
        }

        let rules = cfg
            .rules
            .iter()
            .map(MatchRule::compile)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(err)?;
        check_rules_agree(&rules).map_err(err)?;

        let variant = cfg.variant.as_ref().map(|v| v.trim().to_string());
        if let Some(v) = &variant {
            if cfg.kind != StageKind::Collate {
                return Err(err(format!("`variant` only applies to collate stages (got {})", cfg.kind)));
            }
            if !capture_exists(&rules, v) {
                return Err(err(format!("`variant = \"{v}\"` is not a capture of any match rule")));
            }
        }

        if cfg.outputs.is_empty() {
            return Err(err("at least one output template is required".to_string()));
        }
        let outputs = cfg
            .outputs
            .iter()
            .map(|t| OutputTemplate::parse(t))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(err)?;

        for tpl in &outputs {
            if cfg.kind.has_fixed_outputs() && !tpl.is_constant() {
                return Err(err(format!(
                    "{} stage outputs must be fixed paths; `{}` has placeholders",
                    cfg.kind,
                    tpl.as_str()
                )));
            }
            for key in tpl.placeholders() {
                if !capture_exists(&rules, key) && !IMPLICIT_FIELDS.contains(&key) {
                    return Err(PipelineError::MissingPlaceholder {
                        stage: name.clone(),
                        key: key.to_string(),
                    });
                }
                if cfg.kind == StageKind::Collate && PER_MEMBER_FIELDS.contains(&key) {
                    return Err(err(format!(
                        "output `{}` uses `{key}`, which differs between members of a group",
                        tpl.as_str()
                    )));
                }
                if variant.as_deref().is_some_and(|v| same_group(&rules, v, key)) {
                    return Err(err(format!(
                        "output `{}` uses the variant field `{key}`, which differs inside a group",
                        tpl.as_str()
                    )));
                }
            }
        }

        let follows: Vec<String> = cfg.follows.iter().map(|s| s.trim().to_string()).collect();

        Ok(Self {
            script: ScriptRef {
                path: cfg.script.clone(),
                job_name: cfg.job_name.clone().unwrap_or_else(|| name.clone()),
            },
            resources: ResourceRequest::resolve(&cfg.resources, default),
            name,
            kind: cfg.kind,
            inputs,
            rules,
            variant,
            outputs,
            follows,
            required: cfg.required,
        })
    }

    /// Producer stages feeding this stage (empty for root/originate).
    pub fn producers(&self) -> &[String] {
        match &self.inputs {
            StageInputs::Stages(names) => names,
            StageInputs::None | StageInputs::Root => &[],
        }
    }
}

fn compile_inputs(kind: StageKind, spec: Option<&InputsSpec>) -> std::result::Result<StageInputs, String> {
    match (kind, spec) {
        (StageKind::Originate, None) => Ok(StageInputs::None),
        (StageKind::Originate, Some(_)) => Err("originate stages take no `inputs`".to_string()),
        (_, None) => Err(format!("{kind} stages need `inputs` (\"root\" or producer stage names)")),
        (_, Some(spec)) if spec.is_root() => Ok(StageInputs::Root),
        (_, Some(spec)) => {
            let producers: Vec<String> = spec.producers().iter().map(|s| s.trim().to_string()).collect();
            if producers.is_empty() {
                return Err("`inputs` must name at least one producer stage".to_string());
            }
            if producers.iter().any(|p| p == crate::config::model::ROOT_INPUTS) {
                return Err("\"root\" cannot be combined with producer stages in `inputs`".to_string());
            }
            Ok(StageInputs::Stages(producers))
        }
    }
}

/// All rules of one stage must expose the same captures, otherwise inputs
/// matched by different rules could never be paired or rendered alike.
fn check_rules_agree(rules: &[MatchRule]) -> std::result::Result<(), String> {
    let mut iter = rules.iter();
    let Some(first) = iter.next() else {
        return Ok(());
    };
    let names: BTreeSet<String> = first.capture_names().into_iter().collect();
    for rule in iter {
        let other: BTreeSet<String> = rule.capture_names().into_iter().collect();
        if other != names {
            return Err(format!(
                "match rules capture different fields: {:?} vs {:?}",
                names, other
            ));
        }
        if names.is_empty() && rule.group_count() != first.group_count() {
            return Err(format!(
                "match rules capture a different number of groups: {} vs {}",
                first.group_count(),
                rule.group_count()
            ));
        }
    }
    Ok(())
}

fn capture_exists(rules: &[MatchRule], key: &str) -> bool {
    if let Ok(idx) = key.parse::<usize>() {
        return idx >= 1 && rules.iter().all(|r| idx <= r.group_count()) && !rules.is_empty();
    }
    !rules.is_empty() && rules.iter().all(|r| r.capture_names().iter().any(|n| n == key))
}

/// True when `a` and `b` address the same capture group in any rule.
fn same_group(rules: &[MatchRule], a: &str, b: &str) -> bool {
    a == b
        || rules.iter().any(|r| match (r.group_position(a), r.group_position(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        })
}
