// src/stage/builder.rs

//! Task instance builder: turns one stage plus its candidate inputs into
//! concrete [`TaskInstance`]s.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::{debug, info};

use crate::errors::{PipelineError, Result};
use crate::pattern::CaptureSet;
use crate::stage::definition::StageDef;
use crate::stage::task::TaskInstance;
use crate::types::{FilePath, StageKind};

/// A candidate input that matched one of the stage's rules.
#[derive(Debug, Clone)]
struct Matched {
    /// Index of the rule that matched (first match wins).
    rule: usize,
    captures: CaptureSet,
}

/// Build the task instances of `stage` from `candidates` (in discovery order).
pub fn build_stage(stage: &StageDef, candidates: &[FilePath]) -> Result<Vec<TaskInstance>> {
    let tasks = match stage.kind {
        StageKind::Originate => vec![build_fixed(stage, Vec::new())?],
        StageKind::Transform | StageKind::Subdivide => build_per_input(stage, candidates)?,
        StageKind::Collate => build_collated(stage, candidates)?,
        StageKind::Merge => {
            let inputs: Vec<FilePath> = if stage.rules.is_empty() {
                candidates.to_vec()
            } else {
                candidates
                    .iter()
                    .filter(|p| match_input(stage, p).is_some())
                    .cloned()
                    .collect()
            };
            if inputs.is_empty() && stage.required {
                return Err(PipelineError::stage(
                    &stage.name,
                    "required merge stage has no inputs",
                ));
            }
            vec![build_fixed(stage, inputs)?]
        }
    };

    if tasks.is_empty() && stage.required {
        return Err(PipelineError::stage(
            &stage.name,
            format!(
                "required stage matched none of its {} candidate input(s)",
                candidates.len()
            ),
        ));
    }

    info!(
        stage = %stage.name,
        kind = %stage.kind,
        candidates = candidates.len(),
        tasks = tasks.len(),
        "built task instances"
    );

    Ok(tasks)
}

fn match_input(stage: &StageDef, path: &FilePath) -> Option<Matched> {
    stage
        .rules
        .iter()
        .enumerate()
        .find_map(|(rule, r)| r.apply(path).map(|captures| Matched { rule, captures }))
}

fn render_all(stage: &StageDef, captures: &CaptureSet) -> Result<Vec<FilePath>> {
    stage
        .outputs
        .iter()
        .map(|tpl| {
            tpl.render(captures)
                .map_err(|key| PipelineError::MissingPlaceholder {
                    stage: stage.name.clone(),
                    key,
                })
        })
        .collect()
}

fn instance(stage: &StageDef, index: usize, inputs: Vec<FilePath>, outputs: Vec<FilePath>) -> TaskInstance {
    TaskInstance {
        stage: stage.name.clone(),
        index,
        inputs,
        outputs,
        script: stage.script.clone(),
        resources: stage.resources.clone(),
    }
}

/// `originate` / `merge`: a single task with the fixed output list.
fn build_fixed(stage: &StageDef, inputs: Vec<FilePath>) -> Result<TaskInstance> {
    let outputs = stage
        .outputs
        .iter()
        .map(|tpl| {
            tpl.render_constant().ok_or_else(|| {
                PipelineError::stage(
                    &stage.name,
                    format!("output `{}` must be a fixed path", tpl.as_str()),
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(instance(stage, 0, inputs, outputs))
}

/// `transform` / `subdivide`: one task per matched input.
fn build_per_input(stage: &StageDef, candidates: &[FilePath]) -> Result<Vec<TaskInstance>> {
    let mut tasks = Vec::new();
    for path in candidates {
        let Some(m) = match_input(stage, path) else {
            debug!(stage = %stage.name, path = %path, "input did not match; excluded");
            continue;
        };
        let outputs = render_all(stage, &m.captures)?;
        tasks.push(instance(stage, tasks.len(), vec![path.clone()], outputs));
    }
    Ok(tasks)
}

/// `collate`: group matched inputs by their non-variant captures.
fn build_collated(stage: &StageDef, candidates: &[FilePath]) -> Result<Vec<TaskInstance>> {
    let variant = stage.variant.as_deref();

    // Groups in first-seen order.
    let mut order: Vec<Vec<(String, String)>> = Vec::new();
    let mut groups: HashMap<Vec<(String, String)>, Vec<Matched>> = HashMap::new();

    for path in candidates {
        let Some(m) = match_input(stage, path) else {
            debug!(stage = %stage.name, path = %path, "input did not match; excluded");
            continue;
        };
        let key = m.captures.grouping_key(variant);
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(m);
    }

    let mut tasks = Vec::with_capacity(order.len());
    for key in order {
        let Some(mut members) = groups.remove(&key) else {
            continue;
        };

        if stage.rules.len() > 1 {
            for rule in 0..stage.rules.len() {
                if !members.iter().any(|m| m.rule == rule) {
                    return Err(PipelineError::stage(
                        &stage.name,
                        format!(
                            "unpaired inputs: captures {} matched by some rules but not by rule #{}",
                            describe_key(&key),
                            rule + 1
                        ),
                    ));
                }
            }
        }

        // Stable: ties keep discovery order.
        members.sort_by(|a, b| {
            let va = variant.and_then(|v| a.captures.get(v)).unwrap_or_default();
            let vb = variant.and_then(|v| b.captures.get(v)).unwrap_or_default();
            compare_variant(&va, &vb).then(a.rule.cmp(&b.rule))
        });

        let outputs = render_all(stage, &members[0].captures)?;
        let inputs = members
            .iter()
            .map(|m| m.captures.source().clone())
            .collect();
        tasks.push(instance(stage, tasks.len(), inputs, outputs));
    }

    Ok(tasks)
}

/// Numeric order when both values are numbers (`R2` before `R10`), text order otherwise.
fn compare_variant(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

fn describe_key(key: &[(String, String)]) -> String {
    let parts: Vec<String> = key.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{{{}}}", parts.join(", "))
}

