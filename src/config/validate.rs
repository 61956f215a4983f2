// src/config/validate.rs

use std::collections::{HashMap, HashSet};

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::DiGraph;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PipelineError, Result};
use crate::stage::StageDef;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::PipelineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let stages = validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.catalog, raw.slurm, stages))
    }
}

/// Run every configuration check and return the compiled stages.
pub fn validate_config(cfg: &RawConfigFile) -> Result<Vec<StageDef>> {
    ensure_has_stages(cfg)?;
    validate_global_config(cfg)?;

    let stages = cfg
        .stage
        .iter()
        .map(|s| StageDef::compile(s, &cfg.default))
        .collect::<Result<Vec<_>>>()?;

    validate_unique_names(&stages)?;
    validate_stage_references(&stages)?;
    validate_stage_graph(&stages)?;
    Ok(stages)
}

fn ensure_has_stages(cfg: &RawConfigFile) -> Result<()> {
    if cfg.stage.is_empty() {
        return Err(PipelineError::ConfigError(
            "config must contain at least one [[stage]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.max_jobs == 0 {
        return Err(PipelineError::ConfigError(
            "[config].max_jobs must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.catalog.root.trim().is_empty() {
        return Err(PipelineError::ConfigError(
            "[catalog].root must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_unique_names(stages: &[StageDef]) -> Result<()> {
    let mut seen = HashSet::new();
    for stage in stages {
        if !seen.insert(stage.name.as_str()) {
            return Err(PipelineError::stage(
                &stage.name,
                "stage name is declared more than once",
            ));
        }
    }
    Ok(())
}

fn validate_stage_references(stages: &[StageDef]) -> Result<()> {
    let names: HashSet<&str> = stages.iter().map(|s| s.name.as_str()).collect();

    for stage in stages {
        for (field, refs) in [("inputs", stage.producers()), ("follows", stage.follows.as_slice())] {
            for dep in refs {
                if !names.contains(dep.as_str()) {
                    return Err(PipelineError::stage(
                        &stage.name,
                        format!("unknown stage '{dep}' in `{field}`"),
                    ));
                }
                if dep == &stage.name {
                    return Err(PipelineError::stage(
                        &stage.name,
                        format!("stage cannot reference itself in `{field}`"),
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Stage-level acyclicity check.
///
/// Edge direction: producer -> consumer, and followed -> follower.
fn validate_stage_graph(stages: &[StageDef]) -> Result<()> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut index = HashMap::new();

    for stage in stages {
        index.insert(stage.name.as_str(), graph.add_node(stage.name.as_str()));
    }

    for stage in stages {
        let to = index[stage.name.as_str()];
        for dep in stage.producers().iter().chain(stage.follows.iter()) {
            if let Some(&from) = index.get(dep.as_str()) {
                graph.update_edge(from, to, ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(PipelineError::DagCycle(describe_cycle(&graph, cycle.node_id()))),
    }
}

/// Name the nodes on the cycle containing `start`.
pub(crate) fn describe_cycle<N, E>(graph: &DiGraph<N, E>, start: petgraph::graph::NodeIndex) -> String
where
    N: std::fmt::Display,
{
    let members: Vec<String> = tarjan_scc(graph)
        .into_iter()
        .find(|scc| scc.contains(&start))
        .map(|mut scc| {
            scc.sort();
            scc.into_iter().map(|n| graph[n].to_string()).collect()
        })
        .unwrap_or_else(|| vec![graph[start].to_string()]);

    members.join(" -> ")
}
