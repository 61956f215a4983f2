// src/dag/assembler.rs

//! Dependency graph assembly.
//!
//! Stages are resolved producer-first, each stage's task instances are
//! built from the catalog or from its producers' outputs, and edges are
//! added per consumed path (`DataFlow`) and per `follows` pair
//! (`OrderOnly`).

use std::collections::{BTreeSet, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::config::validate::describe_cycle;
use crate::dag::graph::{EdgeKind, PipelineGraph, TaskId};
use crate::errors::{PipelineError, Result};
use crate::stage::{build_stage, StageDef, StageInputs};
use crate::types::FilePath;

/// Build the task graph for `stages` over the raw paths in `catalog`.
///
/// Fails on unknown stage references, stage or task cycles, overlapping
/// outputs, and any builder error. Nothing is dispatched before this
/// returns.
pub fn assemble(stages: &[StageDef], catalog: &Catalog) -> Result<PipelineGraph> {
    let order = resolve_stage_order(stages)?;
    let names: Vec<String> = order.iter().map(|&i| stages[i].name.clone()).collect();
    debug!(order = ?names, "resolved stage order");

    let mut graph = PipelineGraph::new(names);
    let mut by_stage: HashMap<&str, Vec<TaskId>> = HashMap::new();
    let mut owners: HashMap<FilePath, TaskId> = HashMap::new();

    for &i in &order {
        let stage = &stages[i];

        let candidates: Vec<FilePath> = match &stage.inputs {
            StageInputs::None => Vec::new(),
            StageInputs::Root => catalog.paths().to_vec(),
            StageInputs::Stages(producers) => producers
                .iter()
                .flat_map(|p| by_stage.get(p.as_str()).into_iter().flatten())
                .flat_map(|&id| graph.task(id).outputs.clone())
                .collect(),
        };

        let mut ids = Vec::new();
        for task in build_stage(stage, &candidates)? {
            let inputs = task.inputs.clone();
            let outputs = task.outputs.clone();
            let label = task.to_string();
            let id = graph.add_task(task);

            for out in outputs {
                if let Some(&first) = owners.get(&out) {
                    return Err(PipelineError::OverlappingOutputs {
                        path: out.to_string(),
                        first: graph.task(first).to_string(),
                        second: label,
                    });
                }
                owners.insert(out, id);
            }

            // Root inputs are raw artifacts and have no producer task.
            if matches!(stage.inputs, StageInputs::Stages(_)) {
                let producers: BTreeSet<TaskId> =
                    inputs.iter().filter_map(|p| owners.get(p).copied()).collect();
                for from in producers {
                    graph.add_edge(from, id, EdgeKind::DataFlow);
                }
            }
            ids.push(id);
        }

        for followed in &stage.follows {
            let Some(before) = by_stage.get(followed.as_str()) else {
                continue;
            };
            for &from in before {
                for &to in &ids {
                    graph.add_edge(from, to, EdgeKind::OrderOnly);
                }
            }
        }

        by_stage.insert(stage.name.as_str(), ids);
    }

    // Stage order already rules out cycles; this guards the task level.
    graph.topological_order()?;

    info!(
        stages = graph.stages().len(),
        tasks = graph.len(),
        "assembled pipeline graph"
    );
    Ok(graph)
}

/// Kahn's algorithm over stages; among ready stages the earliest declared
/// goes first.
fn resolve_stage_order(stages: &[StageDef]) -> Result<Vec<usize>> {
    let index: HashMap<&str, usize> = stages
        .iter()
        .enumerate()
        .map(|(i, s)| (s.name.as_str(), i))
        .collect();

    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let nodes: Vec<NodeIndex> = stages.iter().map(|s| graph.add_node(s.name.as_str())).collect();
    for (i, stage) in stages.iter().enumerate() {
        for dep in stage.producers().iter().chain(stage.follows.iter()) {
            let &j = index
                .get(dep.as_str())
                .ok_or_else(|| PipelineError::StageNotFound(dep.clone()))?;
            graph.update_edge(nodes[j], nodes[i], ());
        }
    }

    let mut indegree: Vec<usize> = nodes
        .iter()
        .map(|&n| graph.neighbors_directed(n, petgraph::Direction::Incoming).count())
        .collect();
    let mut ready: BTreeSet<usize> = (0..stages.len()).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(stages.len());

    while let Some(i) = ready.pop_first() {
        order.push(i);
        for next in graph.neighbors(nodes[i]) {
            let j = next.index();
            indegree[j] -= 1;
            if indegree[j] == 0 {
                ready.insert(j);
            }
        }
    }

    if order.len() < stages.len() {
        // Prefer a node on the cycle itself over one merely downstream of it.
        let stuck = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .find_map(|scc| scc.into_iter().min())
            .or_else(|| (0..stages.len()).find(|i| !order.contains(i)).map(|i| nodes[i]))
            .unwrap_or_default();
        return Err(PipelineError::DagCycle(describe_cycle(&graph, stuck)));
    }
    Ok(order)
}
