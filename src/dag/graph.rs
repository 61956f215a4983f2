// src/dag/graph.rs

use std::collections::HashSet;
use std::fmt;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef, Reversed};
use petgraph::Direction;

use crate::errors::{PipelineError, Result};
use crate::stage::TaskInstance;

/// Identifier of a task instance inside one [`PipelineGraph`].
///
/// Ids follow discovery order: stages in resolved order, then instances
/// in the order the builder produced them. Every edge points from a lower
/// id to a higher one, so id order is a topological order.
pub type TaskId = NodeIndex;

/// Why one task must wait for another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// The consumer reads at least one of the producer's outputs.
    DataFlow,
    /// `follows`: ordering only, no data relationship.
    OrderOnly,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::DataFlow => f.write_str("data"),
            EdgeKind::OrderOnly => f.write_str("follows"),
        }
    }
}

/// All task instances of a run plus the edges between them.
///
/// Only built by [`crate::dag::assembler::assemble`], which guarantees the
/// graph is acyclic and that no two tasks declare the same output.
#[derive(Debug, Clone)]
pub struct PipelineGraph {
    graph: DiGraph<TaskInstance, EdgeKind>,
    /// Stage names in resolved (producer-before-consumer) order.
    stages: Vec<String>,
}

impl PipelineGraph {
    pub(crate) fn new(stages: Vec<String>) -> Self {
        Self {
            graph: DiGraph::new(),
            stages,
        }
    }

    pub(crate) fn add_task(&mut self, task: TaskInstance) -> TaskId {
        self.graph.add_node(task)
    }

    /// Add an edge; a data edge supersedes an existing order-only edge.
    pub(crate) fn add_edge(&mut self, from: TaskId, to: TaskId, kind: EdgeKind) {
        match self.graph.find_edge(from, to) {
            Some(e) => {
                if kind == EdgeKind::DataFlow {
                    self.graph[e] = EdgeKind::DataFlow;
                }
            }
            None => {
                self.graph.add_edge(from, to, kind);
            }
        }
    }

    pub fn task(&self, id: TaskId) -> &TaskInstance {
        &self.graph[id]
    }

    /// All task ids in discovery order.
    pub fn task_ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.graph.node_indices()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Stage names in resolved order.
    pub fn stages(&self) -> &[String] {
        &self.stages
    }

    /// Tasks of one stage in discovery order.
    pub fn tasks_of_stage<'a>(&'a self, stage: &'a str) -> impl Iterator<Item = TaskId> + 'a {
        self.graph
            .node_indices()
            .filter(move |&id| self.graph[id].stage == stage)
    }

    /// Immediate predecessors of a task (data and order-only), sorted.
    pub fn dependencies_of(&self, id: TaskId) -> Vec<TaskId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Immediate successors of a task (data and order-only), sorted.
    pub fn dependents_of(&self, id: TaskId) -> Vec<TaskId> {
        self.neighbors(id, Direction::Outgoing)
    }

    fn neighbors(&self, id: TaskId, dir: Direction) -> Vec<TaskId> {
        let mut out: Vec<TaskId> = self.graph.neighbors_directed(id, dir).collect();
        out.sort();
        out.dedup();
        out
    }

    /// Kind of the edge `from -> to`, if any.
    pub fn edge_kind(&self, from: TaskId, to: TaskId) -> Option<EdgeKind> {
        self.graph.find_edge(from, to).map(|e| self.graph[e])
    }

    /// Every edge as `(from, to, kind)`.
    pub fn edges(&self) -> impl Iterator<Item = (TaskId, TaskId, EdgeKind)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (e.source(), e.target(), *e.weight()))
    }

    /// Tasks in a dependency-respecting order.
    pub fn topological_order(&self) -> Result<Vec<TaskId>> {
        toposort(&self.graph, None).map_err(|cycle| {
            PipelineError::DagCycle(crate::config::validate::describe_cycle(
                &self.graph,
                cycle.node_id(),
            ))
        })
    }

    /// Restrict the graph to the tasks of `target` and everything upstream
    /// of them (data and order-only predecessors, transitively).
    pub fn up_to(&self, target: &str) -> Result<PipelineGraph> {
        if !self.stages.iter().any(|s| s == target) {
            return Err(PipelineError::StageNotFound(target.to_string()));
        }

        let reversed = Reversed(&self.graph);
        let mut keep: HashSet<TaskId> = HashSet::new();
        for start in self.tasks_of_stage(target) {
            let mut dfs = Dfs::new(reversed, start);
            while let Some(id) = dfs.next(reversed) {
                keep.insert(id);
            }
        }

        let graph = self.graph.filter_map(
            |id, task| keep.contains(&id).then(|| task.clone()),
            |_, kind| Some(*kind),
        );
        let kept_stages: HashSet<&str> = graph.node_weights().map(|t| t.stage.as_str()).collect();
        let stages = self
            .stages
            .iter()
            .filter(|s| s.as_str() == target || kept_stages.contains(s.as_str()))
            .cloned()
            .collect();

        Ok(PipelineGraph { graph, stages })
    }
}
