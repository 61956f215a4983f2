// src/flowchart.rs

//! Graphviz rendering of the task graph.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::dag::{EdgeKind, PipelineGraph, RunState};
use crate::fs::FileSystem;

/// Render `graph` as DOT: one cluster per stage, data edges solid,
/// order-only edges dashed. With `states`, nodes are colored by state.
pub fn render_dot(graph: &PipelineGraph, states: Option<&[RunState]>) -> String {
    let mut out = String::new();
    out.push_str("digraph pipeline {\n");
    out.push_str("    rankdir=LR;\n");
    out.push_str("    node [shape=box, fontname=\"Helvetica\"];\n");

    for (n, stage) in graph.stages().iter().enumerate() {
        let _ = writeln!(out, "    subgraph cluster_{n} {{");
        let _ = writeln!(out, "        label=\"{}\";", escape(stage));
        for id in graph.tasks_of_stage(stage) {
            let task = graph.task(id);
            let label = match task.outputs.first() {
                Some(first) if task.outputs.len() > 1 => {
                    format!("{task}\\n{} (+{})", first, task.outputs.len() - 1)
                }
                Some(first) => format!("{task}\\n{first}"),
                None => task.to_string(),
            };
            let color = states
                .and_then(|s| s.get(id.index()))
                .map(|s| format!(", style=filled, fillcolor=\"{}\"", fill(*s)))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "        t{} [label=\"{}\"{}];",
                id.index(),
                escape(&label),
                color
            );
        }
        out.push_str("    }\n");
    }

    for (from, to, kind) in graph.edges() {
        let style = match kind {
            EdgeKind::DataFlow => "",
            EdgeKind::OrderOnly => " [style=dashed]",
        };
        let _ = writeln!(out, "    t{} -> t{}{};", from.index(), to.index(), style);
    }

    out.push_str("}\n");
    out
}

/// Render and write the flowchart through `fs`.
pub fn write_flowchart(
    fs: &dyn FileSystem,
    path: &Path,
    graph: &PipelineGraph,
    states: Option<&[RunState]>,
) -> Result<()> {
    let dot = render_dot(graph, states);
    fs.write(path, dot.as_bytes())
        .with_context(|| format!("writing flowchart to {:?}", path))?;
    info!(path = ?path, tasks = graph.len(), "wrote flowchart");
    Ok(())
}

fn fill(state: RunState) -> &'static str {
    match state {
        RunState::UpToDate => "gray90",
        RunState::Runnable | RunState::Pending => "lightgoldenrod1",
        RunState::Running => "lightblue",
        RunState::Succeeded => "palegreen",
        RunState::Failed => "salmon",
        RunState::Skipped => "orange",
    }
}

// Keeps the `\n` line breaks already in labels.
fn escape(s: &str) -> String {
    s.replace('"', "\\\"")
}
