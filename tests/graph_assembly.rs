// tests/graph_assembly.rs

use asmpipe::catalog::Catalog;
use asmpipe::config::ConfigFile;
use asmpipe::dag::{assemble, EdgeKind, PipelineGraph, TaskId};
use asmpipe::errors::PipelineError;
use asmpipe_test_utils::builders::{PipelineConfigBuilder, StageConfigBuilder};

fn reads_catalog() -> Catalog {
    Catalog::from_paths([
        "data/libA_R1.fastq.gz",
        "data/libA_R2.fastq.gz",
        "data/libB_R1.fastq.gz",
        "data/libB_R2.fastq.gz",
    ])
}

/// collate -> transform -> merge, plus an independent `originate` that the
/// merge `follows`.
fn reads_pipeline() -> ConfigFile {
    PipelineConfigBuilder::new()
        .stage(
            StageConfigBuilder::merge("report")
                .from_stage("fastqc")
                .output("out/report.html")
                .follows("reference")
                .build(),
        )
        .stage(
            StageConfigBuilder::collate("merged")
                .from_root()
                .regex(r"data/(?P<LIB>[^_/]+)_R(?P<RN>\d)\.fastq\.gz")
                .variant("RN")
                .output("out/merged/{LIB}.fastq.gz")
                .build(),
        )
        .stage(
            StageConfigBuilder::transform("fastqc")
                .from_stage("merged")
                .suffix(".fastq.gz")
                .output("{prefix}_fastqc.zip")
                .build(),
        )
        .stage(
            StageConfigBuilder::originate("reference")
                .output("ref/genome.fa")
                .build(),
        )
        .build()
}

fn ids_of(graph: &PipelineGraph, stage: &str) -> Vec<TaskId> {
    graph.tasks_of_stage(stage).collect()
}

#[test]
fn test_stages_resolve_producer_first_with_declaration_tiebreak() {
    let cfg = reads_pipeline();
    let graph = assemble(cfg.stages(), &reads_catalog()).unwrap();

    assert_eq!(graph.stages(), ["merged", "fastqc", "reference", "report"]);
    assert_eq!(graph.len(), 2 + 2 + 1 + 1);
}

#[test]
fn test_ids_are_a_topological_order() {
    let cfg = reads_pipeline();
    let graph = assemble(cfg.stages(), &reads_catalog()).unwrap();

    for (from, to, _) in graph.edges() {
        assert!(from < to, "edge {from:?} -> {to:?} goes backwards");
    }
    assert_eq!(graph.topological_order().unwrap().len(), graph.len());
}

#[test]
fn test_data_edges_follow_consumed_paths() {
    let cfg = reads_pipeline();
    let graph = assemble(cfg.stages(), &reads_catalog()).unwrap();

    let merged = ids_of(&graph, "merged");
    let fastqc = ids_of(&graph, "fastqc");
    let report = ids_of(&graph, "report");

    // Root inputs have no producer.
    assert!(graph.dependencies_of(merged[0]).is_empty());

    assert_eq!(graph.dependencies_of(fastqc[0]), vec![merged[0]]);
    assert_eq!(graph.dependencies_of(fastqc[1]), vec![merged[1]]);
    assert_eq!(graph.edge_kind(merged[0], fastqc[0]), Some(EdgeKind::DataFlow));
    assert_eq!(graph.edge_kind(merged[0], fastqc[1]), None);

    assert_eq!(
        graph.task(fastqc[0]).inputs,
        graph.task(merged[0]).outputs,
        "transform consumes exactly its producer's output"
    );
    assert_eq!(graph.task(report[0]).inputs.len(), 2);
}

#[test]
fn test_follows_adds_order_only_edges() {
    let cfg = reads_pipeline();
    let graph = assemble(cfg.stages(), &reads_catalog()).unwrap();

    let reference = ids_of(&graph, "reference")[0];
    let report = ids_of(&graph, "report")[0];

    assert_eq!(graph.edge_kind(reference, report), Some(EdgeKind::OrderOnly));
    assert!(graph.dependencies_of(report).contains(&reference));
    assert!(graph.task(report).inputs.iter().all(|p| p.as_str() != "ref/genome.fa"));
}

#[test]
fn test_data_edge_supersedes_order_only_edge() {
    let cfg = PipelineConfigBuilder::new()
        .stage(StageConfigBuilder::originate("ref").output("ref.fa").build())
        .stage(
            StageConfigBuilder::merge("index")
                .from_stage("ref")
                .output("ref.fa.bwt")
                .follows("ref")
                .build(),
        )
        .build();

    let graph = assemble(cfg.stages(), &Catalog::default()).unwrap();

    let edges: Vec<_> = graph.edges().collect();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].2, EdgeKind::DataFlow);
}

#[test]
fn test_overlapping_outputs_are_rejected() {
    let cfg = PipelineConfigBuilder::new()
        .stage(
            StageConfigBuilder::transform("trim")
                .from_root()
                .regex(r"data/(?P<LIB>[^_/]+)_R\d\.fastq\.gz")
                .output("out/{LIB}.trimmed.fastq.gz")
                .build(),
        )
        .build();

    match assemble(cfg.stages(), &reads_catalog()) {
        Err(PipelineError::OverlappingOutputs { path, first, second }) => {
            assert_eq!(path, "out/libA.trimmed.fastq.gz");
            assert_eq!(first, "trim[0]");
            assert_eq!(second, "trim[1]");
        }
        other => panic!("Expected OverlappingOutputs error, got: {:?}", other),
    }
}

#[test]
fn test_overlapping_outputs_across_stages_are_rejected() {
    let cfg = PipelineConfigBuilder::new()
        .stage(StageConfigBuilder::originate("a").output("shared.txt").build())
        .stage(StageConfigBuilder::originate("b").output("shared.txt").build())
        .build();

    assert!(matches!(
        assemble(cfg.stages(), &Catalog::default()),
        Err(PipelineError::OverlappingOutputs { .. })
    ));
}

#[test]
fn test_stage_with_no_matches_contributes_no_tasks() {
    let cfg = reads_pipeline();
    let graph = assemble(cfg.stages(), &Catalog::from_paths(["data/readme.txt"])).unwrap();

    assert!(ids_of(&graph, "merged").is_empty());
    assert!(ids_of(&graph, "fastqc").is_empty());
    // The merge still exists and only waits on `reference`.
    let report = ids_of(&graph, "report")[0];
    assert!(graph.task(report).inputs.is_empty());
    assert_eq!(graph.dependencies_of(report), ids_of(&graph, "reference"));
}

#[test]
fn test_up_to_keeps_target_and_its_ancestors() {
    let cfg = reads_pipeline();
    let graph = assemble(cfg.stages(), &reads_catalog()).unwrap();

    let sub = graph.up_to("fastqc").unwrap();

    assert_eq!(sub.stages(), ["merged", "fastqc"]);
    assert_eq!(sub.len(), 4);
    for (from, to, kind) in sub.edges() {
        assert_eq!(kind, EdgeKind::DataFlow);
        assert_eq!(sub.task(from).stage, "merged");
        assert_eq!(sub.task(to).stage, "fastqc");
    }
}

#[test]
fn test_up_to_follows_order_only_edges_too() {
    let cfg = reads_pipeline();
    let graph = assemble(cfg.stages(), &reads_catalog()).unwrap();

    let sub = graph.up_to("report").unwrap();

    assert_eq!(sub.len(), graph.len());
    assert_eq!(sub.stages(), graph.stages());
}

#[test]
fn test_up_to_unknown_stage_is_stage_not_found() {
    let cfg = reads_pipeline();
    let graph = assemble(cfg.stages(), &reads_catalog()).unwrap();

    match graph.up_to("assemble") {
        Err(PipelineError::StageNotFound(name)) => assert_eq!(name, "assemble"),
        other => panic!("Expected StageNotFound, got: {:?}", other.map(|g| g.len())),
    }
}

#[test]
fn test_build_graph_applies_target() {
    use asmpipe::fs::mock::MockFileSystem;

    let fs = MockFileSystem::new();
    for p in reads_catalog().paths() {
        fs.add_file(p.as_path(), "");
    }
    let cfg = reads_pipeline();

    let full = asmpipe::build_graph(&cfg, &fs, None).unwrap();
    let merged_only = asmpipe::build_graph(&cfg, &fs, Some("merged")).unwrap();

    assert_eq!(full.len(), 6);
    assert_eq!(merged_only.len(), 2);
    assert!(matches!(
        asmpipe::build_graph(&cfg, &fs, Some("nope")),
        Err(PipelineError::StageNotFound(_))
    ));
}
