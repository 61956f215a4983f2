// tests/staleness.rs

use asmpipe::config::ConfigFile;
use asmpipe::dag::{
    Freshness, PipelineGraph, RunState, StaleReason, StalenessEvaluator, TaskId,
};
use asmpipe::fs::mock::MockFileSystem;
use asmpipe::history::{fingerprint, HistoryStore, MemoryHistoryStore};
use asmpipe::types::FilePath;
use asmpipe_test_utils::builders::{PipelineConfigBuilder, StageConfigBuilder};
use asmpipe_test_utils::{init_tracing, run_with_fake_backend};

const RAW: &[&str] = &[
    "data/libA_R1.fastq.gz",
    "data/libA_R2.fastq.gz",
    "data/libB_R1.fastq.gz",
    "data/libB_R2.fastq.gz",
];

fn raw_reads() -> MockFileSystem {
    let fs = MockFileSystem::new();
    for p in RAW {
        fs.add_file(p, "reads");
    }
    fs
}

fn qc_pipeline() -> ConfigFile {
    PipelineConfigBuilder::new()
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
            StageConfigBuilder::merge("report")
                .from_stage("fastqc")
                .output("out/report.html")
                .build(),
        )
        .build()
}

fn graph_for(cfg: &ConfigFile, fs: &MockFileSystem) -> PipelineGraph {
    asmpipe::build_graph(cfg, fs, None).unwrap()
}

fn find(graph: &PipelineGraph, label: &str) -> TaskId {
    graph
        .task_ids()
        .find(|&id| graph.task(id).to_string() == label)
        .unwrap_or_else(|| panic!("no task {label}"))
}

#[tokio::test]
async fn test_first_run_executes_everything_in_dependency_order() {
    init_tracing();
    let fs = raw_reads();
    let cfg = qc_pipeline();

    let run = run_with_fake_backend(&cfg, &fs, &[]).await;

    assert_eq!(
        run.executed_labels(),
        vec!["merged[0]", "merged[1]", "fastqc[0]", "fastqc[1]", "report[0]"]
    );
    assert!(run.scheduler.is_finished());
    assert_eq!(run.scheduler.summary().total().succeeded, 5);
}

#[tokio::test]
async fn test_second_run_is_a_no_op() {
    init_tracing();
    let fs = raw_reads();
    let cfg = qc_pipeline();

    run_with_fake_backend(&cfg, &fs, &[]).await;
    let second = run_with_fake_backend(&cfg, &fs, &[]).await;

    assert!(second.executed.is_empty());
    let states = second.scheduler.states();
    assert!(states.iter().all(|s| *s == RunState::UpToDate), "{states:?}");
    assert_eq!(second.scheduler.summary().exit_code(), 0);
}

#[tokio::test]
async fn test_touching_one_raw_input_reruns_only_its_branch() {
    init_tracing();
    let fs = raw_reads();
    let cfg = qc_pipeline();

    run_with_fake_backend(&cfg, &fs, &[]).await;
    fs.touch("data/libA_R1.fastq.gz").unwrap();
    let second = run_with_fake_backend(&cfg, &fs, &[]).await;

    assert_eq!(
        second.executed_labels(),
        vec!["merged[0]", "fastqc[0]", "report[0]"]
    );
    let summary = second.scheduler.summary();
    assert_eq!(summary.stage("merged").unwrap().up_to_date, 1);
    assert_eq!(summary.stage("fastqc").unwrap().up_to_date, 1);
    assert_eq!(summary.stage("report").unwrap().succeeded, 1);
}

#[tokio::test]
async fn test_deleted_intermediate_output_is_rebuilt() {
    init_tracing();
    let fs = raw_reads();
    let cfg = qc_pipeline();

    run_with_fake_backend(&cfg, &fs, &[]).await;
    fs.remove("out/merged/libB.fastq.gz");
    let second = run_with_fake_backend(&cfg, &fs, &[]).await;

    assert_eq!(
        second.executed_labels(),
        vec!["merged[1]", "fastqc[1]", "report[0]"]
    );
}

#[tokio::test]
async fn test_plan_predicts_downstream_reruns() {
    init_tracing();
    let fs = raw_reads();
    let cfg = qc_pipeline();

    run_with_fake_backend(&cfg, &fs, &[]).await;
    fs.touch("data/libB_R2.fastq.gz").unwrap();

    let graph = graph_for(&cfg, &fs);
    let plan = StalenessEvaluator::new(&fs).plan(&graph);

    let at = |label: &str| plan[find(&graph, label).index()].clone();
    assert_eq!(at("merged[0]"), (RunState::UpToDate, None));
    assert_eq!(
        at("merged[1]"),
        (
            RunState::Runnable,
            Some(StaleReason::InputNewer {
                input: FilePath::from("data/libB_R2.fastq.gz"),
                output: FilePath::from("out/merged/libB.fastq.gz"),
            })
        )
    );
    assert_eq!(at("fastqc[1]"), (RunState::Runnable, Some(StaleReason::UpstreamRuns)));
    assert_eq!(at("fastqc[0]"), (RunState::UpToDate, None));
    assert_eq!(at("report[0]"), (RunState::Runnable, Some(StaleReason::UpstreamRuns)));
}

#[test]
fn test_initial_evaluation_leaves_downstream_pending() {
    let fs = raw_reads();
    let cfg = qc_pipeline();
    let graph = graph_for(&cfg, &fs);

    let states = StalenessEvaluator::new(&fs).evaluate(&graph);

    assert_eq!(
        states,
        vec![
            RunState::Runnable,
            RunState::Runnable,
            RunState::Pending,
            RunState::Pending,
            RunState::Pending,
        ]
    );
}

fn split_pipeline() -> ConfigFile {
    PipelineConfigBuilder::new()
        .suffix(".fasta")
        .stage(
            StageConfigBuilder::subdivide("split")
                .from_root()
                .regex(r"data/(?P<S>[^/]+)\.fasta$")
                .output("chunks/{S}.1.fa")
                .output("chunks/{S}.2.fa")
                .build(),
        )
        .build()
}

#[test]
fn test_one_missing_output_makes_task_stale() {
    let fs = MockFileSystem::new();
    fs.add_file("data/contigs.fasta", ">c1");
    fs.add_file("chunks/contigs.1.fa", ">c1");
    let cfg = split_pipeline();
    let graph = graph_for(&cfg, &fs);
    let task = graph.task(TaskId::new(0));

    assert_eq!(
        StalenessEvaluator::new(&fs).freshness(task),
        Freshness::Stale(StaleReason::MissingOutput(FilePath::from("chunks/contigs.2.fa")))
    );

    fs.add_file("chunks/contigs.2.fa", ">c1");
    assert!(StalenessEvaluator::new(&fs).freshness(task).is_current());
}

#[test]
fn test_input_must_be_older_than_the_oldest_output() {
    let fs = MockFileSystem::new();
    fs.add_file("chunks/contigs.1.fa", ">c1");
    fs.add_file("data/contigs.fasta", ">c1");
    fs.add_file("chunks/contigs.2.fa", ">c1");
    let cfg = split_pipeline();
    let graph = graph_for(&cfg, &fs);

    match StalenessEvaluator::new(&fs).freshness(graph.task(TaskId::new(0))) {
        Freshness::Stale(StaleReason::InputNewer { input, output }) => {
            assert_eq!(input.as_str(), "data/contigs.fasta");
            assert_eq!(output.as_str(), "chunks/contigs.1.fa");
        }
        other => panic!("Expected InputNewer, got {other:?}"),
    }
}

#[test]
fn test_missing_input_with_present_outputs_is_stale() {
    let fs = MockFileSystem::new();
    fs.add_file("data/contigs.fasta", ">c1");
    let cfg = split_pipeline();
    let graph = graph_for(&cfg, &fs);
    fs.add_file("chunks/contigs.1.fa", ">c1");
    fs.add_file("chunks/contigs.2.fa", ">c1");
    fs.remove("data/contigs.fasta");

    assert_eq!(
        StalenessEvaluator::new(&fs).freshness(graph.task(TaskId::new(0))),
        Freshness::Stale(StaleReason::MissingInput(FilePath::from("data/contigs.fasta")))
    );
}

#[test]
fn test_history_requires_a_completion_record() {
    let fs = MockFileSystem::new();
    fs.add_file("data/contigs.fasta", ">c1");
    fs.add_file("chunks/contigs.1.fa", ">c1");
    fs.add_file("chunks/contigs.2.fa", ">c1");
    let cfg = split_pipeline();
    let graph = graph_for(&cfg, &fs);
    let task = graph.task(TaskId::new(0));

    let mut history = MemoryHistoryStore::new();
    assert_eq!(
        StalenessEvaluator::new(&fs)
            .with_history(Some(&history))
            .freshness(task),
        Freshness::Stale(StaleReason::NotRecorded)
    );
    // Timestamps alone say current.
    assert!(StalenessEvaluator::new(&fs).freshness(task).is_current());

    history.record(&fingerprint(task), &task.to_string()).unwrap();
    assert!(
        StalenessEvaluator::new(&fs)
            .with_history(Some(&history))
            .freshness(task)
            .is_current()
    );
}

#[test]
fn test_fingerprint_changes_with_task_identity() {
    let fs = MockFileSystem::new();
    fs.add_file("data/a.fasta", "");
    fs.add_file("data/b.fasta", "");
    let cfg = split_pipeline();
    let graph = graph_for(&cfg, &fs);

    let a = fingerprint(graph.task(TaskId::new(0)));
    let b = fingerprint(graph.task(TaskId::new(1)));

    assert_ne!(a, b);
    assert_eq!(a, fingerprint(graph.task(TaskId::new(0))));
    assert_eq!(a.len(), 64);
}

#[test]
fn test_file_history_persists_across_opens() {
    use asmpipe::history::FileHistoryStore;

    let dir = tempfile::tempdir().unwrap();
    {
        let mut store = FileHistoryStore::open(dir.path()).unwrap();
        store.record("abc123", "split[0]").unwrap();
        store.record("abc123", "split[0]").unwrap();
    }

    let store = FileHistoryStore::open(dir.path()).unwrap();
    assert!(store.contains("abc123"));
    assert!(!store.contains("def456"));

    let contents = std::fs::read_to_string(store.path()).unwrap();
    assert_eq!(contents, "abc123 split[0]\n");
}
