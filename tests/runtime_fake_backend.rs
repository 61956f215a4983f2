// tests/runtime_fake_backend.rs

use asmpipe::config::ConfigFile;
use asmpipe::dag::RunState;
use asmpipe::fs::mock::MockFileSystem;
use asmpipe::fs::FileSystem;
use asmpipe_test_utils::builders::{PipelineConfigBuilder, StageConfigBuilder};
use asmpipe_test_utils::{init_tracing, run_with_fake_backend};

/// Two libraries through a short assembly pipeline:
///
/// ```text
/// raw reads -> trimmed (transform) -> paired (collate) -> assembly (transform) -> stats (merge)
///                                  \-> fastqc (transform) -> multiqc (merge)
/// reference (originate) ..follows..> assembly
/// ```
fn assembly_pipeline(max_jobs: usize) -> ConfigFile {
    PipelineConfigBuilder::new()
        .max_jobs(max_jobs)
        .stage(
            StageConfigBuilder::transform("trimmed")
                .from_root()
                .regex(r"data/(?P<LIB>[^_/]+)_R(?P<RN>\d)\.fastq\.gz")
                .output("out/trim/{LIB}_R{RN}.trimmed.fastq.gz")
                .cpus(4)
                .build(),
        )
        .stage(
            StageConfigBuilder::collate("paired")
                .from_stage("trimmed")
                .regex(r"out/trim/(?P<LIB>[^_/]+)_R(?P<RN>\d)\.trimmed\.fastq\.gz")
                .variant("RN")
                .output("out/paired/{LIB}.interleaved.fastq.gz")
                .build(),
        )
        .stage(
            StageConfigBuilder::transform("fastqc")
                .from_stage("trimmed")
                .suffix(".fastq.gz")
                .output("{prefix}_fastqc.zip")
                .build(),
        )
        .stage(
            StageConfigBuilder::merge("multiqc")
                .from_stage("fastqc")
                .output("out/multiqc/report.html")
                .build(),
        )
        .stage(StageConfigBuilder::originate("reference").output("ref/phix.fa").build())
        .stage(
            StageConfigBuilder::transform("assembly")
                .from_stage("paired")
                .regex(r"out/paired/(?P<LIB>[^/]+)\.interleaved\.fastq\.gz")
                .output("out/asm/{LIB}/contigs.fa")
                .output("out/asm/{LIB}/assembly.log")
                .follows("reference")
                .build(),
        )
        .stage(
            StageConfigBuilder::merge("stats")
                .from_stage("assembly")
                .fixed("contigs.fa")
                .output("out/stats.tsv")
                .build(),
        )
        .build()
}

fn raw_reads() -> MockFileSystem {
    let fs = MockFileSystem::new();
    for lib in ["libA", "libB"] {
        for rn in ["1", "2"] {
            fs.add_file(format!("data/{lib}_R{rn}.fastq.gz"), "reads");
        }
    }
    fs
}

#[tokio::test]
async fn test_full_pipeline_runs_every_task_once() {
    init_tracing();
    let fs = raw_reads();
    let cfg = assembly_pipeline(3);

    let run = run_with_fake_backend(&cfg, &fs, &[]).await;

    // 4 trimmed + 2 paired + 4 fastqc + 1 multiqc + 1 reference + 2 assembly + 1 stats
    assert_eq!(run.executed.len(), 15);
    let mut labels = run.executed_labels();
    labels.sort();
    labels.dedup();
    assert_eq!(labels.len(), 15, "a task ran twice");

    assert!(fs.exists("out/stats.tsv".as_ref()));
    assert!(fs.exists("out/asm/libB/assembly.log".as_ref()));

    let summary = run.scheduler.summary();
    assert_eq!(summary.total().succeeded, 15);
    assert_eq!(summary.exit_code(), 0);
}

#[tokio::test]
async fn test_producers_always_finish_before_consumers_start() {
    init_tracing();
    let fs = raw_reads();
    let cfg = assembly_pipeline(8);

    let run = run_with_fake_backend(&cfg, &fs, &[]).await;
    let graph = run.scheduler.graph();
    let position = |id| run.executed.iter().position(|t| t.id == id).unwrap();

    for (from, to, _) in graph.edges() {
        assert!(
            position(from) < position(to),
            "{} dispatched before {}",
            graph.task(to),
            graph.task(from)
        );
    }
}

#[tokio::test]
async fn test_stats_merge_only_sees_contigs() {
    init_tracing();
    let fs = raw_reads();
    let cfg = assembly_pipeline(2);

    let run = run_with_fake_backend(&cfg, &fs, &[]).await;

    let stats = run
        .executed
        .iter()
        .find(|t| t.stage == "stats")
        .expect("stats ran");
    let inputs: Vec<&str> = stats.inputs.iter().map(|p| p.as_str()).collect();
    assert_eq!(inputs, vec!["out/asm/libA/contigs.fa", "out/asm/libB/contigs.fa"]);
}

#[tokio::test]
async fn test_failing_stage_skips_only_its_consumers() {
    init_tracing();
    let fs = raw_reads();
    let cfg = assembly_pipeline(4);

    let run = run_with_fake_backend(&cfg, &fs, &["paired"]).await;
    let summary = run.scheduler.summary();

    assert_eq!(summary.stage("paired").unwrap().failed, 2);
    assert_eq!(summary.stage("assembly").unwrap().skipped, 2);
    assert_eq!(summary.stage("stats").unwrap().skipped, 1);
    // Independent branches still complete.
    assert_eq!(summary.stage("fastqc").unwrap().succeeded, 4);
    assert_eq!(summary.stage("multiqc").unwrap().succeeded, 1);
    assert_eq!(summary.stage("reference").unwrap().succeeded, 1);

    assert!(run.executed.iter().all(|t| t.stage != "assembly" && t.stage != "stats"));
    assert_eq!(summary.exit_code(), 1);
    assert!(run.scheduler.is_finished());
}

#[tokio::test]
async fn test_failed_order_only_predecessor_skips_follower() {
    init_tracing();
    let fs = raw_reads();
    let cfg = assembly_pipeline(4);

    let run = run_with_fake_backend(&cfg, &fs, &["reference"]).await;
    let states = run.scheduler.states();
    let graph = run.scheduler.graph();

    for id in graph.tasks_of_stage("assembly") {
        assert_eq!(states[id.index()], RunState::Skipped);
    }
    assert_eq!(run.scheduler.summary().stage("paired").unwrap().succeeded, 2);
}

#[tokio::test]
async fn test_rerun_after_failure_runs_only_what_is_left() {
    init_tracing();
    let fs = raw_reads();
    let cfg = assembly_pipeline(4);

    let first = run_with_fake_backend(&cfg, &fs, &["assembly"]).await;
    assert_eq!(first.scheduler.summary().exit_code(), 1);

    let second = run_with_fake_backend(&cfg, &fs, &[]).await;
    let mut labels = second.executed_labels();
    labels.sort();
    assert_eq!(labels, vec!["assembly[0]", "assembly[1]", "stats[0]"]);
    assert_eq!(second.scheduler.summary().total().up_to_date, 12);
    assert_eq!(second.scheduler.summary().exit_code(), 0);
}

#[tokio::test]
async fn test_resources_reach_the_backend() {
    init_tracing();
    let fs = raw_reads();
    let cfg = assembly_pipeline(4);

    let run = run_with_fake_backend(&cfg, &fs, &[]).await;

    let trim = run.executed.iter().find(|t| t.stage == "trimmed").unwrap();
    assert_eq!(trim.resources.cpus, 4);
    assert_eq!(trim.script.path, "scripts/trimmed");
    let asm = run.executed.iter().find(|t| t.stage == "assembly").unwrap();
    assert_eq!(asm.resources.cpus, 1);
}
