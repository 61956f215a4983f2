// tests/error_handling.rs

use std::io::Write;

use tempfile::NamedTempFile;

use asmpipe::config::load_and_validate;
use asmpipe::errors::PipelineError;
use asmpipe::types::{BackendKind, HistoryMode, StageKind};

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn test_full_config_loads_with_defaults_applied() {
    let file = config_file(
        r#"
[config]
max_jobs = 4
backend = "slurm"
history = "file"

[catalog]
root = "data"
suffixes = [".fastq.gz", ".fastq"]
include = ["2125-01-11-1"]

[default]
cpus = 1
mem_mb = 4000

[[stage]]
name = "merged_fq_files"
kind = "collate"
inputs = "root"
match = [{ regex = '.+/(?P<LIB>[^_/]+)_L\d+_R(?P<RN>\d)\.fastq\.gz' }]
outputs = ["output/fq_merged/{LIB}_R1_merged.fastq.gz"]
script = "src/sh/merge_fq"
job_name = "merge_fq"
variant = "RN"

[[stage]]
name = "fastqc"
kind = "transform"
inputs = "merged_fq_files"
match = [{ suffix = ".fastq.gz" }]
outputs = ["output/fastqc/{stem}_fastqc.zip"]
script = "src/sh/fastqc"
[stage.resources]
cpus = 2
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.config.max_jobs, 4);
    assert_eq!(cfg.config.backend, BackendKind::Slurm);
    assert_eq!(cfg.config.history, HistoryMode::File);
    assert_eq!(cfg.catalog.include, vec!["2125-01-11-1".to_string()]);
    assert_eq!(cfg.slurm.log_dir, "ruffus");

    assert_eq!(cfg.stages().len(), 2);
    let merged = cfg.stage("merged_fq_files").unwrap();
    assert_eq!(merged.kind, StageKind::Collate);
    assert_eq!(merged.script.job_name, "merge_fq");
    assert_eq!(merged.resources.cpus, 1);
    assert_eq!(merged.resources.mem_mb, Some(4000));

    let fastqc = cfg.stage("fastqc").unwrap();
    assert_eq!(fastqc.script.job_name, "fastqc");
    assert_eq!(fastqc.resources.cpus, 2);
    assert_eq!(fastqc.resources.mem_mb, Some(4000));
    assert_eq!(fastqc.producers(), ["merged_fq_files".to_string()]);
}

#[test]
fn test_stage_cycle_returns_structured_error() {
    let file = config_file(
        r#"
[[stage]]
name = "A"
kind = "transform"
inputs = "B"
match = [{ suffix = ".a" }]
outputs = ["{prefix}.b"]
script = "a.sh"

[[stage]]
name = "B"
kind = "transform"
inputs = "A"
match = [{ suffix = ".b" }]
outputs = ["{prefix}.a"]
script = "b.sh"
"#,
    );

    match load_and_validate(file.path()) {
        Err(PipelineError::DagCycle(msg)) => {
            assert!(msg.contains('A'));
            assert!(msg.contains('B'));
        }
        Err(e) => panic!("Expected DagCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_follows_cycle_is_detected_too() {
    let file = config_file(
        r#"
[[stage]]
name = "one"
kind = "originate"
outputs = ["one.txt"]
script = "one.sh"
follows = ["two"]

[[stage]]
name = "two"
kind = "originate"
outputs = ["two.txt"]
script = "two.sh"
follows = ["one"]
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(PipelineError::DagCycle(_))
    ));
}

#[test]
fn test_unknown_producer_names_the_stage() {
    let file = config_file(
        r#"
[[stage]]
name = "trim"
kind = "transform"
inputs = "nonexistent"
match = [{ suffix = ".fastq.gz" }]
outputs = ["{prefix}.trimmed.fastq.gz"]
script = "trim.sh"
"#,
    );

    match load_and_validate(file.path()) {
        Err(PipelineError::StageConfig { stage, message }) => {
            assert_eq!(stage, "trim");
            assert!(message.contains("nonexistent"), "{message}");
        }
        other => panic!("Expected StageConfig error, got: {:?}", other),
    }
}

#[test]
fn test_missing_placeholder_is_rejected_before_dispatch() {
    let file = config_file(
        r#"
[[stage]]
name = "align"
kind = "transform"
inputs = "root"
match = [{ regex = '(?P<LIB>[^/]+)\.fastq\.gz$' }]
outputs = ["output/{SAMPLE}.bam"]
script = "align.sh"
"#,
    );

    match load_and_validate(file.path()) {
        Err(PipelineError::MissingPlaceholder { stage, key }) => {
            assert_eq!(stage, "align");
            assert_eq!(key, "SAMPLE");
        }
        other => panic!("Expected MissingPlaceholder error, got: {:?}", other),
    }
}

#[test]
fn test_originate_outputs_must_be_fixed() {
    let file = config_file(
        r#"
[[stage]]
name = "raw"
kind = "originate"
outputs = ["data/{LIB}.fastq.gz"]
script = "true"
"#,
    );

    match load_and_validate(file.path()) {
        Err(PipelineError::StageConfig { stage, message }) => {
            assert_eq!(stage, "raw");
            assert!(message.contains("fixed paths"), "{message}");
        }
        other => panic!("Expected StageConfig error, got: {:?}", other),
    }
}

#[test]
fn test_duplicate_stage_names_are_rejected() {
    let file = config_file(
        r#"
[[stage]]
name = "raw"
kind = "originate"
outputs = ["a.txt"]
script = "true"

[[stage]]
name = "raw"
kind = "originate"
outputs = ["b.txt"]
script = "true"
"#,
    );

    match load_and_validate(file.path()) {
        Err(PipelineError::StageConfig { stage, message }) => {
            assert_eq!(stage, "raw");
            assert!(message.contains("more than once"), "{message}");
        }
        other => panic!("Expected StageConfig error, got: {:?}", other),
    }
}

#[test]
fn test_variant_must_be_a_capture() {
    let file = config_file(
        r#"
[[stage]]
name = "pairs"
kind = "collate"
inputs = "root"
match = [{ regex = '(?P<LIB>[^/_]+)_R\d\.fastq\.gz$' }]
variant = "RN"
outputs = ["{LIB}.merged.fastq.gz"]
script = "merge.sh"
"#,
    );

    match load_and_validate(file.path()) {
        Err(PipelineError::StageConfig { stage, message }) => {
            assert_eq!(stage, "pairs");
            assert!(message.contains("RN"), "{message}");
        }
        other => panic!("Expected StageConfig error, got: {:?}", other),
    }
}

#[test]
fn test_collate_output_cannot_name_one_member_path() {
    for field in ["stem", "basename", "path"] {
        let file = config_file(&format!(
            r#"
[[stage]]
name = "pairs"
kind = "collate"
inputs = "root"
match = [{{ regex = '(?P<LIB>[^/_]+)_R(?P<RN>\d)\.fastq\.gz$' }}]
variant = "RN"
outputs = ["out/{{{field}}}.merged"]
script = "merge.sh"
"#
        ));

        match load_and_validate(file.path()) {
            Err(PipelineError::StageConfig { stage, message }) => {
                assert_eq!(stage, "pairs");
                assert!(message.contains(field), "{message}");
            }
            other => panic!("Expected StageConfig error for {field}, got: {:?}", other),
        }
    }
}

#[test]
fn test_collate_output_cannot_use_the_variant_by_position() {
    let file = config_file(
        r#"
[[stage]]
name = "pairs"
kind = "collate"
inputs = "root"
match = [{ regex = '(?P<LIB>[^/_]+)_R(?P<RN>\d)\.fastq\.gz$' }]
variant = "RN"
outputs = ["out/{LIB}_R{2}.fastq.gz"]
script = "merge.sh"
"#,
    );

    match load_and_validate(file.path()) {
        Err(PipelineError::StageConfig { stage, message }) => {
            assert_eq!(stage, "pairs");
            assert!(message.contains("variant"), "{message}");
        }
        other => panic!("Expected StageConfig error, got: {:?}", other),
    }
}

#[test]
fn test_invalid_regex_is_a_stage_error() {
    let file = config_file(
        r#"
[[stage]]
name = "broken"
kind = "transform"
inputs = "root"
match = [{ regex = '(unclosed' }]
outputs = ["x.txt"]
script = "x.sh"
"#,
    );

    match load_and_validate(file.path()) {
        Err(PipelineError::StageConfig { stage, message }) => {
            assert_eq!(stage, "broken");
            assert!(message.contains("invalid regex"), "{message}");
        }
        other => panic!("Expected StageConfig error, got: {:?}", other),
    }
}

#[test]
fn test_unterminated_template_is_a_stage_error() {
    let file = config_file(
        r#"
[[stage]]
name = "trim"
kind = "transform"
inputs = "root"
match = [{ suffix = ".fastq.gz" }]
outputs = ["{prefix.trimmed.fastq.gz"]
script = "trim.sh"
"#,
    );

    match load_and_validate(file.path()) {
        Err(PipelineError::StageConfig { stage, message }) => {
            assert_eq!(stage, "trim");
            assert!(message.contains("unterminated"), "{message}");
        }
        other => panic!("Expected StageConfig error, got: {:?}", other),
    }
}

#[test]
fn test_zero_max_jobs_is_rejected() {
    let file = config_file(
        r#"
[config]
max_jobs = 0

[[stage]]
name = "raw"
kind = "originate"
outputs = ["a.txt"]
script = "true"
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(PipelineError::ConfigError(msg)) if msg.contains("max_jobs")
    ));
}

#[test]
fn test_config_without_stages_is_rejected() {
    let file = config_file("[config]\nmax_jobs = 2\n");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(PipelineError::ConfigError(_))
    ));
}

#[test]
fn test_unknown_stage_kind_is_a_toml_error() {
    let file = config_file(
        r#"
[[stage]]
name = "x"
kind = "scatter"
outputs = ["a.txt"]
script = "true"
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(PipelineError::TomlError(_))
    ));
}

#[test]
fn test_missing_config_file_is_reported_with_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    match load_and_validate(&path) {
        Err(PipelineError::ConfigError(msg)) => assert!(msg.contains("absent.toml"), "{msg}"),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}
