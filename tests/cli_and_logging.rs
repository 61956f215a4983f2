// tests/cli_and_logging.rs

use clap::Parser;

use asmpipe::cli::{CliArgs, LogLevel};
use asmpipe::logging::resolve_level;
use asmpipe_test_utils::builders::{PipelineConfigBuilder, StageConfigBuilder};

#[test]
fn test_defaults() {
    let args = CliArgs::try_parse_from(["asmpipe"]).unwrap();

    assert_eq!(args.config, "asmpipe.toml");
    assert!(args.jobs.is_none());
    assert!(!args.dry_run);
    assert_eq!(args.effective_log_level(), None);
}

#[test]
fn test_all_flags() {
    let args = CliArgs::try_parse_from([
        "asmpipe",
        "--config",
        "pipelines/asm.toml",
        "--root",
        "/scratch/reads",
        "-j",
        "16",
        "--target",
        "assembly",
        "--dry-run",
        "--flowchart",
        "graph.dot",
    ])
    .unwrap();

    assert_eq!(args.config, "pipelines/asm.toml");
    assert_eq!(args.root.as_deref(), Some("/scratch/reads"));
    assert_eq!(args.jobs, Some(16));
    assert_eq!(args.target.as_deref(), Some("assembly"));
    assert!(args.dry_run);
    assert_eq!(args.flowchart.as_deref(), Some("graph.dot"));
}

#[test]
fn test_verbosity_maps_to_levels() {
    let v = CliArgs::try_parse_from(["asmpipe", "-v"]).unwrap();
    assert_eq!(v.effective_log_level(), Some(LogLevel::Debug));

    let vv = CliArgs::try_parse_from(["asmpipe", "-vv"]).unwrap();
    assert_eq!(vv.effective_log_level(), Some(LogLevel::Trace));

    let explicit = CliArgs::try_parse_from(["asmpipe", "-vv", "--log-level", "warn"]).unwrap();
    assert_eq!(explicit.effective_log_level(), Some(LogLevel::Warn));
}

#[test]
fn test_log_level_resolution_order() {
    assert_eq!(resolve_level(Some(LogLevel::Error), Some("trace")), tracing::Level::ERROR);
    assert_eq!(resolve_level(None, Some("debug")), tracing::Level::DEBUG);
    assert_eq!(resolve_level(None, Some(" WARNING ")), tracing::Level::WARN);
    assert_eq!(resolve_level(None, Some("loud")), tracing::Level::INFO);
    assert_eq!(resolve_level(None, None), tracing::Level::INFO);
}

#[test]
fn test_overrides_apply_on_top_of_config() {
    let mut cfg = PipelineConfigBuilder::new()
        .root("data")
        .max_jobs(2)
        .stage(StageConfigBuilder::originate("ref").output("ref.fa").build())
        .build();
    let args = CliArgs::try_parse_from(["asmpipe", "--root", "other", "-j", "6"]).unwrap();

    asmpipe::apply_overrides(&mut cfg, &args).unwrap();

    assert_eq!(cfg.catalog.root, "other");
    assert_eq!(cfg.config.max_jobs, 6);

    let zero = CliArgs::try_parse_from(["asmpipe", "-j", "0"]).unwrap();
    assert!(asmpipe::apply_overrides(&mut cfg, &zero).is_err());
}
