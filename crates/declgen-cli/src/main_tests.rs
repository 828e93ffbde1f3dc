// crates/declgen-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing, settings merge, and commands.
// Purpose: Ensure flags override config and runs report drift and success.
// Dependencies: declgen-cli main helpers, tempfile
// ============================================================================

//! ## Overview
//! Validates clap definitions, flag-over-config precedence, marker listing,
//! and an end-to-end generate/check cycle against a temporary root.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use clap::CommandFactory;
use clap::Parser;
use declgen_codegen::GeneratorKind;
use declgen_codegen::OutputRule;
use declgen_codegen::Outcome;
use declgen_codegen::Pipeline;
use declgen_codegen::PipelineOptions;
use declgen_codegen::RunMode;
use declgen_codegen::build_generators;
use declgen_config::DeclgenConfig;
use declgen_core::SYMBOL_TABLE_FILE;

use super::Cli;
use super::CliError;
use super::Commands;
use super::RunArgs;
use super::command_run;
use super::fallback_log_level;
use super::render_markers;
use super::resolve_settings;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Symbol table with one dispatcher interface.
const TABLE: &str = r#"{
  "package": { "name": "todo", "path": "example.com/app/todo" },
  "declarations": [
    {
      "name": "Events",
      "kind": "interface",
      "markers": ["+event:dispatcher"],
      "methods": [
        {
          "name": "MarkedAsDone",
          "params": [
            { "name": "ctx", "type": { "kind": "named", "name": "Context", "package": { "name": "context", "path": "context" } } },
            { "name": "event", "type": { "kind": "named", "name": "MarkedAsDone", "package": { "name": "todo", "path": "example.com/app/todo" } } }
          ],
          "results": [ { "type": { "kind": "named", "name": "error" } } ]
        }
      ]
    },
    { "name": "MarkedAsDone", "kind": "struct" }
  ]
}"#;

/// Parses a full command line into run arguments.
fn run_args(argv: &[&str]) -> RunArgs {
    match Cli::try_parse_from(argv).unwrap().command {
        Commands::Generate(args) | Commands::Check(args) => args,
        Commands::Markers(_) => panic!("expected a run command"),
    }
}

/// Parses configuration text.
fn config(text: &str) -> DeclgenConfig {
    DeclgenConfig::from_toml_str(text).unwrap()
}

/// Writes the fixture table and an empty config into `dir`.
fn workspace(dir: &Path) -> PathBuf {
    fs::write(dir.join(SYMBOL_TABLE_FILE), TABLE).unwrap();
    let config_path = dir.join("declgen.toml");
    fs::write(&config_path, "").unwrap();
    config_path
}

// ============================================================================
// SECTION: Argument Parsing
// ============================================================================

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn generate_parses_every_flag() {
    let args = run_args(&[
        "declgen",
        "generate",
        "./a",
        "./b",
        "--kind",
        "event-handler",
        "--kind",
        "testify-mock",
        "--header-file",
        "hack/header.txt",
        "--year",
        "2026",
        "--output",
        "stdout",
        "--jobs",
        "3",
        "--config",
        "custom.toml",
        "--log-level",
        "debug",
    ]);
    assert_eq!(args.paths, ["./a", "./b"]);
    assert_eq!(args.kinds, [GeneratorKind::EventHandler, GeneratorKind::TestifyMock]);
    assert_eq!(args.header_file, Some(PathBuf::from("hack/header.txt")));
    assert_eq!(args.year.as_deref(), Some("2026"));
    assert_eq!(args.output.as_deref(), Some("stdout"));
    assert_eq!(args.jobs, Some(3));
    assert_eq!(args.config, Some(PathBuf::from("custom.toml")));
    assert_eq!(args.log_level.as_deref(), Some("debug"));
}

#[test]
fn parsing_rejects_unknown_kind_and_level() {
    assert!(Cli::try_parse_from(["declgen", "generate", "--kind", "grpc"]).is_err());
    assert!(Cli::try_parse_from(["declgen", "check", "--log-level", "loud"]).is_err());
}

// ============================================================================
// SECTION: Settings
// ============================================================================

#[test]
fn flags_override_config() {
    let config = config(
        "[generate]\nroots = [\"./cfg\"]\nkinds = [\"kit-endpoint\"]\noutput = \"none\"\n\
         header_file = \"cfg.txt\"\nyear = \"2020\"\njobs = 2\n",
    );
    let args = run_args(&[
        "declgen",
        "generate",
        "./cli",
        "--kind",
        "event-dispatcher",
        "--output",
        "stdout",
        "--header-file",
        "cli.txt",
        "--year",
        "2026",
        "--jobs",
        "4",
    ]);
    let settings = resolve_settings(&args, &config).unwrap();
    assert_eq!(settings.roots, ["./cli"]);
    assert_eq!(settings.kinds, [GeneratorKind::EventDispatcher]);
    assert_eq!(settings.output, OutputRule::Stdout);
    assert_eq!(settings.header_file, Some(PathBuf::from("cli.txt")));
    assert_eq!(settings.year, "2026");
    assert_eq!(settings.jobs, 4);
}

#[test]
fn config_fills_unset_flags() {
    let config = config(
        "[generate]\nroots = [\"./cfg\"]\nkinds = [\"kit-endpoint\"]\noutput = \"none\"\n\
         year = \"2020\"\njobs = 2\n",
    );
    let settings = resolve_settings(&RunArgs::default(), &config).unwrap();
    assert_eq!(settings.roots, ["./cfg"]);
    assert_eq!(settings.kinds, [GeneratorKind::KitEndpoint]);
    assert_eq!(settings.output, OutputRule::Nothing);
    assert_eq!(settings.header_file, None);
    assert_eq!(settings.year, "2020");
    assert_eq!(settings.jobs, 2);
}

#[test]
fn defaults_apply_without_flags_or_config() {
    let settings = resolve_settings(&RunArgs::default(), &DeclgenConfig::default()).unwrap();
    assert_eq!(settings.roots, ["."]);
    assert_eq!(settings.kinds, GeneratorKind::ALL);
    assert_eq!(settings.output, OutputRule::Package);
    assert_eq!(settings.year, "");
    assert_eq!(settings.jobs, 1);
}

#[test]
fn settings_reject_bad_flag_values() {
    let zero_jobs = run_args(&["declgen", "generate", "--jobs", "0"]);
    let err = resolve_settings(&zero_jobs, &DeclgenConfig::default()).unwrap_err();
    assert_eq!(err.to_string(), "--jobs must be between 1 and 256");

    let bad_rule = run_args(&["declgen", "generate", "--output", "tarball"]);
    let err = resolve_settings(&bad_rule, &DeclgenConfig::default()).unwrap_err();
    assert!(matches!(err, CliError::Output(_)));
}

#[test]
fn log_level_prefers_flag_then_config() {
    assert_eq!(fallback_log_level(Some("debug"), Some("info")), "debug");
    assert_eq!(fallback_log_level(None, Some("info")), "info");
    assert_eq!(fallback_log_level(None, None), "warn");
}

// ============================================================================
// SECTION: Commands
// ============================================================================

#[test]
fn markers_listing_shows_usage_help_and_defaults() {
    let pipeline =
        Pipeline::new(build_generators(&GeneratorKind::ALL), PipelineOptions::default()).unwrap();
    let listing = render_markers(pipeline.registry());
    assert!(listing.starts_with("+event:dispatcher\n"));
    assert!(listing.contains(
        "+kit:endpoint[:baseName=<string>,moduleName=<string>,withOpenCensus=<bool>,errorStrategy=<string>]\n    \
         enables endpoint generation for a service interface\n"
    ));
    assert!(listing.contains(
        "    withOpenCensus (bool): generate a tracing endpoint wrapper [default: false]\n"
    ));
    assert!(listing.contains("+testify:mock[:testOnly=<bool>,external=<bool>]\n"));
    assert!(listing.contains("+mga:event:handler\n    alias of +event:handler\n"));
}

#[test]
fn generate_then_check_detects_drift() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = workspace(dir.path());
    let root = dir.path().to_str().unwrap().to_string();
    let args = RunArgs {
        paths: vec![root],
        kinds: vec![GeneratorKind::EventDispatcher],
        config: Some(config_path),
        ..RunArgs::default()
    };

    assert_eq!(command_run(&args, RunMode::Write).unwrap(), Outcome::Success);
    let generated = dir.path().join("zz_generated.event_dispatcher.go");
    let contents = fs::read_to_string(&generated).unwrap();
    assert!(contents.contains("func (d EventDispatcher) MarkedAsDone("));

    assert_eq!(command_run(&args, RunMode::Check).unwrap(), Outcome::Success);
    fs::write(&generated, "package todo\n").unwrap();
    assert_eq!(command_run(&args, RunMode::Check).unwrap(), Outcome::PartialFailure);
    assert_eq!(fs::read_to_string(&generated).unwrap(), "package todo\n");
}

#[test]
fn unreadable_config_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let args = RunArgs {
        config: Some(dir.path().join("absent.toml")),
        ..RunArgs::default()
    };
    let err = command_run(&args, RunMode::Write).unwrap_err();
    assert!(matches!(err, CliError::Config(_)));
}
