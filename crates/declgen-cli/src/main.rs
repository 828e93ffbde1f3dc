// crates/declgen-cli/src/main.rs
// ============================================================================
// Module: declgen CLI Entry Point
// Description: Command dispatcher for generation, drift checks, and help.
// Purpose: Resolve run settings from flags and config, then drive the pipeline.
// Dependencies: clap, declgen-codegen, declgen-config, declgen-core, thiserror,
//               tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! `declgen generate` runs the selected generators over every root and writes
//! their files; `declgen check` runs the same pipeline in verify mode and
//! fails on drift; `declgen markers` lists the registered markers.
//!
//! Command-line flags override `declgen.toml` values. Every recorded error is
//! printed to stderr and any error yields a non-zero exit status. Logging goes
//! to stderr so generated output on stdout stays clean.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::builder::PossibleValuesParser;
use declgen_codegen::GeneratorKind;
use declgen_codegen::HeaderError;
use declgen_codegen::OutputRule;
use declgen_codegen::Outcome;
use declgen_codegen::Pipeline;
use declgen_codegen::PipelineError;
use declgen_codegen::PipelineOptions;
use declgen_codegen::RouteError;
use declgen_codegen::RunMode;
use declgen_codegen::build_generators;
use declgen_codegen::load_header;
use declgen_config::ConfigError;
use declgen_config::DeclgenConfig;
use declgen_config::LOG_LEVELS;
use declgen_config::MAX_JOBS;
use declgen_core::JsonSymbolResolver;
use declgen_core::MarkerRegistry;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Log level used when neither `RUST_LOG`, a flag, nor config sets one.
const DEFAULT_LOG_LEVEL: &str = "warn";
/// Root processed when neither arguments nor config name any.
const DEFAULT_ROOT: &str = ".";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "declgen",
    version,
    about = "Generate Go source from marker-annotated declarations",
    disable_help_subcommand = true
)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate files for every root.
    Generate(RunArgs),
    /// Verify generated files are up to date without writing them.
    Check(RunArgs),
    /// List the markers understood by the selected generators.
    Markers(MarkersArgs),
}

/// Arguments shared by `generate` and `check`.
#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Compilation roots: directories holding a symbol table, or table files.
    #[arg(value_name = "PATHS")]
    paths: Vec<String>,
    /// Generator to run; repeatable. Defaults to every generator.
    #[arg(long = "kind", value_name = "KIND")]
    kinds: Vec<GeneratorKind>,
    /// File prepended to every generated file.
    #[arg(long, value_name = "FILE")]
    header_file: Option<PathBuf>,
    /// Year substituted for ` YEAR` in the header.
    #[arg(long, value_name = "YEAR")]
    year: Option<String>,
    /// Output rule: pkg, subpkg[:prefix=,package=,suffix=], dir:path=, stdout, none.
    #[arg(long, value_name = "RULE")]
    output: Option<String>,
    /// Worker threads.
    #[arg(long, value_name = "N")]
    jobs: Option<usize>,
    /// Configuration file (overrides `DECLGEN_CONFIG`).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Log level used when `RUST_LOG` is unset.
    #[arg(long, value_name = "LEVEL", value_parser = PossibleValuesParser::new(LOG_LEVELS))]
    log_level: Option<String>,
}

/// Arguments for `markers`.
#[derive(Args, Debug, Default)]
struct MarkersArgs {
    /// Generator whose markers are listed; repeatable. Defaults to every generator.
    #[arg(long = "kind", value_name = "KIND")]
    kinds: Vec<GeneratorKind>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal CLI failures.
#[derive(Debug, Error)]
enum CliError {
    /// The configuration file is unreadable or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The header file is unreadable.
    #[error(transparent)]
    Header(#[from] HeaderError),
    /// The output rule flag does not parse.
    #[error(transparent)]
    Output(#[from] RouteError),
    /// Generator markers collide or no generator is selected.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// A flag value is out of range.
    #[error("{0}")]
    Usage(String),
    /// Writing to a standard stream failed.
    #[error("failed to write to {stream}: {message}")]
    Stream {
        /// Stream name.
        stream: &'static str,
        /// Underlying I/O error.
        message: String,
    },
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(Outcome::Success) => ExitCode::SUCCESS,
        Ok(Outcome::PartialFailure) => ExitCode::FAILURE,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<Outcome> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Generate(args) => command_run(&args, RunMode::Write),
        Commands::Check(args) => command_run(&args, RunMode::Check),
        Commands::Markers(args) => command_markers(&args),
    }
}

// ============================================================================
// SECTION: Run Commands
// ============================================================================

/// Effective settings after merging flags over configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RunSettings {
    /// Roots in processing order.
    roots: Vec<String>,
    /// Selected generators.
    kinds: Vec<GeneratorKind>,
    /// Output routing rule.
    output: OutputRule,
    /// Header file, if any.
    header_file: Option<PathBuf>,
    /// Year substituted into the header.
    year: String,
    /// Worker threads.
    jobs: usize,
}

/// Runs the pipeline in `mode` and prints every recorded error.
fn command_run(args: &RunArgs, mode: RunMode) -> CliResult<Outcome> {
    let config = DeclgenConfig::load(args.config.as_deref())?;
    init_logging(args.log_level.as_deref(), config.logging.level.as_deref());
    if let Some(source) = &config.source {
        info!(config = %source.display(), "loaded configuration");
    }
    let settings = resolve_settings(args, &config)?;
    let header_text = load_header(settings.header_file.as_deref(), &settings.year)?;
    let pipeline = Pipeline::new(
        build_generators(&settings.kinds),
        PipelineOptions {
            header_text,
            output: settings.output,
            jobs: settings.jobs,
            mode,
        },
    )?;
    let report = pipeline.run(&JsonSymbolResolver::new(), &settings.roots);
    for error in report.errors() {
        write_stderr_line(&error.to_string()).map_err(|err| stream_error("stderr", &err))?;
    }
    Ok(report.outcome())
}

/// Merges flags over configuration values.
fn resolve_settings(args: &RunArgs, config: &DeclgenConfig) -> CliResult<RunSettings> {
    let generate = &config.generate;
    let roots = match (args.paths.is_empty(), generate.roots.is_empty()) {
        (false, _) => args.paths.clone(),
        (true, false) => generate.roots.clone(),
        (true, true) => vec![DEFAULT_ROOT.to_string()],
    };
    let kinds =
        if args.kinds.is_empty() { generate.generator_kinds()? } else { args.kinds.clone() };
    let output = match &args.output {
        Some(rule) => OutputRule::parse(rule)?,
        None => generate.output_rule()?,
    };
    let jobs = args.jobs.unwrap_or(generate.jobs);
    if jobs == 0 || jobs > MAX_JOBS {
        return Err(CliError::Usage(format!("--jobs must be between 1 and {MAX_JOBS}")));
    }
    Ok(RunSettings {
        roots,
        kinds,
        output,
        header_file: args.header_file.clone().or_else(|| generate.header_file.clone()),
        year: args.year.clone().or_else(|| generate.year.clone()).unwrap_or_default(),
        jobs,
    })
}

// ============================================================================
// SECTION: Markers Command
// ============================================================================

/// Prints the markers of the selected generators.
fn command_markers(args: &MarkersArgs) -> CliResult<Outcome> {
    let kinds =
        if args.kinds.is_empty() { GeneratorKind::ALL.to_vec() } else { args.kinds.clone() };
    let pipeline = Pipeline::new(build_generators(&kinds), PipelineOptions::default())?;
    write_stdout(&render_markers(pipeline.registry()))
        .map_err(|err| stream_error("stdout", &err))?;
    Ok(Outcome::Success)
}

/// Renders usage and help for every registered marker, sorted by name.
fn render_markers(registry: &MarkerRegistry) -> String {
    let mut out = String::new();
    for schema in registry.schemas() {
        let _ = writeln!(out, "{}\n    {}", schema.usage(), schema.help);
        for option in &schema.options {
            let _ = write!(out, "    {} ({}): {}", option.key, option.ty, option.help);
            if option.required {
                out.push_str(" [required]");
            } else if let Some(default) = &option.default {
                let _ = write!(out, " [default: {default}]");
            }
            out.push('\n');
        }
    }
    out
}

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Returns the level used when `RUST_LOG` is unset.
fn fallback_log_level<'a>(flag: Option<&'a str>, config: Option<&'a str>) -> &'a str {
    flag.or(config).unwrap_or(DEFAULT_LOG_LEVEL)
}

/// Installs the stderr subscriber; `RUST_LOG` wins over flag and config.
fn init_logging(flag: Option<&str>, config: Option<&str>) {
    let fallback = fallback_log_level(flag, config);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes text to stdout as-is.
fn write_stdout(text: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Wraps a stream write failure.
fn stream_error(stream: &'static str, error: &std::io::Error) -> CliError {
    CliError::Stream {
        stream,
        message: error.to_string(),
    }
}

/// Emits an error message and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
