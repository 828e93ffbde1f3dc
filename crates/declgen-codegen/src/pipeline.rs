// crates/declgen-codegen/src/pipeline.rs
// ============================================================================
// Module: Pipeline Driver
// Description: Per-root orchestration of scanning, generation, and output.
// Purpose: Run every generator on every root and aggregate the outcome.
// Dependencies: declgen-core, thiserror, tracing
// ============================================================================

//! ## Overview
//! Each root walks `Idle → Scanning → Extracting → Synthesizing → Writing →
//! Done`. A root that cannot be resolved stops in `Scanning`; every other
//! failure is recorded on the root and processing continues. Failures never
//! cross roots.
//!
//! With `jobs > 1`, roots run on scoped worker threads that pull the next
//! root index from a shared counter. The marker registry and generators are
//! shared read-only; reports are collected under a mutex and re-ordered by
//! root index, so the report does not depend on scheduling.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;

use declgen_core::MarkerError;
use declgen_core::MarkerRegistry;
use declgen_core::ResolvedRoot;
use declgen_core::SymbolResolver;
use declgen_core::scan;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::info_span;
use tracing::warn;

use crate::generator::Artifact;
use crate::generator::GenerationInput;
use crate::generator::Generator;
use crate::output::OutputRule;
use crate::output::RouteError;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Whether artifacts are written or compared with existing files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    /// Write artifacts through the output rule.
    #[default]
    Write,
    /// Compare artifacts with the files they would replace.
    Check,
}

/// Run-wide pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Header text with the year already substituted.
    pub header_text: String,
    /// Output routing rule.
    pub output: OutputRule,
    /// Worker threads; values below 2 run sequentially.
    pub jobs: usize,
    /// Write or check.
    pub mode: RunMode,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            header_text: String::new(),
            output: OutputRule::Package,
            jobs: 1,
            mode: RunMode::Write,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal pipeline construction failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Two generators registered the same marker.
    #[error(transparent)]
    Marker(#[from] MarkerError),
    /// No generator was selected.
    #[error("no generators selected")]
    NoGenerators,
}

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Processing stage of one root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum RootStage {
    /// Not started.
    #[default]
    Idle,
    /// Resolving the root and collecting marked declarations.
    Scanning,
    /// Validating declarations against generator rules.
    Extracting,
    /// Rendering source files.
    Synthesizing,
    /// Routing artifacts to their destinations.
    Writing,
    /// Finished, possibly with recorded errors.
    Done,
}

impl fmt::Display for RootStage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Extracting => "extracting",
            Self::Synthesizing => "synthesizing",
            Self::Writing => "writing",
            Self::Done => "done",
        })
    }
}

/// A failure recorded on a root.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{root}: {stage}: {message}")]
pub struct RootError {
    /// Root identifier.
    pub root: String,
    /// Stage the failure occurred in.
    pub stage: RootStage,
    /// Rendered failure.
    pub message: String,
}

/// Result of processing one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootReport {
    /// Root identifier.
    pub root: String,
    /// Last stage reached.
    pub stage: RootStage,
    /// Generated file names, in generator order.
    pub files: Vec<String>,
    /// Paths written to disk.
    pub written: Vec<PathBuf>,
    /// Recorded failures.
    pub errors: Vec<RootError>,
}

impl RootReport {
    /// Creates an idle report for `root`.
    fn new(root: &str) -> Self {
        Self {
            root: root.to_string(),
            stage: RootStage::Idle,
            files: Vec::new(),
            written: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Records a failure at `stage`.
    fn fail(&mut self, stage: RootStage, message: String) {
        warn!(root = %self.root, %stage, error = %message, "root error");
        self.errors.push(RootError {
            root: self.root.clone(),
            stage,
            message,
        });
    }
}

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No root recorded an error.
    Success,
    /// At least one root recorded an error.
    PartialFailure,
}

/// Reports for every root, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Per-root reports.
    pub roots: Vec<RootReport>,
}

impl RunReport {
    /// Returns the run outcome.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        if self.roots.iter().all(|root| root.errors.is_empty()) {
            Outcome::Success
        } else {
            Outcome::PartialFailure
        }
    }

    /// Iterates over every recorded failure.
    pub fn errors(&self) -> impl Iterator<Item = &RootError> {
        self.roots.iter().flat_map(|root| root.errors.iter())
    }

    /// Returns the number of paths written to disk.
    #[must_use]
    pub fn written_count(&self) -> usize {
        self.roots.iter().map(|root| root.written.len()).sum()
    }
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Generators, their markers, and run settings.
pub struct Pipeline {
    /// Selected generators, in run order.
    generators: Vec<Box<dyn Generator>>,
    /// Markers registered by the generators.
    registry: MarkerRegistry,
    /// Run settings.
    options: PipelineOptions,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.generators.iter().map(|generator| generator.name()).collect();
        formatter
            .debug_struct("Pipeline")
            .field("generators", &names)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Builds a pipeline and registers every generator's markers.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoGenerators`] for an empty selection and
    /// [`PipelineError::Marker`] when two generators claim one marker.
    pub fn new(
        generators: Vec<Box<dyn Generator>>,
        options: PipelineOptions,
    ) -> Result<Self, PipelineError> {
        if generators.is_empty() {
            return Err(PipelineError::NoGenerators);
        }
        let mut registry = MarkerRegistry::new();
        for generator in &generators {
            generator.register_markers(&mut registry)?;
        }
        Ok(Self {
            generators,
            registry,
            options,
        })
    }

    /// Returns the marker registry.
    #[must_use]
    pub const fn registry(&self) -> &MarkerRegistry {
        &self.registry
    }

    /// Returns the run settings.
    #[must_use]
    pub const fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Processes every root and returns their reports in input order.
    pub fn run(&self, resolver: &dyn SymbolResolver, roots: &[String]) -> RunReport {
        let jobs = self.options.jobs.clamp(1, roots.len().max(1));
        let reports = if jobs == 1 {
            roots.iter().map(|root| self.process_root(resolver, root)).collect()
        } else {
            self.run_parallel(resolver, roots, jobs)
        };
        let report = RunReport {
            roots: reports,
        };
        info!(
            roots = report.roots.len(),
            written = report.written_count(),
            errors = report.errors().count(),
            "generation finished"
        );
        report
    }

    /// Processes roots on `jobs` scoped worker threads.
    fn run_parallel(
        &self,
        resolver: &dyn SymbolResolver,
        roots: &[String],
        jobs: usize,
    ) -> Vec<RootReport> {
        let next = AtomicUsize::new(0);
        let collected = Mutex::new(Vec::with_capacity(roots.len()));
        thread::scope(|scope| {
            for _ in 0 .. jobs {
                scope.spawn(|| {
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(root) = roots.get(index) else {
                            break;
                        };
                        let report = self.process_root(resolver, root);
                        collected.lock().unwrap_or_else(PoisonError::into_inner).push((index, report));
                    }
                });
            }
        });
        let mut collected = collected.into_inner().unwrap_or_else(PoisonError::into_inner);
        collected.sort_by_key(|(index, _)| *index);
        collected.into_iter().map(|(_, report)| report).collect()
    }

    /// Runs one root through every stage.
    fn process_root(&self, resolver: &dyn SymbolResolver, root_id: &str) -> RootReport {
        let span = info_span!("root", root = %root_id);
        let _entered = span.enter();
        let mut report = RootReport::new(root_id);

        report.stage = RootStage::Scanning;
        let resolved = match resolver.resolve(root_id) {
            Ok(resolved) => resolved,
            Err(err) => {
                report.fail(RootStage::Scanning, err.to_string());
                return report;
            }
        };
        let mut declarations = Vec::new();
        for item in scan(&resolved, &self.registry) {
            match item {
                Ok(declaration) => declarations.push(declaration),
                Err(err) => report.fail(RootStage::Scanning, err.to_string()),
            }
        }
        debug!(declarations = declarations.len(), "scanned root");

        let target = self.options.output.package_ref(&resolved);
        let input = GenerationInput {
            root: &resolved,
            declarations: &declarations,
            target: &target,
            header_text: &self.options.header_text,
        };
        let mut artifacts = Vec::new();
        for generator in &self.generators {
            report.stage = RootStage::Extracting;
            let output = generator.generate(&input);
            report.stage = RootStage::Synthesizing;
            debug!(
                generator = generator.name(),
                artifacts = output.artifacts.len(),
                errors = output.errors.len(),
                "generator finished"
            );
            for err in output.errors {
                report.fail(err.stage(), err.to_string());
            }
            artifacts.extend(output.artifacts);
        }

        report.stage = RootStage::Writing;
        for artifact in &artifacts {
            report.files.push(artifact.file_name.clone());
            match self.route(&resolved, artifact) {
                Ok(Some(path)) => {
                    debug!(path = %path.display(), "wrote artifact");
                    report.written.push(path);
                }
                Ok(None) => {}
                Err(err) => report.fail(RootStage::Writing, err.to_string()),
            }
        }
        report.stage = RootStage::Done;
        report
    }

    /// Writes or verifies one artifact according to the run mode.
    fn route(&self, root: &ResolvedRoot, artifact: &Artifact) -> Result<Option<PathBuf>, RouteError> {
        let output = &self.options.output;
        match self.options.mode {
            RunMode::Check => {
                output.verify(root, &artifact.file_name, &artifact.contents)?;
                Ok(None)
            }
            RunMode::Write => {
                let mut sink = output.open(root, &artifact.file_name)?;
                sink.write_all(artifact.contents.as_bytes()).map_err(|err| RouteError::Io {
                    path: artifact.file_name.clone(),
                    message: err.to_string(),
                })?;
                sink.finish()
            }
        }
    }
}
