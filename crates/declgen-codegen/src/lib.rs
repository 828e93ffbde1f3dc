// crates/declgen-codegen/src/lib.rs
// ============================================================================
// Module: declgen Codegen
// Description: Generators, Go source synthesis, output routing, and pipeline.
// Purpose: Turn scanned declarations into generated Go source files.
// Dependencies: declgen-core, tempfile, thiserror, tracing
// ============================================================================

//! ## Overview
//! Each generator owns its marker schemas and runs in two phases: extraction
//! validates a declaration against the generator's rules and normalizes it
//! into a specification value; synthesis renders a whole file from those
//! values. The [`Pipeline`] drives every selected generator over every root
//! and routes artifacts through an [`OutputRule`].
//!
//! Invariants:
//! - Synthesis is deterministic: equal inputs render byte-identical files.
//! - Recoverable failures are reported per declaration or per file; only
//!   marker registration and configuration fail a run up front.
//!
//! ## Index
//! - Generators: [`DispatcherGenerator`], [`HandlerGenerator`],
//!   [`EndpointGenerator`], [`MockGenerator`]
//! - Rendering helpers: [`gosrc`]
//! - Routing: [`OutputRule`], [`Sink`]
//! - Driver: [`Pipeline`], [`RunReport`]

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod dispatcher;
pub mod endpoint;
pub mod error;
pub mod generator;
pub mod gosrc;
pub mod handler;
pub mod header;
pub mod mock;
pub mod output;
pub mod pipeline;
pub mod spec;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dispatcher::DispatcherGenerator;
pub use endpoint::EndpointGenerator;
pub use error::GenerateError;
pub use error::SignatureError;
pub use error::SynthesisError;
pub use generator::Artifact;
pub use generator::GenerationInput;
pub use generator::Generator;
pub use generator::GeneratorKind;
pub use generator::GeneratorOutput;
pub use generator::build_generators;
pub use handler::HandlerGenerator;
pub use header::HeaderError;
pub use header::load_header;
pub use header::substitute_year;
pub use mock::MockGenerator;
pub use output::OutputRule;
pub use output::RouteError;
pub use output::Sink;
pub use pipeline::Outcome;
pub use pipeline::Pipeline;
pub use pipeline::PipelineError;
pub use pipeline::PipelineOptions;
pub use pipeline::RootError;
pub use pipeline::RootReport;
pub use pipeline::RootStage;
pub use pipeline::RunMode;
pub use pipeline::RunReport;
pub use spec::ErrorStrategy;
pub use spec::MockBucket;
pub use spec::operation_name;
