// crates/declgen-codegen/src/generator.rs
// ============================================================================
// Module: Generator Contract
// Description: Generator trait, inputs, outputs, and the built-in kinds.
// Purpose: Let the pipeline drive every artifact kind the same way.
// Dependencies: declgen-core
// ============================================================================

//! ## Overview
//! A [`Generator`] registers its marker schema and, per compilation root,
//! turns the scanned declarations into zero or more [`Artifact`]s plus any
//! recoverable errors. Generators never touch the filesystem; the pipeline
//! routes artifacts through the configured output rule.
//!
//! [`GeneratorKind`] is the closed set of built-in generators selectable from
//! configuration and the command line.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use declgen_core::MarkerError;
use declgen_core::MarkerRegistry;
use declgen_core::PackageRef;
use declgen_core::ResolvedRoot;
use declgen_core::ScannedDecl;

use crate::dispatcher::DispatcherGenerator;
use crate::endpoint::EndpointGenerator;
use crate::error::GenerateError;
use crate::error::SynthesisError;
use crate::gosrc::is_identifier;
use crate::handler::HandlerGenerator;
use crate::mock::MockGenerator;

// ============================================================================
// SECTION: Inputs and Outputs
// ============================================================================

/// Everything a generator sees for one compilation root.
#[derive(Debug, Clone, Copy)]
pub struct GenerationInput<'a> {
    /// The resolved root, for method-set flattening.
    pub root: &'a ResolvedRoot,
    /// Declarations carrying at least one registered marker.
    pub declarations: &'a [ScannedDecl<'a>],
    /// Package generated files belong to.
    pub target: &'a PackageRef,
    /// Header text with the year already substituted.
    pub header_text: &'a str,
}

/// One synthesized output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// File name relative to the output location.
    pub file_name: String,
    /// Complete file contents.
    pub contents: String,
}

/// Artifacts and recoverable errors produced for one root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratorOutput {
    /// Files to write.
    pub artifacts: Vec<Artifact>,
    /// Recoverable failures.
    pub errors: Vec<GenerateError>,
}

// ============================================================================
// SECTION: Generator Trait
// ============================================================================

/// Produces one kind of artifact from annotated declarations.
pub trait Generator: Send + Sync {
    /// Stable generator name used in logs.
    fn name(&self) -> &'static str;

    /// Registers the markers this generator reacts to.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerError`] when a marker name is already registered.
    fn register_markers(&self, registry: &mut MarkerRegistry) -> Result<(), MarkerError>;

    /// Generates artifacts for one root.
    fn generate(&self, input: &GenerationInput<'_>) -> GeneratorOutput;
}

// ============================================================================
// SECTION: Built-in Kinds
// ============================================================================

/// Built-in generator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GeneratorKind {
    /// Event dispatcher facade over an event bus.
    EventDispatcher,
    /// Message-router handler adapter for event structs.
    EventHandler,
    /// RPC endpoint wrappers for service interfaces.
    KitEndpoint,
    /// Test doubles for interfaces.
    TestifyMock,
}

impl GeneratorKind {
    /// All kinds in canonical order.
    pub const ALL: [Self; 4] =
        [Self::EventDispatcher, Self::EventHandler, Self::KitEndpoint, Self::TestifyMock];

    /// Returns the configuration and command-line spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EventDispatcher => "event-dispatcher",
            Self::EventHandler => "event-handler",
            Self::KitEndpoint => "kit-endpoint",
            Self::TestifyMock => "testify-mock",
        }
    }

    /// Instantiates the generator.
    #[must_use]
    pub fn build(self) -> Box<dyn Generator> {
        match self {
            Self::EventDispatcher => Box::new(DispatcherGenerator),
            Self::EventHandler => Box::new(HandlerGenerator),
            Self::KitEndpoint => Box::new(EndpointGenerator),
            Self::TestifyMock => Box::new(MockGenerator),
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for GeneratorKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|kind| kind.as_str()).collect();
            format!("unknown generator kind \"{value}\" (expected one of {})", known.join(", "))
        })
    }
}

/// Instantiates every generator in `kinds`, dropping duplicates.
#[must_use]
pub fn build_generators(kinds: &[GeneratorKind]) -> Vec<Box<dyn Generator>> {
    let mut selected: Vec<GeneratorKind> = kinds.to_vec();
    selected.sort_unstable();
    selected.dedup();
    selected.into_iter().map(GeneratorKind::build).collect()
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Fails with [`SynthesisError::InvalidIdentifier`] unless `name` is valid.
///
/// # Errors
///
/// Returns the invalid name wrapped in [`SynthesisError`].
pub fn ensure_identifier(name: &str) -> Result<(), SynthesisError> {
    if is_identifier(name) { Ok(()) } else { Err(SynthesisError::InvalidIdentifier(name.to_string())) }
}

/// Fails with [`SynthesisError::DuplicateIdentifier`] when `name` was seen.
///
/// # Errors
///
/// Returns the repeated name wrapped in [`SynthesisError`].
pub fn claim_identifier(
    seen: &mut std::collections::BTreeSet<String>,
    name: &str,
) -> Result<(), SynthesisError> {
    ensure_identifier(name)?;
    if seen.insert(name.to_string()) {
        Ok(())
    } else {
        Err(SynthesisError::DuplicateIdentifier(name.to_string()))
    }
}
