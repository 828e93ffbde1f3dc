// crates/declgen-codegen/src/error.rs
// ============================================================================
// Module: Generation Errors
// Description: Error types for extraction, synthesis, and generator output.
// Purpose: Keep recoverable per-declaration failures typed and printable.
// Dependencies: declgen-core, thiserror
// ============================================================================

//! ## Overview
//! Extraction failures ([`SignatureError`]) are recoverable per declaration;
//! synthesis failures ([`SynthesisError`]) are recoverable per output file.
//! Generators report both through [`GenerateError`], which carries the
//! location the pipeline prints.

// ============================================================================
// SECTION: Imports
// ============================================================================

use declgen_core::MethodSetError;
use thiserror::Error;

use crate::pipeline::RootStage;

// ============================================================================
// SECTION: Extraction Errors
// ============================================================================

/// A declaration does not have the shape a generator requires.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The declaration is not an interface.
    #[error("{name} is not an interface (found {found})")]
    NotAnInterface {
        /// Declaration name.
        name: String,
        /// Declaration kind label.
        found: &'static str,
    },
    /// The declaration is not a struct.
    #[error("{name} is not a struct (found {found})")]
    NotAStruct {
        /// Declaration name.
        name: String,
        /// Declaration kind label.
        found: &'static str,
    },
    /// A dispatcher method has zero or more than two parameters.
    #[error("dispatcher method {method} can only have one or two parameters, but it has {count}")]
    TooManyOrFewParameters {
        /// Method name.
        method: String,
        /// Actual parameter count.
        count: usize,
    },
    /// The first parameter is not the context type.
    #[error("method {method} must take a context as its first parameter")]
    MissingContext {
        /// Method name.
        method: String,
    },
    /// A dispatcher parameter is not a named type.
    #[error("parameter {parameter} in dispatcher method {method} is not a named type")]
    InvalidParameterType {
        /// Method name.
        method: String,
        /// Parameter name or position.
        parameter: String,
    },
    /// A dispatcher method has more than one result.
    #[error("dispatcher method {method} can only have one or zero results, but it has {count}")]
    TooManyResults {
        /// Method name.
        method: String,
        /// Actual result count.
        count: usize,
    },
    /// A dispatcher method's single result is not the error type.
    #[error("the result of dispatcher method {method} can only be error")]
    InvalidReturnType {
        /// Method name.
        method: String,
    },
    /// An endpoint method is variadic.
    #[error("endpoint method {method} is variadic, which is not supported")]
    VariadicNotSupported {
        /// Method name.
        method: String,
    },
    /// An endpoint method does not return an error last.
    #[error("endpoint method {method} must return an error as its last result")]
    MissingErrorReturn {
        /// Method name.
        method: String,
    },
    /// A marker option value is outside its accepted set.
    #[error("invalid value \"{value}\" for option {option}")]
    InvalidOption {
        /// Option key.
        option: String,
        /// Rejected value.
        value: String,
    },
    /// The interface method set cannot be flattened.
    #[error(transparent)]
    MethodSet(#[from] MethodSetError),
}

// ============================================================================
// SECTION: Synthesis Errors
// ============================================================================

/// A normalized specification cannot be rendered as valid source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    /// A generated name is not a valid identifier.
    #[error("\"{0}\" is not a valid identifier")]
    InvalidIdentifier(String),
    /// Two artifacts in one file would declare the same identifier.
    #[error("identifier {0} is declared more than once")]
    DuplicateIdentifier(String),
}

// ============================================================================
// SECTION: Generator Errors
// ============================================================================

/// A recoverable failure reported by a generator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    /// A declaration failed extraction.
    #[error("{location}: {source}")]
    Signature {
        /// Declaration location.
        location: String,
        /// Extraction failure.
        source: SignatureError,
    },
    /// An output file failed synthesis.
    #[error("{file}: {source}")]
    Synthesis {
        /// Output file name.
        file: String,
        /// Synthesis failure.
        source: SynthesisError,
    },
}

impl GenerateError {
    /// Returns the pipeline stage the error belongs to.
    #[must_use]
    pub const fn stage(&self) -> RootStage {
        match self {
            Self::Signature {
                ..
            } => RootStage::Extracting,
            Self::Synthesis {
                ..
            } => RootStage::Synthesizing,
        }
    }
}
