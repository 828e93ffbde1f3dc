// crates/declgen-core/src/lib.rs
// ============================================================================
// Module: declgen Core
// Description: Declaration model, symbol resolution, markers, and scanning.
// Purpose: Provide the input side of the declaration-driven generator.
// Dependencies: serde, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! `declgen-core` owns everything the generators consume: the resolved
//! declaration model, the [`SymbolResolver`] contract with its JSON
//! symbol-table adapter, the [`MarkerRegistry`], and the lazy declaration
//! [`scan`]ner.
//!
//! Invariants:
//! - No global state: registries and resolvers are explicit values.
//! - Declarations are closed variants; extractors match on [`DeclKind`].
//!
//! ## Index
//! - Model: [`Declaration`], [`TypeExpr`], [`TypeRef`], [`PackageRef`]
//! - Resolution: [`SymbolResolver`], [`JsonSymbolResolver`], [`StaticResolver`]
//! - Markers: [`MarkerRegistry`], [`MarkerSchema`], [`MarkerOptions`]

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod markers;
pub mod model;
pub mod scanner;
pub mod symbols;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use markers::DecodeError;
pub use markers::MarkerError;
pub use markers::MarkerOptions;
pub use markers::MarkerRegistry;
pub use markers::MarkerSchema;
pub use markers::OptionSchema;
pub use markers::OptionType;
pub use markers::OptionValue;
pub use model::CONTEXT_PACKAGE_PATH;
pub use model::CONTEXT_TYPE_NAME;
pub use model::ChanDir;
pub use model::DeclKind;
pub use model::Declaration;
pub use model::ERROR_TYPE_NAME;
pub use model::Field;
pub use model::InterfaceType;
pub use model::Method;
pub use model::NamedType;
pub use model::PackageRef;
pub use model::Param;
pub use model::Signature;
pub use model::SourcePosition;
pub use model::StructType;
pub use model::TypeExpr;
pub use model::TypeRef;
pub use scanner::DeclarationError;
pub use scanner::ScannedDecl;
pub use scanner::scan;
pub use symbols::ImportedInterface;
pub use symbols::JsonSymbolResolver;
pub use symbols::MAX_SYMBOL_TABLE_BYTES;
pub use symbols::MethodSetError;
pub use symbols::ResolveError;
pub use symbols::ResolvedRoot;
pub use symbols::SYMBOL_TABLE_FILE;
pub use symbols::StaticResolver;
pub use symbols::SymbolResolver;
pub use symbols::SymbolTable;
