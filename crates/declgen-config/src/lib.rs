// crates/declgen-config/src/lib.rs
// ============================================================================
// Module: declgen Config Library
// Description: Canonical configuration model and validation.
// Purpose: Single source of truth for declgen.toml semantics.
// Dependencies: declgen-codegen, serde, toml
// ============================================================================

//! ## Overview
//! `declgen-config` defines the `declgen.toml` model. Loading is strict and
//! fail-closed: oversized, non-UTF-8, unknown-key, or semantically invalid
//! files are rejected before any generator runs.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
