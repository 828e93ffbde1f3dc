// crates/declgen-config/src/config/tests.rs
// ============================================================================
// Module: Config Location Tests
// Description: Unit tests for config path resolution.
// Purpose: Validate the explicit, environment, and default lookup order.
// Dependencies: declgen-config, tempfile
// ============================================================================

//! ## Overview
//! Exercises [`super::locate`] directly so the environment lookup can be
//! tested without mutating process state.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use super::ConfigError;
use super::locate;

#[test]
fn explicit_path_wins_even_when_missing() {
    let located = locate(
        Some(Path::new("missing.toml")),
        Some(OsString::from("env.toml")),
        Path::new("declgen.toml"),
    )
    .unwrap();
    assert_eq!(located, Some(PathBuf::from("missing.toml")));
}

#[test]
fn environment_overrides_default_location() {
    let located =
        locate(None, Some(OsString::from("env.toml")), Path::new("declgen.toml")).unwrap();
    assert_eq!(located, Some(PathBuf::from("env.toml")));
}

#[test]
fn empty_environment_value_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let fallback = dir.path().join("declgen.toml");
    let located = locate(None, Some(OsString::new()), &fallback).unwrap();
    assert_eq!(located, None);
}

#[test]
fn default_location_is_used_only_when_present() {
    let dir = tempfile::tempdir().unwrap();
    let fallback = dir.path().join("declgen.toml");
    assert_eq!(locate(None, None, &fallback).unwrap(), None);

    fs::write(&fallback, "[generate]\n").unwrap();
    assert_eq!(locate(None, None, &fallback).unwrap(), Some(fallback));
}

#[test]
fn oversized_environment_path_is_rejected() {
    let value = OsString::from("a".repeat(5_000));
    let err = locate(None, Some(value), Path::new("declgen.toml")).unwrap_err();
    assert_eq!(err, ConfigError::Invalid("config path exceeds max length".to_string()));
}
