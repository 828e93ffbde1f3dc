// crates/declgen-codegen/src/header.rs
// ============================================================================
// Module: Header Text
// Description: Loading and year substitution for generated-file headers.
// Purpose: Prepend license or boilerplate text to every generated file.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! The header file is read once per run, before any root is processed, so an
//! unreadable header is a fatal configuration error. Every ` YEAR`
//! placeholder is replaced with ` <year>`; an empty year leaves a bare space.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum header file size in bytes.
pub const MAX_HEADER_BYTES: u64 = 64 * 1024;

/// Placeholder replaced with the configured year.
const YEAR_PLACEHOLDER: &str = " YEAR";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Header loading failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    /// The header file cannot be read.
    #[error("header file {path}: {message}")]
    Io {
        /// Header file path.
        path: String,
        /// Underlying I/O error.
        message: String,
    },
    /// The header file exceeds [`MAX_HEADER_BYTES`].
    #[error("header file {path} exceeds {limit} bytes")]
    TooLarge {
        /// Header file path.
        path: String,
        /// Size limit in bytes.
        limit: u64,
    },
    /// The header file is not UTF-8.
    #[error("header file {path} is not valid UTF-8")]
    NotUtf8 {
        /// Header file path.
        path: String,
    },
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Replaces every ` YEAR` in `text` with ` <year>`.
#[must_use]
pub fn substitute_year(text: &str, year: &str) -> String {
    text.replace(YEAR_PLACEHOLDER, &format!(" {year}"))
}

/// Loads header text and substitutes the year; no path yields empty text.
///
/// # Errors
///
/// Returns [`HeaderError`] when the file cannot be read, is too large, or is
/// not UTF-8.
pub fn load_header(path: Option<&Path>, year: &str) -> Result<String, HeaderError> {
    let Some(path) = path else {
        return Ok(String::new());
    };
    let display = path.display().to_string();
    let io_error = |err: std::io::Error| HeaderError::Io {
        path: display.clone(),
        message: err.to_string(),
    };
    let too_large = || HeaderError::TooLarge {
        path: display.clone(),
        limit: MAX_HEADER_BYTES,
    };
    let file = fs::File::open(path).map_err(io_error)?;
    if file.metadata().map_err(io_error)?.len() > MAX_HEADER_BYTES {
        return Err(too_large());
    }
    let mut bytes = Vec::new();
    file.take(MAX_HEADER_BYTES + 1).read_to_end(&mut bytes).map_err(io_error)?;
    let size = u64::try_from(bytes.len()).map_err(|_| too_large())?;
    if size > MAX_HEADER_BYTES {
        return Err(too_large());
    }
    let text = String::from_utf8(bytes).map_err(|_| HeaderError::NotUtf8 {
        path: display.clone(),
    })?;
    Ok(substitute_year(&text, year))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
