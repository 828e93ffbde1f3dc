// crates/declgen-core/src/scanner.rs
// ============================================================================
// Module: Declaration Scanner
// Description: Lazy discovery of marker-annotated declarations.
// Purpose: Pair each annotated declaration with its decoded markers.
// Dependencies: tracing
// ============================================================================

//! ## Overview
//! [`scan`] walks the declarations of a [`ResolvedRoot`] in source order and
//! yields one item per declaration that carries at least one registered
//! marker. Marker lines whose name is not registered are skipped silently.
//! A registered marker that fails to decode yields a [`DeclarationError`]
//! item; the remaining markers on that declaration are still delivered.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;

use thiserror::Error;
use tracing::debug;

use crate::markers::DecodeError;
use crate::markers::MarkerOptions;
use crate::markers::MarkerRegistry;
use crate::model::Declaration;
use crate::symbols::ResolvedRoot;

// ============================================================================
// SECTION: Items
// ============================================================================

/// A declaration together with its decoded markers.
///
/// # Invariants
/// - `markers` is non-empty and in the order the lines were attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedDecl<'a> {
    /// The annotated declaration.
    pub declaration: &'a Declaration,
    /// Successfully decoded markers.
    pub markers: Vec<MarkerOptions>,
}

impl ScannedDecl<'_> {
    /// Returns the decoded occurrences of the named marker.
    pub fn markers_named<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s MarkerOptions> {
        self.markers.iter().filter(move |options| options.marker() == name)
    }

    /// Returns the first decoded occurrence of the named marker.
    #[must_use]
    pub fn marker(&self, name: &str) -> Option<&MarkerOptions> {
        self.markers.iter().find(|options| options.marker() == name)
    }
}

/// A marker on a declaration that failed to decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{location}: {source}")]
pub struct DeclarationError {
    /// Declaration name.
    pub declaration: String,
    /// Human-readable location of the declaration.
    pub location: String,
    /// Decode failure.
    pub source: DecodeError,
}

// ============================================================================
// SECTION: Scanning
// ============================================================================

/// Lazily scans `root` for declarations carrying registered markers.
#[must_use]
pub fn scan<'a>(root: &'a ResolvedRoot, registry: &'a MarkerRegistry) -> Scan<'a> {
    Scan {
        declarations: root.declarations.iter(),
        registry,
        pending: VecDeque::new(),
    }
}

/// Iterator returned by [`scan`].
#[derive(Debug)]
pub struct Scan<'a> {
    /// Remaining declarations.
    declarations: std::slice::Iter<'a, Declaration>,
    /// Registry used for matching and decoding.
    registry: &'a MarkerRegistry,
    /// Items produced by the current declaration but not yet yielded.
    pending: VecDeque<Result<ScannedDecl<'a>, DeclarationError>>,
}

impl<'a> Scan<'a> {
    /// Decodes the markers of one declaration into pending items.
    fn visit(&mut self, declaration: &'a Declaration) {
        let mut decoded = Vec::new();
        for raw in &declaration.markers {
            let Some(schema) = self.registry.match_marker(raw) else {
                continue;
            };
            match self.registry.decode(raw, schema) {
                Ok(options) => decoded.push(options),
                Err(source) => self.pending.push_back(Err(DeclarationError {
                    declaration: declaration.name.clone(),
                    location: declaration.location(),
                    source,
                })),
            }
        }
        if !decoded.is_empty() {
            debug!(
                declaration = %declaration.name,
                markers = decoded.len(),
                "found annotated declaration"
            );
            self.pending.push_back(Ok(ScannedDecl {
                declaration,
                markers: decoded,
            }));
        }
    }
}

impl<'a> Iterator for Scan<'a> {
    type Item = Result<ScannedDecl<'a>, DeclarationError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            let declaration = self.declarations.next()?;
            self.visit(declaration);
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
