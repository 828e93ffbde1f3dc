// crates/declgen-core/tests/json_symbols.rs
// ============================================================================
// Module: JSON Symbol Table Tests
// Description: Integration tests for the on-disk symbol-table adapter.
// Purpose: Validate path resolution, parsing, and input size limits.
// Dependencies: declgen-core, tempfile
// ============================================================================

//! ## Overview
//! Writes symbol tables into temporary directories and resolves them through
//! [`JsonSymbolResolver`], covering directory and file roots, source
//! directory resolution, malformed input, and the size limit.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::fs;

use declgen_core::DeclKind;
use declgen_core::JsonSymbolResolver;
use declgen_core::MAX_SYMBOL_TABLE_BYTES;
use declgen_core::ResolveError;
use declgen_core::SYMBOL_TABLE_FILE;
use declgen_core::SymbolResolver;
use declgen_core::TypeExpr;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Symbol table fixture covering every declaration kind.
const TABLE: &str = r#"{
  "package": { "name": "todo", "path": "example.com/app/todo" },
  "declarations": [
    {
      "name": "Events",
      "kind": "interface",
      "markers": ["+event:dispatcher"],
      "position": { "file": "events.go", "line": 12 },
      "methods": [
        {
          "name": "MarkedAsDone",
          "params": [
            { "name": "ctx", "type": { "kind": "named", "name": "Context", "package": { "name": "context", "path": "context" } } },
            { "name": "event", "type": { "kind": "named", "name": "MarkedAsDone", "package": { "name": "todo", "path": "example.com/app/todo" } } }
          ],
          "results": [ { "type": { "kind": "named", "name": "error" } } ]
        }
      ]
    },
    {
      "name": "MarkedAsDone",
      "kind": "struct",
      "markers": ["+event:handler"],
      "fields": [ { "name": "ID", "type": { "kind": "named", "name": "string" } } ]
    },
    {
      "name": "Tags",
      "kind": "other",
      "underlying": { "kind": "slice", "elem": { "kind": "named", "name": "string" } }
    }
  ]
}"#;

/// Symbol table whose results reference imported and local nillable types.
const NILLABLE_TABLE: &str = r#"{
  "package": { "name": "store", "path": "example.com/app/store" },
  "declarations": [
    {
      "name": "Repository",
      "kind": "interface",
      "methods": [
        {
          "name": "Open",
          "results": [
            { "type": { "kind": "named", "name": "Reader", "package": { "name": "io", "path": "io" }, "nillable": true } },
            { "type": { "kind": "named", "name": "Cursor", "package": { "name": "store", "path": "example.com/app/store" } } },
            { "type": { "kind": "named", "name": "Callback", "package": { "name": "store", "path": "example.com/app/store" } } },
            { "type": { "kind": "named", "name": "Item", "package": { "name": "store", "path": "example.com/app/store" } } },
            { "type": { "kind": "named", "name": "error" } }
          ]
        }
      ]
    },
    { "name": "Cursor", "kind": "interface" },
    {
      "name": "Hook",
      "kind": "other",
      "underlying": { "kind": "func", "signature": {} }
    },
    {
      "name": "Callback",
      "kind": "other",
      "underlying": { "kind": "named", "name": "Hook", "package": { "name": "store", "path": "example.com/app/store" } }
    },
    { "name": "Item", "kind": "struct" }
  ]
}"#;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn resolves_directory_root() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(SYMBOL_TABLE_FILE), TABLE).unwrap();
    let root = dir.path().to_str().unwrap();

    let resolved = JsonSymbolResolver::new().resolve(root).unwrap();
    assert_eq!(resolved.root, root);
    assert_eq!(resolved.package.name, "todo");
    assert_eq!(resolved.source_dir.as_deref(), Some(dir.path()));
    assert_eq!(resolved.declarations.len(), 3);

    let events = &resolved.declarations[0];
    assert_eq!(events.markers, ["+event:dispatcher"]);
    assert_eq!(events.location(), "events.go:12 (Events)");
    let DeclKind::Interface(interface) = &events.kind else {
        panic!("expected interface");
    };
    let signature = &interface.methods[0].signature;
    assert!(signature.params[0].ty.is_context());
    assert!(signature.results[0].ty.is_error());
    assert!(matches!(resolved.declarations[1].kind, DeclKind::Struct(_)));
    assert!(matches!(
        resolved.declarations[2].kind,
        DeclKind::Other { underlying: TypeExpr::Slice { .. } }
    ));
}

#[test]
fn resolves_file_root_with_relative_source_dir() {
    let dir = tempfile::tempdir().unwrap();
    let table = TABLE.replacen("\"declarations\"", "\"source_dir\": \"pkg/todo\",\n  \"declarations\"", 1);
    let path = dir.path().join("custom.json");
    fs::write(&path, table).unwrap();

    let resolved = JsonSymbolResolver::new().resolve(path.to_str().unwrap()).unwrap();
    assert_eq!(resolved.source_dir, Some(dir.path().join("pkg/todo")));
}

#[test]
fn named_results_carry_underlying_nillability() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(SYMBOL_TABLE_FILE), NILLABLE_TABLE).unwrap();

    let resolved = JsonSymbolResolver::new().resolve(dir.path().to_str().unwrap()).unwrap();
    let DeclKind::Interface(interface) = &resolved.declarations[0].kind else {
        panic!("expected interface");
    };
    let nillable: Vec<bool> =
        interface.methods[0].signature.results.iter().map(|result| result.ty.is_nillable()).collect();
    assert_eq!(nillable, [true, true, true, false, true]);
}

#[test]
fn missing_table_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = JsonSymbolResolver::new().resolve(dir.path().to_str().unwrap()).unwrap_err();
    assert!(matches!(err, ResolveError::NotFound { .. }));
}

#[test]
fn malformed_table_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(SYMBOL_TABLE_FILE), "{\"package\": 1}").unwrap();
    let err = JsonSymbolResolver::new().resolve(dir.path().to_str().unwrap()).unwrap_err();
    assert!(matches!(err, ResolveError::Parse { .. }));
}

#[test]
fn duplicate_declarations_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let table = r#"{
      "package": { "name": "p", "path": "example.com/p" },
      "declarations": [
        { "name": "A", "kind": "struct" },
        { "name": "A", "kind": "struct" }
      ]
    }"#;
    fs::write(dir.path().join(SYMBOL_TABLE_FILE), table).unwrap();
    let err = JsonSymbolResolver::new().resolve(dir.path().to_str().unwrap()).unwrap_err();
    assert!(matches!(err, ResolveError::Invalid { .. }));
}

#[test]
fn oversized_table_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(SYMBOL_TABLE_FILE);
    let file = fs::File::create(&path).unwrap();
    file.set_len(MAX_SYMBOL_TABLE_BYTES + 1).unwrap();
    let err = JsonSymbolResolver::new().resolve(dir.path().to_str().unwrap()).unwrap_err();
    assert_eq!(
        err,
        ResolveError::TooLarge {
            root: dir.path().to_str().unwrap().to_string(),
            limit: MAX_SYMBOL_TABLE_BYTES,
        }
    );
}
