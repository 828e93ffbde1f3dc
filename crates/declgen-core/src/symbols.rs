// crates/declgen-core/src/symbols.rs
// ============================================================================
// Module: Symbol Resolution
// Description: Resolver contract, JSON symbol-table adapter, method sets.
// Purpose: Turn a compilation root into a type-resolved declaration table.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Package loading and type checking happen outside this workspace. A
//! [`SymbolResolver`] hands the pipeline a [`ResolvedRoot`]: the package
//! identity, the declarations with their attached marker lines, and the
//! imported interfaces that local interfaces embed.
//!
//! The bundled [`JsonSymbolResolver`] reads a symbol table emitted by the host
//! toolchain as `declgen.symbols.json`. Symbol tables are treated as untrusted
//! input: reads are size limited and structural invariants are validated
//! before any declaration reaches an extractor.
//!
//! Invariants:
//! - Declaration names are unique within a root.
//! - A variadic signature always ends with a slice-typed parameter.
//! - [`ResolvedRoot::method_set`] is ordered by method name and free of
//!   duplicates.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::model::DeclKind;
use crate::model::Declaration;
use crate::model::InterfaceType;
use crate::model::Method;
use crate::model::NamedType;
use crate::model::PackageRef;
use crate::model::Param;
use crate::model::Signature;
use crate::model::TypeExpr;
use crate::model::TypeRef;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File name of the symbol table inside a root directory.
pub const SYMBOL_TABLE_FILE: &str = "declgen.symbols.json";

/// Maximum symbol table size accepted by the JSON adapter.
pub const MAX_SYMBOL_TABLE_BYTES: u64 = 8 * 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while resolving a compilation root.
///
/// # Invariants
/// - Every variant names the root it was raised for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The root does not exist or has no symbol table.
    #[error("root {root}: no symbol table found")]
    NotFound {
        /// Root identifier.
        root: String,
    },
    /// Reading the symbol table failed.
    #[error("root {root}: io error: {message}")]
    Io {
        /// Root identifier.
        root: String,
        /// Underlying error message.
        message: String,
    },
    /// The symbol table exceeds the size limit.
    #[error("root {root}: symbol table exceeds {limit} bytes")]
    TooLarge {
        /// Root identifier.
        root: String,
        /// Size limit in bytes.
        limit: u64,
    },
    /// The symbol table is not valid JSON for the expected shape.
    #[error("root {root}: invalid symbol table: {message}")]
    Parse {
        /// Root identifier.
        root: String,
        /// Parser message.
        message: String,
    },
    /// The symbol table parsed but violates a structural invariant.
    #[error("root {root}: inconsistent symbol table: {message}")]
    Invalid {
        /// Root identifier.
        root: String,
        /// Violated invariant.
        message: String,
    },
}

/// Errors raised while flattening an interface method set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MethodSetError {
    /// An embedded interface is unknown to the resolved root.
    #[error("embedded interface {0} not found")]
    EmbeddedNotFound(String),
    /// Interfaces embed each other in a cycle.
    #[error("embedding cycle through {0}")]
    EmbeddingCycle(String),
    /// Two embedded interfaces contribute the same method with different signatures.
    #[error("method {0} is declared with conflicting signatures")]
    ConflictingMethod(String),
}

// ============================================================================
// SECTION: Resolved Roots
// ============================================================================

/// An interface declared outside the root but embedded by one of its interfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedInterface {
    /// Identity of the imported interface.
    #[serde(flatten)]
    pub type_ref: TypeRef,
    /// Interface body.
    #[serde(flatten)]
    pub interface: InterfaceType,
}

/// A type-resolved compilation root.
///
/// # Invariants
/// - `declarations` are in source order.
/// - `source_dir` is `None` for roots that only exist in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoot {
    /// Root identifier as supplied by the caller.
    pub root: String,
    /// Package the declarations belong to.
    pub package: PackageRef,
    /// On-disk directory of the package sources, when known.
    pub source_dir: Option<PathBuf>,
    /// Declared types in source order.
    pub declarations: Vec<Declaration>,
    /// Interfaces from other packages reachable through embedding.
    pub imported_interfaces: Vec<ImportedInterface>,
}

impl ResolvedRoot {
    /// Creates an in-memory root with no source directory.
    #[must_use]
    pub fn new(root: impl Into<String>, package: PackageRef) -> Self {
        Self {
            root: root.into(),
            package,
            source_dir: None,
            declarations: Vec::new(),
            imported_interfaces: Vec::new(),
        }
    }

    /// Sets the on-disk source directory.
    #[must_use]
    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = Some(dir.into());
        self
    }

    /// Appends a declaration.
    #[must_use]
    pub fn with_declaration(mut self, declaration: Declaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// Appends an imported interface.
    #[must_use]
    pub fn with_imported_interface(mut self, type_ref: TypeRef, interface: InterfaceType) -> Self {
        self.imported_interfaces.push(ImportedInterface {
            type_ref,
            interface,
        });
        self
    }

    /// Finds an interface body by reference, local declarations first.
    ///
    /// A reference with an empty package is looked up among local declarations.
    #[must_use]
    pub fn find_interface(&self, type_ref: &TypeRef) -> Option<&InterfaceType> {
        let local = type_ref.package.is_builtin() || type_ref.package.path == self.package.path;
        if local {
            let found = self.declarations.iter().find_map(|decl| match &decl.kind {
                DeclKind::Interface(interface) if decl.name == type_ref.name => Some(interface),
                _ => None,
            });
            if found.is_some() {
                return found;
            }
        }
        self.imported_interfaces
            .iter()
            .find(|imported| imported.type_ref == *type_ref)
            .map(|imported| &imported.interface)
    }

    /// Flags every named reference whose declaration in this root, or whose
    /// imported interface, has a nillable underlying type.
    ///
    /// Symbol tables may already carry the flag; this fills it in for types
    /// the table itself declares.
    pub fn mark_nillable_types(&mut self) {
        let imported: Vec<TypeRef> =
            self.imported_interfaces.iter().map(|imported| imported.type_ref.clone()).collect();
        let local = self.nillable_local_names(&imported);
        if local.is_empty() && imported.is_empty() {
            return;
        }
        let package_path = self.package.path.clone();
        let mut mark = |named: &mut NamedType| {
            let type_ref = &named.type_ref;
            if (refers_to_local(&package_path, type_ref) && local.contains(type_ref.name.as_str()))
                || imported.contains(type_ref)
            {
                named.nillable = true;
            }
        };
        for decl in &mut self.declarations {
            match &mut decl.kind {
                DeclKind::Interface(interface) => {
                    for method in &mut interface.methods {
                        method.signature.visit_named_mut(&mut mark);
                    }
                }
                DeclKind::Struct(body) => {
                    for field in &mut body.fields {
                        field.ty.visit_named_mut(&mut mark);
                    }
                }
                DeclKind::Other {
                    underlying,
                } => underlying.visit_named_mut(&mut mark),
            }
        }
        for entry in &mut self.imported_interfaces {
            for method in &mut entry.interface.methods {
                method.signature.visit_named_mut(&mut mark);
            }
        }
    }

    /// Returns local declaration names whose underlying type may be nil,
    /// following chains of named types declared in this root.
    fn nillable_local_names(&self, imported: &[TypeRef]) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = self
            .declarations
            .iter()
            .filter(|decl| matches!(decl.kind, DeclKind::Interface(_)))
            .map(|decl| decl.name.clone())
            .collect();
        loop {
            let before = names.len();
            for decl in &self.declarations {
                let DeclKind::Other {
                    underlying,
                } = &decl.kind
                else {
                    continue;
                };
                let via_named = underlying.as_named().is_some_and(|type_ref| {
                    (refers_to_local(&self.package.path, type_ref)
                        && names.contains(type_ref.name.as_str()))
                        || imported.contains(type_ref)
                });
                if underlying.is_nillable() || via_named {
                    names.insert(decl.name.clone());
                }
            }
            if names.len() == before {
                return names;
            }
        }
    }

    /// Returns the full method set of `interface`, including every method
    /// inherited through embedded interfaces, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`MethodSetError`] when an embed cannot be found, embeds form a
    /// cycle, or two sources declare the same method with different signatures.
    pub fn method_set(&self, interface: &InterfaceType) -> Result<Vec<Method>, MethodSetError> {
        let mut methods = BTreeMap::new();
        let mut stack = Vec::new();
        self.collect_methods(interface, &mut stack, &mut methods)?;
        Ok(methods.into_values().collect())
    }

    /// Accumulates methods of `interface` and its embeds into `methods`.
    fn collect_methods(
        &self,
        interface: &InterfaceType,
        stack: &mut Vec<TypeRef>,
        methods: &mut BTreeMap<String, Method>,
    ) -> Result<(), MethodSetError> {
        for method in &interface.methods {
            insert_method(methods, method.clone())?;
        }
        for embed in &interface.embeds {
            if embed.is_error() {
                insert_method(methods, error_method())?;
                continue;
            }
            if stack.contains(embed) {
                return Err(MethodSetError::EmbeddingCycle(embed.to_string()));
            }
            let embedded = self
                .find_interface(embed)
                .ok_or_else(|| MethodSetError::EmbeddedNotFound(embed.to_string()))?;
            stack.push(embed.clone());
            self.collect_methods(embedded, stack, methods)?;
            stack.pop();
        }
        Ok(())
    }
}

/// Returns true when `type_ref` names a type of the package at `package_path`.
fn refers_to_local(package_path: &str, type_ref: &TypeRef) -> bool {
    type_ref.package.is_builtin() || type_ref.package.path == package_path
}

/// Inserts a method, tolerating identical duplicates from diamond embeds.
fn insert_method(methods: &mut BTreeMap<String, Method>, method: Method) -> Result<(), MethodSetError> {
    match methods.get(&method.name) {
        Some(existing) if existing.signature == method.signature => Ok(()),
        Some(_) => Err(MethodSetError::ConflictingMethod(method.name)),
        None => {
            methods.insert(method.name.clone(), method);
            Ok(())
        }
    }
}

/// Returns the single method of the built-in error interface.
fn error_method() -> Method {
    Method {
        name: "Error".to_string(),
        signature: Signature {
            params: Vec::new(),
            results: vec![Param::unnamed(TypeExpr::builtin("string"))],
            variadic: false,
        },
    }
}

// ============================================================================
// SECTION: Resolver Contract
// ============================================================================

/// Loads type-resolved declarations for a compilation root.
///
/// Implementations are shared across worker threads during a pipeline run.
pub trait SymbolResolver: Send + Sync {
    /// Resolves a root identifier into its declaration table.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the root cannot be loaded or is invalid.
    fn resolve(&self, root: &str) -> Result<ResolvedRoot, ResolveError>;
}

/// Resolver backed by pre-built in-memory roots.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    /// Roots keyed by identifier.
    roots: BTreeMap<String, ResolvedRoot>,
}

impl StaticResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a root, replacing any root with the same identifier.
    pub fn insert(&mut self, mut root: ResolvedRoot) {
        root.mark_nillable_types();
        self.roots.insert(root.root.clone(), root);
    }

    /// Builder form of [`StaticResolver::insert`].
    #[must_use]
    pub fn with_root(mut self, root: ResolvedRoot) -> Self {
        self.insert(root);
        self
    }
}

impl SymbolResolver for StaticResolver {
    fn resolve(&self, root: &str) -> Result<ResolvedRoot, ResolveError> {
        self.roots.get(root).cloned().ok_or_else(|| ResolveError::NotFound {
            root: root.to_string(),
        })
    }
}

// ============================================================================
// SECTION: JSON Symbol Tables
// ============================================================================

/// On-disk symbol table layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SymbolTable {
    /// Package the declarations belong to.
    pub package: PackageRef,
    /// Source directory, relative to the table file when not absolute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<PathBuf>,
    /// Declared types in source order.
    #[serde(default)]
    pub declarations: Vec<Declaration>,
    /// Imported interfaces reachable through embedding.
    #[serde(default)]
    pub imported_interfaces: Vec<ImportedInterface>,
}

/// Resolver reading `declgen.symbols.json` symbol tables from disk.
///
/// A root is either a directory containing [`SYMBOL_TABLE_FILE`] or the path
/// of a symbol table file itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSymbolResolver;

impl JsonSymbolResolver {
    /// Creates the resolver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns the symbol table path for a root.
    fn table_path(root: &Path) -> PathBuf {
        if root.is_dir() { root.join(SYMBOL_TABLE_FILE) } else { root.to_path_buf() }
    }
}

impl SymbolResolver for JsonSymbolResolver {
    fn resolve(&self, root: &str) -> Result<ResolvedRoot, ResolveError> {
        let table_path = Self::table_path(Path::new(root));
        if !table_path.is_file() {
            return Err(ResolveError::NotFound {
                root: root.to_string(),
            });
        }
        let bytes = read_table_bytes(root, &table_path)?;
        let table: SymbolTable =
            serde_json::from_slice(&bytes).map_err(|err| ResolveError::Parse {
                root: root.to_string(),
                message: err.to_string(),
            })?;
        let table_dir = table_path.parent().map(Path::to_path_buf).unwrap_or_default();
        let source_dir = match table.source_dir {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => table_dir.join(dir),
            None => table_dir,
        };
        let mut resolved = ResolvedRoot {
            root: root.to_string(),
            package: table.package,
            source_dir: Some(source_dir),
            declarations: table.declarations,
            imported_interfaces: table.imported_interfaces,
        };
        resolved.mark_nillable_types();
        validate_root(&resolved)?;
        Ok(resolved)
    }
}

/// Reads a symbol table while enforcing [`MAX_SYMBOL_TABLE_BYTES`].
fn read_table_bytes(root: &str, path: &Path) -> Result<Vec<u8>, ResolveError> {
    let io_error = |err: std::io::Error| ResolveError::Io {
        root: root.to_string(),
        message: err.to_string(),
    };
    let too_large = || ResolveError::TooLarge {
        root: root.to_string(),
        limit: MAX_SYMBOL_TABLE_BYTES,
    };
    let file = fs::File::open(path).map_err(io_error)?;
    let metadata = file.metadata().map_err(io_error)?;
    if metadata.len() > MAX_SYMBOL_TABLE_BYTES {
        return Err(too_large());
    }
    let mut bytes = Vec::new();
    let mut limited = file.take(MAX_SYMBOL_TABLE_BYTES + 1);
    limited.read_to_end(&mut bytes).map_err(io_error)?;
    let size = u64::try_from(bytes.len()).map_err(|_| too_large())?;
    if size > MAX_SYMBOL_TABLE_BYTES {
        return Err(too_large());
    }
    Ok(bytes)
}

/// Validates structural invariants of a resolved root.
///
/// # Errors
///
/// Returns [`ResolveError::Invalid`] for duplicate declaration names, empty
/// package names, or malformed variadic signatures.
pub fn validate_root(root: &ResolvedRoot) -> Result<(), ResolveError> {
    let invalid = |message: String| ResolveError::Invalid {
        root: root.root.clone(),
        message,
    };
    if root.package.name.trim().is_empty() {
        return Err(invalid("package name is empty".to_string()));
    }
    let mut seen = BTreeSet::new();
    for decl in &root.declarations {
        if decl.name.trim().is_empty() {
            return Err(invalid("declaration with empty name".to_string()));
        }
        if !seen.insert(decl.name.as_str()) {
            return Err(invalid(format!("duplicate declaration {}", decl.name)));
        }
        if let DeclKind::Interface(interface) = &decl.kind {
            validate_interface(&decl.name, interface).map_err(invalid)?;
        }
    }
    for imported in &root.imported_interfaces {
        validate_interface(&imported.type_ref.name, &imported.interface).map_err(invalid)?;
    }
    Ok(())
}

/// Checks the variadic invariant on every method of an interface.
fn validate_interface(owner: &str, interface: &InterfaceType) -> Result<(), String> {
    for method in &interface.methods {
        if !method.signature.variadic {
            continue;
        }
        let last_is_slice = matches!(
            method.signature.params.last().map(|param| &param.ty),
            Some(TypeExpr::Slice { .. })
        );
        if !last_is_slice {
            return Err(format!(
                "{owner}.{}: variadic signature must end with a slice parameter",
                method.name
            ));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
