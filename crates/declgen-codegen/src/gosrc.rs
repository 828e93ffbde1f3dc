// crates/declgen-codegen/src/gosrc.rs
// ============================================================================
// Module: Go Source Builder
// Description: Import resolution, type rendering, and file assembly for Go.
// Purpose: Give every synthesizer one deterministic way to emit Go text.
// Dependencies: declgen-core
// ============================================================================

//! ## Overview
//! Synthesizers work in two phases. First they register every package a file
//! will reference with an [`ImportSet`]; [`ImportSet::resolve`] then assigns
//! collision-free qualifiers in sorted path order, producing [`Imports`].
//! Second, they render their body through [`Imports`] so that every type is
//! spelled with the qualifier that appears in the import block.
//!
//! Invariants:
//! - The target package is never imported; its types render unqualified.
//! - Import order and alias assignment depend only on the set of paths.
//! - [`render_file`] output is byte-identical for identical inputs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt::Write;

use declgen_core::ChanDir;
use declgen_core::PackageRef;
use declgen_core::Param;
use declgen_core::Signature;
use declgen_core::TypeExpr;
use declgen_core::TypeRef;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Marker comment that identifies generated files.
pub const GENERATED_COMMENT: &str = "// Code generated by declgen. DO NOT EDIT.";

/// Build constraint placed on top of generated files.
pub const BUILD_CONSTRAINT: &str = "//go:build !ignore_autogenerated";

/// Go keywords; never valid as identifiers.
const KEYWORDS: [&str; 25] = [
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

// ============================================================================
// SECTION: Identifiers
// ============================================================================

/// Returns true when `name` is a valid Go identifier.
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first == '_' || first.is_alphabetic())
        && chars.all(|ch| ch == '_' || ch.is_alphanumeric())
        && !KEYWORDS.contains(&name)
}

/// Renders `value` as an interpreted Go string literal.
#[must_use]
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

/// Upper-cases the first character so the identifier is exported.
#[must_use]
pub fn export(name: &str) -> String {
    let mut chars = name.chars();
    chars.next().map_or_else(String::new, |first| first.to_uppercase().chain(chars).collect())
}

/// Lower-cases the first character so the identifier is unexported.
#[must_use]
pub fn unexport(name: &str) -> String {
    let mut chars = name.chars();
    chars.next().map_or_else(String::new, |first| first.to_lowercase().chain(chars).collect())
}

// ============================================================================
// SECTION: Import Collection
// ============================================================================

/// Packages requested by a file before qualifiers are assigned.
#[derive(Debug, Clone)]
pub struct ImportSet {
    /// Import path of the package being generated.
    target_path: String,
    /// Requested packages keyed by import path.
    requested: BTreeMap<String, Requested>,
}

/// One requested package.
#[derive(Debug, Clone)]
struct Requested {
    /// Declared package name.
    name: String,
    /// Preferred qualifier, when the caller asked for one.
    alias: Option<String>,
}

impl ImportSet {
    /// Creates an empty set for a file in `target`.
    #[must_use]
    pub fn new(target: &PackageRef) -> Self {
        Self {
            target_path: target.path.clone(),
            requested: BTreeMap::new(),
        }
    }

    /// Requests `package`; built-in and target packages are ignored.
    pub fn add(&mut self, package: &PackageRef) {
        if package.is_builtin() || package.path == self.target_path {
            return;
        }
        self.requested.entry(package.path.clone()).or_insert_with(|| Requested {
            name: package.name.clone(),
            alias: None,
        });
    }

    /// Requests a package by path and name.
    pub fn add_path(&mut self, path: &str, name: &str) {
        self.add(&PackageRef::new(name, path));
    }

    /// Requests a package under a preferred qualifier.
    pub fn add_aliased(&mut self, path: &str, name: &str, alias: &str) {
        if path == self.target_path {
            return;
        }
        let entry = self.requested.entry(path.to_string()).or_insert_with(|| Requested {
            name: name.to_string(),
            alias: None,
        });
        entry.alias = Some(alias.to_string());
    }

    /// Requests every package referenced by a type.
    pub fn add_type(&mut self, ty: &TypeExpr) {
        ty.visit_named(&mut |type_ref: &TypeRef| self.add(&type_ref.package));
    }

    /// Requests every package referenced by a signature.
    pub fn add_signature(&mut self, signature: &Signature) {
        signature.visit_named(&mut |type_ref: &TypeRef| self.add(&type_ref.package));
    }

    /// Assigns qualifiers in sorted path order.
    ///
    /// A package keeps its preferred alias or declared name unless an earlier
    /// path already claimed it; later claimants get a numeric suffix.
    #[must_use]
    pub fn resolve(self) -> Imports {
        let mut taken = BTreeSet::new();
        let mut entries = BTreeMap::new();
        for (path, requested) in self.requested {
            let base = requested.alias.unwrap_or(requested.name);
            let mut qualifier = base.clone();
            let mut counter = 2_u32;
            while taken.contains(&qualifier) || !is_identifier(&qualifier) {
                qualifier = format!("{}{counter}", sanitize(&base));
                counter += 1;
            }
            taken.insert(qualifier.clone());
            entries.insert(path, qualifier);
        }
        Imports {
            target_path: self.target_path,
            entries,
        }
    }
}

/// Replaces characters that cannot appear in an identifier.
fn sanitize(name: &str) -> String {
    let cleaned: String =
        name.chars().map(|ch| if ch == '_' || ch.is_alphanumeric() { ch } else { '_' }).collect();
    if cleaned.chars().next().is_some_and(|ch| ch.is_alphabetic() || ch == '_') {
        cleaned
    } else {
        format!("pkg{cleaned}")
    }
}

/// Returns the last segment of an import path.
fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

// ============================================================================
// SECTION: Resolved Imports
// ============================================================================

/// Resolved import qualifiers for one file.
#[derive(Debug, Clone)]
pub struct Imports {
    /// Import path of the package being generated.
    target_path: String,
    /// Qualifier per import path, ordered by path.
    entries: BTreeMap<String, String>,
}

impl Imports {
    /// Returns the qualifier for `package`, or `None` when it renders unqualified.
    #[must_use]
    pub fn qualifier(&self, package: &PackageRef) -> Option<&str> {
        if package.is_builtin() || package.path == self.target_path {
            return None;
        }
        self.entries.get(&package.path).map(String::as_str)
    }

    /// Returns the qualifier registered for an import path.
    #[must_use]
    pub fn qualifier_for_path(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    /// Returns true when `name` is used as a qualifier.
    #[must_use]
    pub fn is_qualifier(&self, name: &str) -> bool {
        self.entries.values().any(|qualifier| qualifier == name)
    }

    /// Renders a qualified identifier from an import path.
    ///
    /// Falls back to the last path segment when the path was not requested.
    #[must_use]
    pub fn qualified(&self, path: &str, name: &str) -> String {
        if path == self.target_path {
            return name.to_string();
        }
        let qualifier = self.qualifier_for_path(path).unwrap_or_else(|| last_segment(path));
        format!("{qualifier}.{name}")
    }

    /// Renders a named type reference without type arguments.
    #[must_use]
    pub fn type_name(&self, type_ref: &TypeRef) -> String {
        match self.qualifier(&type_ref.package) {
            Some(qualifier) => format!("{qualifier}.{}", type_ref.name),
            None if type_ref.package.is_builtin() || type_ref.package.path == self.target_path => {
                type_ref.name.clone()
            }
            None => format!("{}.{}", type_ref.package.name, type_ref.name),
        }
    }

    /// Renders a type expression in Go syntax.
    #[must_use]
    pub fn render_type(&self, ty: &TypeExpr) -> String {
        let mut out = String::new();
        self.write_type(&mut out, ty);
        out
    }

    /// Appends the Go spelling of `ty` to `out`.
    fn write_type(&self, out: &mut String, ty: &TypeExpr) {
        match ty {
            TypeExpr::Named(named) => {
                out.push_str(&self.type_name(&named.type_ref));
                if !named.args.is_empty() {
                    out.push('[');
                    for (index, arg) in named.args.iter().enumerate() {
                        if index > 0 {
                            out.push_str(", ");
                        }
                        self.write_type(out, arg);
                    }
                    out.push(']');
                }
            }
            TypeExpr::Pointer {
                elem,
            } => {
                out.push('*');
                self.write_type(out, elem);
            }
            TypeExpr::Slice {
                elem,
            } => {
                out.push_str("[]");
                self.write_type(out, elem);
            }
            TypeExpr::Array {
                len,
                elem,
            } => {
                let _ = write!(out, "[{len}]");
                self.write_type(out, elem);
            }
            TypeExpr::Map {
                key,
                value,
            } => {
                out.push_str("map[");
                self.write_type(out, key);
                out.push(']');
                self.write_type(out, value);
            }
            TypeExpr::Chan {
                dir,
                elem,
            } => {
                out.push_str(match dir {
                    ChanDir::Both => "chan ",
                    ChanDir::Send => "chan<- ",
                    ChanDir::Recv => "<-chan ",
                });
                self.write_type(out, elem);
            }
            TypeExpr::Func {
                signature,
            } => {
                out.push_str("func");
                out.push_str(&self.render_signature_types(signature));
            }
            TypeExpr::Interface => out.push_str("interface{}"),
        }
    }

    /// Renders the type of a parameter, spelling a variadic slice as `...T`.
    #[must_use]
    pub fn render_param_type(&self, ty: &TypeExpr, variadic: bool) -> String {
        match (variadic, ty) {
            (
                true,
                TypeExpr::Slice {
                    elem,
                },
            ) => format!("...{}", self.render_type(elem)),
            _ => self.render_type(ty),
        }
    }

    /// Renders `(T1, T2) R` or `(T1) (R1, R2)` with parameter names dropped.
    #[must_use]
    pub fn render_signature_types(&self, signature: &Signature) -> String {
        let last = signature.params.len().saturating_sub(1);
        let params: Vec<String> = signature
            .params
            .iter()
            .enumerate()
            .map(|(index, param)| {
                self.render_param_type(&param.ty, signature.variadic && index == last)
            })
            .collect();
        format!("({}){}", params.join(", "), self.render_results(&signature.results))
    }

    /// Renders a result list as it follows a parameter list.
    #[must_use]
    pub fn render_results(&self, results: &[Param]) -> String {
        match results {
            [] => String::new(),
            [single] => format!(" {}", self.render_type(&single.ty)),
            many => {
                let types: Vec<String> =
                    many.iter().map(|result| self.render_type(&result.ty)).collect();
                format!(" ({})", types.join(", "))
            }
        }
    }

    /// Renders the import block, or an empty string when nothing is imported.
    #[must_use]
    pub fn render_block(&self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        let mut out = String::from("import (\n");
        for (path, qualifier) in &self.entries {
            if qualifier == last_segment(path) {
                let _ = writeln!(out, "\t{}", quote(path));
            } else {
                let _ = writeln!(out, "\t{qualifier} {}", quote(path));
            }
        }
        out.push_str(")\n");
        out
    }
}

// ============================================================================
// SECTION: Layout Helpers
// ============================================================================

/// Renders struct fields with names aligned the way gofmt aligns them.
#[must_use]
pub fn struct_fields(fields: &[(String, String)]) -> String {
    if fields.is_empty() {
        return "struct{}".to_string();
    }
    let width = fields.iter().map(|(name, _)| name.chars().count()).max().unwrap_or(0);
    let mut out = String::from("struct {\n");
    for (name, ty) in fields {
        let _ = writeln!(out, "\t{name:<width$} {ty}");
    }
    out.push('}');
    out
}

/// Renders a keyed composite literal body with gofmt value alignment.
///
/// `indent` is the indentation of the closing brace.
#[must_use]
pub fn keyed_literal(type_name: &str, pairs: &[(String, String)], indent: &str) -> String {
    if pairs.is_empty() {
        return format!("{type_name}{{}}");
    }
    let width = pairs.iter().map(|(key, _)| key.chars().count() + 1).max().unwrap_or(0);
    let mut out = format!("{type_name}{{\n");
    for (key, value) in pairs {
        let label = format!("{key}:");
        let _ = writeln!(out, "{indent}\t{label:<width$} {value},");
    }
    out.push_str(indent);
    out.push('}');
    out
}

// ============================================================================
// SECTION: File Assembly
// ============================================================================

/// Assembles a complete Go source file.
///
/// Layout: build constraint, optional header text, generated marker, package
/// clause, import block, then `body` verbatim.
#[must_use]
pub fn render_file(package: &PackageRef, header_text: &str, imports: &Imports, body: &str) -> String {
    let mut out = String::new();
    out.push_str(BUILD_CONSTRAINT);
    out.push_str("\n\n");
    let header = header_text.trim_end();
    if !header.is_empty() {
        out.push_str(header);
        out.push_str("\n\n");
    }
    out.push_str(GENERATED_COMMENT);
    out.push_str("\n\n");
    let _ = writeln!(out, "package {}", package.name);
    let block = imports.render_block();
    if !block.is_empty() {
        out.push('\n');
        out.push_str(&block);
    }
    let body = body.trim_end();
    if !body.is_empty() {
        out.push('\n');
        out.push_str(body);
        out.push('\n');
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================
