// crates/declgen-core/src/model.rs
// ============================================================================
// Module: Declaration Model
// Description: Resolved type, signature, and declaration representations.
// Purpose: Provide the language-agnostic shapes consumed by extractors.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The declaration model mirrors what a host compiler front end materializes
//! for a compilation root: named types with package identity, resolved
//! parameter/result lists, and the declaration kind as a closed variant.
//!
//! Invariants:
//! - Two [`TypeRef`] values denote the same type iff `(name, package.path)` match.
//! - A [`TypeRef`] with an empty package denotes a built-in type.
//! - A variadic [`Signature`] stores its final parameter as a slice type.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Package path of the context-capability type.
pub const CONTEXT_PACKAGE_PATH: &str = "context";

/// Name of the context-capability type.
pub const CONTEXT_TYPE_NAME: &str = "Context";

/// Name of the built-in error-capability type.
pub const ERROR_TYPE_NAME: &str = "error";

// ============================================================================
// SECTION: Package and Type References
// ============================================================================

/// Identifies a compilation unit.
///
/// # Invariants
/// - `path` is globally unique; `name` is a short display identifier that may
///   collide across packages.
/// - The empty reference (both fields empty) denotes the built-in universe.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PackageRef {
    /// Short package name used in generated identifiers.
    pub name: String,
    /// Globally unique import path.
    pub path: String,
}

impl PackageRef {
    /// Creates a package reference.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Returns the reference used for built-in types.
    #[must_use]
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Returns true when this reference denotes the built-in universe.
    #[must_use]
    pub const fn is_builtin(&self) -> bool {
        self.path.is_empty()
    }
}

/// Identifies a named type.
#[derive(Debug, Clone, Default, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    /// Type name as declared.
    pub name: String,
    /// Declaring package; empty for built-in types.
    #[serde(default)]
    pub package: PackageRef,
}

impl TypeRef {
    /// Creates a reference to a type declared in `package`.
    #[must_use]
    pub fn new(name: impl Into<String>, package: PackageRef) -> Self {
        Self {
            name: name.into(),
            package,
        }
    }

    /// Creates a reference to a built-in type such as `string` or `error`.
    #[must_use]
    pub fn builtin(name: impl Into<String>) -> Self {
        Self::new(name, PackageRef::builtin())
    }

    /// Returns true for the context-capability type.
    #[must_use]
    pub fn is_context(&self) -> bool {
        self.name == CONTEXT_TYPE_NAME && self.package.path == CONTEXT_PACKAGE_PATH
    }

    /// Returns true for the error-capability type.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.name == ERROR_TYPE_NAME && self.package.is_builtin()
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.package.path == other.package.path
    }
}

impl std::hash::Hash for TypeRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.package.path.hash(state);
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package.is_builtin() {
            formatter.write_str(&self.name)
        } else {
            write!(formatter, "{}.{}", self.package.path, self.name)
        }
    }
}

// ============================================================================
// SECTION: Type Expressions
// ============================================================================

/// Channel direction for channel types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChanDir {
    /// Bidirectional channel.
    #[default]
    Both,
    /// Send-only channel.
    Send,
    /// Receive-only channel.
    Recv,
}

/// A named type reference with optional generic type arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedType {
    /// Referenced type.
    #[serde(flatten)]
    pub type_ref: TypeRef,
    /// Type arguments for generic instantiations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<TypeExpr>,
    /// True when the underlying type is an interface, pointer, map, slice,
    /// chan, or func.
    #[serde(default, skip_serializing_if = "is_false")]
    pub nillable: bool,
}

/// Serde predicate that omits unset flags.
#[allow(clippy::trivially_copy_pass_by_ref, reason = "Serde passes skip predicates by reference.")]
const fn is_false(value: &bool) -> bool {
    !*value
}

/// A fully resolved type as it appears in a parameter, result, or field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeExpr {
    /// A named (declared or built-in) type, optionally instantiated.
    Named(NamedType),
    /// Pointer to the element type.
    Pointer {
        /// Pointee type.
        elem: Box<Self>,
    },
    /// Slice of the element type.
    Slice {
        /// Element type.
        elem: Box<Self>,
    },
    /// Fixed-length array.
    Array {
        /// Array length.
        len: u64,
        /// Element type.
        elem: Box<Self>,
    },
    /// Map from key to value type.
    Map {
        /// Key type.
        key: Box<Self>,
        /// Value type.
        value: Box<Self>,
    },
    /// Channel of the element type.
    Chan {
        /// Channel direction.
        #[serde(default)]
        dir: ChanDir,
        /// Element type.
        elem: Box<Self>,
    },
    /// Function type.
    Func {
        /// Function signature.
        signature: Box<Signature>,
    },
    /// The empty interface.
    Interface,
}

impl TypeExpr {
    /// Creates a named type expression.
    #[must_use]
    pub const fn named(type_ref: TypeRef) -> Self {
        Self::Named(NamedType {
            type_ref,
            args: Vec::new(),
            nillable: false,
        })
    }

    /// Creates a named type expression whose underlying type may be nil.
    #[must_use]
    pub const fn named_nillable(type_ref: TypeRef) -> Self {
        Self::Named(NamedType {
            type_ref,
            args: Vec::new(),
            nillable: true,
        })
    }

    /// Creates a built-in named type expression.
    #[must_use]
    pub fn builtin(name: &str) -> Self {
        Self::named(TypeRef::builtin(name))
    }

    /// Returns the context-capability type expression.
    #[must_use]
    pub fn context() -> Self {
        Self::named(TypeRef::new(
            CONTEXT_TYPE_NAME,
            PackageRef::new(CONTEXT_PACKAGE_PATH, CONTEXT_PACKAGE_PATH),
        ))
    }

    /// Returns the error-capability type expression.
    #[must_use]
    pub fn error() -> Self {
        Self::builtin(ERROR_TYPE_NAME)
    }

    /// Wraps a type in a pointer.
    #[must_use]
    pub fn pointer(elem: Self) -> Self {
        Self::Pointer {
            elem: Box::new(elem),
        }
    }

    /// Wraps a type in a slice.
    #[must_use]
    pub fn slice(elem: Self) -> Self {
        Self::Slice {
            elem: Box::new(elem),
        }
    }

    /// Returns the named type reference when this is a named type.
    #[must_use]
    pub const fn as_named(&self) -> Option<&TypeRef> {
        match self {
            Self::Named(named) => Some(&named.type_ref),
            _ => None,
        }
    }

    /// Returns true for the context-capability type.
    #[must_use]
    pub fn is_context(&self) -> bool {
        self.as_named().is_some_and(TypeRef::is_context)
    }

    /// Returns true for the error-capability type.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.as_named().is_some_and(TypeRef::is_error)
    }

    /// Returns true when values of this type may be nil.
    ///
    /// Named types follow their recorded underlying nillability. The error and
    /// context types are interfaces and always qualify.
    #[must_use]
    pub fn is_nillable(&self) -> bool {
        match self {
            Self::Pointer {
                ..
            }
            | Self::Slice {
                ..
            }
            | Self::Map {
                ..
            }
            | Self::Chan {
                ..
            }
            | Self::Func {
                ..
            }
            | Self::Interface => true,
            Self::Named(named) => {
                named.nillable || named.type_ref.is_error() || named.type_ref.is_context()
            }
            Self::Array {
                ..
            } => false,
        }
    }

    /// Visits every named type reference contained in this expression.
    pub fn visit_named<'a>(&'a self, visit: &mut impl FnMut(&'a TypeRef)) {
        match self {
            Self::Named(named) => {
                visit(&named.type_ref);
                for arg in &named.args {
                    arg.visit_named(visit);
                }
            }
            Self::Pointer {
                elem,
            }
            | Self::Slice {
                elem,
            }
            | Self::Array {
                elem, ..
            }
            | Self::Chan {
                elem, ..
            } => elem.visit_named(visit),
            Self::Map {
                key,
                value,
            } => {
                key.visit_named(visit);
                value.visit_named(visit);
            }
            Self::Func {
                signature,
            } => signature.visit_named(visit),
            Self::Interface => {}
        }
    }

    /// Visits every named type in this expression, outermost first, with
    /// mutable access.
    pub fn visit_named_mut(&mut self, visit: &mut impl FnMut(&mut NamedType)) {
        match self {
            Self::Named(named) => {
                visit(named);
                for arg in &mut named.args {
                    arg.visit_named_mut(visit);
                }
            }
            Self::Pointer {
                elem,
            }
            | Self::Slice {
                elem,
            }
            | Self::Array {
                elem, ..
            }
            | Self::Chan {
                elem, ..
            } => elem.visit_named_mut(visit),
            Self::Map {
                key,
                value,
            } => {
                key.visit_named_mut(visit);
                value.visit_named_mut(visit);
            }
            Self::Func {
                signature,
            } => signature.visit_named_mut(visit),
            Self::Interface => {}
        }
    }
}

// ============================================================================
// SECTION: Signatures
// ============================================================================

/// A parameter or result entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name; empty for unnamed entries.
    #[serde(default)]
    pub name: String,
    /// Resolved parameter type.
    #[serde(rename = "type")]
    pub ty: TypeExpr,
}

impl Param {
    /// Creates a parameter entry.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    /// Creates an unnamed parameter entry.
    #[must_use]
    pub fn unnamed(ty: TypeExpr) -> Self {
        Self::new("", ty)
    }
}

/// A resolved function or method signature.
///
/// # Invariants
/// - When `variadic` is true the final parameter exists and is a slice type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Parameters in declared order.
    #[serde(default)]
    pub params: Vec<Param>,
    /// Results in declared order.
    #[serde(default)]
    pub results: Vec<Param>,
    /// True when the final parameter is variadic.
    #[serde(default)]
    pub variadic: bool,
}

impl Signature {
    /// Visits every named type reference contained in the signature.
    pub fn visit_named<'a>(&'a self, visit: &mut impl FnMut(&'a TypeRef)) {
        for param in self.params.iter().chain(&self.results) {
            param.ty.visit_named(visit);
        }
    }

    /// Mutable form of [`Signature::visit_named`].
    pub fn visit_named_mut(&mut self, visit: &mut impl FnMut(&mut NamedType)) {
        for param in self.params.iter_mut().chain(&mut self.results) {
            param.ty.visit_named_mut(visit);
        }
    }
}

/// A method declared on an interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    /// Method name.
    pub name: String,
    /// Method signature.
    #[serde(flatten)]
    pub signature: Signature,
}

// ============================================================================
// SECTION: Declarations
// ============================================================================

/// Interface declaration body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceType {
    /// Methods declared directly on the interface.
    #[serde(default)]
    pub methods: Vec<Method>,
    /// Embedded interfaces whose methods are inherited.
    #[serde(default)]
    pub embeds: Vec<TypeRef>,
}

/// Struct field entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name; for embedded fields this is the type name.
    pub name: String,
    /// Field type.
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    /// True when the field is embedded.
    #[serde(default)]
    pub embedded: bool,
}

/// Struct declaration body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructType {
    /// Fields in declared order.
    #[serde(default)]
    pub fields: Vec<Field>,
}

/// Closed set of declaration shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeclKind {
    /// A bundle of method signatures.
    Interface(InterfaceType),
    /// A plain data-holding type.
    Struct(StructType),
    /// Any other named type (basic, slice, function, ...).
    Other {
        /// The underlying type.
        underlying: TypeExpr,
    },
}

impl DeclKind {
    /// Returns a stable label for diagnostics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Interface(_) => "interface",
            Self::Struct(_) => "struct",
            Self::Other {
                ..
            } => "non-struct type",
        }
    }
}

/// Source location of a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePosition {
    /// Source file path.
    pub file: String,
    /// One-based line number.
    pub line: u32,
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.file, self.line)
    }
}

/// A declared type in a compilation root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    /// Declared type name.
    pub name: String,
    /// Declaration shape.
    #[serde(flatten)]
    pub kind: DeclKind,
    /// Raw marker lines attached immediately above the declaration.
    #[serde(default)]
    pub markers: Vec<String>,
    /// Optional source location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<SourcePosition>,
}

impl Declaration {
    /// Creates a declaration without markers or position.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: DeclKind) -> Self {
        Self {
            name: name.into(),
            kind,
            markers: Vec::new(),
            position: None,
        }
    }

    /// Attaches a raw marker line.
    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.markers.push(marker.into());
        self
    }

    /// Returns a human-readable location, preferring the source position.
    #[must_use]
    pub fn location(&self) -> String {
        self.position.as_ref().map_or_else(|| self.name.clone(), |pos| format!("{pos} ({})", self.name))
    }
}
