// crates/declgen-codegen/src/spec.rs
// ============================================================================
// Module: Intermediate Specifications
// Description: Normalized shapes produced by extractors.
// Purpose: Decouple declaration validation from source synthesis.
// Dependencies: declgen-core
// ============================================================================

//! ## Overview
//! Extractors validate a declaration and reduce it to one of the shapes in
//! this module. Synthesizers only ever see these shapes, never raw
//! declarations, so every invariant listed here holds by construction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use declgen_core::PackageRef;
use declgen_core::Param;
use declgen_core::TypeExpr;
use declgen_core::TypeRef;

// ============================================================================
// SECTION: Shared Shapes
// ============================================================================

/// A named, typed parameter or result; the name may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    /// Declared name, empty when unnamed.
    pub name: String,
    /// Resolved type.
    pub ty: TypeExpr,
}

impl From<&Param> for Argument {
    fn from(param: &Param) -> Self {
        Self {
            name: param.name.clone(),
            ty: param.ty.clone(),
        }
    }
}

/// An interface reduced to its name, package, and normalized methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSpec<M> {
    /// Interface name.
    pub name: String,
    /// Declaring package.
    pub package: PackageRef,
    /// Normalized methods ordered by name.
    pub methods: Vec<M>,
}

impl<M> InterfaceSpec<M> {
    /// Returns a reference to the interface type itself.
    #[must_use]
    pub fn type_ref(&self) -> TypeRef {
        TypeRef::new(self.name.clone(), self.package.clone())
    }
}

/// A unit of synthesis: one output file worth of artifacts.
///
/// # Invariants
/// - All artifacts render into `target_package`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationFile<A> {
    /// Package the generated file belongs to.
    pub target_package: PackageRef,
    /// License or header text placed above the generated marker.
    pub header_text: String,
    /// Artifacts rendered in order.
    pub artifacts: Vec<A>,
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// One dispatcher method.
///
/// # Invariants
/// - `event` is a named type.
/// - `receives_context` is true iff the method takes two parameters.
/// - `returns_error` is true iff the method has exactly one (error) result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSpec {
    /// Method name.
    pub name: String,
    /// Event type passed to the bus.
    pub event: TypeRef,
    /// True when the first parameter is the context.
    pub receives_context: bool,
    /// True when the method returns an error.
    pub returns_error: bool,
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// A struct that event handlers are generated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSpec {
    /// Event struct name.
    pub name: String,
    /// Declaring package.
    pub package: PackageRef,
}

impl EventSpec {
    /// Returns a reference to the event type.
    #[must_use]
    pub fn type_ref(&self) -> TypeRef {
        TypeRef::new(self.name.clone(), self.package.clone())
    }
}

// ============================================================================
// SECTION: Endpoint
// ============================================================================

/// One service method wrapped by an endpoint.
///
/// # Invariants
/// - The context parameter and the trailing error result are stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceMethod {
    /// Method name.
    pub name: String,
    /// Parameters after the context.
    pub request_parameters: Vec<Argument>,
    /// Results before the error.
    pub response_parameters: Vec<Argument>,
}

/// How a failed service call surfaces through the endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorStrategy {
    /// Errors become endpoint errors only when they say so; otherwise they
    /// travel in the response.
    #[default]
    Endpoint,
    /// Errors travel in the response only when they are service errors;
    /// otherwise they become endpoint errors.
    Service,
}

impl ErrorStrategy {
    /// Parses the marker value; the empty string selects the default.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "" | "endpoint" => Some(Self::Endpoint),
            "service" => Some(Self::Service),
            _ => None,
        }
    }
}

/// Endpoints generated for one service interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSet {
    /// The wrapped service.
    pub service: InterfaceSpec<ServiceMethod>,
    /// Prefix of generated identifiers; may be empty.
    pub base_name: String,
    /// Module segment of operation names.
    pub module_name: String,
    /// True when a tracing wrapper is generated.
    pub with_open_census: bool,
    /// Error surfacing strategy.
    pub error_strategy: ErrorStrategy,
}

impl EndpointSet {
    /// Returns the operation name of a method.
    ///
    /// The base name segment is omitted when the base name is empty.
    #[must_use]
    pub fn operation_name(&self, method: &str) -> String {
        operation_name(&self.module_name, &self.base_name, method)
    }
}

/// Composes `<module>.<base>.<method>`, or `<module>.<method>` for an empty base.
#[must_use]
pub fn operation_name(module: &str, base: &str, method: &str) -> String {
    if base.is_empty() { format!("{module}.{method}") } else { format!("{module}.{base}.{method}") }
}

// ============================================================================
// SECTION: Mock
// ============================================================================

/// One interface method captured verbatim for a test double.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockMethod {
    /// Method name.
    pub name: String,
    /// Parameters in declared order.
    pub parameters: Vec<Argument>,
    /// Results in declared order.
    pub results: Vec<Argument>,
    /// True when the final parameter is variadic.
    pub variadic: bool,
}

/// Output bucket of a mocked interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MockBucket {
    /// Regular source file in the target package.
    Default,
    /// Test file in the target package.
    TestOnly,
    /// Test file in the external `_test` package.
    External,
}

impl MockBucket {
    /// Returns the output file name of the bucket.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Default => "zz_generated.mock.go",
            Self::TestOnly => "zz_generated.mock_test.go",
            Self::External => "zz_generated.mock_external_test.go",
        }
    }

    /// Returns the buckets an interface lands in for the given options.
    ///
    /// `external` always selects the external bucket and `test_only` the
    /// test-only bucket; the default bucket is used only when neither is set.
    #[must_use]
    pub fn select(test_only: bool, external: bool) -> Vec<Self> {
        match (test_only, external) {
            (false, false) => vec![Self::Default],
            (true, false) => vec![Self::TestOnly],
            (false, true) => vec![Self::External],
            (true, true) => vec![Self::TestOnly, Self::External],
        }
    }
}
