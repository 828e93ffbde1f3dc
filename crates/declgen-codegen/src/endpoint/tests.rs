// crates/declgen-codegen/src/endpoint/tests.rs
// ============================================================================
// Module: Endpoint Tests
// Description: Unit tests for endpoint extraction and synthesis.
// Purpose: Validate service rules, option handling, and rendered endpoints.
// Dependencies: declgen-codegen
// ============================================================================

//! ## Overview
//! Covers the context/error/variadic rules, option defaults, field naming,
//! both error strategies, and a complete rendered file.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use declgen_core::DeclKind;
use declgen_core::Declaration;
use declgen_core::InterfaceType;
use declgen_core::MarkerOptions;
use declgen_core::Method;
use declgen_core::NamedType;
use declgen_core::OptionValue;
use declgen_core::PackageRef;
use declgen_core::Param;
use declgen_core::ResolvedRoot;
use declgen_core::Signature;
use declgen_core::StructType;
use declgen_core::TypeExpr;
use declgen_core::TypeRef;

use super::MARKER;
use super::default_base_name;
use super::extract;
use super::field_names;
use super::synthesize;
use crate::error::SignatureError;
use crate::spec::Argument;
use crate::spec::EndpointSet;
use crate::spec::ErrorStrategy;
use crate::spec::GenerationFile;
use crate::spec::InterfaceSpec;
use crate::spec::ServiceMethod;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// The `generics` package fixture.
fn generics() -> PackageRef {
    PackageRef::new("generics", "example.com/app/generics")
}

/// A root holding one `Service` interface with `methods`.
fn service(methods: Vec<Method>) -> (ResolvedRoot, Declaration) {
    let declaration = Declaration::new(
        "Service",
        DeclKind::Interface(InterfaceType {
            methods,
            embeds: Vec::new(),
        }),
    );
    let root = ResolvedRoot::new("generics", generics()).with_declaration(declaration.clone());
    (root, declaration)
}

/// Builds an interface method.
fn method(name: &str, params: Vec<Param>, results: Vec<Param>, variadic: bool) -> Method {
    Method {
        name: name.to_string(),
        signature: Signature {
            params,
            results,
            variadic,
        },
    }
}

/// A `ctx context.Context` parameter.
fn ctx() -> Param {
    Param::new("ctx", TypeExpr::context())
}

/// An unnamed `error` result.
fn err() -> Param {
    Param::unnamed(TypeExpr::error())
}

/// The builtin `string` type.
fn string() -> TypeExpr {
    TypeExpr::builtin("string")
}

/// Empty endpoint marker options.
fn options() -> MarkerOptions {
    MarkerOptions::empty(MARKER)
}

/// Extracts a single-method interface.
fn extract_one(method: Method) -> Result<EndpointSet, SignatureError> {
    let (root, declaration) = service(vec![method]);
    extract(&declaration, &root, &options())
}

// ============================================================================
// SECTION: Extraction
// ============================================================================

#[test]
fn extract_requires_leading_context() {
    let missing = extract_one(method("Get", Vec::new(), vec![err()], false)).unwrap_err();
    assert_eq!(
        missing,
        SignatureError::MissingContext {
            method: "Get".to_string(),
        }
    );
    let wrong = extract_one(method("Get", vec![Param::new("id", string())], vec![err()], false));
    assert!(matches!(wrong, Err(SignatureError::MissingContext { .. })));
}

#[test]
fn extract_rejects_variadic_methods() {
    let variadic = method(
        "Tag",
        vec![ctx(), Param::new("tags", TypeExpr::slice(string()))],
        vec![err()],
        true,
    );
    assert!(matches!(extract_one(variadic), Err(SignatureError::VariadicNotSupported { .. })));
}

#[test]
fn extract_requires_trailing_error() {
    let none = extract_one(method("Get", vec![ctx()], Vec::new(), false)).unwrap_err();
    assert!(matches!(none, SignatureError::MissingErrorReturn { .. }));
    let wrong = extract_one(method(
        "Get",
        vec![ctx()],
        vec![err(), Param::unnamed(string())],
        false,
    ))
    .unwrap_err();
    assert!(matches!(wrong, SignatureError::MissingErrorReturn { .. }));
}

#[test]
fn extract_rejects_structs() {
    let declaration = Declaration::new("Service", DeclKind::Struct(StructType::default()));
    let root = ResolvedRoot::new("generics", generics());
    assert!(matches!(
        extract(&declaration, &root, &options()),
        Err(SignatureError::NotAnInterface { found: "struct", .. })
    ));
}

#[test]
fn extract_strips_context_and_error() {
    let set = extract_one(method(
        "Create",
        vec![ctx(), Param::new("title", string())],
        vec![Param::new("id", string()), err()],
        false,
    ))
    .unwrap();
    assert_eq!(
        set.service.methods,
        vec![ServiceMethod {
            name: "Create".to_string(),
            request_parameters: vec![Argument {
                name: "title".to_string(),
                ty: string(),
            }],
            response_parameters: vec![Argument {
                name: "id".to_string(),
                ty: string(),
            }],
        }]
    );
}

#[test]
fn extract_applies_option_defaults() {
    let set = extract_one(method("Ping", vec![ctx()], vec![err()], false)).unwrap();
    assert_eq!(set.base_name, "");
    assert_eq!(set.module_name, "generics");
    assert!(!set.with_open_census);
    assert_eq!(set.error_strategy, ErrorStrategy::Endpoint);
    assert_eq!(set.operation_name("Ping"), "generics.Ping");
}

#[test]
fn extract_honours_explicit_options() {
    let (root, declaration) = service(vec![method("Ping", vec![ctx()], vec![err()], false)]);
    let opts = options()
        .with_value("baseName", OptionValue::String("Todo".to_string()))
        .with_value("moduleName", OptionValue::String("app".to_string()))
        .with_value("withOpenCensus", OptionValue::Bool(true))
        .with_value("errorStrategy", OptionValue::String("service".to_string()));
    let set = extract(&declaration, &root, &opts).unwrap();
    assert_eq!(set.base_name, "Todo");
    assert_eq!(set.operation_name("Ping"), "app.Todo.Ping");
    assert!(set.with_open_census);
    assert_eq!(set.error_strategy, ErrorStrategy::Service);
}

#[test]
fn extract_rejects_unknown_error_strategy() {
    let (root, declaration) = service(Vec::new());
    let opts = options().with_value("errorStrategy", OptionValue::String("panic".to_string()));
    assert_eq!(
        extract(&declaration, &root, &opts).unwrap_err(),
        SignatureError::InvalidOption {
            option: "errorStrategy".to_string(),
            value: "panic".to_string(),
        }
    );
}

#[test]
fn default_base_name_strips_service_suffix() {
    assert_eq!(default_base_name("Service"), "");
    assert_eq!(default_base_name("TodoService"), "Todo");
    assert_eq!(default_base_name("Todos"), "Todos");
}

// ============================================================================
// SECTION: Field Naming
// ============================================================================

#[test]
fn field_names_fall_back_to_positions() {
    let args = vec![
        Argument {
            name: "title".to_string(),
            ty: string(),
        },
        Argument {
            name: String::new(),
            ty: string(),
        },
        Argument {
            name: "_".to_string(),
            ty: string(),
        },
        Argument {
            name: "Title".to_string(),
            ty: string(),
        },
    ];
    assert_eq!(field_names(&args, 'P', &[]), vec!["Title", "P1", "P2", "P3"]);
}

#[test]
fn field_names_avoid_reserved_names() {
    let args = vec![Argument {
        name: "err".to_string(),
        ty: TypeExpr::error(),
    }];
    assert_eq!(field_names(&args, 'R', &["Err"]), vec!["R0"]);
}

// ============================================================================
// SECTION: Synthesis
// ============================================================================

/// The generic `Optional[string]` type.
fn optional() -> TypeExpr {
    TypeExpr::Named(NamedType {
        type_ref: TypeRef::new("Optional", generics()),
        args: vec![string(), string()],
        nillable: false,
    })
}

/// The `CreateTodo` endpoint set with `strategy`.
fn create_todo_set(strategy: ErrorStrategy) -> EndpointSet {
    EndpointSet {
        service: InterfaceSpec {
            name: "Service".to_string(),
            package: generics(),
            methods: vec![ServiceMethod {
                name: "CreateTodo".to_string(),
                request_parameters: vec![Argument {
                    name: String::new(),
                    ty: string(),
                }],
                response_parameters: vec![Argument {
                    name: String::new(),
                    ty: optional(),
                }],
            }],
        },
        base_name: String::new(),
        module_name: "generics".to_string(),
        with_open_census: true,
        error_strategy: strategy,
    }
}

/// Wraps `set` into a file targeting the `pkgdriver` package.
fn driver_file(set: EndpointSet) -> GenerationFile<EndpointSet> {
    GenerationFile {
        target_package: PackageRef::new("pkgdriver", "example.com/app/generics/pkgdriver"),
        header_text: String::new(),
        artifacts: vec![set],
    }
}

#[test]
fn synthesize_renders_generic_service() {
    let expected = r#"//go:build !ignore_autogenerated

// Code generated by declgen. DO NOT EDIT.

package pkgdriver

import (
	"context"
	"errors"
	"example.com/app/generics"
	"github.com/go-kit/kit/endpoint"
	kitoc "github.com/go-kit/kit/tracing/opencensus"
	kitxendpoint "github.com/sagikazarmark/kitx/endpoint"
)

// endpointError identifies an error that should be returned as an endpoint error.
type endpointError interface {
	EndpointError() bool
}

// serviceError identifies an error that should be returned as a service error.
type serviceError interface {
	ServiceError() bool
}

// Endpoints collects all of the endpoints that compose the underlying service. It's
// meant to be used as a helper struct, to collect all of the endpoints into a
// single parameter.
type Endpoints struct {
	CreateTodo endpoint.Endpoint
}

// MakeEndpoints returns a(n) Endpoints struct where each endpoint invokes
// the corresponding method on the provided service.
func MakeEndpoints(service generics.Service, middleware ...endpoint.Middleware) Endpoints {
	mw := kitxendpoint.Combine(middleware...)

	return Endpoints{CreateTodo: kitxendpoint.OperationNameMiddleware("generics.CreateTodo")(mw(MakeCreateTodoEndpoint(service)))}
}

// TraceEndpoints returns a(n) Endpoints struct where each endpoint is wrapped with a tracing middleware.
func TraceEndpoints(endpoints Endpoints) Endpoints {
	return Endpoints{CreateTodo: kitoc.TraceEndpoint("generics.CreateTodo")(endpoints.CreateTodo)}
}

// CreateTodoRequest is a request struct for CreateTodo endpoint.
type CreateTodoRequest struct {
	P0 string
}

// CreateTodoResponse is a response struct for CreateTodo endpoint.
type CreateTodoResponse struct {
	R0  generics.Optional[string, string]
	Err error
}

func (r CreateTodoResponse) Failed() error {
	return r.Err
}

// MakeCreateTodoEndpoint returns an endpoint for the matching method of the underlying service.
func MakeCreateTodoEndpoint(service generics.Service) endpoint.Endpoint {
	return func(ctx context.Context, request interface{}) (interface{}, error) {
		req := request.(CreateTodoRequest)

		r0, err := service.CreateTodo(ctx, req.P0)

		if err != nil {
			if endpointErr := endpointError(nil); errors.As(err, &endpointErr) && endpointErr.EndpointError() {
				return CreateTodoResponse{
					Err: err,
					R0:  r0,
				}, err
			}

			return CreateTodoResponse{
				Err: err,
				R0:  r0,
			}, nil
		}

		return CreateTodoResponse{R0: r0}, nil
	}
}
"#;
    assert_eq!(synthesize(&driver_file(create_todo_set(ErrorStrategy::Endpoint))).unwrap(), expected);
}

#[test]
fn synthesize_service_strategy_returns_endpoint_error_by_default() {
    let out = synthesize(&driver_file(create_todo_set(ErrorStrategy::Service))).unwrap();
    assert!(out.contains(
        "if serviceErr := serviceError(nil); errors.As(err, &serviceErr) && serviceErr.ServiceError() {"
    ));
    assert!(out.contains("\t\t\treturn nil, err\n"));
    assert!(!out.contains("endpointErr.EndpointError()"));
}

#[test]
fn synthesize_omits_tracing_without_open_census() {
    let mut set = create_todo_set(ErrorStrategy::Endpoint);
    set.with_open_census = false;
    let out = synthesize(&driver_file(set)).unwrap();
    assert!(!out.contains("kitoc"));
    assert!(!out.contains("TraceEndpoints"));
}

#[test]
fn synthesize_handles_methods_without_payload() {
    let set = EndpointSet {
        service: InterfaceSpec {
            name: "TodoService".to_string(),
            package: generics(),
            methods: vec![
                ServiceMethod {
                    name: "Ping".to_string(),
                    request_parameters: Vec::new(),
                    response_parameters: Vec::new(),
                },
                ServiceMethod {
                    name: "Rename".to_string(),
                    request_parameters: vec![Argument {
                        name: "name".to_string(),
                        ty: string(),
                    }],
                    response_parameters: Vec::new(),
                },
            ],
        },
        base_name: "Todo".to_string(),
        module_name: "generics".to_string(),
        with_open_census: false,
        error_strategy: ErrorStrategy::Endpoint,
    };
    let out = synthesize(&GenerationFile {
        target_package: generics(),
        header_text: String::new(),
        artifacts: vec![set],
    })
    .unwrap();
    assert!(out.contains("type TodoPingRequest struct{}\n"));
    assert!(out.contains("\t\terr := service.Ping(ctx)\n"));
    assert!(!out.contains("request.(TodoPingRequest)"));
    assert!(out.contains("\t\terr := service.Rename(ctx, req.Name)\n"));
    assert!(out.contains("\t\treturn TodoPingResponse{}, nil\n"));
    assert!(out.contains("\t\t\t\treturn TodoPingResponse{Err: err}, err\n"));
    assert!(out.contains(
        "\treturn TodoEndpoints{\n\
         \t\tPing:   kitxendpoint.OperationNameMiddleware(\"generics.Todo.Ping\")(mw(MakeTodoPingEndpoint(service))),\n\
         \t\tRename: kitxendpoint.OperationNameMiddleware(\"generics.Todo.Rename\")(mw(MakeTodoRenameEndpoint(service))),\n\
         \t}\n"
    ));
    assert!(out.contains("func MakeTodoEndpoints(service TodoService, middleware ...endpoint.Middleware)"));
}

#[test]
fn synthesize_renders_empty_service() {
    let set = EndpointSet {
        service: InterfaceSpec {
            name: "Service".to_string(),
            package: generics(),
            methods: Vec::new(),
        },
        base_name: String::new(),
        module_name: "generics".to_string(),
        with_open_census: false,
        error_strategy: ErrorStrategy::Endpoint,
    };
    let out = synthesize(&driver_file(set)).unwrap();
    assert!(out.contains("type Endpoints struct{}\n"));
    assert!(out.contains("\treturn Endpoints{}\n"));
    assert!(!out.contains("mw :="));
}

#[test]
fn synthesize_rejects_colliding_sets() {
    let mut file = driver_file(create_todo_set(ErrorStrategy::Endpoint));
    file.artifacts.push(create_todo_set(ErrorStrategy::Endpoint));
    assert!(synthesize(&file).is_err());
}
