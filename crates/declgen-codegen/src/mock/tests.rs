// crates/declgen-codegen/src/mock/tests.rs
// ============================================================================
// Module: Mock Tests
// Description: Unit tests for mock extraction, bucketing, and synthesis.
// Purpose: Validate forwarding bodies, nil guards, and variadic spreading.
// Dependencies: declgen-codegen
// ============================================================================

//! ## Overview
//! Renders a representative interface end to end and checks bucket routing
//! through the generator entry point.

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
use declgen_core::OptionValue;
use declgen_core::PackageRef;
use declgen_core::Param;
use declgen_core::ResolvedRoot;
use declgen_core::ScannedDecl;
use declgen_core::Signature;
use declgen_core::StructType;
use declgen_core::TypeExpr;
use declgen_core::TypeRef;

use super::MARKER;
use super::MockGenerator;
use super::bucket_package;
use super::extract;
use super::parameter_names;
use super::synthesize;
use crate::error::SignatureError;
use crate::generator::GenerationInput;
use crate::generator::Generator;
use crate::gosrc::ImportSet;
use crate::spec::Argument;
use crate::spec::GenerationFile;
use crate::spec::InterfaceSpec;
use crate::spec::MockBucket;
use crate::spec::MockMethod;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// The `todo` package fixture.
fn todo() -> PackageRef {
    PackageRef::new("todo", "example.com/app/todo")
}

/// The builtin `string` type.
fn string() -> TypeExpr {
    TypeExpr::builtin("string")
}

/// Builds a named argument.
fn arg(name: &str, ty: TypeExpr) -> Argument {
    Argument {
        name: name.to_string(),
        ty,
    }
}

/// Builds a normalized mock method.
fn mock_method(name: &str, parameters: Vec<Argument>, results: Vec<Argument>) -> MockMethod {
    MockMethod {
        name: name.to_string(),
        parameters,
        results,
        variadic: false,
    }
}

/// Wraps one `Service` mock into a generation file.
fn file(package: PackageRef, methods: Vec<MockMethod>) -> GenerationFile<InterfaceSpec<MockMethod>> {
    GenerationFile {
        target_package: package,
        header_text: String::new(),
        artifacts: vec![InterfaceSpec {
            name: "Service".to_string(),
            package: todo(),
            methods,
        }],
    }
}

/// A `Service` interface with one context-taking method.
fn service_declaration(name: &str) -> Declaration {
    Declaration::new(
        name,
        DeclKind::Interface(InterfaceType {
            methods: vec![Method {
                name: "Ping".to_string(),
                signature: Signature {
                    params: vec![Param::new("ctx", TypeExpr::context())],
                    results: vec![Param::unnamed(TypeExpr::error())],
                    variadic: false,
                },
            }],
            embeds: Vec::new(),
        }),
    )
}

// ============================================================================
// SECTION: Extraction
// ============================================================================

#[test]
fn extract_captures_methods_verbatim() {
    let declaration = service_declaration("Service");
    let root = ResolvedRoot::new("todo", todo()).with_declaration(declaration.clone());
    let spec = extract(&declaration, &root).unwrap();
    assert_eq!(
        spec.methods,
        vec![MockMethod {
            name: "Ping".to_string(),
            parameters: vec![arg("ctx", TypeExpr::context())],
            results: vec![arg("", TypeExpr::error())],
            variadic: false,
        }]
    );
}

#[test]
fn extract_rejects_structs() {
    let declaration = Declaration::new("Todo", DeclKind::Struct(StructType::default()));
    let root = ResolvedRoot::new("todo", todo());
    assert!(matches!(
        extract(&declaration, &root),
        Err(SignatureError::NotAnInterface { found: "struct", .. })
    ));
}

#[test]
fn external_bucket_uses_test_package() {
    let package = bucket_package(MockBucket::External, &todo());
    assert_eq!(package, PackageRef::new("todo_test", "example.com/app/todo_test"));
    assert_eq!(bucket_package(MockBucket::TestOnly, &todo()), todo());
}

// ============================================================================
// SECTION: Naming
// ============================================================================

#[test]
fn parameter_names_replace_unusable_names() {
    let mut set = ImportSet::new(&todo());
    set.add_path("github.com/stretchr/testify/mock", "mock");
    let imports = set.resolve();
    let params = vec![
        arg("", string()),
        arg("ret", string()),
        arg("mock", string()),
        arg("r0", string()),
        arg("id", string()),
        arg("id", string()),
        arg("_", string()),
        arg("rate", string()),
    ];
    assert_eq!(
        parameter_names(&params, &imports),
        vec!["_a0", "_a1", "_a2", "_a3", "id", "_a5", "_a6", "rate"]
    );
}

// ============================================================================
// SECTION: Synthesis
// ============================================================================

#[test]
fn synthesize_renders_forwarding_methods() {
    let todo_list = TypeExpr::slice(TypeExpr::named(TypeRef::new("Todo", todo())));
    let methods = vec![
        mock_method(
            "CreateTodo",
            vec![arg("ctx", TypeExpr::context()), arg("text", string())],
            vec![arg("id", string()), arg("err", TypeExpr::error())],
        ),
        mock_method(
            "ListTodos",
            vec![arg("ctx", TypeExpr::context())],
            vec![arg("", todo_list), arg("", TypeExpr::error())],
        ),
        mock_method("TouchTodo", vec![arg("ctx", TypeExpr::context()), arg("id", string())], Vec::new()),
    ];
    let expected = r#"//go:build !ignore_autogenerated

// Code generated by declgen. DO NOT EDIT.

package todo

import (
	"context"
	"github.com/stretchr/testify/mock"
)

// ServiceMock is an autogenerated mock type for the Service type.
type ServiceMock struct {
	mock.Mock
}

// CreateTodo provides a mock function with given fields: ctx, text
func (_m *ServiceMock) CreateTodo(ctx context.Context, text string) (string, error) {
	ret := _m.Called(ctx, text)

	var r0 string
	if rf, ok := ret.Get(0).(func(context.Context, string) string); ok {
		r0 = rf(ctx, text)
	} else {
		r0 = ret.Get(0).(string)
	}

	var r1 error
	if rf, ok := ret.Get(1).(func(context.Context, string) error); ok {
		r1 = rf(ctx, text)
	} else {
		r1 = ret.Error(1)
	}

	return r0, r1
}

// ListTodos provides a mock function with given fields: ctx
func (_m *ServiceMock) ListTodos(ctx context.Context) ([]Todo, error) {
	ret := _m.Called(ctx)

	var r0 []Todo
	if rf, ok := ret.Get(0).(func(context.Context) []Todo); ok {
		r0 = rf(ctx)
	} else {
		if ret.Get(0) != nil {
			r0 = ret.Get(0).([]Todo)
		}
	}

	var r1 error
	if rf, ok := ret.Get(1).(func(context.Context) error); ok {
		r1 = rf(ctx)
	} else {
		r1 = ret.Error(1)
	}

	return r0, r1
}

// TouchTodo provides a mock function with given fields: ctx, id
func (_m *ServiceMock) TouchTodo(ctx context.Context, id string) {
	_m.Called(ctx, id)
}
"#;
    assert_eq!(synthesize(&file(todo(), methods)).unwrap(), expected);
}

#[test]
fn synthesize_spreads_empty_interface_variadics() {
    let method = MockMethod {
        variadic: true,
        ..mock_method(
            "Variadic",
            vec![
                arg("id", string()),
                arg("count", TypeExpr::builtin("int")),
                arg("arguments", TypeExpr::slice(TypeExpr::Interface)),
            ],
            vec![arg("err", TypeExpr::error())],
        )
    };
    let out = synthesize(&file(todo(), vec![method])).unwrap();
    assert!(out.contains(
        "func (_m *ServiceMock) Variadic(id string, count int, arguments ...interface{}) error {\n\
         \tvar _ca []interface{}\n\
         \t_ca = append(_ca, id, count)\n\
         \t_ca = append(_ca, arguments...)\n\
         \tret := _m.Called(_ca...)\n"
    ));
    assert!(out.contains("ret.Get(0).(func(string, int, ...interface{}) error); ok {"));
    assert!(out.contains("\t\tr0 = rf(id, count, arguments...)\n"));
}

#[test]
fn synthesize_converts_typed_variadics() {
    let method = MockMethod {
        variadic: true,
        ..mock_method("Tag", vec![arg("names", TypeExpr::slice(string()))], Vec::new())
    };
    let out = synthesize(&file(todo(), vec![method])).unwrap();
    assert!(out.contains(
        "\t_va := make([]interface{}, len(names))\n\
         \tfor _i := range names {\n\
         \t\t_va[_i] = names[_i]\n\
         \t}\n\
         \tvar _ca []interface{}\n\
         \t_ca = append(_ca, _va...)\n\
         \t_m.Called(_ca...)\n"
    ));
}

#[test]
fn synthesize_qualifies_local_types_in_external_package() {
    let method = mock_method(
        "Get",
        Vec::new(),
        vec![arg("", TypeExpr::pointer(TypeExpr::named(TypeRef::new("Todo", todo()))))],
    );
    let external = bucket_package(MockBucket::External, &todo());
    let out = synthesize(&file(external, vec![method])).unwrap();
    assert!(out.contains("package todo_test\n"));
    assert!(out.contains("\t\"example.com/app/todo\"\n"));
    assert!(out.contains("// Get provides a mock function.\n"));
    assert!(out.contains("func (_m *ServiceMock) Get() *todo.Todo {"));
    assert!(out.contains("\t\tif ret.Get(0) != nil {\n\t\t\tr0 = ret.Get(0).(*todo.Todo)\n\t\t}\n"));
}

#[test]
fn synthesize_guards_named_interface_results() {
    let reader = TypeExpr::named_nillable(TypeRef::new("Reader", PackageRef::new("io", "io")));
    let method = mock_method(
        "Open",
        vec![arg("ctx", TypeExpr::context())],
        vec![arg("", reader), arg("", TypeExpr::error())],
    );
    let out = synthesize(&file(todo(), vec![method])).unwrap();
    assert!(out.contains("func (_m *ServiceMock) Open(ctx context.Context) (io.Reader, error) {"));
    assert!(out.contains(
        "	var r0 io.Reader
         	if rf, ok := ret.Get(0).(func(context.Context) io.Reader); ok {
         		r0 = rf(ctx)
         	} else {
         		if ret.Get(0) != nil {
         			r0 = ret.Get(0).(io.Reader)
         		}
         	}
"
    ));
    assert!(out.contains("		r1 = ret.Error(1)
"));
}

#[test]
fn synthesize_guards_named_reference_types_but_not_named_values() {
    let store = PackageRef::new("store", "example.com/app/store");
    let index = TypeExpr::named_nillable(TypeRef::new("Index", store.clone()));
    let record = TypeExpr::named(TypeRef::new("Record", store));
    let method = mock_method("Load", Vec::new(), vec![arg("", index), arg("", record)]);
    let out = synthesize(&file(todo(), vec![method])).unwrap();
    assert!(out.contains("		if ret.Get(0) != nil {
			r0 = ret.Get(0).(store.Index)
		}
"));
    assert!(out.contains("	} else {
		r1 = ret.Get(1).(store.Record)
	}
"));
    assert!(!out.contains("if ret.Get(1) != nil"));
}

// ============================================================================
// SECTION: Generator
// ============================================================================

/// Runs the mock generator once and returns its file names.
fn run_generator(options: MarkerOptions) -> Vec<String> {
    let declaration = service_declaration("Service");
    let root = ResolvedRoot::new("todo", todo()).with_declaration(declaration.clone());
    let scanned = vec![ScannedDecl {
        declaration: &declaration,
        markers: vec![options],
    }];
    let target = todo();
    let input = GenerationInput {
        root: &root,
        declarations: &scanned,
        target: &target,
        header_text: "",
    };
    let output = MockGenerator.generate(&input);
    assert!(output.errors.is_empty());
    output.artifacts.into_iter().map(|artifact| artifact.file_name).collect()
}

#[test]
fn generator_routes_buckets_by_options() {
    assert_eq!(run_generator(MarkerOptions::empty(MARKER)), vec!["zz_generated.mock.go"]);
    assert_eq!(
        run_generator(MarkerOptions::empty(MARKER).with_value("testOnly", OptionValue::Bool(true))),
        vec!["zz_generated.mock_test.go"]
    );
    assert_eq!(
        run_generator(
            MarkerOptions::empty(MARKER)
                .with_value("testOnly", OptionValue::Bool(true))
                .with_value("external", OptionValue::Bool(true))
        ),
        vec!["zz_generated.mock_test.go", "zz_generated.mock_external_test.go"]
    );
}
