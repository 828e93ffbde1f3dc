// crates/declgen-codegen/tests/properties.rs
// ============================================================================
// Module: Generator Property Tests
// Description: Property tests for naming and signature shape preservation.
// Purpose: Check generator invariants over generated inputs.
// Dependencies: declgen-codegen, declgen-core, proptest
// ============================================================================

//! ## Overview
//! Base-name stripping, operation-name composition, and the dispatcher's
//! context/error round trip hold for arbitrary identifiers.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use declgen_codegen::dispatcher;
use declgen_codegen::operation_name;
use declgen_codegen::spec::GenerationFile;
use declgen_core::DeclKind;
use declgen_core::Declaration;
use declgen_core::InterfaceType;
use declgen_core::Method;
use declgen_core::PackageRef;
use declgen_core::Param;
use declgen_core::ResolvedRoot;
use declgen_core::Signature;
use declgen_core::TypeExpr;
use declgen_core::TypeRef;
use proptest::prelude::*;

// ============================================================================
// SECTION: Strategies
// ============================================================================

/// Exported Go identifiers without digits.
fn exported_name() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{1,8}"
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #[test]
    fn dispatcher_suffix_is_stripped_once(
        base in exported_name(),
        suffix in prop::sample::select(vec!["EventDispatcher", "EventBus", "Events"]),
    ) {
        let name = format!("{base}{suffix}");
        prop_assert_eq!(dispatcher::base_name(&name), base.as_str());
    }

    #[test]
    fn operation_name_joins_non_empty_segments(
        module in "[a-z]{1,8}",
        base in prop::option::of(exported_name()),
        method in exported_name(),
    ) {
        let base = base.unwrap_or_default();
        let name = operation_name(&module, &base, &method);
        let segments: Vec<&str> = name.split('.').collect();
        if base.is_empty() {
            prop_assert_eq!(segments, vec![module.as_str(), method.as_str()]);
        } else {
            prop_assert_eq!(segments, vec![module.as_str(), base.as_str(), method.as_str()]);
        }
    }

    #[test]
    fn dispatcher_preserves_context_and_error_presence(
        event in exported_name(),
        receives_context in any::<bool>(),
        returns_error in any::<bool>(),
    ) {
        let todo = PackageRef::new("todo", "example.com/app/todo");
        let mut params = Vec::new();
        if receives_context {
            params.push(Param::new("ctx", TypeExpr::context()));
        }
        params.push(Param::new("event", TypeExpr::named(TypeRef::new(event.clone(), todo.clone()))));
        let results = if returns_error { vec![Param::unnamed(TypeExpr::error())] } else { Vec::new() };
        let declaration = Declaration::new(
            "Events",
            DeclKind::Interface(InterfaceType {
                methods: vec![Method {
                    name: event.clone(),
                    signature: Signature { params, results, variadic: false },
                }],
                embeds: Vec::new(),
            }),
        );
        let root = ResolvedRoot::new("todo", todo.clone()).with_declaration(declaration.clone());

        let spec = dispatcher::extract(&declaration, &root).unwrap();
        prop_assert_eq!(spec.methods[0].receives_context, receives_context);
        prop_assert_eq!(spec.methods[0].returns_error, returns_error);

        let out = dispatcher::synthesize(&GenerationFile {
            target_package: todo,
            header_text: String::new(),
            artifacts: vec![spec],
        })
        .unwrap();
        let context_param = if receives_context { "ctx context.Context, " } else { "" };
        let result = if returns_error { " error" } else { "" };
        let expected = format!("func (d EventDispatcher) {event}({context_param}event {event}){result} {{\n");
        prop_assert!(out.contains(&expected));
    }
}
