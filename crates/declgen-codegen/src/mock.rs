// crates/declgen-codegen/src/mock.rs
// ============================================================================
// Module: Mock Generator
// Description: Extraction and synthesis of test doubles for interfaces.
// Purpose: Emit call-recording mocks that forward every interface method.
// Dependencies: declgen-core, tracing
// ============================================================================

//! ## Overview
//! An interface marked `+testify:mock` receives an `<Iface>Mock` type that
//! embeds `mock.Mock` and implements every method by recording the call and
//! replaying configured return values. Return values may be plain values or
//! functions with the method's parameter list, which are invoked with the
//! call arguments.
//!
//! Mocks land in one or more buckets (see [`MockBucket`]): the package
//! itself, a test file of the package, or a test file of the external
//! `_test` package.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt::Write;

use declgen_core::DeclKind;
use declgen_core::Declaration;
use declgen_core::MarkerError;
use declgen_core::MarkerRegistry;
use declgen_core::MarkerSchema;
use declgen_core::OptionSchema;
use declgen_core::PackageRef;
use declgen_core::Param;
use declgen_core::ResolvedRoot;
use declgen_core::Signature;
use declgen_core::TypeExpr;
use tracing::debug;

use crate::error::GenerateError;
use crate::error::SignatureError;
use crate::error::SynthesisError;
use crate::generator::Artifact;
use crate::generator::GenerationInput;
use crate::generator::Generator;
use crate::generator::GeneratorOutput;
use crate::generator::claim_identifier;
use crate::generator::ensure_identifier;
use crate::gosrc::ImportSet;
use crate::gosrc::Imports;
use crate::gosrc::is_identifier;
use crate::gosrc::render_file;
use crate::spec::Argument;
use crate::spec::GenerationFile;
use crate::spec::InterfaceSpec;
use crate::spec::MockBucket;
use crate::spec::MockMethod;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Marker enabling mock generation.
pub const MARKER: &str = "testify:mock";

/// Import path of the mock support package.
const MOCK_PATH: &str = "github.com/stretchr/testify/mock";

/// Suffix of the external test package name and path.
const EXTERNAL_SUFFIX: &str = "_test";

/// Local identifiers used inside generated method bodies.
const RESERVED_LOCALS: [&str; 7] = ["_m", "ret", "rf", "ok", "_va", "_ca", "_i"];

// ============================================================================
// SECTION: Marker Schema
// ============================================================================

/// Returns the `+testify:mock` marker schema.
#[must_use]
pub fn marker_schema() -> MarkerSchema {
    MarkerSchema::new(MARKER, "enables mock generation for an interface")
        .with_option(OptionSchema::flag("testOnly", "write the mock into a test file of the package"))
        .with_option(OptionSchema::flag(
            "external",
            "write the mock into the external test package",
        ))
}

// ============================================================================
// SECTION: Extraction
// ============================================================================

/// Captures the flattened method set of an interface.
///
/// # Errors
///
/// Returns [`SignatureError::NotAnInterface`] for other declaration kinds
/// and [`SignatureError::MethodSet`] when embeds cannot be flattened.
pub fn extract(
    declaration: &Declaration,
    root: &ResolvedRoot,
) -> Result<InterfaceSpec<MockMethod>, SignatureError> {
    let DeclKind::Interface(interface) = &declaration.kind else {
        return Err(SignatureError::NotAnInterface {
            name: declaration.name.clone(),
            found: declaration.kind.label(),
        });
    };
    let methods = root
        .method_set(interface)?
        .into_iter()
        .map(|method| MockMethod {
            parameters: method.signature.params.iter().map(Argument::from).collect(),
            results: method.signature.results.iter().map(Argument::from).collect(),
            variadic: method.signature.variadic,
            name: method.name,
        })
        .collect();
    Ok(InterfaceSpec {
        name: declaration.name.clone(),
        package: root.package.clone(),
        methods,
    })
}

/// Returns the package a bucket's file belongs to.
#[must_use]
pub fn bucket_package(bucket: MockBucket, target: &PackageRef) -> PackageRef {
    match bucket {
        MockBucket::Default | MockBucket::TestOnly => target.clone(),
        MockBucket::External => PackageRef::new(
            format!("{}{EXTERNAL_SUFFIX}", target.name),
            format!("{}{EXTERNAL_SUFFIX}", target.path),
        ),
    }
}

// ============================================================================
// SECTION: Naming
// ============================================================================

/// Returns true for names that would shadow a generated local.
fn is_reserved_local(name: &str) -> bool {
    RESERVED_LOCALS.contains(&name)
        || name
            .strip_prefix('r')
            .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Names method parameters, replacing unusable names with `_a<index>`.
///
/// A name is unusable when it is empty, blank, repeated, shadows a generated
/// local, or shadows an import qualifier.
#[must_use]
pub fn parameter_names(parameters: &[Argument], imports: &Imports) -> Vec<String> {
    let mut used = BTreeSet::new();
    parameters
        .iter()
        .enumerate()
        .map(|(index, argument)| {
            let name = &argument.name;
            let usable = !name.is_empty()
                && name != "_"
                && is_identifier(name)
                && !is_reserved_local(name)
                && !imports.is_qualifier(name)
                && !used.contains(name);
            let mut chosen = if usable { name.clone() } else { format!("_a{index}") };
            while used.contains(&chosen) {
                chosen.push('_');
            }
            used.insert(chosen.clone());
            chosen
        })
        .collect()
}

// ============================================================================
// SECTION: Synthesis
// ============================================================================

/// Renders a mock file.
///
/// # Errors
///
/// Returns [`SynthesisError`] for invalid or repeated identifiers.
pub fn synthesize(file: &GenerationFile<InterfaceSpec<MockMethod>>) -> Result<String, SynthesisError> {
    ensure_identifier(&file.target_package.name)?;
    let mut imports = ImportSet::new(&file.target_package);
    imports.add_path(MOCK_PATH, "mock");
    for interface in &file.artifacts {
        for method in &interface.methods {
            for argument in method.parameters.iter().chain(&method.results) {
                imports.add_type(&argument.ty);
            }
        }
    }
    let imports = imports.resolve();
    let embedded = imports.qualified(MOCK_PATH, "Mock");

    let mut seen = BTreeSet::new();
    let mut body = String::new();
    for interface in &file.artifacts {
        let mock_name = format!("{}Mock", interface.name);
        claim_identifier(&mut seen, &mock_name)?;
        let _ = write!(
            body,
            "// {mock_name} is an autogenerated mock type for the {iface} type.\n\
             type {mock_name} struct {{\n\
             \t{embedded}\n\
             }}\n",
            iface = interface.name,
        );
        for method in &interface.methods {
            ensure_identifier(&method.name)?;
            render_method(&mut body, &imports, &mock_name, method);
        }
        body.push('\n');
    }
    Ok(render_file(&file.target_package, &file.header_text, &imports, &body))
}

/// Rebuilds a signature from captured parameters and results.
fn signature_of(parameters: &[Param], results: &[Argument], variadic: bool) -> Signature {
    Signature {
        params: parameters.to_vec(),
        results: results.iter().map(|result| Param::unnamed(result.ty.clone())).collect(),
        variadic,
    }
}

/// Renders one forwarding method.
fn render_method(body: &mut String, imports: &Imports, mock_name: &str, method: &MockMethod) {
    let names = parameter_names(&method.parameters, imports);
    let params: Vec<Param> = names
        .iter()
        .zip(&method.parameters)
        .map(|(name, argument)| Param::new(name.clone(), argument.ty.clone()))
        .collect();
    let last = params.len().saturating_sub(1);
    let declared: Vec<String> = params
        .iter()
        .enumerate()
        .map(|(index, param)| {
            format!(
                "{} {}",
                param.name,
                imports.render_param_type(&param.ty, method.variadic && index == last)
            )
        })
        .collect();
    let results = imports.render_results(
        &method.results.iter().map(|result| Param::unnamed(result.ty.clone())).collect::<Vec<_>>(),
    );

    if names.is_empty() {
        let _ = write!(body, "\n// {} provides a mock function.\n", method.name);
    } else {
        let _ = write!(
            body,
            "\n// {} provides a mock function with given fields: {}\n",
            method.name,
            names.join(", ")
        );
    }
    let _ = writeln!(
        body,
        "func (_m *{mock_name}) {}({}){results} {{",
        method.name,
        declared.join(", ")
    );

    let call = if method.variadic { render_variadic_call(body, &params) } else { names.join(", ") };
    if method.results.is_empty() {
        let _ = writeln!(body, "\t_m.Called({call})");
        body.push_str("}\n");
        return;
    }
    let _ = writeln!(body, "\tret := _m.Called({call})\n");

    let forwarded = if method.variadic {
        let mut args = names.clone();
        if let Some(last) = args.last_mut() {
            last.push_str("...");
        }
        args.join(", ")
    } else {
        names.join(", ")
    };
    let param_types = imports.render_signature_types(&signature_of(&params, &[], method.variadic));
    let mut locals = Vec::with_capacity(method.results.len());
    for (index, result) in method.results.iter().enumerate() {
        let local = format!("r{index}");
        let ty = imports.render_type(&result.ty);
        let assign = if result.ty.is_error() {
            format!("\t\t{local} = ret.Error({index})\n")
        } else if result.ty.is_nillable() {
            format!(
                "\t\tif ret.Get({index}) != nil {{\n\
                 \t\t\t{local} = ret.Get({index}).({ty})\n\
                 \t\t}}\n"
            )
        } else {
            format!("\t\t{local} = ret.Get({index}).({ty})\n")
        };
        let _ = write!(
            body,
            "\tvar {local} {ty}\n\
             \tif rf, ok := ret.Get({index}).(func{param_types} {ty}); ok {{\n\
             \t\t{local} = rf({forwarded})\n\
             \t}} else {{\n\
             {assign}\
             \t}}\n\n"
        );
        locals.push(local);
    }
    let _ = writeln!(body, "\treturn {}", locals.join(", "));
    body.push_str("}\n");
}

/// Writes the argument spreading prologue and returns the `Called` argument.
fn render_variadic_call(body: &mut String, params: &[Param]) -> String {
    let Some((variadic, fixed)) = params.split_last() else {
        return String::new();
    };
    let spread_empty_interface = matches!(
        &variadic.ty,
        TypeExpr::Slice { elem } if matches!(elem.as_ref(), TypeExpr::Interface)
    );
    let spread = if spread_empty_interface {
        variadic.name.clone()
    } else {
        let name = &variadic.name;
        let _ = write!(
            body,
            "\t_va := make([]interface{{}}, len({name}))\n\
             \tfor _i := range {name} {{\n\
             \t\t_va[_i] = {name}[_i]\n\
             \t}}\n"
        );
        "_va".to_string()
    };
    body.push_str("\tvar _ca []interface{}\n");
    if !fixed.is_empty() {
        let fixed_names: Vec<&str> = fixed.iter().map(|param| param.name.as_str()).collect();
        let _ = writeln!(body, "\t_ca = append(_ca, {})", fixed_names.join(", "));
    }
    let _ = writeln!(body, "\t_ca = append(_ca, {spread}...)");
    "_ca...".to_string()
}

// ============================================================================
// SECTION: Generator
// ============================================================================

/// Generator for `+testify:mock` interfaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockGenerator;

impl Generator for MockGenerator {
    fn name(&self) -> &'static str {
        "testify-mock"
    }

    fn register_markers(&self, registry: &mut MarkerRegistry) -> Result<(), MarkerError> {
        registry.register(marker_schema())
    }

    fn generate(&self, input: &GenerationInput<'_>) -> GeneratorOutput {
        let mut output = GeneratorOutput::default();
        let mut buckets: BTreeMap<MockBucket, Vec<InterfaceSpec<MockMethod>>> = BTreeMap::new();
        for scanned in input.declarations {
            let Some(options) = scanned.marker(MARKER) else {
                continue;
            };
            let declaration = scanned.declaration;
            match extract(declaration, input.root) {
                Ok(spec) => {
                    let selected =
                        MockBucket::select(options.get_bool("testOnly"), options.get_bool("external"));
                    debug!(
                        declaration = %declaration.name,
                        methods = spec.methods.len(),
                        buckets = selected.len(),
                        "extracted mock"
                    );
                    for bucket in selected {
                        buckets.entry(bucket).or_default().push(spec.clone());
                    }
                }
                Err(source) => output.errors.push(GenerateError::Signature {
                    location: declaration.location(),
                    source,
                }),
            }
        }
        for (bucket, artifacts) in buckets {
            let file_name = bucket.file_name();
            let file = GenerationFile {
                target_package: bucket_package(bucket, input.target),
                header_text: input.header_text.to_string(),
                artifacts,
            };
            match synthesize(&file) {
                Ok(contents) => output.artifacts.push(Artifact {
                    file_name: file_name.to_string(),
                    contents,
                }),
                Err(source) => output.errors.push(GenerateError::Synthesis {
                    file: file_name.to_string(),
                    source,
                }),
            }
        }
        output
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
