// crates/declgen-codegen/src/dispatcher.rs
// ============================================================================
// Module: Event Dispatcher Generator
// Description: Extraction and synthesis of event dispatcher facades.
// Purpose: Turn an event interface into a typed facade over a generic bus.
// Dependencies: declgen-core, tracing
// ============================================================================

//! ## Overview
//! An interface marked `+event:dispatcher` lists one method per event. Each
//! method takes the event (optionally preceded by a context) and returns
//! either nothing or an error. The generated `<Base>EventDispatcher`
//! implements that interface by publishing every event on a
//! `<Base>EventBus`.
//!
//! Invariants:
//! - Methods are emitted in name order, embedded interfaces included.
//! - The base name strips exactly one of `EventDispatcher`, `EventBus`,
//!   `Events`, longest first.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt::Write;

use declgen_core::CONTEXT_PACKAGE_PATH;
use declgen_core::CONTEXT_TYPE_NAME;
use declgen_core::DeclKind;
use declgen_core::Declaration;
use declgen_core::MarkerError;
use declgen_core::MarkerRegistry;
use declgen_core::MarkerSchema;
use declgen_core::PackageRef;
use declgen_core::ResolvedRoot;
use declgen_core::Signature;
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
use crate::gosrc::render_file;
use crate::spec::GenerationFile;
use crate::spec::InterfaceSpec;
use crate::spec::MethodSpec;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Marker enabling dispatcher generation.
pub const MARKER: &str = "event:dispatcher";

/// Alternate marker name used by sources annotated for `mga`.
pub const MARKER_ALIAS: &str = "mga:event:dispatcher";

/// Output file name.
pub const FILE_NAME: &str = "zz_generated.event_dispatcher.go";

/// Import path of the error-wrapping package used by dispatchers.
const ERRORS_PATH: &str = "emperror.dev/errors";

/// Suffixes stripped from the interface name, longest first.
const SUFFIXES: [&str; 3] = ["EventDispatcher", "EventBus", "Events"];

// ============================================================================
// SECTION: Naming
// ============================================================================

/// Returns the base name used as prefix of generated identifiers.
#[must_use]
pub fn base_name(interface_name: &str) -> &str {
    SUFFIXES
        .iter()
        .find_map(|suffix| interface_name.strip_suffix(suffix))
        .unwrap_or(interface_name)
}

/// Generated identifiers of one dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherNames {
    /// `<Base>EventBus`.
    pub bus: String,
    /// `<Base>EventDispatcher`.
    pub dispatcher: String,
    /// `New<Base>EventDispatcher`.
    pub constructor: String,
}

impl DispatcherNames {
    /// Derives the generated identifiers from an interface name.
    #[must_use]
    pub fn for_interface(interface_name: &str) -> Self {
        let base = base_name(interface_name);
        Self {
            bus: format!("{base}EventBus"),
            dispatcher: format!("{base}EventDispatcher"),
            constructor: format!("New{base}EventDispatcher"),
        }
    }
}

// ============================================================================
// SECTION: Extraction
// ============================================================================

/// Validates an event interface and normalizes its methods.
///
/// # Errors
///
/// Returns [`SignatureError`] for non-interfaces and for the first method
/// that violates the parameter or result rules.
pub fn extract(
    declaration: &Declaration,
    root: &ResolvedRoot,
) -> Result<InterfaceSpec<MethodSpec>, SignatureError> {
    let DeclKind::Interface(interface) = &declaration.kind else {
        return Err(SignatureError::NotAnInterface {
            name: declaration.name.clone(),
            found: declaration.kind.label(),
        });
    };
    let methods = root
        .method_set(interface)?
        .into_iter()
        .map(|method| extract_method(&method.name, &method.signature))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(InterfaceSpec {
        name: declaration.name.clone(),
        package: root.package.clone(),
        methods,
    })
}

/// Applies the dispatcher rules to one method.
fn extract_method(
    name: &str,
    signature: &Signature,
) -> Result<MethodSpec, SignatureError> {
    let params = &signature.params;
    if params.is_empty() || params.len() > 2 {
        return Err(SignatureError::TooManyOrFewParameters {
            method: name.to_string(),
            count: params.len(),
        });
    }
    let receives_context = params.len() == 2;
    if receives_context && !params[0].ty.is_context() {
        return Err(SignatureError::MissingContext {
            method: name.to_string(),
        });
    }
    let event_index = params.len() - 1;
    let event_param = &params[event_index];
    let event = event_param.ty.as_named().cloned().ok_or_else(|| {
        SignatureError::InvalidParameterType {
            method: name.to_string(),
            parameter: if event_param.name.is_empty() {
                format!("#{event_index}")
            } else {
                event_param.name.clone()
            },
        }
    })?;

    let results = &signature.results;
    if results.len() > 1 {
        return Err(SignatureError::TooManyResults {
            method: name.to_string(),
            count: results.len(),
        });
    }
    let returns_error = match results.first() {
        None => false,
        Some(result) if result.ty.is_error() => true,
        Some(_) => {
            return Err(SignatureError::InvalidReturnType {
                method: name.to_string(),
            });
        }
    };
    Ok(MethodSpec {
        name: name.to_string(),
        event,
        receives_context,
        returns_error,
    })
}

// ============================================================================
// SECTION: Synthesis
// ============================================================================

/// Renders a dispatcher file.
///
/// # Errors
///
/// Returns [`SynthesisError`] when a generated identifier is invalid or two
/// dispatchers in the file would share one.
pub fn synthesize(
    file: &GenerationFile<InterfaceSpec<MethodSpec>>,
) -> Result<String, SynthesisError> {
    ensure_identifier(&file.target_package.name)?;
    let context = PackageRef::new(CONTEXT_PACKAGE_PATH, CONTEXT_PACKAGE_PATH);
    let mut imports = ImportSet::new(&file.target_package);
    imports.add(&context);
    for artifact in &file.artifacts {
        for method in &artifact.methods {
            imports.add(&method.event.package);
            if method.returns_error {
                imports.add_path(ERRORS_PATH, "errors");
            }
        }
    }
    let imports = imports.resolve();
    let ctx_type = imports.qualified(CONTEXT_PACKAGE_PATH, CONTEXT_TYPE_NAME);
    let background = imports.qualified(CONTEXT_PACKAGE_PATH, "Background");
    let with_details = imports.qualified(ERRORS_PATH, "WithDetails");
    let with_message = imports.qualified(ERRORS_PATH, "WithMessage");

    let mut seen = BTreeSet::new();
    let mut body = String::new();
    for artifact in &file.artifacts {
        let names = DispatcherNames::for_interface(&artifact.name);
        claim_identifier(&mut seen, &names.bus)?;
        claim_identifier(&mut seen, &names.dispatcher)?;
        claim_identifier(&mut seen, &names.constructor)?;

        let _ = write!(
            body,
            "// {bus} is a generic event bus.\n\
             type {bus} interface {{\n\
             \t// Publish sends an event to the underlying message bus.\n\
             \tPublish(ctx {ctx_type}, event interface{{}}) error\n\
             }}\n\n\
             // {dispatcher} dispatches events through the underlying generic event bus.\n\
             type {dispatcher} struct {{\n\
             \tbus {bus}\n\
             }}\n\n\
             // {constructor} returns a new {dispatcher} instance.\n\
             func {constructor}(bus {bus}) {dispatcher} {{\n\
             \treturn {dispatcher}{{bus: bus}}\n\
             }}\n",
            bus = names.bus,
            dispatcher = names.dispatcher,
            constructor = names.constructor,
        );

        for method in &artifact.methods {
            ensure_identifier(&method.name)?;
            let event_type = imports.type_name(&method.event);
            let mut params = String::new();
            if method.receives_context {
                let _ = write!(params, "ctx {ctx_type}, ");
            }
            let _ = write!(params, "event {event_type}");
            let result = if method.returns_error { " error" } else { "" };

            let _ = write!(
                body,
                "\n// {name} dispatches a(n) {event} event.\n\
                 func (d {dispatcher}) {name}({params}){result} {{\n",
                name = method.name,
                event = method.event.name,
                dispatcher = names.dispatcher,
            );
            if !method.receives_context {
                let _ = writeln!(body, "\tctx := {background}()");
            }
            if method.returns_error {
                let _ = write!(
                    body,
                    "\terr := d.bus.Publish(ctx, event)\n\
                     \tif err != nil {{\n\
                     \t\treturn {with_details}({with_message}(err, \"failed to dispatch event\"), \"event\", \"{event}\")\n\
                     \t}}\n\n\
                     \treturn nil\n",
                    event = method.event.name,
                );
            } else {
                body.push_str("\t_ = d.bus.Publish(ctx, event)\n");
            }
            body.push_str("}\n");
        }
        body.push('\n');
    }
    Ok(render_file(&file.target_package, &file.header_text, &imports, &body))
}

// ============================================================================
// SECTION: Generator
// ============================================================================

/// Generator for `+event:dispatcher` interfaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatcherGenerator;

impl Generator for DispatcherGenerator {
    fn name(&self) -> &'static str {
        "event-dispatcher"
    }

    fn register_markers(&self, registry: &mut MarkerRegistry) -> Result<(), MarkerError> {
        registry.register(MarkerSchema::new(
            MARKER,
            "enables event dispatcher generation for an event interface",
        ))?;
        registry.register(MarkerSchema::new(MARKER_ALIAS, "alias of +event:dispatcher"))
    }

    fn generate(&self, input: &GenerationInput<'_>) -> GeneratorOutput {
        let mut output = GeneratorOutput::default();
        let mut artifacts = Vec::new();
        for scanned in input.declarations {
            if scanned.marker(MARKER).is_none() && scanned.marker(MARKER_ALIAS).is_none() {
                continue;
            }
            let declaration = scanned.declaration;
            match extract(declaration, input.root) {
                Ok(spec) => {
                    debug!(declaration = %declaration.name, methods = spec.methods.len(), "extracted event dispatcher");
                    artifacts.push(spec);
                }
                Err(source) => output.errors.push(GenerateError::Signature {
                    location: declaration.location(),
                    source,
                }),
            }
        }
        if artifacts.is_empty() {
            return output;
        }
        let file = GenerationFile {
            target_package: input.target.clone(),
            header_text: input.header_text.to_string(),
            artifacts,
        };
        match synthesize(&file) {
            Ok(contents) => output.artifacts.push(Artifact {
                file_name: FILE_NAME.to_string(),
                contents,
            }),
            Err(source) => output.errors.push(GenerateError::Synthesis {
                file: FILE_NAME.to_string(),
                source,
            }),
        }
        output
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
