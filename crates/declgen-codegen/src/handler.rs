// crates/declgen-codegen/src/handler.rs
// ============================================================================
// Module: Event Handler Generator
// Description: Extraction and synthesis of message-router handler adapters.
// Purpose: Adapt typed event callbacks to the untyped handler contract.
// Dependencies: declgen-core, tracing
// ============================================================================

//! ## Overview
//! A struct marked `+event:handler` is an event payload. For each one the
//! generator emits a `<Event>Handler` callback interface and an
//! `<Event>EventHandler` adapter that satisfies the router's untyped handler
//! contract (`HandlerName`, `NewEvent`, `Handle`) by unwrapping the pointer
//! payload and forwarding it to the callback.

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
use declgen_core::ResolvedRoot;
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
use crate::gosrc::render_file;
use crate::spec::EventSpec;
use crate::spec::GenerationFile;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Marker enabling handler generation.
pub const MARKER: &str = "event:handler";

/// Alternate marker name used by sources annotated for `mga`.
pub const MARKER_ALIAS: &str = "mga:event:handler";

/// Output file name.
pub const FILE_NAME: &str = "zz_generated.event_handler.go";

/// Import path of the error package used for unexpected payloads.
const ERRORS_PATH: &str = "emperror.dev/errors";

// ============================================================================
// SECTION: Extraction
// ============================================================================

/// Validates an event struct.
///
/// # Errors
///
/// Returns [`SignatureError::NotAStruct`] for any other declaration kind.
pub fn extract(declaration: &Declaration, root: &ResolvedRoot) -> Result<EventSpec, SignatureError> {
    match &declaration.kind {
        DeclKind::Struct(_) => Ok(EventSpec {
            name: declaration.name.clone(),
            package: root.package.clone(),
        }),
        other => Err(SignatureError::NotAStruct {
            name: declaration.name.clone(),
            found: other.label(),
        }),
    }
}

// ============================================================================
// SECTION: Synthesis
// ============================================================================

/// Renders a handler file.
///
/// # Errors
///
/// Returns [`SynthesisError`] for invalid or repeated identifiers.
pub fn synthesize(file: &GenerationFile<EventSpec>) -> Result<String, SynthesisError> {
    ensure_identifier(&file.target_package.name)?;
    let mut imports = ImportSet::new(&file.target_package);
    imports.add_path(CONTEXT_PACKAGE_PATH, CONTEXT_PACKAGE_PATH);
    imports.add_path("fmt", "fmt");
    imports.add_path(ERRORS_PATH, "errors");
    for event in &file.artifacts {
        imports.add(&event.package);
    }
    let imports = imports.resolve();
    let ctx_type = imports.qualified(CONTEXT_PACKAGE_PATH, CONTEXT_TYPE_NAME);
    let sprintf = imports.qualified("fmt", "Sprintf");
    let new_with_details = imports.qualified(ERRORS_PATH, "NewWithDetails");
    let param = unshadowed_local(&imports, "event");

    let mut seen = BTreeSet::new();
    let mut body = String::new();
    for event in &file.artifacts {
        let name = &event.name;
        let callback = format!("{name}Handler");
        let adapter = format!("{name}EventHandler");
        let constructor = format!("New{adapter}");
        claim_identifier(&mut seen, &callback)?;
        claim_identifier(&mut seen, &adapter)?;
        claim_identifier(&mut seen, &constructor)?;
        let event_type = imports.type_name(&event.type_ref());

        let _ = write!(
            body,
            "// {callback} is a handler for {name} events.\n\
             type {callback} interface {{\n\
             \t// {name} handles a(n) {name} event.\n\
             \t{name}(ctx {ctx_type}, event {event_type}) error\n\
             }}\n\n\
             // {adapter} handles {name} events.\n\
             type {adapter} struct {{\n\
             \thandler {callback}\n\
             \tname    string\n\
             }}\n\n\
             // {constructor} returns a new {adapter} instance.\n\
             func {constructor}(handler {callback}, name string) {adapter} {{\n\
             \treturn {adapter}{{\n\
             \t\thandler: handler,\n\
             \t\tname:    name,\n\
             \t}}\n\
             }}\n\n\
             // HandlerName returns the name of the event handler.\n\
             func (h {adapter}) HandlerName() string {{\n\
             \treturn h.name\n\
             }}\n\n\
             // NewEvent returns a new empty event used for serialization.\n\
             func (h {adapter}) NewEvent() interface{{}} {{\n\
             \treturn &{event_type}{{}}\n\
             }}\n\n\
             // Handle handles an event.\n\
             func (h {adapter}) Handle(ctx {ctx_type}, {param} interface{{}}) error {{\n\
             \te, ok := {param}.(*{event_type})\n\
             \tif !ok {{\n\
             \t\treturn {new_with_details}(\"unexpected event type\", \"type\", {sprintf}(\"%T\", {param}))\n\
             \t}}\n\n\
             \treturn h.handler.{name}(ctx, *e)\n\
             }}\n\n",
        );
    }
    Ok(render_file(&file.target_package, &file.header_text, &imports, &body))
}

/// Returns `base`, suffixed with underscores until no import qualifier shares
/// the name.
fn unshadowed_local(imports: &Imports, base: &str) -> String {
    let mut name = base.to_string();
    while imports.is_qualifier(&name) {
        name.push('_');
    }
    name
}

// ============================================================================
// SECTION: Generator
// ============================================================================

/// Generator for `+event:handler` structs.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandlerGenerator;

impl Generator for HandlerGenerator {
    fn name(&self) -> &'static str {
        "event-handler"
    }

    fn register_markers(&self, registry: &mut MarkerRegistry) -> Result<(), MarkerError> {
        registry.register(MarkerSchema::new(MARKER, "enables event handler generation for an event"))?;
        registry.register(MarkerSchema::new(MARKER_ALIAS, "alias of +event:handler"))
    }

    fn generate(&self, input: &GenerationInput<'_>) -> GeneratorOutput {
        let mut output = GeneratorOutput::default();
        let mut events = Vec::new();
        for scanned in input.declarations {
            if scanned.marker(MARKER).is_none() && scanned.marker(MARKER_ALIAS).is_none() {
                continue;
            }
            let declaration = scanned.declaration;
            match extract(declaration, input.root) {
                Ok(event) => {
                    debug!(declaration = %declaration.name, "extracted event handler");
                    events.push(event);
                }
                Err(source) => output.errors.push(GenerateError::Signature {
                    location: declaration.location(),
                    source,
                }),
            }
        }
        if events.is_empty() {
            return output;
        }
        let file = GenerationFile {
            target_package: input.target.clone(),
            header_text: input.header_text.to_string(),
            artifacts: events,
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
