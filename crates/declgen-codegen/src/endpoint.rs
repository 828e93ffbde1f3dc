// crates/declgen-codegen/src/endpoint.rs
// ============================================================================
// Module: Endpoint Generator
// Description: Extraction and synthesis of RPC endpoint wrappers.
// Purpose: Wrap each service method in a transport-agnostic endpoint.
// Dependencies: declgen-core, tracing
// ============================================================================

//! ## Overview
//! An interface marked `+kit:endpoint` is a service. Every method must take a
//! context first and return an error last; the parameters in between form a
//! request struct and the results before the error form a response struct.
//! The generated code exposes an `<Base>Endpoints` set, a constructor that
//! applies operation-name middleware, an optional tracing wrapper, and one
//! endpoint factory per method.
//!
//! Marker options:
//! - `baseName`: prefix of generated identifiers (default: interface name
//!   without a trailing `Service`).
//! - `moduleName`: first segment of operation names (default: package name).
//! - `withOpenCensus`: also generate `Trace<Base>Endpoints`.
//! - `errorStrategy`: `endpoint` (default) or `service`.

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
use declgen_core::MarkerOptions;
use declgen_core::MarkerRegistry;
use declgen_core::MarkerSchema;
use declgen_core::Method;
use declgen_core::OptionSchema;
use declgen_core::OptionType;
use declgen_core::OptionValue;
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
use crate::gosrc::export;
use crate::gosrc::is_identifier;
use crate::gosrc::keyed_literal;
use crate::gosrc::quote;
use crate::gosrc::render_file;
use crate::gosrc::struct_fields;
use crate::spec::Argument;
use crate::spec::EndpointSet;
use crate::spec::ErrorStrategy;
use crate::spec::GenerationFile;
use crate::spec::InterfaceSpec;
use crate::spec::ServiceMethod;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Marker enabling endpoint generation.
pub const MARKER: &str = "kit:endpoint";

/// Output file name.
pub const FILE_NAME: &str = "zz_generated.endpoint.go";

/// Import path of the endpoint package.
const KIT_ENDPOINT_PATH: &str = "github.com/go-kit/kit/endpoint";

/// Import path of the tracing middleware package.
const KIT_OC_PATH: &str = "github.com/go-kit/kit/tracing/opencensus";

/// Import path of the endpoint helper package.
const KITX_ENDPOINT_PATH: &str = "github.com/sagikazarmark/kitx/endpoint";

/// Standard library error inspection package.
const STD_ERRORS_PATH: &str = "errors";

/// Suffix stripped from service names to derive the default base name.
const SERVICE_SUFFIX: &str = "Service";

// ============================================================================
// SECTION: Marker Schema
// ============================================================================

/// Returns the `+kit:endpoint` marker schema.
#[must_use]
pub fn marker_schema() -> MarkerSchema {
    MarkerSchema::new(MARKER, "enables endpoint generation for a service interface")
        .with_option(OptionSchema::new(
            "baseName",
            OptionType::String,
            "base name for generated identifiers (default: service name without Service)",
        ))
        .with_option(OptionSchema::new(
            "moduleName",
            OptionType::String,
            "module segment of operation names (default: package name)",
        ))
        .with_option(OptionSchema::flag("withOpenCensus", "generate a tracing endpoint wrapper"))
        .with_option(
            OptionSchema::new(
                "errorStrategy",
                OptionType::String,
                "how service errors surface: endpoint or service",
            )
            .with_default(OptionValue::String(String::new())),
        )
}

// ============================================================================
// SECTION: Extraction
// ============================================================================

/// Validates a service interface and builds its endpoint set.
///
/// # Errors
///
/// Returns [`SignatureError`] for non-interfaces, invalid option values, and
/// the first method without a leading context, with a variadic parameter, or
/// without a trailing error.
pub fn extract(
    declaration: &Declaration,
    root: &ResolvedRoot,
    options: &MarkerOptions,
) -> Result<EndpointSet, SignatureError> {
    let DeclKind::Interface(interface) = &declaration.kind else {
        return Err(SignatureError::NotAnInterface {
            name: declaration.name.clone(),
            found: declaration.kind.label(),
        });
    };
    let strategy_value = options.get_str("errorStrategy").unwrap_or_default();
    let error_strategy =
        ErrorStrategy::parse(strategy_value).ok_or_else(|| SignatureError::InvalidOption {
            option: "errorStrategy".to_string(),
            value: strategy_value.to_string(),
        })?;
    let methods = root
        .method_set(interface)?
        .iter()
        .map(extract_method)
        .collect::<Result<Vec<_>, _>>()?;

    let base_name = options
        .get_str("baseName")
        .filter(|name| !name.is_empty())
        .map_or_else(|| default_base_name(&declaration.name).to_string(), str::to_string);
    let module_name = options
        .get_str("moduleName")
        .filter(|name| !name.is_empty())
        .map_or_else(|| root.package.name.clone(), str::to_string);

    Ok(EndpointSet {
        service: InterfaceSpec {
            name: declaration.name.clone(),
            package: root.package.clone(),
            methods,
        },
        base_name,
        module_name,
        with_open_census: options.get_bool("withOpenCensus"),
        error_strategy,
    })
}

/// Returns the service name without its trailing `Service`.
#[must_use]
pub fn default_base_name(service_name: &str) -> &str {
    service_name.strip_suffix(SERVICE_SUFFIX).unwrap_or(service_name)
}

/// Applies the endpoint rules to one method.
fn extract_method(method: &Method) -> Result<ServiceMethod, SignatureError> {
    let signature = &method.signature;
    if !signature.params.first().is_some_and(|param| param.ty.is_context()) {
        return Err(SignatureError::MissingContext {
            method: method.name.clone(),
        });
    }
    if signature.variadic {
        return Err(SignatureError::VariadicNotSupported {
            method: method.name.clone(),
        });
    }
    let Some((last, leading)) = signature.results.split_last() else {
        return Err(SignatureError::MissingErrorReturn {
            method: method.name.clone(),
        });
    };
    if !last.ty.is_error() {
        return Err(SignatureError::MissingErrorReturn {
            method: method.name.clone(),
        });
    }
    Ok(ServiceMethod {
        name: method.name.clone(),
        request_parameters: signature.params[1 ..].iter().map(Argument::from).collect(),
        response_parameters: leading.iter().map(Argument::from).collect(),
    })
}

// ============================================================================
// SECTION: Field Naming
// ============================================================================

/// Names struct fields: exported parameter names, or `<prefix><index>` for
/// unnamed, blank, reserved, or repeated names.
#[must_use]
pub fn field_names(arguments: &[Argument], prefix: char, reserved: &[&str]) -> Vec<String> {
    let mut used: BTreeSet<String> = reserved.iter().map(|name| (*name).to_string()).collect();
    let mut names = Vec::with_capacity(arguments.len());
    for (index, argument) in arguments.iter().enumerate() {
        let exported = export(&argument.name);
        let mut name = if argument.name.is_empty()
            || argument.name == "_"
            || !is_identifier(&exported)
            || used.contains(&exported)
        {
            format!("{prefix}{index}")
        } else {
            exported
        };
        while used.contains(&name) {
            name.push('_');
        }
        used.insert(name.clone());
        names.push(name);
    }
    names
}

// ============================================================================
// SECTION: Synthesis
// ============================================================================

/// Renders an endpoint file.
///
/// # Errors
///
/// Returns [`SynthesisError`] for invalid or repeated identifiers.
pub fn synthesize(file: &GenerationFile<EndpointSet>) -> Result<String, SynthesisError> {
    ensure_identifier(&file.target_package.name)?;
    let mut imports = ImportSet::new(&file.target_package);
    imports.add_path(CONTEXT_PACKAGE_PATH, CONTEXT_PACKAGE_PATH);
    imports.add_path(STD_ERRORS_PATH, "errors");
    imports.add_path(KIT_ENDPOINT_PATH, "endpoint");
    imports.add_aliased(KITX_ENDPOINT_PATH, "endpoint", "kitxendpoint");
    for set in &file.artifacts {
        imports.add(&set.service.package);
        if set.with_open_census {
            imports.add_aliased(KIT_OC_PATH, "opencensus", "kitoc");
        }
        for method in &set.service.methods {
            for argument in method.request_parameters.iter().chain(&method.response_parameters) {
                imports.add_type(&argument.ty);
            }
        }
    }
    let imports = imports.resolve();

    let mut seen = BTreeSet::new();
    claim_identifier(&mut seen, "endpointError")?;
    claim_identifier(&mut seen, "serviceError")?;
    let mut body = String::from(
        "// endpointError identifies an error that should be returned as an endpoint error.\n\
         type endpointError interface {\n\
         \tEndpointError() bool\n\
         }\n\n\
         // serviceError identifies an error that should be returned as a service error.\n\
         type serviceError interface {\n\
         \tServiceError() bool\n\
         }\n",
    );
    for set in &file.artifacts {
        render_set(&mut body, &imports, &mut seen, set)?;
    }
    Ok(render_file(&file.target_package, &file.header_text, &imports, &body))
}

/// Qualified identifiers shared by every endpoint set in a file.
struct Names {
    /// `context.Context`.
    ctx: String,
    /// `errors.As`.
    errors_as: String,
    /// `endpoint.Endpoint`.
    endpoint: String,
    /// `endpoint.Middleware`.
    middleware: String,
    /// `kitxendpoint.Combine`.
    combine: String,
    /// `kitxendpoint.OperationNameMiddleware`.
    operation_name: String,
    /// `kitoc.TraceEndpoint`.
    trace: String,
}

impl Names {
    /// Resolves the shared identifiers through the file imports.
    fn new(imports: &Imports) -> Self {
        Self {
            ctx: imports.qualified(CONTEXT_PACKAGE_PATH, CONTEXT_TYPE_NAME),
            errors_as: imports.qualified(STD_ERRORS_PATH, "As"),
            endpoint: imports.qualified(KIT_ENDPOINT_PATH, "Endpoint"),
            middleware: imports.qualified(KIT_ENDPOINT_PATH, "Middleware"),
            combine: imports.qualified(KITX_ENDPOINT_PATH, "Combine"),
            operation_name: imports.qualified(KITX_ENDPOINT_PATH, "OperationNameMiddleware"),
            trace: imports.qualified(KIT_OC_PATH, "TraceEndpoint"),
        }
    }
}

/// Renders `T{K: V}` for at most one pair, otherwise a multi-line literal.
fn literal(type_name: &str, pairs: &[(String, String)], indent: &str) -> String {
    match pairs {
        [] => format!("{type_name}{{}}"),
        [(key, value)] => format!("{type_name}{{{key}: {value}}}"),
        _ => keyed_literal(type_name, pairs, indent),
    }
}

/// Renders one endpoint set.
fn render_set(
    body: &mut String,
    imports: &Imports,
    seen: &mut BTreeSet<String>,
    set: &EndpointSet,
) -> Result<(), SynthesisError> {
    let names = Names::new(imports);
    let base = &set.base_name;
    let endpoints = format!("{base}Endpoints");
    let make_endpoints = format!("Make{base}Endpoints");
    claim_identifier(seen, &endpoints)?;
    claim_identifier(seen, &make_endpoints)?;
    let service_type = imports.type_name(&set.service.type_ref());
    let methods = &set.service.methods;
    for method in methods {
        ensure_identifier(&method.name)?;
    }

    let fields: Vec<(String, String)> =
        methods.iter().map(|method| (method.name.clone(), names.endpoint.clone())).collect();
    let _ = write!(
        body,
        "\n// {endpoints} collects all of the endpoints that compose the underlying service. It's\n\
         // meant to be used as a helper struct, to collect all of the endpoints into a\n\
         // single parameter.\n\
         type {endpoints} {}\n",
        struct_fields(&fields),
    );

    let _ = write!(
        body,
        "\n// {make_endpoints} returns a(n) {endpoints} struct where each endpoint invokes\n\
         // the corresponding method on the provided service.\n\
         func {make_endpoints}(service {service_type}, middleware ...{middleware}) {endpoints} {{\n",
        middleware = names.middleware,
    );
    if methods.is_empty() {
        let _ = writeln!(body, "\treturn {endpoints}{{}}");
    } else {
        let pairs: Vec<(String, String)> = methods
            .iter()
            .map(|method| {
                (
                    method.name.clone(),
                    format!(
                        "{}({})(mw(Make{base}{}Endpoint(service)))",
                        names.operation_name,
                        quote(&set.operation_name(&method.name)),
                        method.name,
                    ),
                )
            })
            .collect();
        let _ = write!(
            body,
            "\tmw := {}(middleware...)\n\n\treturn {}\n",
            names.combine,
            literal(&endpoints, &pairs, "\t"),
        );
    }
    body.push_str("}\n");

    if set.with_open_census {
        let trace_endpoints = format!("Trace{base}Endpoints");
        claim_identifier(seen, &trace_endpoints)?;
        let pairs: Vec<(String, String)> = methods
            .iter()
            .map(|method| {
                (
                    method.name.clone(),
                    format!(
                        "{}({})(endpoints.{})",
                        names.trace,
                        quote(&set.operation_name(&method.name)),
                        method.name,
                    ),
                )
            })
            .collect();
        let _ = write!(
            body,
            "\n// {trace_endpoints} returns a(n) {endpoints} struct where each endpoint is wrapped with a tracing middleware.\n\
             func {trace_endpoints}(endpoints {endpoints}) {endpoints} {{\n\
             \treturn {}\n\
             }}\n",
            literal(&endpoints, &pairs, "\t"),
        );
    }

    for method in methods {
        render_method(body, imports, &names, seen, set, &service_type, method)?;
    }
    Ok(())
}

/// Renders the request, response, and factory of one method.
fn render_method(
    body: &mut String,
    imports: &Imports,
    names: &Names,
    seen: &mut BTreeSet<String>,
    set: &EndpointSet,
    service_type: &str,
    method: &ServiceMethod,
) -> Result<(), SynthesisError> {
    let base = &set.base_name;
    let name = &method.name;
    let request = format!("{base}{name}Request");
    let response = format!("{base}{name}Response");
    let factory = format!("Make{base}{name}Endpoint");
    claim_identifier(seen, &request)?;
    claim_identifier(seen, &response)?;
    claim_identifier(seen, &factory)?;

    let request_fields = field_names(&method.request_parameters, 'P', &[]);
    let response_fields = field_names(&method.response_parameters, 'R', &["Err"]);

    let request_struct: Vec<(String, String)> = request_fields
        .iter()
        .zip(&method.request_parameters)
        .map(|(field, argument)| (field.clone(), imports.render_type(&argument.ty)))
        .collect();
    let mut response_struct: Vec<(String, String)> = response_fields
        .iter()
        .zip(&method.response_parameters)
        .map(|(field, argument)| (field.clone(), imports.render_type(&argument.ty)))
        .collect();
    response_struct.push(("Err".to_string(), "error".to_string()));

    let _ = write!(
        body,
        "\n// {request} is a request struct for {name} endpoint.\n\
         type {request} {}\n\n\
         // {response} is a response struct for {name} endpoint.\n\
         type {response} {}\n\n\
         func (r {response}) Failed() error {{\n\
         \treturn r.Err\n\
         }}\n\n\
         // {factory} returns an endpoint for the matching method of the underlying service.\n\
         func {factory}(service {service_type}) {endpoint} {{\n\
         \treturn func(ctx {ctx}, request interface{{}}) (interface{{}}, error) {{\n",
        struct_fields(&request_struct),
        struct_fields(&response_struct),
        endpoint = names.endpoint,
        ctx = names.ctx,
    );

    let mut call_args = vec!["ctx".to_string()];
    if !request_fields.is_empty() {
        let _ = writeln!(body, "\t\treq := request.({request})\n");
        call_args.extend(request_fields.iter().map(|field| format!("req.{field}")));
    }
    let mut results: Vec<String> =
        (0 .. response_fields.len()).map(|index| format!("r{index}")).collect();
    results.push("err".to_string());
    let _ = writeln!(
        body,
        "\t\t{} := service.{name}({})\n",
        results.join(", "),
        call_args.join(", "),
    );

    let mut success: Vec<(String, String)> = response_fields
        .iter()
        .enumerate()
        .map(|(index, field)| (field.clone(), format!("r{index}")))
        .collect();
    success.sort();
    let mut failure = success.clone();
    failure.push(("Err".to_string(), "err".to_string()));
    failure.sort();

    body.push_str("\t\tif err != nil {\n");
    match set.error_strategy {
        ErrorStrategy::Endpoint => {
            let _ = write!(
                body,
                "\t\t\tif endpointErr := endpointError(nil); {errors_as}(err, &endpointErr) && endpointErr.EndpointError() {{\n\
                 \t\t\t\treturn {}, err\n\
                 \t\t\t}}\n\n\
                 \t\t\treturn {}, nil\n",
                literal(&response, &failure, "\t\t\t\t"),
                literal(&response, &failure, "\t\t\t"),
                errors_as = names.errors_as,
            );
        }
        ErrorStrategy::Service => {
            let _ = write!(
                body,
                "\t\t\tif serviceErr := serviceError(nil); {errors_as}(err, &serviceErr) && serviceErr.ServiceError() {{\n\
                 \t\t\t\treturn {}, nil\n\
                 \t\t\t}}\n\n\
                 \t\t\treturn nil, err\n",
                literal(&response, &failure, "\t\t\t\t"),
                errors_as = names.errors_as,
            );
        }
    }
    let _ = write!(
        body,
        "\t\t}}\n\n\
         \t\treturn {}, nil\n\
         \t}}\n\
         }}\n",
        literal(&response, &success, "\t\t"),
    );
    Ok(())
}

// ============================================================================
// SECTION: Generator
// ============================================================================

/// Generator for `+kit:endpoint` service interfaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct EndpointGenerator;

impl Generator for EndpointGenerator {
    fn name(&self) -> &'static str {
        "kit-endpoint"
    }

    fn register_markers(&self, registry: &mut MarkerRegistry) -> Result<(), MarkerError> {
        registry.register(marker_schema())
    }

    fn generate(&self, input: &GenerationInput<'_>) -> GeneratorOutput {
        let mut output = GeneratorOutput::default();
        let mut sets = Vec::new();
        for scanned in input.declarations {
            for options in scanned.markers_named(MARKER) {
                let declaration = scanned.declaration;
                match extract(declaration, input.root, options) {
                    Ok(set) => {
                        debug!(
                            declaration = %declaration.name,
                            methods = set.service.methods.len(),
                            "extracted endpoint set"
                        );
                        sets.push(set);
                    }
                    Err(source) => output.errors.push(GenerateError::Signature {
                        location: declaration.location(),
                        source,
                    }),
                }
            }
        }
        if sets.is_empty() {
            return output;
        }
        let file = GenerationFile {
            target_package: input.target.clone(),
            header_text: input.header_text.to_string(),
            artifacts: sets,
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

#[cfg(test)]
mod tests;
