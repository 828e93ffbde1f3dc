// crates/declgen-core/src/markers.rs
// ============================================================================
// Module: Marker Registry
// Description: Marker option schemas, registration, and argument decoding.
// Purpose: Recognize `+namespace:name[:key=value,...]` annotations.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! A marker is a structured annotation line placed immediately above a
//! declaration, for example `+kit:endpoint:baseName=Todo,withOpenCensus`.
//! Each generator registers a [`MarkerSchema`] describing the marker name and
//! its typed options; the [`MarkerRegistry`] matches raw marker lines against
//! registered names and decodes their arguments into [`MarkerOptions`].
//!
//! The registry is an explicit value owned by one pipeline run. It is
//! additive only and shared read-only once generation starts.
//!
//! Invariants:
//! - Marker names are unique within a registry.
//! - A raw marker matches the longest registered name that equals its body or
//!   is followed by `:`.
//! - Decoded options contain every key with a default or an explicit value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while registering marker schemas.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkerError {
    /// A schema with the same marker name is already registered.
    #[error("marker {0} is already registered")]
    DuplicateMarker(String),
}

/// Errors raised while decoding marker arguments.
///
/// # Invariants
/// - Every variant names the marker being decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The argument key is not declared by the schema.
    #[error("marker {marker}: unknown option \"{key}\"")]
    UnknownKey {
        /// Marker name.
        marker: String,
        /// Offending key.
        key: String,
    },
    /// The argument value does not parse as the declared type.
    #[error("marker {marker}: option \"{key}\" expects {expected}, got \"{value}\"")]
    InvalidValue {
        /// Marker name.
        marker: String,
        /// Option key.
        key: String,
        /// Declared option type.
        expected: OptionType,
        /// Raw value text.
        value: String,
    },
    /// A required option is absent.
    #[error("marker {marker}: missing required option \"{key}\"")]
    MissingKey {
        /// Marker name.
        marker: String,
        /// Missing key.
        key: String,
    },
    /// The same key appears more than once.
    #[error("marker {marker}: duplicate option \"{key}\"")]
    DuplicateKey {
        /// Marker name.
        marker: String,
        /// Repeated key.
        key: String,
    },
    /// The argument list cannot be tokenized.
    #[error("marker {marker}: malformed arguments: {message}")]
    Malformed {
        /// Marker name.
        marker: String,
        /// Description of the syntax problem.
        message: String,
    },
}

// ============================================================================
// SECTION: Schemas
// ============================================================================

/// Declared type of a marker option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    /// `true` or `false`; a bare key means `true`.
    Bool,
    /// Bare or double-quoted string.
    String,
    /// Signed 64-bit integer.
    Int,
}

impl fmt::Display for OptionType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Bool => "bool",
            Self::String => "string",
            Self::Int => "int",
        })
    }
}

/// Decoded option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// Boolean value.
    Bool(bool),
    /// String value.
    String(String),
    /// Integer value.
    Int(i64),
}

impl OptionValue {
    /// Returns the declared type this value satisfies.
    #[must_use]
    pub const fn option_type(&self) -> OptionType {
        match self {
            Self::Bool(_) => OptionType::Bool,
            Self::String(_) => OptionType::String,
            Self::Int(_) => OptionType::Int,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(formatter, "{value}"),
            Self::String(value) => write!(formatter, "\"{value}\""),
            Self::Int(value) => write!(formatter, "{value}"),
        }
    }
}

/// Schema entry for one marker option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSchema {
    /// Option key as written in markers.
    pub key: String,
    /// Declared value type.
    pub ty: OptionType,
    /// True when the option must be present.
    pub required: bool,
    /// Value used when the option is absent.
    pub default: Option<OptionValue>,
    /// One-line help text.
    pub help: String,
}

impl OptionSchema {
    /// Creates an optional option without a default.
    #[must_use]
    pub fn new(key: impl Into<String>, ty: OptionType, help: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ty,
            required: false,
            default: None,
            help: help.into(),
        }
    }

    /// Creates a boolean flag defaulting to `false`.
    #[must_use]
    pub fn flag(key: impl Into<String>, help: impl Into<String>) -> Self {
        Self::new(key, OptionType::Bool, help).with_default(OptionValue::Bool(false))
    }

    /// Marks the option as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the value used when the option is absent.
    #[must_use]
    pub fn with_default(mut self, value: OptionValue) -> Self {
        self.default = Some(value);
        self
    }
}

/// Schema describing one marker.
///
/// # Invariants
/// - Option keys are unique and kept in declaration order for help output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSchema {
    /// Marker name without the leading `+`, e.g. `kit:endpoint`.
    pub name: String,
    /// One-line help text.
    pub help: String,
    /// Options in declaration order.
    pub options: Vec<OptionSchema>,
}

impl MarkerSchema {
    /// Creates a schema without options.
    #[must_use]
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            options: Vec::new(),
        }
    }

    /// Appends an option schema.
    #[must_use]
    pub fn with_option(mut self, option: OptionSchema) -> Self {
        self.options.push(option);
        self
    }

    /// Returns the schema for `key`.
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&OptionSchema> {
        self.options.iter().find(|option| option.key == key)
    }

    /// Renders a help line such as `+kit:endpoint[:baseName=<string>,...]`.
    #[must_use]
    pub fn usage(&self) -> String {
        if self.options.is_empty() {
            return format!("+{}", self.name);
        }
        let args: Vec<String> =
            self.options.iter().map(|option| format!("{}=<{}>", option.key, option.ty)).collect();
        format!("+{}[:{}]", self.name, args.join(","))
    }
}

// ============================================================================
// SECTION: Decoded Options
// ============================================================================

/// Decoded arguments of one marker occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerOptions {
    /// Name of the matched marker.
    marker: String,
    /// Values keyed by option key.
    values: BTreeMap<String, OptionValue>,
}

impl MarkerOptions {
    /// Creates an option set with no values.
    #[must_use]
    pub fn empty(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            values: BTreeMap::new(),
        }
    }

    /// Sets a value, replacing any previous one.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: OptionValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Returns the name of the matched marker.
    #[must_use]
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Returns the raw value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.values.get(key)
    }

    /// Returns a boolean option; absent or non-boolean values read as `false`.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(OptionValue::Bool(true)))
    }

    /// Returns a string option.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(OptionValue::String(value)) => Some(value),
            _ => None,
        }
    }

    /// Returns an integer option.
    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some(OptionValue::Int(value)) => Some(*value),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Maps marker names to option schemas.
#[derive(Debug, Clone, Default)]
pub struct MarkerRegistry {
    /// Registered schemas keyed by marker name.
    schemas: BTreeMap<String, MarkerSchema>,
}

impl MarkerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a marker schema.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerError::DuplicateMarker`] when the name is taken.
    pub fn register(&mut self, schema: MarkerSchema) -> Result<(), MarkerError> {
        if self.schemas.contains_key(&schema.name) {
            return Err(MarkerError::DuplicateMarker(schema.name));
        }
        self.schemas.insert(schema.name.clone(), schema);
        Ok(())
    }

    /// Returns the schema registered under `name`.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&MarkerSchema> {
        self.schemas.get(name)
    }

    /// Iterates registered schemas ordered by name.
    pub fn schemas(&self) -> impl Iterator<Item = &MarkerSchema> {
        self.schemas.values()
    }

    /// Returns true when no schema is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Matches a raw marker line against registered names.
    ///
    /// Returns `None` for lines that are not markers or whose name is not
    /// registered.
    #[must_use]
    pub fn match_marker(&self, raw: &str) -> Option<&MarkerSchema> {
        let body = marker_body(raw)?;
        self.schemas
            .values()
            .filter(|schema| name_matches(body, &schema.name))
            .max_by_key(|schema| schema.name.len())
    }

    /// Decodes a raw marker line against `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] for unknown keys, ill-typed values, missing
    /// required keys, duplicate keys, or malformed argument syntax.
    pub fn decode(&self, raw: &str, schema: &MarkerSchema) -> Result<MarkerOptions, DecodeError> {
        decode_marker(raw, schema)
    }
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Strips comment slashes and the leading `+` from a marker line.
#[must_use]
pub fn marker_body(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix("//").map_or(trimmed, str::trim_start);
    trimmed.strip_prefix('+').map(str::trim_end)
}

/// Returns true when `name` is the marker body or a `:`-delimited prefix of it.
fn name_matches(body: &str, name: &str) -> bool {
    body.strip_prefix(name).is_some_and(|rest| rest.is_empty() || rest.starts_with(':'))
}

/// Decodes a marker line against a schema.
///
/// # Errors
///
/// See [`MarkerRegistry::decode`].
pub fn decode_marker(raw: &str, schema: &MarkerSchema) -> Result<MarkerOptions, DecodeError> {
    let malformed = |message: &str| DecodeError::Malformed {
        marker: schema.name.clone(),
        message: message.to_string(),
    };
    let body = marker_body(raw).ok_or_else(|| malformed("marker must start with '+'"))?;
    let rest = body
        .strip_prefix(schema.name.as_str())
        .filter(|rest| rest.is_empty() || rest.starts_with(':'))
        .ok_or_else(|| malformed("marker name does not match schema"))?;
    let args = rest.strip_prefix(':').unwrap_or(rest);

    let mut options = MarkerOptions::empty(schema.name.clone());
    for (key, value) in split_arguments(args).map_err(|message| malformed(&message))? {
        let option = schema.option(&key).ok_or_else(|| DecodeError::UnknownKey {
            marker: schema.name.clone(),
            key: key.clone(),
        })?;
        if options.values.contains_key(&key) {
            return Err(DecodeError::DuplicateKey {
                marker: schema.name.clone(),
                key,
            });
        }
        let decoded = parse_value(option.ty, value.as_ref()).ok_or_else(|| {
            DecodeError::InvalidValue {
                marker: schema.name.clone(),
                key: key.clone(),
                expected: option.ty,
                value: value.clone().map(RawValue::into_text).unwrap_or_default(),
            }
        })?;
        options.values.insert(key, decoded);
    }

    for option in &schema.options {
        if options.values.contains_key(&option.key) {
            continue;
        }
        if option.required {
            return Err(DecodeError::MissingKey {
                marker: schema.name.clone(),
                key: option.key.clone(),
            });
        }
        if let Some(default) = &option.default {
            options.values.insert(option.key.clone(), default.clone());
        }
    }
    Ok(options)
}

/// Argument value as written, keeping track of quoting.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RawValue {
    /// Unquoted text.
    Bare(String),
    /// Text from a double-quoted literal with escapes resolved.
    Quoted(String),
}

impl RawValue {
    /// Returns the value text.
    fn into_text(self) -> String {
        match self {
            Self::Bare(text) | Self::Quoted(text) => text,
        }
    }
}

/// Parses a raw value as `ty`; `None` value means a bare key.
fn parse_value(ty: OptionType, value: Option<&RawValue>) -> Option<OptionValue> {
    match (ty, value) {
        (OptionType::Bool, None) => Some(OptionValue::Bool(true)),
        (OptionType::Bool, Some(RawValue::Bare(text))) => match text.as_str() {
            "true" => Some(OptionValue::Bool(true)),
            "false" => Some(OptionValue::Bool(false)),
            _ => None,
        },
        (OptionType::String, Some(RawValue::Bare(text) | RawValue::Quoted(text))) => {
            Some(OptionValue::String(text.clone()))
        }
        (OptionType::Int, Some(RawValue::Bare(text))) => text.parse().ok().map(OptionValue::Int),
        _ => None,
    }
}

/// Splits `key=value,key2,key3="a,b"` into key/value pairs.
fn split_arguments(args: &str) -> Result<Vec<(String, Option<RawValue>)>, String> {
    let mut pairs = Vec::new();
    if args.trim().is_empty() {
        return Ok(pairs);
    }
    let mut chars = args.chars().peekable();
    loop {
        let mut key = String::new();
        while let Some(&ch) = chars.peek() {
            if ch == '=' || ch == ',' {
                break;
            }
            key.push(ch);
            chars.next();
        }
        let key = key.trim().to_string();
        if key.is_empty() {
            return Err("empty option key".to_string());
        }
        if key.chars().any(|ch| !(ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')) {
            return Err(format!("invalid option key \"{key}\""));
        }
        let value = if chars.peek() == Some(&'=') {
            chars.next();
            Some(read_value(&mut chars)?)
        } else {
            None
        };
        pairs.push((key, value));
        match chars.next() {
            None => break,
            Some(',') => {}
            Some(other) => return Err(format!("unexpected character {other}")),
        }
    }
    Ok(pairs)
}

/// Reads one bare or quoted value, stopping before the next `,`.
fn read_value(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<RawValue, String> {
    if chars.peek() != Some(&'"') {
        let mut text = String::new();
        while let Some(&ch) = chars.peek() {
            if ch == ',' {
                break;
            }
            text.push(ch);
            chars.next();
        }
        return Ok(RawValue::Bare(text.trim().to_string()));
    }
    chars.next();
    let mut text = String::new();
    loop {
        match chars.next() {
            None => return Err("unterminated string".to_string()),
            Some('"') => break,
            Some('\\') => match chars.next() {
                Some(escaped @ ('"' | '\\')) => text.push(escaped),
                Some('n') => text.push('\n'),
                Some('t') => text.push('\t'),
                Some(other) => return Err(format!("unknown escape \\{other}")),
                None => return Err("unterminated string".to_string()),
            },
            Some(ch) => text.push(ch),
        }
    }
    while chars.peek().is_some_and(|ch| ch.is_whitespace()) {
        chars.next();
    }
    Ok(RawValue::Quoted(text))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
