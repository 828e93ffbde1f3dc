// crates/declgen-config/src/config.rs
// ============================================================================
// Module: declgen Configuration
// Description: Configuration loading and validation for declgen runs.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: declgen-codegen, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The file is located through an explicit path, then [`CONFIG_ENV_VAR`],
//! then `./declgen.toml`; when none applies the built-in defaults are used.
//! An explicitly named file that is missing is an error.
//!
//! Relative paths inside the file (roots, header file) are interpreted
//! against the working directory, the same way command-line paths are.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use declgen_codegen::GeneratorKind;
use declgen_codegen::OutputRule;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "declgen.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "DECLGEN_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of configured roots.
pub const MAX_ROOTS: usize = 4096;
/// Maximum worker threads.
pub const MAX_JOBS: usize = 256;
/// Maximum length of the year substitution text.
const MAX_YEAR_LENGTH: usize = 32;
/// Accepted `[logging].level` values.
pub const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

// ============================================================================
// SECTION: Model
// ============================================================================

/// Top-level `declgen.toml` model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclgenConfig {
    /// Generation settings.
    #[serde(default)]
    pub generate: GenerateConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// File the configuration was loaded from; `None` for defaults.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// `[generate]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateConfig {
    /// Compilation roots processed when none are given on the command line.
    #[serde(default)]
    pub roots: Vec<String>,
    /// Generator kinds; empty selects every built-in kind.
    #[serde(default)]
    pub kinds: Vec<String>,
    /// Output rule text, for example `pkg` or `subpkg:suffix=mocks`.
    #[serde(default)]
    pub output: Option<String>,
    /// Header file prepended to generated files.
    #[serde(default)]
    pub header_file: Option<PathBuf>,
    /// Year substituted into the header.
    #[serde(default)]
    pub year: Option<String>,
    /// Worker threads.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            kinds: Vec::new(),
            output: None,
            header_file: None,
            year: None,
            jobs: default_jobs(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default log level, one of [`LOG_LEVELS`].
    #[serde(default)]
    pub level: Option<String>,
}

/// Default worker count.
const fn default_jobs() -> usize {
    1
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl DeclgenConfig {
    /// Loads configuration from `path`, the environment, or the default
    /// location, falling back to built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a located file cannot be read, parsed, or
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = env::var_os(CONFIG_ENV_VAR);
        match locate(path, env_path, Path::new(DEFAULT_CONFIG_NAME))? {
            Some(resolved) => Self::load_file(&resolved),
            None => Ok(Self::default()),
        }
    }

    /// Loads and validates one configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is missing, oversized, not
    /// UTF-8, malformed, or invalid.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml_str(content)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::Invalid`] for values that fail validation.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.generate.validate()?;
        self.logging.validate()
    }
}

impl GenerateConfig {
    /// Validates the generation settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.roots.len() > MAX_ROOTS {
            return Err(ConfigError::Invalid(format!(
                "generate.roots exceeds {MAX_ROOTS} entries"
            )));
        }
        for root in &self.roots {
            validate_path_string("generate.roots", root)?;
        }
        self.generator_kinds()?;
        self.output_rule()?;
        if let Some(header) = &self.header_file {
            validate_path_string("generate.header_file", &header.to_string_lossy())?;
        }
        if let Some(year) = &self.year {
            if year.len() > MAX_YEAR_LENGTH {
                return Err(ConfigError::Invalid("generate.year exceeds max length".to_string()));
            }
            if year.chars().any(char::is_control) {
                return Err(ConfigError::Invalid(
                    "generate.year must not contain control characters".to_string(),
                ));
            }
        }
        if self.jobs == 0 || self.jobs > MAX_JOBS {
            return Err(ConfigError::Invalid(format!(
                "generate.jobs must be between 1 and {MAX_JOBS}"
            )));
        }
        Ok(())
    }

    /// Returns the selected generator kinds; an empty list selects all.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unknown kind names.
    pub fn generator_kinds(&self) -> Result<Vec<GeneratorKind>, ConfigError> {
        if self.kinds.is_empty() {
            return Ok(GeneratorKind::ALL.to_vec());
        }
        self.kinds
            .iter()
            .map(|kind| {
                kind.parse::<GeneratorKind>()
                    .map_err(|err| ConfigError::Invalid(format!("generate.kinds: {err}")))
            })
            .collect()
    }

    /// Returns the parsed output rule; unset means [`OutputRule::Package`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the rule text does not parse.
    pub fn output_rule(&self) -> Result<OutputRule, ConfigError> {
        self.output.as_deref().map_or(Ok(OutputRule::Package), |rule| {
            OutputRule::parse(rule)
                .map_err(|err| ConfigError::Invalid(format!("generate.output: {err}")))
        })
    }
}

impl LoggingConfig {
    /// Validates the logging settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(level) = &self.level
            && !LOG_LEVELS.contains(&level.as_str())
        {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Picks the config file from the explicit path, the environment value, or
/// `fallback` when it exists. `None` means built-in defaults.
fn locate(
    explicit: Option<&Path>,
    env_value: Option<OsString>,
    fallback: &Path,
) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = explicit {
        return Ok(Some(path.to_path_buf()));
    }
    if let Some(value) = env_value.filter(|value| !value.is_empty()) {
        if value.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(Some(PathBuf::from(value)));
    }
    Ok(fallback.is_file().then(|| fallback.to_path_buf()))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
