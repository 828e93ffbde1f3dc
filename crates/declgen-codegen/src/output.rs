// crates/declgen-codegen/src/output.rs
// ============================================================================
// Module: Output Router
// Description: Output rules deciding where generated files are written.
// Purpose: Map (root, file name) pairs to scoped, atomically replaced sinks.
// Dependencies: declgen-core, tempfile, thiserror
// ============================================================================

//! ## Overview
//! An [`OutputRule`] is parsed from a short rule string using the same
//! argument syntax as markers:
//!
//! | Rule | Destination |
//! |---|---|
//! | `pkg` | the root's source directory |
//! | `subpkg[:prefix=,package=,suffix=]` | a child package of the source directory |
//! | `dir:path=<dir>` | a fixed directory |
//! | `stdout` | standard output |
//! | `none` | discarded |
//!
//! File sinks write into a temporary sibling and atomically replace the
//! destination on [`Sink::finish`]; a sink dropped before `finish` removes
//! its temporary file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use declgen_core::MarkerSchema;
use declgen_core::OptionSchema;
use declgen_core::OptionType;
use declgen_core::PackageRef;
use declgen_core::ResolvedRoot;
use declgen_core::markers::decode_marker;
use tempfile::NamedTempFile;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Output routing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The rule string is not a known rule or has invalid arguments.
    #[error("invalid output rule \"{rule}\": {message}")]
    InvalidRule {
        /// Rule as written.
        rule: String,
        /// Reason.
        message: String,
    },
    /// The rule writes next to sources but the root has no source directory.
    #[error("root {root}: cannot output to a package with no path on disk")]
    NoSourcePath {
        /// Root identifier.
        root: String,
    },
    /// Writing or reading an output file failed.
    #[error("{path}: {message}")]
    Io {
        /// File path.
        path: String,
        /// Underlying I/O error.
        message: String,
    },
    /// The on-disk file differs from the generated contents.
    #[error("{path}: generated file is out of date")]
    Drift {
        /// File path.
        path: String,
    },
}

// ============================================================================
// SECTION: Rules
// ============================================================================

/// Where generated files go.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputRule {
    /// Next to the root's sources, in the same package.
    #[default]
    Package,
    /// In a child directory holding a new package named
    /// `<prefix><package or root package name><suffix>`.
    Subpackage {
        /// Prepended to the package name.
        prefix: String,
        /// Replaces the root package name when non-empty.
        package: String,
        /// Appended to the package name.
        suffix: String,
    },
    /// Into a fixed directory, keeping the root's package.
    Directory(PathBuf),
    /// To standard output.
    Stdout,
    /// Nowhere.
    Nothing,
}

/// Builds the argument schema of a rule name.
fn rule_schema(name: &str) -> Option<MarkerSchema> {
    let schema = MarkerSchema::new(name, "output rule");
    match name {
        "pkg" | "stdout" | "none" => Some(schema),
        "subpkg" => Some(
            schema
                .with_option(OptionSchema::new("prefix", OptionType::String, "package name prefix"))
                .with_option(OptionSchema::new("package", OptionType::String, "package name"))
                .with_option(OptionSchema::new("suffix", OptionType::String, "package name suffix")),
        ),
        "dir" => Some(
            schema.with_option(
                OptionSchema::new("path", OptionType::String, "output directory").required(),
            ),
        ),
        _ => None,
    }
}

impl OutputRule {
    /// Parses a rule string.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidRule`] for unknown rules and invalid or
    /// missing arguments.
    pub fn parse(rule: &str) -> Result<Self, RouteError> {
        let trimmed = rule.trim();
        let invalid = |message: String| RouteError::InvalidRule {
            rule: rule.to_string(),
            message,
        };
        let name = trimmed.split(':').next().unwrap_or(trimmed);
        let schema = rule_schema(name).ok_or_else(|| invalid("unknown rule".to_string()))?;
        let options =
            decode_marker(&format!("+{trimmed}"), &schema).map_err(|err| invalid(err.to_string()))?;
        let text = |key: &str| options.get_str(key).unwrap_or_default().to_string();
        Ok(match name {
            "subpkg" => Self::Subpackage {
                prefix: text("prefix"),
                package: text("package"),
                suffix: text("suffix"),
            },
            "dir" => {
                let path = text("path");
                if path.is_empty() {
                    return Err(invalid("path must not be empty".to_string()));
                }
                Self::Directory(PathBuf::from(path))
            }
            "stdout" => Self::Stdout,
            "none" => Self::Nothing,
            _ => Self::Package,
        })
    }

    /// Returns the package generated files for `root` belong to.
    #[must_use]
    pub fn package_ref(&self, root: &ResolvedRoot) -> PackageRef {
        match self {
            Self::Subpackage {
                ..
            } => {
                let name = self.subpackage_name(&root.package);
                PackageRef::new(name.clone(), format!("{}/{name}", root.package.path))
            }
            _ => root.package.clone(),
        }
    }

    /// Returns the subpackage name for `package`, or its own name otherwise.
    fn subpackage_name(&self, package: &PackageRef) -> String {
        match self {
            Self::Subpackage {
                prefix,
                package: replacement,
                suffix,
            } => {
                let base = if replacement.is_empty() { &package.name } else { replacement };
                format!("{prefix}{base}{suffix}")
            }
            _ => package.name.clone(),
        }
    }

    /// Returns the file path for `item`, or `None` for non-file rules.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::NoSourcePath`] when a package rule meets a root
    /// without a source directory.
    pub fn destination(&self, root: &ResolvedRoot, item: &str) -> Result<Option<PathBuf>, RouteError> {
        let source_dir = || {
            root.source_dir.as_deref().ok_or_else(|| RouteError::NoSourcePath {
                root: root.root.clone(),
            })
        };
        Ok(match self {
            Self::Package => Some(source_dir()?.join(item)),
            Self::Subpackage {
                ..
            } => Some(source_dir()?.join(self.subpackage_name(&root.package)).join(item)),
            Self::Directory(dir) => Some(dir.join(item)),
            Self::Stdout | Self::Nothing => None,
        })
    }

    /// Opens a sink for `item` of `root`.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError`] when the destination cannot be resolved or its
    /// directory cannot be prepared.
    pub fn open(&self, root: &ResolvedRoot, item: &str) -> Result<Sink, RouteError> {
        let kind = match (self, self.destination(root, item)?) {
            (_, Some(destination)) => {
                let dir = destination.parent().unwrap_or_else(|| Path::new("."));
                fs::create_dir_all(dir).map_err(|err| io_error(dir, &err))?;
                let temp = NamedTempFile::new_in(dir).map_err(|err| io_error(dir, &err))?;
                SinkKind::File {
                    temp,
                    destination,
                }
            }
            (Self::Stdout, None) => SinkKind::Stdout {
                buffer: Vec::new(),
            },
            (_, None) => SinkKind::Discard,
        };
        Ok(Sink {
            kind,
        })
    }

    /// Compares `contents` with the file `item` would be written to.
    ///
    /// Non-file rules have nothing to compare against and always pass.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Drift`] when the file is missing or differs, and
    /// [`RouteError::Io`] when it cannot be read.
    pub fn verify(&self, root: &ResolvedRoot, item: &str, contents: &str) -> Result<(), RouteError> {
        let Some(destination) = self.destination(root, item)? else {
            return Ok(());
        };
        match fs::read(&destination) {
            Ok(existing) if existing == contents.as_bytes() => Ok(()),
            Ok(_) => Err(RouteError::Drift {
                path: destination.display().to_string(),
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(RouteError::Drift {
                path: destination.display().to_string(),
            }),
            Err(err) => Err(io_error(&destination, &err)),
        }
    }
}

/// Builds an [`RouteError::Io`] for `path`.
fn io_error(path: &Path, err: &io::Error) -> RouteError {
    RouteError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// A scoped writer for one generated file.
#[derive(Debug)]
pub struct Sink {
    /// Backing destination.
    kind: SinkKind,
}

/// Backing destination of a [`Sink`].
#[derive(Debug)]
enum SinkKind {
    /// Temporary sibling persisted over the destination on finish.
    File {
        /// Temporary file, removed on drop unless persisted.
        temp: NamedTempFile,
        /// Final path.
        destination: PathBuf,
    },
    /// Buffered standard output, flushed as one write on finish.
    Stdout {
        /// Pending bytes.
        buffer: Vec<u8>,
    },
    /// Discarded output.
    Discard,
}

impl Sink {
    /// Commits the written contents.
    ///
    /// Returns the written path for file sinks.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Io`] when flushing or replacing fails.
    pub fn finish(self) -> Result<Option<PathBuf>, RouteError> {
        match self.kind {
            SinkKind::File {
                mut temp,
                destination,
            } => {
                temp.flush().map_err(|err| io_error(&destination, &err))?;
                temp.persist(&destination).map_err(|err| io_error(&destination, &err.error))?;
                Ok(Some(destination))
            }
            SinkKind::Stdout {
                buffer,
            } => {
                let stdout = Path::new("<stdout>");
                let mut handle = io::stdout().lock();
                handle.write_all(&buffer).map_err(|err| io_error(stdout, &err))?;
                handle.flush().map_err(|err| io_error(stdout, &err))?;
                Ok(None)
            }
            SinkKind::Discard => Ok(None),
        }
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.kind {
            SinkKind::File {
                temp, ..
            } => temp.write(buf),
            SinkKind::Stdout {
                buffer,
            } => buffer.write(buf),
            SinkKind::Discard => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.kind {
            SinkKind::File {
                temp, ..
            } => temp.flush(),
            SinkKind::Stdout {
                ..
            }
            | SinkKind::Discard => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
