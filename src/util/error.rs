// LitmusLog - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// All errors preserve the causal chain for diagnostic logging.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all LitmusLog operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum LitmusError {
    /// Command-line arguments were missing or invalid.
    Usage(UsageError),

    /// File discovery failed.
    Discovery(DiscoveryError),

    /// An external tool could not be started or exited unsuccessfully.
    Dispatch(DispatchError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for LitmusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage(e) => write!(f, "Usage error: {e}"),
            Self::Discovery(e) => write!(f, "Discovery error: {e}"),
            Self::Dispatch(e) => write!(f, "Stage failed: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for LitmusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Usage(e) => Some(e),
            Self::Discovery(e) => Some(e),
            Self::Dispatch(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl LitmusError {
    /// Shorthand for an I/O error tagged with the failing operation.
    pub fn io(path: impl Into<PathBuf>, operation: &'static str, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            operation,
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Usage errors
// ---------------------------------------------------------------------------

/// Errors in the command line that clap cannot catch on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// A required positional argument was not given.
    MissingArgument { name: &'static str },

    /// A positional argument is not one of the accepted literals.
    InvalidChoice {
        name: &'static str,
        value: String,
        expected: &'static [&'static str],
    },
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingArgument { name } => write!(f, "missing required argument <{name}>"),
            Self::InvalidChoice {
                name,
                value,
                expected,
            } => write!(
                f,
                "invalid value '{value}' for <{name}>; expected one of: {}",
                expected.join(", ")
            ),
        }
    }
}

impl std::error::Error for UsageError {}

impl From<UsageError> for LitmusError {
    fn from(e: UsageError) -> Self {
        Self::Usage(e)
    }
}

// ---------------------------------------------------------------------------
// Discovery errors
// ---------------------------------------------------------------------------

/// Errors related to input file discovery.
///
/// A directory that does not exist is not an error: discovery returns an
/// empty set and every dependent stage becomes a no-op.
#[derive(Debug)]
pub enum DiscoveryError {
    /// The path exists but is not a directory.
    NotADirectory { path: PathBuf },

    /// A glob pattern failed to compile.
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },

    /// Walkdir traversal error on the directory itself.
    Traversal {
        path: PathBuf,
        source: walkdir::Error,
    },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotADirectory { path } => {
                write!(f, "'{}' is not a directory", path.display())
            }
            Self::InvalidPattern { pattern, source } => {
                write!(f, "invalid glob pattern '{pattern}': {source}")
            }
            Self::Traversal { path, source } => {
                write!(f, "error traversing '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidPattern { source, .. } => Some(source),
            Self::Traversal { source, .. } => Some(source),
            Self::NotADirectory { .. } => None,
        }
    }
}

impl From<DiscoveryError> for LitmusError {
    fn from(e: DiscoveryError) -> Self {
        Self::Discovery(e)
    }
}

// ---------------------------------------------------------------------------
// Dispatch errors
// ---------------------------------------------------------------------------

/// Errors raised while running an external pipeline stage.
#[derive(Debug)]
pub enum DispatchError {
    /// The tool command prefix is empty.
    EmptyCommand { tool: &'static str },

    /// The process could not be spawned (missing binary, permissions).
    Spawn { command: String, source: io::Error },

    /// The process ran and exited unsuccessfully. `code` is `None` when it
    /// was terminated by a signal.
    Failed { command: String, code: Option<i32> },

    /// A stage implemented in-process (rewrite, gather) failed on I/O.
    Io {
        stage: &'static str,
        path: PathBuf,
        source: io::Error,
    },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCommand { tool } => {
                write!(f, "no command configured for tool '{tool}'")
            }
            Self::Spawn { command, source } => {
                write!(f, "could not start `{command}`: {source}")
            }
            Self::Failed {
                command,
                code: Some(code),
            } => write!(f, "`{command}` exited with status {code}"),
            Self::Failed {
                command,
                code: None,
            } => write!(f, "`{command}` was terminated by a signal"),
            Self::Io {
                stage,
                path,
                source,
            } => write!(f, "{stage} on '{}': {source}", path.display()),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<DispatchError> for LitmusError {
    fn from(e: DispatchError) -> Self {
        Self::Dispatch(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is not one of the accepted values.
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading the config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::InvalidValue {
                field,
                value,
                expected,
            } => write!(f, "Config '{field}' = '{value}' is invalid. Expected: {expected}"),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::InvalidValue { .. } => None,
        }
    }
}

impl From<ConfigError> for LitmusError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for LitmusLog results.
pub type Result<T> = std::result::Result<T, LitmusError>;
