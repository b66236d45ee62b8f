//! Error types for Armory.
//!
//! Module-level failures are described by [`ModuleError`]; this module wraps
//! them together with configuration and serialization failures into the
//! crate-wide [`Error`] used by the CLI.

use crate::modules::ModuleError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Armory operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Armory.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Module Errors
    // ========================================================================
    /// Module not found.
    #[error("Module '{0}' not found")]
    ModuleNotFound(String),

    /// Error raised by a module.
    #[error(transparent)]
    Module(#[from] ModuleError),

    /// Malformed `name=value` argument.
    #[error("Invalid parameter assignment '{0}', expected name=value")]
    InvalidAssignment(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // IO Errors
    // ========================================================================
    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // ========================================================================
    // Other Errors
    // ========================================================================
    /// Generic error with source.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Returns true if the caller can retry with corrected input.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InvalidAssignment(_) | Error::Module(ModuleError::Validation { .. })
        )
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Module(ModuleError::CommandFailed { result }) if result.rc > 0 => result.rc,
            Error::Module(ModuleError::Validation { .. }) | Error::InvalidAssignment(_) => 2,
            Error::Module(
                ModuleError::DependencyConflict(_)
                | ModuleError::DependencyInstallFailure(_)
                | ModuleError::DependencyCheck(_),
            ) => 3,
            Error::Module(ModuleError::Timeout { .. } | ModuleError::Cancelled) => 124,
            Error::InvalidConfig { .. }
            | Error::YamlParse(_)
            | Error::JsonParse(_)
            | Error::TomlParse(_) => 4,
            Error::ModuleNotFound(_) | Error::Module(ModuleError::NotFound(_)) => 5,
            _ => 1,
        }
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Adds context with a closure that is only evaluated on error.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Other {
            message: message.into(),
            source: Some(Box::new(e)),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::Other {
            message: f().into(),
            source: Some(Box::new(e)),
        })
    }
}
