//! Module system for Armory
//!
//! This module provides the core traits, types, and registry for Armory
//! modules. A module wraps one third-party command-line tool: it declares the
//! tool's parameters and how to validate them, where the tool and its
//! dependency manifests live, and is turned into a runnable [`ToolModule`].

pub mod command;
pub mod deps;
pub mod exec;
pub mod params;
pub mod rsactftool;
pub mod tool;
pub mod validation;

pub use command::{CommandSynthesizer, Invocation};
pub use deps::{DependencyResolver, Resolution, ResolverState};
pub use exec::{CommandResult, ExecuteOptions, LocalExecutor, ProcessExecutor};
pub use params::{ParamSpec, Parameter, ParameterStore, PASSTHROUGH_KEY};
pub use tool::ToolModule;
pub use validation::{AllowedValues, ValidationRegistry, Verdict};

use crate::config::Config;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during module execution
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Module not found: {0}")]
    NotFound(String),

    #[error("Invalid value for '{name}': {reason}")]
    Validation { name: String, reason: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Dependency conflict: {0}")]
    DependencyConflict(String),

    #[error("Dependency installation failed: {0}")]
    DependencyInstallFailure(String),

    #[error("Dependency check failed: {0}")]
    DependencyCheck(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// The tool ran and exited non-zero; its full output is kept
    #[error("Command failed with exit code {}: {}", .result.rc, .result.summary())]
    CommandFailed { result: CommandResult },

    #[error("Process timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Process was cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModuleError {
    /// Validation errors are recoverable: the caller may retry with a
    /// corrected value
    pub fn is_validation(&self) -> bool {
        matches!(self, ModuleError::Validation { .. })
    }
}

/// Result type for module operations
pub type ModuleResult<T> = Result<T, ModuleError>;

/// Status of a module run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStatus {
    /// The tool ran and exited successfully
    Ok,
    /// Nothing was executed (dry run)
    Skipped,
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleStatus::Ok => write!(f, "ok"),
            ModuleStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Result of a module run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleOutput {
    /// Human-readable message about what happened
    pub msg: String,
    /// Status of the run
    pub status: ModuleStatus,
    /// The argument vector that was (or would be) executed
    pub invocation: Vec<String>,
    /// Outcome of dependency resolution, absent on dry runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Resolution>,
    /// Standard output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    /// Standard error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    /// Return code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rc: Option<i32>,
}

impl ModuleOutput {
    /// Create a new successful output
    pub fn ok(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            status: ModuleStatus::Ok,
            invocation: Vec::new(),
            dependencies: None,
            stdout: None,
            stderr: None,
            rc: None,
        }
    }

    /// Create a skipped output
    pub fn skipped(msg: impl Into<String>) -> Self {
        Self {
            status: ModuleStatus::Skipped,
            ..Self::ok(msg)
        }
    }

    pub fn with_invocation(mut self, invocation: &Invocation) -> Self {
        self.invocation = invocation.tokens().to_vec();
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.dependencies = Some(resolution);
        self
    }

    /// Add stdout/stderr/rc of the executed tool
    pub fn with_command_output(mut self, result: CommandResult) -> Self {
        self.stdout = Some(result.stdout);
        self.stderr = Some(result.stderr);
        self.rc = Some(result.rc);
        self
    }
}

/// Files that make up a wrapped tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolLayout {
    /// Tool checkout directory
    pub dir: PathBuf,
    /// Entry script handed to the interpreter
    pub script: PathBuf,
    /// Required packages
    pub requirements: PathBuf,
    /// Extra packages installed only when repairing
    pub optional_requirements: Option<PathBuf>,
}

impl ToolLayout {
    /// Conventional layout: `<dir>/<script>`, `<dir>/requirements.txt` and
    /// `<dir>/optional-requirements.txt`
    pub fn conventional(dir: impl Into<PathBuf>, script: &str) -> Self {
        let dir = dir.into();
        Self {
            script: dir.join(script),
            requirements: dir.join("requirements.txt"),
            optional_requirements: Some(dir.join("optional-requirements.txt")),
            dir,
        }
    }
}

/// Trait that all module types must implement
///
/// A `Module` is the static description of a wrapped tool, shared by every
/// instance. Runtime state lives in [`ToolModule`].
pub trait Module: Send + Sync {
    /// Returns the name of the module
    fn name(&self) -> &'static str;

    /// Returns a description of what the module does
    fn description(&self) -> &'static str;

    /// Declared options, created unset in this order
    fn options(&self) -> &'static [ParamSpec];

    /// Validation policy for this module's parameters
    fn validation(&self) -> ValidationRegistry;

    /// Location of the wrapped tool below `tools_dir`
    fn layout(&self, tools_dir: &Path) -> ToolLayout;

    /// Closed set of accepted values for `name`, if it has one
    fn choices(&self, _name: &str) -> Option<Vec<&'static str>> {
        None
    }
}

/// Registry for looking up modules by name
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Create a registry with all built-in modules
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(rsactftool::RsaCtfToolModule));
        registry
    }

    /// Register a module
    pub fn register(&mut self, module: Arc<dyn Module>) {
        self.modules.insert(module.name().to_string(), module);
    }

    /// Get a module by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.modules.get(name).cloned()
    }

    /// Check if a module exists
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Get all module names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Create a runnable instance of a module
    pub fn instantiate(&self, name: &str, config: &Config) -> ModuleResult<ToolModule> {
        let module = self
            .get(name)
            .ok_or_else(|| ModuleError::NotFound(name.to_string()))?;
        Ok(ToolModule::from_config(module.as_ref(), config))
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
