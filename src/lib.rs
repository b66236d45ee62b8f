//! # Armory - validated wrapper modules for third-party attack tools
//!
//! Armory drives external command-line security tools through *modules*.
//! Each module declares the tool's parameters and how to validate them,
//! repairs the tool's Python dependencies when they are missing, builds the
//! command line from the accepted parameters, and runs the tool as a child
//! process.
//!
//! ## Core Concepts
//!
//! - **Parameter Store**: the validated key/value state of one module instance
//! - **Validation Registry**: per-parameter rules, with an accept-all fallback
//! - **Dependency Resolver**: checks a tool's requirements and installs
//!   missing packages, refusing to touch version conflicts
//! - **Command Synthesizer**: turns set parameters into an argument vector
//! - **Process Executor**: spawns the argument vector, never through a shell
//!
//! ## Architecture Overview
//!
//! ```text
//!   set(name, value) ──► ValidationRegistry ──► ParameterStore
//!                                                    │
//!   run() ──► DependencyResolver::check_reqs ──► CommandSynthesizer
//!                  │                                 │
//!         PackageQuery / PackageInstaller      ProcessExecutor
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use armory::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let mut tool = ModuleRegistry::with_builtins().instantiate("rsactftool", &config)?;
//!
//!     tool.set("mode", "fermat")?;
//!     tool.set("publickey", "key.pub")?;
//!
//!     let output = tool.run()?;
//!     println!("{}", output.msg);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::modules::deps::{
        DependencyIssue, PackageInstaller, PackageQuery, PipBackend, QueryOutcome,
    };
    pub use crate::modules::{
        CommandResult, DependencyResolver, ExecuteOptions, Invocation, LocalExecutor, Module,
        ModuleError, ModuleOutput, ModuleRegistry, ModuleResult, ProcessExecutor, Resolution,
        ResolverState, ToolModule, ValidationRegistry, Verdict,
    };
}

/// Configuration loading: files, then environment overrides.
pub mod config;

/// Error types and result aliases for Armory operations.
pub mod error;

/// Module trait, registry, and the building blocks of a runnable module.
pub mod modules;

pub use error::{Error, Result};

/// Version of the armory crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
