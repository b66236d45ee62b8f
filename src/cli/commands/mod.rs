//! Subcommands module for Armory CLI
//!
//! This module contains all the subcommand implementations.

pub mod check;
pub mod list;
pub mod run;
pub mod show;

use crate::cli::output::OutputFormatter;
use anyhow::Result;
use armory::config::Config;
use armory::modules::{ModuleRegistry, ToolModule};
use armory::Error;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
    /// Available modules
    pub registry: ModuleRegistry,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, config: Config) -> Self {
        let output = OutputFormatter::new(!cli.no_color, cli.is_json(), cli.verbosity());

        Self {
            config,
            output,
            registry: ModuleRegistry::with_builtins(),
        }
    }

    /// Instantiate a module by name
    pub fn instantiate(&self, name: &str) -> armory::Result<ToolModule> {
        if !self.registry.contains(name) {
            return Err(Error::ModuleNotFound(name.to_string()));
        }
        Ok(self.registry.instantiate(name, &self.config)?)
    }

    /// Report an error and return its exit code
    pub fn fail(&self, err: &Error) -> i32 {
        self.output.negative(&err.to_string());
        err.exit_code()
    }
}

/// Parse a `name=value` assignment
pub fn parse_assignment(raw: &str) -> armory::Result<(&str, &str)> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value)),
        _ => Err(Error::InvalidAssignment(raw.to_string())),
    }
}

/// Trait for runnable commands
pub trait Runnable {
    /// Execute the command
    fn run(&self, ctx: &mut CommandContext) -> Result<i32>;
}
