//! Runnable module instances
//!
//! A [`ToolModule`] binds a module's parameter store and validation policy to
//! the wrapped tool's location, its dependency resolver, and the collaborators
//! used to query packages, install them and spawn the tool.

use super::command::{CommandSynthesizer, Invocation};
use super::deps::{
    DependencyResolver, PackageInstaller, PackageQuery, PipBackend, Resolution, ResolverState,
};
use super::exec::{ExecuteOptions, LocalExecutor, ProcessExecutor};
use super::params::{Parameter, ParameterStore};
use super::{Module, ModuleError, ModuleOutput, ModuleResult};
use crate::config::Config;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A configured, runnable instance of a [`Module`]
///
/// Parameters are mutated through `&mut self`; clone the instance to give
/// each concurrent user its own copy.
#[derive(Clone)]
pub struct ToolModule {
    name: String,
    store: ParameterStore,
    synthesizer: CommandSynthesizer,
    resolver: DependencyResolver,
    query: Arc<dyn PackageQuery>,
    installer: Arc<dyn PackageInstaller>,
    executor: Arc<dyn ProcessExecutor>,
    strict: bool,
    exec_options: ExecuteOptions,
}

impl fmt::Debug for ToolModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolModule")
            .field("name", &self.name)
            .field("store", &self.store)
            .field("synthesizer", &self.synthesizer)
            .field("resolver", &self.resolver)
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

impl ToolModule {
    /// Create an instance with explicit interpreter and tools directory and
    /// the default pip/local collaborators
    pub fn new(
        module: &dyn Module,
        interpreter: impl Into<PathBuf>,
        tools_dir: impl Into<PathBuf>,
    ) -> Self {
        let interpreter = interpreter.into();
        let layout = module.layout(&tools_dir.into());

        let pip = Arc::new(PipBackend::new(interpreter.clone()));

        Self {
            name: module.name().to_string(),
            store: ParameterStore::with_specs(module.validation(), module.options()),
            synthesizer: CommandSynthesizer::new(interpreter, layout.script),
            resolver: DependencyResolver::new(module.name(), layout.requirements)
                .with_optional(layout.optional_requirements),
            query: pip.clone(),
            installer: pip,
            executor: Arc::new(LocalExecutor),
            strict: false,
            exec_options: ExecuteOptions::default(),
        }
    }

    /// Create an instance from loaded configuration
    pub fn from_config(module: &dyn Module, config: &Config) -> Self {
        let interpreter = match which::which(&config.python) {
            Ok(path) => path,
            Err(e) => {
                warn!(
                    "Cannot locate interpreter '{}' ({}), using it as given",
                    config.python, e
                );
                PathBuf::from(&config.python)
            }
        };

        let mut tool = Self::new(module, interpreter, &config.tools_dir).with_strict(config.strict);
        tool.resolver = tool
            .resolver
            .with_verify_after_install(config.verify_after_install)
            .with_install_timeout(config.install_timeout());
        tool.exec_options = tool.exec_options.with_timeout(config.exec_timeout());
        tool
    }

    pub fn with_query(mut self, query: Arc<dyn PackageQuery>) -> Self {
        self.query = query;
        self
    }

    pub fn with_installer(mut self, installer: Arc<dyn PackageInstaller>) -> Self {
        self.installer = installer;
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn ProcessExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Abort `run` when dependency resolution reports any issue
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_execute_options(mut self, options: ExecuteOptions) -> Self {
        self.exec_options = options;
        self
    }

    pub fn with_resolver(mut self, resolver: DependencyResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Set a parameter; rejected values leave the store untouched
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> ModuleResult<()> {
        self.store.set(name, value)
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.store.get(name)
    }

    pub fn reset(&mut self, name: &str) -> ModuleResult<()> {
        self.store.reset(name)
    }

    pub fn params(&self) -> &ParameterStore {
        &self.store
    }

    pub fn dependency_state(&self) -> ResolverState {
        self.resolver.state()
    }

    /// Check the tool's requirements, installing missing packages
    pub fn check_reqs(&mut self) -> Resolution {
        self.resolver
            .check_reqs(self.query.as_ref(), self.installer.as_ref())
    }

    /// The argument vector `run` would execute with the current parameters
    pub fn invocation(&self) -> Invocation {
        self.synthesizer.synthesize(&self.store)
    }

    /// Dry run: report the invocation without resolving dependencies or
    /// spawning anything
    pub fn check(&self) -> ModuleOutput {
        let invocation = self.invocation();
        ModuleOutput::skipped(format!("Would run: {}", invocation)).with_invocation(&invocation)
    }

    /// Resolve dependencies, build the invocation and execute it
    pub fn run(&mut self) -> ModuleResult<ModuleOutput> {
        let resolution = self.check_reqs();

        if let Some(issue) = resolution.issues.first() {
            if self.strict {
                return Err(issue.to_error());
            }
            warn!(
                "Running {} with unresolved dependencies ({}): {}",
                self.name,
                resolution.state,
                issue.message()
            );
        }

        let invocation = self.invocation();
        info!("Running {}: {}", self.name, invocation);

        let result = self.executor.execute(&invocation, &self.exec_options)?;
        debug!("{} exited with {}", self.name, result.rc);

        if !result.success() {
            return Err(ModuleError::CommandFailed { result });
        }

        Ok(ModuleOutput::ok(format!("{} completed", self.name))
            .with_invocation(&invocation)
            .with_resolution(resolution)
            .with_command_output(result))
    }
}
