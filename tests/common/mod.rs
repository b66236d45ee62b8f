//! Shared test utilities and fixtures for the Armory test suite.
//!
//! This module provides:
//! - mockall doubles for the package query, installer and process executor
//! - A fake tools directory with dependency manifests
//! - A builder wiring the doubles into an RsaCtfTool module instance
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use mockall::mock;
use tempfile::TempDir;

use armory::modules::deps::{
    DependencyManifest, PackageInstaller, PackageQuery, QueryOutcome, VersionConflict,
};
use armory::modules::rsactftool::RsaCtfToolModule;
use armory::modules::{
    CommandResult, ExecuteOptions, Invocation, ModuleResult, ProcessExecutor, ToolModule,
};

pub const PYTHON: &str = "/usr/bin/python3";

mock! {
    pub Query {}

    impl PackageQuery for Query {
        fn query(&self, manifest: &DependencyManifest) -> ModuleResult<QueryOutcome>;
    }
}

mock! {
    pub Installer {}

    impl PackageInstaller for Installer {
        fn install(&self, manifest: &Path, timeout: Option<Duration>) -> ModuleResult<()>;
    }
}

mock! {
    pub Executor {}

    impl ProcessExecutor for Executor {
        fn execute(
            &self,
            invocation: &Invocation,
            options: &ExecuteOptions,
        ) -> ModuleResult<CommandResult>;
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// A tools directory containing `RsaCtfTool/requirements.txt` and, when
/// given, `RsaCtfTool/optional-requirements.txt`
pub fn tools_dir(requirements: &str, optional: Option<&str>) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let tool = dir.path().join("RsaCtfTool");
    std::fs::create_dir_all(&tool).unwrap();
    std::fs::write(tool.join("requirements.txt"), requirements).unwrap();
    if let Some(optional) = optional {
        std::fs::write(tool.join("optional-requirements.txt"), optional).unwrap();
    }
    dir
}

/// Default manifest used by most tests
pub const REQUIREMENTS: &str = "\
# RSA attacks
cryptography>=3.0
gmpy2
sympy~=1.9
";

/// A query that always answers `outcome`
pub fn query_returning(outcome: QueryOutcome) -> MockQuery {
    let mut query = MockQuery::new();
    query
        .expect_query()
        .returning(move |_| Ok(outcome.clone()));
    query
}

/// An installer that must never be called
pub fn no_installs() -> MockInstaller {
    let mut installer = MockInstaller::new();
    installer.expect_install().times(0);
    installer
}

/// An executor that succeeds with `stdout`
pub fn executor_ok(stdout: &'static str) -> MockExecutor {
    let mut executor = MockExecutor::new();
    executor.expect_execute().returning(move |_, _| {
        Ok(CommandResult {
            rc: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        })
    });
    executor
}

/// An executor that must never be called
pub fn no_execution() -> MockExecutor {
    let mut executor = MockExecutor::new();
    executor.expect_execute().times(0);
    executor
}

pub fn conflict(package: &str, installed: &str, required: &str) -> QueryOutcome {
    QueryOutcome::Conflict(vec![VersionConflict {
        package: package.to_string(),
        installed: installed.to_string(),
        required: required.to_string(),
    }])
}

/// An RsaCtfTool instance under `dir` wired to the given doubles
pub fn rsactftool(
    dir: &Path,
    query: MockQuery,
    installer: MockInstaller,
    executor: MockExecutor,
) -> ToolModule {
    ToolModule::new(&RsaCtfToolModule, PYTHON, dir)
        .with_query(Arc::new(query))
        .with_installer(Arc::new(installer))
        .with_executor(Arc::new(executor))
}

/// An RsaCtfTool instance for parameter and synthesis tests only
pub fn offline_rsactftool() -> ToolModule {
    ToolModule::new(&RsaCtfToolModule, PYTHON, "/opt/tools")
        .with_query(Arc::new(MockQuery::new()))
        .with_installer(Arc::new(MockInstaller::new()))
        .with_executor(Arc::new(MockExecutor::new()))
}

/// Tokens after `[interpreter, script]`
pub fn flag_tokens(tool: &ToolModule) -> Vec<String> {
    tool.invocation().args()[1..].to_vec()
}
