//! Module behaviour tests
//!
//! Exercises a full RsaCtfTool module instance against mocked package and
//! process collaborators: parameter validation, command synthesis, dependency
//! resolution in lenient and strict mode, and error propagation.

mod common;

use common::*;
use mockall::predicate::*;
use pretty_assertions::assert_eq;
use std::path::Path;
use std::time::Duration;

use armory::modules::deps::{DependencyIssue, QueryOutcome};
use armory::modules::{ModuleError, ModuleStatus, ResolverState};

// ============================================================================
// Parameter validation
// ============================================================================

#[test]
fn test_mode_accepts_known_attack() {
    let mut tool = offline_rsactftool();

    tool.set("mode", "fermat").unwrap();
    assert_eq!(tool.get("mode").unwrap().value.as_deref(), Some("fermat"));

    match tool.set("mode", "not_a_mode") {
        Err(ModuleError::Validation { name, reason }) => {
            assert_eq!(name, "mode");
            assert_eq!(reason, "No such attack mode");
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(tool.get("mode").unwrap().value.as_deref(), Some("fermat"));
}

#[test]
fn test_numeric_params_accept_hex_but_not_bare_prefix() {
    let mut tool = offline_rsactftool();

    tool.set("n", "0x1A").unwrap();
    assert!(tool.set("n", "0x").is_err());
    assert!(tool.set("e", "65537").is_ok());
    assert!(tool.set("p", "12ab").is_err());
    assert_eq!(tool.get("n").unwrap().value.as_deref(), Some("0x1A"));
}

#[test]
fn test_publickey_wildcard_and_existing_file() {
    let mut tool = offline_rsactftool();
    let key = tempfile::NamedTempFile::new().unwrap();

    tool.set("publickey", "keys/*.pem").unwrap();
    tool.set("publickey", key.path().to_str().unwrap()).unwrap();
    assert_eq!(
        tool.set("publickey", "/no/such/key.pem")
            .unwrap_err()
            .to_string(),
        "Invalid value for 'publickey': No such file"
    );
}

#[test]
fn test_free_form_params_accept_anything() {
    let mut tool = offline_rsactftool();
    tool.set("uncipher", "0xdeadbeef; rm -rf /").unwrap();
    tool.set("undeclared", "value").unwrap();
    assert_eq!(tool.get("undeclared").unwrap().value.as_deref(), Some("value"));
}

#[test]
fn test_reset_returns_parameter_to_unset() {
    let mut tool = offline_rsactftool();
    tool.set("q", "7").unwrap();
    tool.reset("q").unwrap();
    assert!(!tool.get("q").unwrap().is_set());
    assert!(matches!(tool.reset("bogus"), Err(ModuleError::NotFound(_))));
}

// ============================================================================
// Command synthesis
// ============================================================================

#[test]
fn test_unset_parameters_are_not_synthesized() {
    let mut tool = offline_rsactftool();
    assert!(flag_tokens(&tool).is_empty());

    tool.set("mode", "wiener").unwrap();
    tool.set("e", "3").unwrap();
    assert_eq!(flag_tokens(&tool), vec!["--mode", "wiener", "-e", "3"]);
}

#[test]
fn test_invocation_starts_with_interpreter_and_script() {
    let tool = offline_rsactftool();
    let invocation = tool.invocation();
    assert_eq!(invocation.program(), Some(PYTHON));
    assert_eq!(
        Path::new(&invocation.args()[0]),
        Path::new("/opt/tools/RsaCtfTool/RsaCtfTool.py")
    );
}

#[test]
fn test_passthrough_is_appended_verbatim_at_the_end() {
    let mut tool = offline_rsactftool();
    tool.set("extra_flags", "--verbose --depth 3").unwrap();
    tool.set("mode", "all").unwrap();

    assert_eq!(
        flag_tokens(&tool),
        vec!["--mode", "all", "--verbose", "--depth", "3"]
    );
}

#[test]
fn test_synthesis_is_idempotent() {
    let mut tool = offline_rsactftool();
    tool.set("mode", "factordb").unwrap();
    tool.set("n", "0xC0FFEE").unwrap();
    assert_eq!(tool.invocation(), tool.invocation());
}

#[test]
fn test_values_are_never_shell_split() {
    let mut tool = offline_rsactftool();
    tool.set("output", "my results.txt").unwrap();
    assert_eq!(flag_tokens(&tool), vec!["--output", "my results.txt"]);
}

// ============================================================================
// Dependency resolution
// ============================================================================

#[test]
fn test_satisfied_dependencies_install_nothing() {
    let dir = tools_dir(REQUIREMENTS, Some("z3-solver\n"));
    let mut tool = rsactftool(
        dir.path(),
        query_returning(QueryOutcome::Satisfied),
        no_installs(),
        no_execution(),
    );

    let resolution = tool.check_reqs();
    assert_eq!(resolution.state, ResolverState::Satisfied);
    assert_eq!(resolution.installs, 0);
    assert!(resolution.is_clean());
}

#[test]
fn test_conflict_is_unsatisfiable_without_installing() {
    let dir = tools_dir(REQUIREMENTS, Some("z3-solver\n"));
    let mut tool = rsactftool(
        dir.path(),
        query_returning(conflict("sympy", "1.4", "~=1.9")),
        no_installs(),
        no_execution(),
    );

    let resolution = tool.check_reqs();
    assert_eq!(resolution.state, ResolverState::Unsatisfiable);
    assert_eq!(resolution.installs, 0);
    assert!(matches!(
        resolution.issues.as_slice(),
        [DependencyIssue::Conflict(message)] if message.contains("sympy")
    ));
    assert_eq!(tool.dependency_state(), ResolverState::Unsatisfiable);
}

#[test]
fn test_missing_packages_install_both_manifests() {
    let dir = tools_dir(REQUIREMENTS, Some("z3-solver\n"));
    let tool_dir = dir.path().join("RsaCtfTool");

    let mut installer = MockInstaller::new();
    installer
        .expect_install()
        .with(eq(tool_dir.join("requirements.txt")), always())
        .times(1)
        .returning(|_, _| Ok(()));
    installer
        .expect_install()
        .with(eq(tool_dir.join("optional-requirements.txt")), always())
        .times(1)
        .returning(|_, _| Ok(()));

    let mut tool = rsactftool(
        dir.path(),
        query_returning(QueryOutcome::Missing(vec!["gmpy2".to_string()])),
        installer,
        no_execution(),
    );

    let resolution = tool.check_reqs();
    assert_eq!(resolution.state, ResolverState::Satisfied);
    assert_eq!(resolution.installs, 2);
}

#[test]
fn test_install_failure_is_reported_but_optimistic() {
    let dir = tools_dir(REQUIREMENTS, None);

    let mut installer = MockInstaller::new();
    installer.expect_install().times(1).returning(|_, _| {
        Err(ModuleError::DependencyInstallFailure(
            "network unreachable".to_string(),
        ))
    });

    let mut tool = rsactftool(
        dir.path(),
        query_returning(QueryOutcome::Missing(vec!["gmpy2".to_string()])),
        installer,
        no_execution(),
    );

    let resolution = tool.check_reqs();
    assert_eq!(resolution.state, ResolverState::Satisfied);
    assert!(matches!(
        resolution.issues.as_slice(),
        [DependencyIssue::InstallFailure(_)]
    ));
}

// ============================================================================
// Running
// ============================================================================

#[test]
fn test_run_hands_synthesized_tokens_to_executor() {
    let dir = tools_dir(REQUIREMENTS, None);

    let mut executor = MockExecutor::new();
    executor
        .expect_execute()
        .withf(|invocation, _| {
            invocation.args()[1..] == ["--mode", "fermat", "-n", "0x1A", "--timer"]
        })
        .times(1)
        .returning(|_, _| {
            Ok(armory::modules::CommandResult {
                rc: 0,
                stdout: "Results for key".to_string(),
                stderr: String::new(),
            })
        });

    let mut tool = rsactftool(
        dir.path(),
        query_returning(QueryOutcome::Satisfied),
        no_installs(),
        executor,
    );
    tool.set("mode", "fermat").unwrap();
    tool.set("n", "0x1A").unwrap();
    tool.set("extra_flags", "--timer").unwrap();

    let output = tool.run().unwrap();
    assert_eq!(output.status, ModuleStatus::Ok);
    assert_eq!(output.rc, Some(0));
    assert_eq!(output.stdout.as_deref(), Some("Results for key"));
}

#[test]
fn test_lenient_run_proceeds_on_conflict() {
    let dir = tools_dir(REQUIREMENTS, None);
    let mut tool = rsactftool(
        dir.path(),
        query_returning(conflict("gmpy2", "1.0", ">=2.0")),
        no_installs(),
        executor_ok("partial"),
    );

    let output = tool.run().unwrap();
    let resolution = output.dependencies.unwrap();
    assert_eq!(resolution.state, ResolverState::Unsatisfiable);
    assert_eq!(output.stdout.as_deref(), Some("partial"));
}

#[test]
fn test_strict_run_aborts_on_conflict() {
    let dir = tools_dir(REQUIREMENTS, None);
    let mut tool = rsactftool(
        dir.path(),
        query_returning(conflict("gmpy2", "1.0", ">=2.0")),
        no_installs(),
        no_execution(),
    )
    .with_strict(true);

    assert!(matches!(
        tool.run(),
        Err(ModuleError::DependencyConflict(_))
    ));
}

#[test]
fn test_strict_run_aborts_on_install_failure() {
    let dir = tools_dir(REQUIREMENTS, None);

    let mut installer = MockInstaller::new();
    installer
        .expect_install()
        .returning(|_, _| {
            Err(ModuleError::Timeout {
                timeout: Duration::from_secs(600),
            })
        });

    let mut tool = rsactftool(
        dir.path(),
        query_returning(QueryOutcome::Missing(vec!["sympy".to_string()])),
        installer,
        no_execution(),
    )
    .with_strict(true);

    assert!(matches!(
        tool.run(),
        Err(ModuleError::DependencyInstallFailure(_))
    ));
}

#[test]
fn test_execution_errors_propagate_unchanged() {
    let dir = tools_dir(REQUIREMENTS, None);

    let mut executor = MockExecutor::new();
    executor
        .expect_execute()
        .returning(|_, _| Err(ModuleError::ExecutionFailed("no such interpreter".to_string())));

    let mut tool = rsactftool(
        dir.path(),
        query_returning(QueryOutcome::Satisfied),
        no_installs(),
        executor,
    );

    assert_eq!(
        tool.run().unwrap_err().to_string(),
        "Execution failed: no such interpreter"
    );
}

#[test]
fn test_dry_run_touches_nothing() {
    let dir = tools_dir(REQUIREMENTS, None);
    let mut query = MockQuery::new();
    query.expect_query().times(0);

    let mut tool = rsactftool(dir.path(), query, no_installs(), no_execution());
    tool.set("mode", "smallq").unwrap();

    let output = tool.check();
    assert_eq!(output.status, ModuleStatus::Skipped);
    assert!(output.msg.contains("--mode smallq"));
    assert_eq!(tool.dependency_state(), ResolverState::Unchecked);
}

#[test]
fn test_clones_have_independent_parameters() {
    let mut first = offline_rsactftool();
    first.set("mode", "fermat").unwrap();

    let mut second = first.clone();
    second.set("mode", "wiener").unwrap();

    assert_eq!(first.get("mode").unwrap().value.as_deref(), Some("fermat"));
    assert_eq!(second.get("mode").unwrap().value.as_deref(), Some("wiener"));
}
