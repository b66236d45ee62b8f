//! Dependency resolution for wrapped tools
//!
//! A wrapped tool ships a requirements manifest (and optionally a second,
//! optional one). Before every run the [`DependencyResolver`] asks a
//! [`PackageQuery`] whether the manifest is satisfied:
//!
//! - satisfied: nothing to do
//! - packages missing: install the manifest(s) through a [`PackageInstaller`]
//! - version conflict: give up without installing and recommend an isolated
//!   environment
//!
//! After installing, the resolver optimistically reports success unless
//! `verify_after_install` is enabled, in which case it queries again and
//! fails closed.
//!
//! Installed-package state is read then acted on with no locking. Two
//! resolvers working on the same environment at the same time can race.

use super::command::Invocation;
use super::exec::{ExecuteOptions, LocalExecutor, ProcessExecutor};
use super::{ModuleError, ModuleResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

static REQUIREMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[[^\]]*\])?\s*(.*)$")
        .expect("requirement regex is valid")
});

static NAME_SEPARATORS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-_.]+").expect("separator regex is valid"));

/// Canonical form of a package name: lowercase, separators collapsed to `-`
pub fn normalize_name(name: &str) -> String {
    NAME_SEPARATORS_RE
        .replace_all(&name.to_lowercase(), "-")
        .into_owned()
}

// ============================================================================
// Version constraints
// ============================================================================

/// Version constraint of a single requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum VersionConstraint {
    /// Any version
    #[default]
    Any,
    /// `==`, with an optional trailing `.*` wildcard
    Exact(String),
    /// `!=`, with an optional trailing `.*` wildcard
    NotEqual(String),
    /// `>=`
    Gte(String),
    /// `>`
    Gt(String),
    /// `<=`
    Lte(String),
    /// `<`
    Lt(String),
    /// `~=`
    Compatible(String),
    /// Multiple constraints (all must match)
    And(Vec<VersionConstraint>),
}

impl VersionConstraint {
    /// Parse a version specifier such as `>=1.2,<2`
    pub fn parse(s: &str) -> ModuleResult<Self> {
        let s = s.trim();
        let s = s
            .strip_prefix('(')
            .and_then(|inner| inner.strip_suffix(')'))
            .unwrap_or(s)
            .trim();

        if s.is_empty() {
            return Ok(Self::Any);
        }

        if s.contains(',') {
            let constraints: ModuleResult<Vec<_>> = s
                .split(',')
                .filter(|part| !part.trim().is_empty())
                .map(Self::parse)
                .collect();
            return Ok(Self::And(constraints?));
        }

        let (ctor, version): (fn(String) -> Self, &str) = if let Some(v) = s.strip_prefix("===") {
            (Self::Exact, v)
        } else if let Some(v) = s.strip_prefix("~=") {
            (Self::Compatible, v)
        } else if let Some(v) = s.strip_prefix("==") {
            (Self::Exact, v)
        } else if let Some(v) = s.strip_prefix("!=") {
            (Self::NotEqual, v)
        } else if let Some(v) = s.strip_prefix(">=") {
            (Self::Gte, v)
        } else if let Some(v) = s.strip_prefix("<=") {
            (Self::Lte, v)
        } else if let Some(v) = s.strip_prefix('>') {
            (Self::Gt, v)
        } else if let Some(v) = s.strip_prefix('<') {
            (Self::Lt, v)
        } else {
            return Err(ModuleError::Manifest(format!(
                "Invalid version constraint: '{}'",
                s
            )));
        };

        let version = version.trim();
        if version.is_empty() || version.contains(char::is_whitespace) {
            return Err(ModuleError::Manifest(format!(
                "Invalid version constraint: '{}'",
                s
            )));
        }
        Ok(ctor(version.to_string()))
    }

    /// Check if an installed version satisfies this constraint
    pub fn matches(&self, version: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(v) => match v.strip_suffix(".*") {
                Some(prefix) => has_release_prefix(version, prefix),
                None => compare_to_bound(version, v) == Ordering::Equal,
            },
            Self::NotEqual(v) => !Self::Exact(v.clone()).matches(version),
            Self::Gte(v) => compare_to_bound(version, v) != Ordering::Less,
            Self::Gt(v) => compare_to_bound(version, v) == Ordering::Greater,
            Self::Lte(v) => compare_to_bound(version, v) != Ordering::Greater,
            Self::Lt(v) => compare_to_bound(version, v) == Ordering::Less,
            Self::Compatible(v) => {
                // ~=X.Y.Z means >=X.Y.Z and ==X.Y.*
                let parts: Vec<&str> = v.split('.').collect();
                let prefix = if parts.len() > 1 {
                    parts[..parts.len() - 1].join(".")
                } else {
                    v.clone()
                };
                compare_to_bound(version, v) != Ordering::Less
                    && has_release_prefix(version, &prefix)
            }
            Self::And(constraints) => constraints.iter().all(|c| c.matches(version)),
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => Ok(()),
            Self::Exact(v) => write!(f, "=={}", v),
            Self::NotEqual(v) => write!(f, "!={}", v),
            Self::Gte(v) => write!(f, ">={}", v),
            Self::Gt(v) => write!(f, ">{}", v),
            Self::Lte(v) => write!(f, "<={}", v),
            Self::Lt(v) => write!(f, "<{}", v),
            Self::Compatible(v) => write!(f, "~={}", v),
            Self::And(constraints) => {
                let parts: Vec<String> = constraints.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(","))
            }
        }
    }
}

/// Numeric release segments of a version string: `1.10.2rc1` -> `[1, 10, 2]`
fn release_segments(version: &str) -> Vec<u64> {
    let version = version.trim().trim_start_matches(['v', 'V']);
    let version = version.split_once('!').map_or(version, |(_, rest)| rest);
    let mut segments = Vec::new();
    for part in version.split('.') {
        let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
        match digits.parse() {
            Ok(n) => segments.push(n),
            Err(_) => break,
        }
        if digits.len() != part.len() {
            break;
        }
    }
    segments
}

fn has_release_prefix(version: &str, prefix: &str) -> bool {
    let version = release_segments(version);
    let prefix = release_segments(prefix);
    !prefix.is_empty()
        && prefix
            .iter()
            .enumerate()
            .all(|(i, p)| version.get(i).copied().unwrap_or(0) == *p)
}

/// `2.0.0+cpu` -> `2.0.0`
fn strip_local(version: &str) -> &str {
    version.split_once('+').map_or(version, |(public, _)| public)
}

static PYTHON_VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)^v?(?:(\d+)!)?(\d+(?:\.\d+)*)",
        r"(?:[-_.]?(alpha|beta|preview|pre|a|b|c|rc)[-_.]?(\d+)?)?",
        r"(?:-(\d+)|[-_.]?(post|rev|r)[-_.]?(\d+)?)?",
        r"(?:[-_.]?(dev)[-_.]?(\d+)?)?",
        r"(?:\+([a-z0-9]+(?:[-_.][a-z0-9]+)*))?$",
    ))
    .expect("version regex is valid")
});

/// Where a release sits relative to its final release
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    /// `1.0.dev1`: below every pre-release of `1.0`
    DevOnly,
    /// `a`/`b`/`rc` rank `0..=2`, then the pre-release number
    Pre(u8, u64),
    Final,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum DevTail {
    Dev(u64),
    None,
}

/// Local label segment; numeric segments sort above alphanumeric ones
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum LocalPart {
    Alpha(String),
    Numeric(u64),
}

/// A parsed Python package version, ordered field by field
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct PythonVersion {
    epoch: u64,
    release: Vec<u64>,
    phase: Phase,
    post: Option<u64>,
    dev: DevTail,
    local: Option<Vec<LocalPart>>,
}

impl PythonVersion {
    fn parse(version: &str) -> Option<Self> {
        let caps = PYTHON_VERSION_RE.captures(version.trim())?;
        let number = |i: usize| -> Option<u64> {
            caps.get(i).map_or(Some(0), |m| m.as_str().parse().ok())
        };

        let mut release = caps
            .get(2)?
            .as_str()
            .split('.')
            .map(|part| part.parse().ok())
            .collect::<Option<Vec<u64>>>()?;
        while release.len() > 1 && release.last() == Some(&0) {
            release.pop();
        }

        let post = if caps.get(5).is_some() {
            Some(number(5)?)
        } else if caps.get(6).is_some() {
            Some(number(7)?)
        } else {
            None
        };
        let dev = if caps.get(8).is_some() {
            DevTail::Dev(number(9)?)
        } else {
            DevTail::None
        };
        let phase = match caps.get(3) {
            Some(label) => {
                let rank = match label.as_str().to_lowercase().as_str() {
                    "a" | "alpha" => 0,
                    "b" | "beta" => 1,
                    _ => 2,
                };
                Phase::Pre(rank, number(4)?)
            }
            None if post.is_none() && dev != DevTail::None => Phase::DevOnly,
            None => Phase::Final,
        };
        let local = caps.get(10).map(|m| {
            m.as_str()
                .split(['-', '_', '.'])
                .map(|part| match part.parse() {
                    Ok(n) => LocalPart::Numeric(n),
                    Err(_) => LocalPart::Alpha(part.to_lowercase()),
                })
                .collect()
        });

        Some(Self {
            epoch: number(1)?,
            release,
            phase,
            post,
            dev,
            local,
        })
    }
}

/// Sort key for any version string; unparseable versions sort below every
/// parseable one and among themselves by release digits, then text
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum VersionKey {
    Legacy(Vec<u64>, String),
    Python(PythonVersion),
}

impl VersionKey {
    fn of(version: &str) -> Self {
        match PythonVersion::parse(version) {
            Some(v) => Self::Python(v),
            None => Self::Legacy(release_segments(version), version.trim().to_string()),
        }
    }
}

/// Compare two version strings using Python packaging order
///
/// Release segments compare numerically with trailing zeros ignored, then
/// `dev < a < b < rc < final < post`. Local labels (`+cpu`) rank above the
/// bare version.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    VersionKey::of(a).cmp(&VersionKey::of(b))
}

/// Compare an installed version against a constraint's version, ignoring
/// the installed local label when the constraint names none
fn compare_to_bound(installed: &str, bound: &str) -> Ordering {
    if bound.contains('+') {
        compare_versions(installed, bound)
    } else {
        compare_versions(strip_local(installed), bound)
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// One package requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Package name as written
    pub name: String,
    /// Version constraint
    pub constraint: VersionConstraint,
}

impl Requirement {
    pub fn new(name: impl Into<String>, constraint: VersionConstraint) -> Self {
        Self {
            name: name.into(),
            constraint,
        }
    }

    /// Parse a single requirements line, returning `None` for lines that do
    /// not name a package (blank, comment, option or URL lines)
    pub fn parse_line(line: &str) -> ModuleResult<Option<Self>> {
        let line = strip_comment(line).trim();
        if line.is_empty() || line.starts_with('-') {
            return Ok(None);
        }
        if line.contains("://") || line.starts_with('.') || line.starts_with('/') {
            debug!("Skipping non-index requirement '{}'", line);
            return Ok(None);
        }

        // environment markers are not evaluated
        let line = line.split(';').next().unwrap_or_default().trim();

        if let Some((name, _url)) = line.split_once(" @ ") {
            return Ok(Some(Self::new(name.trim(), VersionConstraint::Any)));
        }

        let caps = REQUIREMENT_RE
            .captures(line)
            .ok_or_else(|| ModuleError::Manifest(format!("Invalid requirement: '{}'", line)))?;
        let name = caps.get(1).map_or("", |m| m.as_str());
        let spec = caps.get(2).map_or("", |m| m.as_str());
        Ok(Some(Self::new(name, VersionConstraint::parse(spec)?)))
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.constraint)
    }
}

fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    for (i, c) in line.char_indices() {
        if c == '#' && (i == 0 || bytes[i - 1].is_ascii_whitespace()) {
            return &line[..i];
        }
    }
    line
}

/// Ordered list of package requirements read from a requirements file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DependencyManifest {
    requirements: Vec<Requirement>,
}

impl DependencyManifest {
    pub fn new(requirements: Vec<Requirement>) -> Self {
        Self { requirements }
    }

    /// Parse requirements-file text
    pub fn parse(content: &str) -> ModuleResult<Self> {
        let mut requirements = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            match Requirement::parse_line(line) {
                Ok(Some(req)) => requirements.push(req),
                Ok(None) => {}
                Err(e) => {
                    return Err(ModuleError::Manifest(format!("line {}: {}", lineno + 1, e)));
                }
            }
        }
        Ok(Self { requirements })
    }

    /// Read and parse a requirements file
    pub fn load(path: &Path) -> ModuleResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ModuleError::Manifest(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn names(&self) -> Vec<&str> {
        self.requirements.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    /// Check the manifest against a map of installed versions keyed by
    /// normalized package name
    pub fn evaluate(&self, installed: &HashMap<String, String>) -> QueryOutcome {
        let mut missing = Vec::new();
        let mut conflicts = Vec::new();

        for req in &self.requirements {
            match installed.get(&normalize_name(&req.name)) {
                None => missing.push(req.name.clone()),
                Some(version) if !req.constraint.matches(version) => {
                    conflicts.push(VersionConflict {
                        package: req.name.clone(),
                        required: req.constraint.to_string(),
                        installed: version.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        // a conflict cannot be fixed by installing, so it takes precedence
        if !conflicts.is_empty() {
            QueryOutcome::Conflict(conflicts)
        } else if !missing.is_empty() {
            QueryOutcome::Missing(missing)
        } else {
            QueryOutcome::Satisfied
        }
    }
}

// ============================================================================
// Collaborators
// ============================================================================

/// An installed version that does not satisfy its requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionConflict {
    pub package: String,
    pub required: String,
    pub installed: String,
}

impl fmt::Display for VersionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} is installed but {} is required",
            self.package, self.installed, self.required
        )
    }
}

/// Three-way answer of an installed-package query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOutcome {
    Satisfied,
    Missing(Vec<String>),
    Conflict(Vec<VersionConflict>),
}

/// Answers whether a manifest is satisfied by the installed packages
pub trait PackageQuery: Send + Sync {
    fn query(&self, manifest: &DependencyManifest) -> ModuleResult<QueryOutcome>;
}

/// Installs the packages listed in a requirements file
pub trait PackageInstaller: Send + Sync {
    fn install(&self, manifest: &Path, timeout: Option<Duration>) -> ModuleResult<()>;
}

/// pip-backed query and installer, running `<python> -m pip`
#[derive(Clone)]
pub struct PipBackend {
    python: PathBuf,
    executor: Arc<dyn ProcessExecutor>,
}

impl fmt::Debug for PipBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipBackend")
            .field("python", &self.python)
            .finish()
    }
}

impl PipBackend {
    pub fn new(python: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
            executor: Arc::new(LocalExecutor),
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn ProcessExecutor>) -> Self {
        self.executor = executor;
        self
    }

    fn pip(&self, args: &[&str]) -> Invocation {
        let mut tokens = vec![
            self.python.to_string_lossy().into_owned(),
            "-m".to_string(),
            "pip".to_string(),
        ];
        tokens.extend(args.iter().map(|a| a.to_string()));
        Invocation::new(tokens)
    }

    /// Installed versions of `names`, keyed by normalized name
    pub fn installed_versions(&self, names: &[&str]) -> ModuleResult<HashMap<String, String>> {
        if names.is_empty() {
            return Ok(HashMap::new());
        }
        let mut args = vec!["show"];
        args.extend_from_slice(names);
        // `pip show` exits non-zero when any package is missing but still
        // prints the ones it found
        let result = self.executor.execute(&self.pip(&args), &ExecuteOptions::new())?;
        Ok(parse_pip_show(&result.stdout))
    }
}

/// Parse `pip show` output into normalized name -> version
pub fn parse_pip_show(output: &str) -> HashMap<String, String> {
    let mut installed = HashMap::new();
    let mut name: Option<String> = None;

    for line in output.lines() {
        if line.trim() == "---" {
            name = None;
        } else if let Some(value) = line.strip_prefix("Name:") {
            name = Some(normalize_name(value.trim()));
        } else if let Some(value) = line.strip_prefix("Version:") {
            if let Some(ref n) = name {
                let version = value.trim();
                if !version.is_empty() {
                    installed.insert(n.clone(), version.to_string());
                }
            }
        }
    }
    installed
}

impl PackageQuery for PipBackend {
    fn query(&self, manifest: &DependencyManifest) -> ModuleResult<QueryOutcome> {
        let installed = self.installed_versions(&manifest.names())?;
        Ok(manifest.evaluate(&installed))
    }
}

impl PackageInstaller for PipBackend {
    fn install(&self, manifest: &Path, timeout: Option<Duration>) -> ModuleResult<()> {
        let path = manifest.to_string_lossy().into_owned();
        let invocation = self.pip(&["install", "-r", path.as_str()]);
        let options = ExecuteOptions::new().with_timeout(timeout);
        let result = self.executor.execute(&invocation, &options)?;
        debug!("pip install output: {}", result.stdout);

        if result.success() {
            Ok(())
        } else {
            Err(ModuleError::DependencyInstallFailure(format!(
                "pip install -r {} exited with {}: {}",
                path,
                result.rc,
                if result.stderr.is_empty() {
                    result.stdout
                } else {
                    result.stderr
                }
            )))
        }
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolver state machine: `Unchecked -> Satisfied | Unsatisfiable`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResolverState {
    #[default]
    Unchecked,
    Satisfied,
    Unsatisfiable,
}

impl fmt::Display for ResolverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverState::Unchecked => write!(f, "unchecked"),
            ResolverState::Satisfied => write!(f, "satisfied"),
            ResolverState::Unsatisfiable => write!(f, "unsatisfiable"),
        }
    }
}

/// A dependency problem found during resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum DependencyIssue {
    /// Installed versions violate the manifest; nothing was installed
    Conflict(String),
    /// The install attempt failed
    InstallFailure(String),
    /// The manifest could not be read or the package state queried
    Check(String),
}

impl DependencyIssue {
    pub fn message(&self) -> &str {
        match self {
            Self::Conflict(m) | Self::InstallFailure(m) | Self::Check(m) => m,
        }
    }

    /// The error raised for this issue in strict mode
    pub fn to_error(&self) -> ModuleError {
        match self {
            Self::Conflict(m) => ModuleError::DependencyConflict(m.clone()),
            Self::InstallFailure(m) => ModuleError::DependencyInstallFailure(m.clone()),
            Self::Check(m) => ModuleError::DependencyCheck(m.clone()),
        }
    }
}

/// Outcome of one `check_reqs` pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub state: ResolverState,
    /// Number of install attempts made
    pub installs: usize,
    pub issues: Vec<DependencyIssue>,
}

impl Resolution {
    fn new() -> Self {
        Self {
            state: ResolverState::Unchecked,
            installs: 0,
            issues: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.state == ResolverState::Satisfied && self.issues.is_empty()
    }
}

/// Where a tool's manifests live and how to treat them
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    tool: String,
    manifest: PathBuf,
    optional: Option<PathBuf>,
    verify_after_install: bool,
    install_timeout: Option<Duration>,
    state: ResolverState,
}

impl DependencyResolver {
    pub fn new(tool: impl Into<String>, manifest: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            manifest: manifest.into(),
            optional: None,
            verify_after_install: false,
            install_timeout: None,
            state: ResolverState::Unchecked,
        }
    }

    /// Secondary manifest installed only on the repair path
    pub fn with_optional(mut self, optional: Option<PathBuf>) -> Self {
        self.optional = optional;
        self
    }

    /// Re-query after installing and fail closed if still unsatisfied
    pub fn with_verify_after_install(mut self, verify: bool) -> Self {
        self.verify_after_install = verify;
        self
    }

    pub fn with_install_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.install_timeout = timeout;
        self
    }

    pub fn state(&self) -> ResolverState {
        self.state
    }

    /// Check the manifest and repair missing packages
    ///
    /// Problems are reported in the returned [`Resolution`], never raised.
    pub fn check_reqs(
        &mut self,
        query: &dyn PackageQuery,
        installer: &dyn PackageInstaller,
    ) -> Resolution {
        let mut resolution = Resolution::new();

        let manifest = match DependencyManifest::load(&self.manifest) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("Cannot check requirements for {}: {}", self.tool, e);
                resolution.issues.push(DependencyIssue::Check(e.to_string()));
                return self.finish(resolution, ResolverState::Unsatisfiable);
            }
        };

        let outcome = match query.query(&manifest) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Cannot query installed packages for {}: {}", self.tool, e);
                resolution.issues.push(DependencyIssue::Check(e.to_string()));
                return self.finish(resolution, ResolverState::Unsatisfiable);
            }
        };

        match outcome {
            QueryOutcome::Satisfied => {
                debug!("Requirements for {} are satisfied", self.tool);
                self.finish(resolution, ResolverState::Satisfied)
            }
            QueryOutcome::Conflict(conflicts) => {
                let details: Vec<String> = conflicts.iter().map(ToString::to_string).collect();
                warn!(
                    "Cannot install requirements for {} because of conflict: {}",
                    self.tool,
                    details.join("; ")
                );
                info!("Install {} in a virtual environment to avoid version conflicts", self.tool);
                resolution
                    .issues
                    .push(DependencyIssue::Conflict(details.join("; ")));
                self.finish(resolution, ResolverState::Unsatisfiable)
            }
            QueryOutcome::Missing(missing) => {
                info!(
                    "Install requirements for {} (missing: {})",
                    self.tool,
                    missing.join(", ")
                );
                self.repair(&manifest, query, installer, resolution)
            }
        }
    }

    fn repair(
        &mut self,
        manifest: &DependencyManifest,
        query: &dyn PackageQuery,
        installer: &dyn PackageInstaller,
        mut resolution: Resolution,
    ) -> Resolution {
        resolution.installs += 1;
        if let Err(e) = installer.install(&self.manifest, self.install_timeout) {
            warn!("Installing requirements for {} failed: {}", self.tool, e);
            resolution
                .issues
                .push(DependencyIssue::InstallFailure(e.to_string()));
        }

        if let Some(optional) = self.optional.clone() {
            if optional.is_file() {
                resolution.installs += 1;
                if let Err(e) = installer.install(&optional, self.install_timeout) {
                    // optional extras never block a run
                    warn!(
                        "Installing optional requirements for {} failed: {}",
                        self.tool, e
                    );
                }
            }
        }

        if !self.verify_after_install {
            return self.finish(resolution, ResolverState::Satisfied);
        }

        match query.query(manifest) {
            Ok(QueryOutcome::Satisfied) => self.finish(resolution, ResolverState::Satisfied),
            Ok(other) => {
                let message = format!("requirements still unsatisfied after install: {:?}", other);
                warn!("{} {}", self.tool, message);
                resolution.issues.push(DependencyIssue::Check(message));
                self.finish(resolution, ResolverState::Unsatisfiable)
            }
            Err(e) => {
                resolution.issues.push(DependencyIssue::Check(e.to_string()));
                self.finish(resolution, ResolverState::Unsatisfiable)
            }
        }
    }

    fn finish(&mut self, mut resolution: Resolution, state: ResolverState) -> Resolution {
        self.state = state;
        resolution.state = state;
        resolution
    }
}
