//! Command synthesis
//!
//! Turns a [`ParameterStore`] into an argument vector for the wrapped tool.
//! The result is always handed to a process spawn as separate tokens; it is
//! never joined into a shell string for execution.

use super::params::ParameterStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// The final token sequence handed to process execution:
/// `[interpreter, script, flags..., passthrough...]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    tokens: Vec<String>,
}

impl Invocation {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    /// Executable to spawn
    pub fn program(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }

    /// Arguments following the executable
    pub fn args(&self) -> &[String] {
        self.tokens.get(1..).unwrap_or(&[])
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<String> {
        self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Display for Invocation {
    /// Shell-quoted rendering, for logs and dry runs only
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell_words::join(&self.tokens))
    }
}

/// Format a parameter name as a command-line flag: `-x` or `--name`
pub fn flag_for(name: &str) -> String {
    if name.chars().count() == 1 {
        format!("-{}", name)
    } else {
        format!("--{}", name)
    }
}

/// Split raw passthrough text into tokens
///
/// Uses POSIX word splitting without any expansion. Text with unbalanced
/// quotes falls back to whitespace splitting.
pub fn split_passthrough(raw: &str) -> Vec<String> {
    match shell_words::split(raw) {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::warn!("Passthrough arguments are not well quoted ({}), splitting on whitespace", e);
            raw.split_whitespace().map(String::from).collect()
        }
    }
}

/// Builds invocations for one wrapped tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSynthesizer {
    interpreter: PathBuf,
    script: PathBuf,
}

impl CommandSynthesizer {
    pub fn new(interpreter: impl Into<PathBuf>, script: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: script.into(),
        }
    }

    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Flag tokens for every set, non-empty parameter in store order
    pub fn flags(&self, store: &ParameterStore) -> Vec<String> {
        let mut tokens = Vec::new();
        for (name, param) in store.iter() {
            match param.value.as_deref() {
                Some(value) if !value.is_empty() => {
                    tokens.push(flag_for(name));
                    tokens.push(value.to_string());
                }
                _ => {}
            }
        }
        tokens
    }

    /// Build a fresh invocation from the current store contents
    ///
    /// The passthrough value is appended unvalidated. It is safe only because
    /// the invocation is executed as an argument vector.
    pub fn synthesize(&self, store: &ParameterStore) -> Invocation {
        let mut tokens = vec![
            self.interpreter.to_string_lossy().into_owned(),
            self.script.to_string_lossy().into_owned(),
        ];
        tokens.extend(self.flags(store));
        if let Some(raw) = store.passthrough() {
            tokens.extend(split_passthrough(raw));
        }
        Invocation::new(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::super::params::{ParamSpec, PASSTHROUGH_KEY};
    use super::super::validation::ValidationRegistry;
    use super::*;

    fn synth() -> CommandSynthesizer {
        CommandSynthesizer::new("/usr/bin/python3", "/opt/tool/tool.py")
    }

    fn store() -> ParameterStore {
        ParameterStore::with_specs(
            ValidationRegistry::new(),
            &[
                ParamSpec::new("mode", ""),
                ParamSpec::new("n", ""),
                ParamSpec::new("output", ""),
                ParamSpec::new(PASSTHROUGH_KEY, ""),
            ],
        )
    }

    #[test]
    fn test_flag_for() {
        assert_eq!(flag_for("n"), "-n");
        assert_eq!(flag_for("publickey"), "--publickey");
        assert_eq!(flag_for("é"), "-é");
    }

    #[test]
    fn test_synthesize_orders_by_insertion() {
        let mut store = store();
        store.set("output", "out.txt").unwrap();
        store.set("mode", "fermat").unwrap();

        let inv = synth().synthesize(&store);
        assert_eq!(
            inv.tokens(),
            &[
                "/usr/bin/python3",
                "/opt/tool/tool.py",
                "--mode",
                "fermat",
                "--output",
                "out.txt"
            ]
        );
        assert_eq!(inv.program(), Some("/usr/bin/python3"));
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let mut store = store();
        store.set("n", "").unwrap();
        let inv = synth().synthesize(&store);
        assert_eq!(inv.args(), &["/opt/tool/tool.py"]);
    }

    #[test]
    fn test_values_with_spaces_stay_single_tokens() {
        let mut store = store();
        store.set("output", "my file.txt").unwrap();
        let inv = synth().synthesize(&store);
        assert_eq!(inv.tokens().last().map(String::as_str), Some("my file.txt"));
        assert!(inv.to_string().ends_with("'my file.txt'"));
    }

    #[test]
    fn test_split_passthrough() {
        assert_eq!(
            split_passthrough("--verbose --depth 3"),
            vec!["--verbose", "--depth", "3"]
        );
        assert_eq!(split_passthrough("--msg 'a b'"), vec!["--msg", "a b"]);
        assert_eq!(split_passthrough("--msg 'a b"), vec!["--msg", "'a", "b"]);
        assert_eq!(split_passthrough("x; rm -rf /"), vec!["x;", "rm", "-rf", "/"]);
    }
}
