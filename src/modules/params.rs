//! Parameter store
//!
//! An insertion-ordered map of module parameters. Every write goes through
//! the module's [`ValidationRegistry`]; a rejected value leaves the store
//! untouched.

use super::validation::ValidationRegistry;
use super::{ModuleError, ModuleResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Name of the passthrough parameter whose value is appended raw to the
/// invocation. It is framework-internal and never iterated as a flag.
pub const PASSTHROUGH_KEY: &str = "extra_flags";

/// Declaration of one module option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn new(name: &'static str, description: &'static str) -> Self {
        Self { name, description }
    }
}

/// A single module parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Current value, `None` until explicitly set
    pub value: Option<String>,
    /// Optional help text
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Whether a value was explicitly assigned
    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// The value, or the empty string when unset
    pub fn value_or_empty(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

/// Validated, insertion-ordered parameter state of one module instance
#[derive(Debug, Clone)]
pub struct ParameterStore {
    params: IndexMap<String, Parameter>,
    registry: ValidationRegistry,
}

impl ParameterStore {
    /// Create an empty store bound to `registry`
    pub fn new(registry: ValidationRegistry) -> Self {
        Self {
            params: IndexMap::new(),
            registry,
        }
    }

    /// Create a store with one unset parameter per declared option
    pub fn with_specs(registry: ValidationRegistry, specs: &[ParamSpec]) -> Self {
        let mut store = Self::new(registry);
        for spec in specs {
            store.declare(spec.name, spec.description);
        }
        store
    }

    /// Declare an unset parameter. Existing parameters are left as they are.
    pub fn declare(&mut self, name: &str, description: &str) {
        self.params
            .entry(name.to_string())
            .or_insert_with(|| Parameter::new(name).with_description(description));
    }

    /// Validate and store `value` under `name`
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> ModuleResult<()> {
        let value = value.into();
        let verdict = self.registry.validate(name, &value);
        if !verdict.accepted {
            tracing::debug!("Rejected value for '{}': {}", name, verdict.reason);
            return Err(ModuleError::Validation {
                name: name.to_string(),
                reason: verdict.reason,
            });
        }

        self.params
            .entry(name.to_string())
            .or_insert_with(|| Parameter::new(name))
            .value = Some(value);
        Ok(())
    }

    /// Return a parameter to the unset state
    pub fn reset(&mut self, name: &str) -> ModuleResult<()> {
        let param = self
            .params
            .get_mut(name)
            .ok_or_else(|| ModuleError::NotFound(format!("parameter '{}'", name)))?;
        param.value = None;
        Ok(())
    }

    /// Look up a parameter, set or not
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.get(name)
    }

    /// Value of the passthrough parameter, if set and non-empty
    pub fn passthrough(&self) -> Option<&str> {
        self.params
            .get(PASSTHROUGH_KEY)
            .and_then(|p| p.value.as_deref())
            .filter(|v| !v.trim().is_empty())
    }

    /// Iterate parameters in insertion order, skipping framework-internal names
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Parameter)> + '_ {
        self.params
            .iter()
            .filter(|(name, _)| !is_internal(name))
            .map(|(name, param)| (name.as_str(), param))
    }

    /// Iterate every parameter including internal ones, for display
    pub fn iter_all(&self) -> impl Iterator<Item = &Parameter> + '_ {
        self.params.values()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn registry(&self) -> &ValidationRegistry {
        &self.registry
    }
}

fn is_internal(name: &str) -> bool {
    name == PASSTHROUGH_KEY
}

#[cfg(test)]
mod tests {
    use super::super::validation::rules;
    use super::*;

    fn store() -> ParameterStore {
        let mut registry = ValidationRegistry::new();
        registry.register("n", rules::integer_or_hex("Value must be int or 0xhex"));
        ParameterStore::with_specs(
            registry,
            &[
                ParamSpec::new("n", "modulus"),
                ParamSpec::new("output", "output file"),
                ParamSpec::new(PASSTHROUGH_KEY, "raw arguments"),
            ],
        )
    }

    #[test]
    fn test_declared_params_start_unset() {
        let store = store();
        assert_eq!(store.len(), 3);
        assert!(store.iter().all(|(_, p)| !p.is_set()));
        assert_eq!(store.get("n").unwrap().description, "modulus");
    }

    #[test]
    fn test_rejected_set_does_not_mutate() {
        let mut store = store();
        store.set("n", "17").unwrap();

        let err = store.set("n", "0x").unwrap_err();
        assert!(matches!(err, ModuleError::Validation { ref name, .. } if name == "n"));
        assert_eq!(store.get("n").unwrap().value.as_deref(), Some("17"));
    }

    #[test]
    fn test_iter_skips_passthrough_and_keeps_order() {
        let mut store = store();
        store.set(PASSTHROUGH_KEY, "--verbose").unwrap();
        store.set("zeta", "1").unwrap();

        let names: Vec<_> = store.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["n", "output", "zeta"]);
        assert_eq!(store.passthrough(), Some("--verbose"));
        // restartable
        assert_eq!(store.iter().count(), 3);
    }

    #[test]
    fn test_reset() {
        let mut store = store();
        store.set("output", "/tmp/out").unwrap();
        store.reset("output").unwrap();
        assert!(!store.get("output").unwrap().is_set());
        assert!(store.reset("missing").is_err());
    }

    #[test]
    fn test_blank_passthrough_is_ignored() {
        let mut store = store();
        store.set(PASSTHROUGH_KEY, "   ").unwrap();
        assert_eq!(store.passthrough(), None);
    }
}
