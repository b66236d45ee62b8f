//! Validation registry for module parameters
//!
//! Every module type carries a table mapping parameter names to validation
//! rules. A rule is a pure function from `(name, value)` to a [`Verdict`];
//! names without a registered rule fall through to [`rules::accept_any`].
//!
//! Validation never fails with an error. It reports a structured verdict and
//! leaves it to the parameter store to turn a rejection into
//! [`ModuleError::Validation`](super::ModuleError::Validation).

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Outcome of validating one parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the value may be stored
    pub accepted: bool,
    /// Human-readable rejection reason, empty when accepted
    pub reason: String,
}

impl Verdict {
    /// An accepting verdict with an empty reason
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: String::new(),
        }
    }

    /// A rejecting verdict
    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: reason.into(),
        }
    }

    /// View as the `(accepted, reason)` pair
    pub fn as_pair(&self) -> (bool, &str) {
        (self.accepted, self.reason.as_str())
    }
}

/// A validation rule: pure, side-effect free, `(name, value) -> verdict`
pub type Rule = Arc<dyn Fn(&str, &str) -> Verdict + Send + Sync>;

/// An immutable, case-sensitive set of permitted tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedValues {
    values: HashSet<&'static str>,
}

impl AllowedValues {
    pub fn new(values: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    /// Exact membership test
    pub fn contains(&self, value: &str) -> bool {
        self.values.contains(value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Members in sorted order, for display
    pub fn sorted(&self) -> Vec<&'static str> {
        let mut values: Vec<_> = self.values.iter().copied().collect();
        values.sort_unstable();
        values
    }
}

/// Lookup table from parameter name to validation rule
///
/// Registration is first-wins: once a name has a rule, later registrations
/// for the same name are ignored. Building a registry in precedence order
/// therefore gives exactly one applicable rule per name.
#[derive(Clone)]
pub struct ValidationRegistry {
    rules: HashMap<String, Rule>,
    fallback: Rule,
}

impl ValidationRegistry {
    /// Create a registry where every name is accepted
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
            fallback: rules::accept_any(),
        }
    }

    /// Register a rule for one parameter name
    pub fn register(&mut self, name: impl Into<String>, rule: Rule) -> &mut Self {
        let name = name.into();
        if self.rules.contains_key(&name) {
            tracing::debug!("Ignoring duplicate validation rule for '{}'", name);
        } else {
            self.rules.insert(name, rule);
        }
        self
    }

    /// Register the same rule for a family of parameter names
    pub fn register_family<'a>(
        &mut self,
        names: impl IntoIterator<Item = &'a str>,
        rule: Rule,
    ) -> &mut Self {
        for name in names {
            self.register(name, Arc::clone(&rule));
        }
        self
    }

    /// Whether a dedicated rule exists for `name`
    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Validate a candidate value for `name`
    pub fn validate(&self, name: &str, value: &str) -> Verdict {
        let rule = self.rules.get(name).unwrap_or(&self.fallback);
        rule(name, value)
    }
}

impl Default for ValidationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ValidationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.rules.keys().collect();
        names.sort();
        f.debug_struct("ValidationRegistry")
            .field("rules", &names)
            .finish()
    }
}

/// Built-in rule constructors
pub mod rules {
    use super::{AllowedValues, Rule, Verdict};
    use std::path::Path;
    use std::sync::Arc;

    /// Wildcard glyph that marks a value as a glob pattern
    pub const WILDCARD: char = '*';

    /// Prefix that introduces a hexadecimal literal
    pub const HEX_PREFIX: &str = "0x";

    /// Accept only exact members of `allowed`
    pub fn one_of(allowed: &'static AllowedValues, reason: &'static str) -> Rule {
        Arc::new(move |_name: &str, value: &str| {
            if allowed.contains(value) {
                Verdict::accept()
            } else {
                Verdict::reject(reason)
            }
        })
    }

    /// Accept glob patterns or paths to existing readable files
    ///
    /// The wildcard test is a plain substring check; glob syntax is not
    /// validated here.
    pub fn file_or_wildcard(reason: &'static str) -> Rule {
        Arc::new(move |_name: &str, value: &str| {
            if value.contains(WILDCARD) || is_readable_file(value) {
                Verdict::accept()
            } else {
                Verdict::reject(reason)
            }
        })
    }

    /// Accept base-10 integers or `0x`-prefixed hex literals of any length
    pub fn integer_or_hex(reason: &'static str) -> Rule {
        Arc::new(move |_name: &str, value: &str| {
            if is_decimal(value) || is_prefixed_hex(value) {
                Verdict::accept()
            } else {
                Verdict::reject(reason)
            }
        })
    }

    /// Accept anything, verbatim
    ///
    /// This is the fallback for free-form tool flags and is allow-all on
    /// purpose.
    pub fn accept_any() -> Rule {
        Arc::new(|_name: &str, _value: &str| Verdict::accept())
    }

    fn is_readable_file(value: &str) -> bool {
        let path = Path::new(value);
        path.is_file() && std::fs::File::open(path).is_ok()
    }

    /// Optional sign followed by at least one ASCII digit
    pub(crate) fn is_decimal(value: &str) -> bool {
        let digits = value
            .strip_prefix('-')
            .or_else(|| value.strip_prefix('+'))
            .unwrap_or(value);
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
    }

    /// `0x` followed by at least one hex digit and nothing else
    pub(crate) fn is_prefixed_hex(value: &str) -> bool {
        match value.strip_prefix(HEX_PREFIX) {
            Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit()),
            None => false,
        }
    }
}
