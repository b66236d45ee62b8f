//! Property-based tests for Armory using proptest.
//!
//! Covers the validation rules, command synthesis and the parameter store
//! with generated input.

mod common;

use common::offline_rsactftool;
use proptest::prelude::*;

use armory::modules::command::split_passthrough;
use armory::modules::deps::{compare_versions, VersionConstraint};
use armory::modules::rsactftool::{RsaCtfToolModule, ATTACK_MODES, NUMERIC_PARAMS};
use armory::modules::Module;
use std::cmp::Ordering;

// ============================================================================
// Strategies for generating test data
// ============================================================================

/// Any attack mode the module accepts
fn attack_mode() -> impl Strategy<Value = &'static str> {
    prop::sample::select(ATTACK_MODES.sorted())
}

/// Strings containing the wildcard glyph somewhere
fn wildcard_pattern() -> impl Strategy<Value = String> {
    ("\\PC{0,20}", "\\PC{0,20}").prop_map(|(a, b)| format!("{}*{}", a, b))
}

/// Hex digits of either case
fn hex_digits() -> impl Strategy<Value = String> {
    prop::string::string_regex("[0-9a-fA-F]{1,64}").unwrap()
}

/// Parameter names that carry no rule
fn free_form_name() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z_]{0,15}")
        .unwrap()
        .prop_filter("has a rule", |s| {
            !matches!(s.as_str(), "mode" | "publickey" | "n" | "p" | "q" | "e" | "extra_flags")
        })
}

/// Dotted release versions
fn version() -> impl Strategy<Value = String> {
    prop::collection::vec(0u32..50, 1..4).prop_map(|parts| {
        parts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    })
}

// ============================================================================
// Validation properties
// ============================================================================

proptest! {
    #[test]
    fn prop_every_attack_mode_is_accepted(mode in attack_mode()) {
        let registry = RsaCtfToolModule.validation();
        let verdict = registry.validate("mode", mode);
        prop_assert_eq!(verdict.as_pair(), (true, ""));
    }

    #[test]
    fn prop_unknown_modes_are_rejected(mode in "\\PC{0,30}") {
        prop_assume!(!ATTACK_MODES.contains(&mode));
        let registry = RsaCtfToolModule.validation();
        let verdict = registry.validate("mode", &mode);
        prop_assert_eq!(verdict.as_pair(), (false, "No such attack mode"));
    }

    #[test]
    fn prop_wildcards_are_accepted_regardless_of_filesystem(pattern in wildcard_pattern()) {
        let registry = RsaCtfToolModule.validation();
        prop_assert!(registry.validate("publickey", &pattern).accepted);
    }

    #[test]
    fn prop_non_negative_integers_are_accepted(n in any::<u128>(), idx in 0usize..4) {
        let registry = RsaCtfToolModule.validation();
        let verdict = registry.validate(NUMERIC_PARAMS[idx], &n.to_string());
        prop_assert_eq!(verdict.as_pair(), (true, ""));
    }

    #[test]
    fn prop_arbitrarily_long_decimals_are_accepted(digits in "[0-9]{1,400}") {
        let registry = RsaCtfToolModule.validation();
        prop_assert!(registry.validate("n", &digits).accepted);
    }

    #[test]
    fn prop_prefixed_hex_is_accepted(digits in hex_digits(), idx in 0usize..4) {
        let registry = RsaCtfToolModule.validation();
        let value = format!("0x{}", digits);
        prop_assert!(registry.validate(NUMERIC_PARAMS[idx], &value).accepted);
    }

    #[test]
    fn prop_bare_prefix_with_junk_is_rejected(junk in "[g-zG-Z ]{0,8}") {
        let registry = RsaCtfToolModule.validation();
        let value = format!("0x{}", junk);
        prop_assert!(!registry.validate("q", &value).accepted);
    }

    #[test]
    fn prop_unregistered_names_accept_anything(name in free_form_name(), value in "\\PC{0,50}") {
        let registry = RsaCtfToolModule.validation();
        prop_assert!(registry.validate(&name, &value).accepted);
    }
}

// ============================================================================
// Parameter store and synthesis properties
// ============================================================================

proptest! {
    #[test]
    fn prop_set_then_get_round_trips(name in free_form_name(), value in "\\PC{0,50}") {
        let mut tool = offline_rsactftool();
        tool.set(&name, value.clone()).unwrap();
        prop_assert_eq!(tool.get(&name).unwrap().value.as_deref(), Some(value.as_str()));
    }

    #[test]
    fn prop_synthesis_is_idempotent(
        mode in attack_mode(),
        n in any::<u64>(),
        output in "\\PC{0,20}",
    ) {
        let mut tool = offline_rsactftool();
        tool.set("mode", mode).unwrap();
        tool.set("n", n.to_string()).unwrap();
        tool.set("output", output).unwrap();
        prop_assert_eq!(tool.invocation(), tool.invocation());
    }

    #[test]
    fn prop_rejected_values_never_reach_the_invocation(value in "[^0-9]\\PC{0,20}") {
        prop_assume!(!value.starts_with('-') && !value.starts_with('+'));
        let mut tool = offline_rsactftool();
        tool.set("e", "3").unwrap();
        let before = tool.invocation();

        if tool.set("e", value.clone()).is_err() {
            prop_assert_eq!(tool.invocation(), before);
            prop_assert!(!tool.invocation().tokens().contains(&value));
        }
    }

    #[test]
    fn prop_passthrough_words_end_the_invocation(
        words in prop::collection::vec("[a-zA-Z0-9=-]{1,10}", 1..6),
    ) {
        let mut tool = offline_rsactftool();
        tool.set("mode", "fermat").unwrap();
        tool.set("extra_flags", words.join(" ")).unwrap();

        let tokens = tool.invocation().into_tokens();
        prop_assert_eq!(&tokens[tokens.len() - words.len()..], words.as_slice());
        prop_assert_eq!(split_passthrough(&words.join(" ")), words);
    }
}

// ============================================================================
// Version comparison properties
// ============================================================================

proptest! {
    #[test]
    fn prop_compare_versions_is_antisymmetric(a in version(), b in version()) {
        prop_assert_eq!(compare_versions(&a, &b), compare_versions(&b, &a).reverse());
    }

    #[test]
    fn prop_exact_constraint_matches_itself(v in version()) {
        let constraint = VersionConstraint::parse(&format!("=={}", v)).unwrap();
        prop_assert!(constraint.matches(&v));
        prop_assert_eq!(compare_versions(&v, &v), Ordering::Equal);
    }

    #[test]
    fn prop_gte_and_lt_partition(v in version(), bound in version()) {
        let gte = VersionConstraint::parse(&format!(">={}", bound)).unwrap();
        let lt = VersionConstraint::parse(&format!("<{}", bound)).unwrap();
        prop_assert_ne!(gte.matches(&v), lt.matches(&v));
    }
}
