//! RsaCtfTool module - RSA attack tool wrapper
//!
//! Drives [RsaCtfTool](https://github.com/RsaCtfTool/RsaCtfTool) from a
//! checkout under the tools directory.
//!
//! Parameters:
//! - `mode`: attack to run, one of [`ATTACK_MODES`]
//! - `publickey`: public key file, or a glob such as `keys/*.pub`
//! - `n`, `p`, `q`, `e`: RSA numbers, decimal or `0x` hex
//! - `uncipher`, `uncipherfile`, `output`, `key`: passed through unchecked
//! - `extra_flags`: raw arguments appended as-is (not validated)

use super::params::{ParamSpec, PASSTHROUGH_KEY};
use super::validation::{rules, AllowedValues, ValidationRegistry};
use super::{Module, ToolLayout};
use once_cell::sync::Lazy;
use std::path::Path;

/// Attack names RsaCtfTool accepts
pub static ATTACK_MODES: Lazy<AllowedValues> = Lazy::new(|| {
    AllowedValues::new([
        "brent",
        "fermat_numbers_gcd",
        "comfact_cn",
        "wiener",
        "factordb",
        "smallq",
        "pollard_rho",
        "euler",
        "z3_solver",
        "neca",
        "cm_factor",
        "mersenne_pm1_gcd",
        "SQUFOF",
        "small_crt_exp",
        "fibonacci_gcd",
        "smallfraction",
        "boneh_durfee",
        "roca",
        "fermat",
        "londahl",
        "mersenne_primes",
        "partial_q",
        "siqs",
        "noveltyprimes",
        "binary_polinomial_factoring",
        "primorial_pm1_gcd",
        "pollard_p_1",
        "ecm2",
        "cube_root",
        "system_primes_gcd",
        "dixon",
        "ecm",
        "pastctfprimes",
        "qicheng",
        "wolframalpha",
        "hastads",
        "same_n_huge_e",
        "commonfactors",
        "pisano_period",
        "nsif",
        "all",
    ])
});

/// Parameters holding RSA numbers
pub const NUMERIC_PARAMS: [&str; 4] = ["n", "p", "q", "e"];

const OPTIONS: &[ParamSpec] = &[
    ParamSpec::new("mode", "Attack to run (one of the accepted attack modes)"),
    ParamSpec::new("publickey", "Public key file or glob pattern"),
    ParamSpec::new("n", "Modulus, decimal or 0x hex"),
    ParamSpec::new("p", "First prime, decimal or 0x hex"),
    ParamSpec::new("q", "Second prime, decimal or 0x hex"),
    ParamSpec::new("e", "Public exponent, decimal or 0x hex"),
    ParamSpec::new("uncipher", "Ciphertext to decrypt"),
    ParamSpec::new("uncipherfile", "File containing ciphertext to decrypt"),
    ParamSpec::new("output", "Output file for results"),
    ParamSpec::new("key", "Private key file to read"),
    ParamSpec::new(PASSTHROUGH_KEY, "Raw arguments appended verbatim (not validated)"),
];

/// Module wrapping RsaCtfTool
pub struct RsaCtfToolModule;

impl Module for RsaCtfToolModule {
    fn name(&self) -> &'static str {
        "rsactftool"
    }

    fn description(&self) -> &'static str {
        "Recover RSA private keys from weak public keys and decipher data"
    }

    fn options(&self) -> &'static [ParamSpec] {
        OPTIONS
    }

    fn validation(&self) -> ValidationRegistry {
        let mut registry = ValidationRegistry::new();
        registry
            .register("mode", rules::one_of(&ATTACK_MODES, "No such attack mode"))
            .register("publickey", rules::file_or_wildcard("No such file"))
            .register_family(
                NUMERIC_PARAMS,
                rules::integer_or_hex("Value must be int or 0xhex"),
            );
        registry
    }

    fn layout(&self, tools_dir: &Path) -> ToolLayout {
        ToolLayout::conventional(tools_dir.join("RsaCtfTool"), "RsaCtfTool.py")
    }

    fn choices(&self, name: &str) -> Option<Vec<&'static str>> {
        (name == "mode").then(|| ATTACK_MODES.sorted())
    }
}
