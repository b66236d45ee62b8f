//! Fuzz target for requirements manifest parsing.
//!
//! Parsing arbitrary text must never panic, and every parsed constraint
//! must be usable against arbitrary installed versions.

#![no_main]

use armory::modules::deps::{compare_versions, DependencyManifest};
use libfuzzer_sys::fuzz_target;
use std::collections::HashMap;

fuzz_target!(|data: (&str, Vec<(String, String)>)| {
    let (content, installed) = data;

    let Ok(manifest) = DependencyManifest::parse(content) else {
        return;
    };

    for req in manifest.requirements() {
        for (_, version) in &installed {
            let _ = req.constraint.matches(version);
            let _ = compare_versions(version, &req.constraint.to_string());
        }
    }

    let installed: HashMap<String, String> = installed.into_iter().collect();
    let _ = manifest.evaluate(&installed);
});
