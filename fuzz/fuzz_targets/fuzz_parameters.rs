//! Fuzz target for parameter validation and command synthesis.
//!
//! Whatever sequence of assignments is applied, a rejected value must never
//! show up in the synthesized invocation and synthesis must be repeatable.

#![no_main]

use arbitrary::Arbitrary;
use armory::modules::rsactftool::RsaCtfToolModule;
use armory::modules::ToolModule;
use libfuzzer_sys::fuzz_target;

const NAMES: &[&str] = &[
    "mode",
    "publickey",
    "n",
    "p",
    "q",
    "e",
    "uncipher",
    "output",
    "extra_flags",
];

#[derive(Debug, Arbitrary)]
struct Assignment {
    name: u8,
    value: String,
}

fuzz_target!(|assignments: Vec<Assignment>| {
    let mut tool = ToolModule::new(&RsaCtfToolModule, "python3", "tools");

    for assignment in &assignments {
        let name = NAMES[assignment.name as usize % NAMES.len()];
        let before = tool.get(name).and_then(|p| p.value.clone());
        if tool.set(name, assignment.value.clone()).is_err() {
            assert_eq!(tool.get(name).and_then(|p| p.value.clone()), before);
        }
    }

    assert_eq!(tool.invocation(), tool.invocation());
});
