//! Check command - dependency resolution only
//!
//! Runs a module's dependency resolver (installing missing packages) and
//! reports the resulting state without running the tool.

use super::{CommandContext, Runnable};
use anyhow::Result;
use armory::modules::deps::DependencyIssue;
use armory::modules::ResolverState;
use clap::Parser;

/// Arguments for the check command
#[derive(Parser, Debug, Clone)]
pub struct CheckArgs {
    /// Module name
    #[arg(required = true)]
    pub module: String,
}

impl CheckArgs {
    /// Execute the check command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let mut tool = match ctx.instantiate(&self.module) {
            Ok(tool) => tool,
            Err(e) => return Ok(ctx.fail(&e)),
        };

        ctx.output
            .debug(&format!("Checking requirements for {}", tool.name()));
        let resolution = tool.check_reqs();

        if ctx.output.is_json() {
            ctx.output.json(&resolution)?;
        } else {
            for issue in &resolution.issues {
                match issue {
                    DependencyIssue::Conflict(m) => {
                        ctx.output.negative(&format!("Version conflict: {}", m));
                        ctx.output.info(&format!(
                            "Install {} in a virtual environment to avoid version conflicts",
                            tool.name()
                        ));
                    }
                    DependencyIssue::InstallFailure(m) => {
                        ctx.output.warning(&format!("Install failed: {}", m))
                    }
                    DependencyIssue::Check(m) => ctx.output.warning(m),
                }
            }
            if resolution.installs > 0 {
                ctx.output
                    .info(&format!("{} install attempt(s) made", resolution.installs));
            }
            match resolution.state {
                ResolverState::Satisfied => ctx
                    .output
                    .positive(&format!("Requirements for {} are satisfied", tool.name())),
                state => ctx
                    .output
                    .negative(&format!("Requirements for {} are {}", tool.name(), state)),
            }
        }

        Ok(if resolution.is_clean() { 0 } else { 3 })
    }
}

impl Runnable for CheckArgs {
    fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx)
    }
}
