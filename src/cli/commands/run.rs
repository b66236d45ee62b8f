//! Run command - set options and execute a module
//!
//! Options are applied in the order given; the first rejected value stops
//! the command before anything is resolved or executed.

use super::{parse_assignment, CommandContext, Runnable};
use anyhow::Result;
use armory::modules::{ExecuteOptions, ModuleError, PASSTHROUGH_KEY};
use armory::Error;
use clap::Parser;

/// Arguments for the run command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Module name
    #[arg(required = true)]
    pub module: String,

    /// Option values (name=value), may be repeated
    #[arg(long = "set", short = 's', action = clap::ArgAction::Append)]
    pub set: Vec<String>,

    /// Raw arguments appended to the tool's command line
    #[arg(long, allow_hyphen_values = true)]
    pub extra: Option<String>,

    /// Abort when dependencies cannot be resolved
    #[arg(long)]
    pub strict: bool,

    /// Print the command line without resolving dependencies or running it
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    /// Execute the run command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let tool = match ctx.instantiate(&self.module) {
            Ok(tool) => tool,
            Err(e) => return Ok(ctx.fail(&e)),
        };
        let strict = self.strict || tool.is_strict();
        let json = ctx.output.is_json();
        let mut tool = tool
            .with_strict(strict)
            .with_execute_options(
                ExecuteOptions::new()
                    .with_timeout(ctx.config.exec_timeout())
                    .with_stream(!json),
            );

        let extra = self
            .extra
            .as_deref()
            .map(|raw| format!("{}={}", PASSTHROUGH_KEY, raw));
        for raw in self.set.iter().chain(extra.iter()) {
            let applied = parse_assignment(raw)
                .and_then(|(name, value)| tool.set(name, value).map_err(Error::from));
            if let Err(e) = applied {
                let code = ctx.fail(&e);
                if e.is_recoverable() {
                    ctx.output.info(&format!(
                        "Run `armory show {}` for the options and accepted values",
                        self.module
                    ));
                }
                return Ok(code);
            }
            ctx.output.debug(&format!("Set {}", raw));
        }

        if self.dry_run {
            let output = tool.check();
            if json {
                ctx.output.json(&output)?;
            } else {
                ctx.output.info(&output.msg);
            }
            return Ok(0);
        }

        ctx.output.info(&format!("Running {}", tool.name()));
        match tool.run() {
            Ok(output) => {
                if json {
                    ctx.output.json(&output)?;
                } else {
                    if let Some(resolution) = &output.dependencies {
                        for issue in &resolution.issues {
                            ctx.output.warning(issue.message());
                        }
                    }
                    ctx.output.positive(&output.msg);
                }
                Ok(output.rc.unwrap_or(0))
            }
            Err(e) => {
                if let ModuleError::CommandFailed { result } = &e {
                    ctx.output.json(result)?;
                }
                Ok(ctx.fail(&Error::from(e)))
            }
        }
    }
}

impl Runnable for RunArgs {
    fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args_parsing() {
        let args = RunArgs::try_parse_from([
            "run",
            "rsactftool",
            "-s",
            "mode=fermat",
            "--set",
            "n=0x1A",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(args.module, "rsactftool");
        assert_eq!(args.set, vec!["mode=fermat", "n=0x1A"]);
        assert!(args.dry_run);
        assert!(!args.strict);
    }

    #[test]
    fn test_run_args_extra_allows_flags() {
        let args =
            RunArgs::try_parse_from(["run", "rsactftool", "--extra", "--verbose --depth 3"])
                .unwrap();
        assert_eq!(args.extra.as_deref(), Some("--verbose --depth 3"));
    }
}
