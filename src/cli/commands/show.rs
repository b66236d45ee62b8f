//! Show command - list a module's options

use super::{parse_assignment, CommandContext, Runnable};
use anyhow::Result;
use clap::Parser;

/// Arguments for the show command
#[derive(Parser, Debug, Clone)]
pub struct ShowArgs {
    /// Module name
    #[arg(required = true)]
    pub module: String,

    /// Option values to apply before showing (name=value)
    #[arg(long = "set", short = 's', action = clap::ArgAction::Append)]
    pub set: Vec<String>,
}

impl ShowArgs {
    /// Execute the show command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let mut tool = match ctx.instantiate(&self.module) {
            Ok(tool) => tool,
            Err(e) => return Ok(ctx.fail(&e)),
        };

        for raw in &self.set {
            let applied = parse_assignment(raw)
                .and_then(|(name, value)| tool.set(name, value).map_err(Into::into));
            if let Err(e) = applied {
                return Ok(ctx.fail(&e));
            }
        }

        let rows: Vec<Vec<String>> = tool
            .params()
            .iter_all()
            .map(|param| {
                vec![
                    param.name.clone(),
                    param.value_or_empty().to_string(),
                    param.description.clone(),
                ]
            })
            .collect();

        ctx.output.section(&format!("Module options ({})", tool.name()));
        ctx.output.table(&["Name", "Current Setting", "Description"], &rows);

        if let Some(module) = ctx.registry.get(&self.module) {
            for param in tool.params().iter_all() {
                if let Some(values) = module.choices(&param.name) {
                    let rows: Vec<Vec<String>> =
                        values.iter().map(|v| vec![v.to_string()]).collect();
                    ctx.output.section(&format!("Accepted values for {}", param.name));
                    ctx.output.table(&[param.name.as_str()], &rows);
                }
            }
        }
        Ok(0)
    }
}

impl Runnable for ShowArgs {
    fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx)
    }
}
