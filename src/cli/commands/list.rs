//! List command - show registered modules

use super::{CommandContext, Runnable};
use anyhow::Result;
use clap::Parser;

/// Arguments for the list command
#[derive(Parser, Debug, Clone)]
pub struct ListArgs {}

impl ListArgs {
    /// Execute the list command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let rows: Vec<Vec<String>> = ctx
            .registry
            .names()
            .into_iter()
            .filter_map(|name| ctx.registry.get(name))
            .map(|module| vec![module.name().to_string(), module.description().to_string()])
            .collect();

        ctx.output.section("Modules");
        ctx.output.table(&["Name", "Description"], &rows);
        Ok(0)
    }
}

impl Runnable for ListArgs {
    fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx)
    }
}
