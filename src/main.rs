//! Armory - validated wrapper modules for third-party attack tools
//!
//! This is the main entry point for the Armory CLI.

mod cli;

use anyhow::Result;
use armory::config::Config;
use cli::commands::{CommandContext, Runnable};
use cli::output::OutputFormatter;
use cli::{Cli, Commands};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    if cli.verbosity() >= 2 {
        eprintln!("Armory v{}", VERSION);
    }

    // Load configuration; a broken config file is an error, not a silent default
    let config = match Config::load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            OutputFormatter::new(!cli.no_color, cli.is_json(), cli.verbosity())
                .negative(&format!("Failed to load config: {}", e));
            std::process::exit(e.exit_code());
        }
    };

    // Create command context
    let mut ctx = CommandContext::new(&cli, config);

    // Execute the appropriate command
    let exit_code = match &cli.command {
        Commands::List(args) => args.run(&mut ctx)?,
        Commands::Show(args) => args.run(&mut ctx)?,
        Commands::Check(args) => args.run(&mut ctx)?,
        Commands::Run(args) => args.run(&mut ctx)?,
    };

    std::process::exit(exit_code);
}

/// Initialize logging based on verbosity level
fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(verbosity >= 3).with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}
