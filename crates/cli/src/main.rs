//! fixturekit CLI
//!
//! Operator tooling around the fixture stack: probe the remote automation
//! endpoint, inspect configuration, and load table fixtures by hand.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

use commands::{config, db, probe};
use fixturekit_common::FixturesConfig;

/// fixturekit - test fixture lifecycle tooling
#[derive(Parser)]
#[command(name = "fixturekit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = fixturekit_common::DEFAULT_CONFIG_FILE, global = true, env = "FIXTUREKIT_CONFIG")]
    config: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the remote automation endpoint can open and quit a session
    Probe(probe::ProbeArgs),

    /// Inspect or create the configuration file
    #[command(subcommand)]
    Config(config::ConfigCommands),

    /// Load or unload table fixtures
    #[command(subcommand)]
    Db(db::DbCommands),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Probe(args) => {
            let config = FixturesConfig::load(&cli.config)?;
            probe::execute(args, config, cli.format).await?
        }
        Commands::Config(cmd) => config::execute(cmd, &cli.config, cli.format)?,
        Commands::Db(cmd) => {
            let config = FixturesConfig::load(&cli.config)?;
            db::execute(cmd, &config, cli.format)?
        }
        Commands::Version => {
            println!("fixturekit v{}", fixturekit_common::VERSION);
        }
    }
    Ok(())
}
