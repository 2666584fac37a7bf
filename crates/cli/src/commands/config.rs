//! Configuration commands

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::Path;

use crate::output::{print_success, OutputFormat};
use fixturekit_common::FixturesConfig;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Write a configuration file with default values
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn execute(cmd: ConfigCommands, path: &Path, format: OutputFormat) -> Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let config = FixturesConfig::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
                _ => println!("{}", toml::to_string_pretty(&config)?),
            }
        }
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to replace it)", path.display());
            }
            FixturesConfig::default().save(path)?;
            print_success(&format!("Wrote {}", path.display()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixturekit.toml");

        execute(ConfigCommands::Init { force: false }, &path, OutputFormat::Plain).unwrap();
        assert!(path.exists());

        assert!(execute(ConfigCommands::Init { force: false }, &path, OutputFormat::Plain).is_err());
        execute(ConfigCommands::Init { force: true }, &path, OutputFormat::Plain).unwrap();
    }
}
