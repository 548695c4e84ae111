//! Application configuration and CLI argument parsing
//!
//! This module handles all command-line interface definitions,
//! argument parsing, and application configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use blescan::Platform;

/// Command-line interface definition for blescan
#[derive(Parser)]
#[command(name = "blescan")]
#[command(about = "Scan for nearby Bluetooth LE devices")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Platform family deciding how scanning is authorized
    #[arg(long, value_enum)]
    pub platform: Option<Platform>,

    /// Use a simulated Bluetooth stack with sample devices
    #[arg(long)]
    pub simulate: bool,

    #[arg(short, long)]
    pub verbose: bool,
}

/// Available commands for the blescan CLI
#[derive(Subcommand)]
pub enum Commands {
    /// Press "Start Scan", show devices as they appear, stop after a while
    Scan {
        /// Seconds before stopping; runs until Ctrl-C when omitted
        #[arg(long)]
        duration: Option<u64>,

        /// Print the final device list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Toggle the scan button with Enter, quit with `q`
    Interactive,

    /// Follow Bluetooth adapter state changes
    State,
}

impl Commands {
    /// Get the command name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Scan { .. } => "scan",
            Commands::Interactive => "interactive",
            Commands::State => "state",
        }
    }
}

/// Expand a leading `~/` in a configuration path
pub fn resolve_config_path(path: &str) -> Result<PathBuf, String> {
    if let Some(rest) = path.strip_prefix("~/") {
        match std::env::var("HOME") {
            Ok(home) => Ok(PathBuf::from(home).join(rest)),
            Err(_) => Err(
                "Cannot resolve ~ in config path - HOME environment variable not set".to_string(),
            ),
        }
    } else {
        Ok(PathBuf::from(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_resolution() {
        if std::env::var("HOME").is_ok() {
            let result = resolve_config_path("~/blescan.toml");
            assert!(result.is_ok());
            assert!(!result.unwrap().starts_with("~"));
        }

        assert_eq!(
            resolve_config_path("/etc/blescan.toml").unwrap(),
            PathBuf::from("/etc/blescan.toml")
        );
        assert_eq!(
            resolve_config_path("relative/blescan.toml").unwrap(),
            PathBuf::from("relative/blescan.toml")
        );
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "blescan",
            "--simulate",
            "--platform",
            "android",
            "scan",
            "--duration",
            "5",
            "--json",
        ])
        .unwrap();

        assert!(cli.simulate);
        assert_eq!(cli.platform, Some(Platform::Android));
        assert!(matches!(
            cli.command,
            Commands::Scan {
                duration: Some(5),
                json: true
            }
        ));
        assert_eq!(cli.command.name(), "scan");
    }

    #[test]
    fn test_command_names() {
        assert_eq!(Commands::Interactive.name(), "interactive");
        assert_eq!(Commands::State.name(), "state");
    }
}
