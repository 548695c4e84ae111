use std::time::Duration;

use log::info;

use blescan::{Config, Error, Result};

mod app_config;
mod app_state;
mod commands;

use app_config::{resolve_config_path, Cli, Commands};
use app_state::ScannerApp;

#[tokio::main]
async fn main() -> Result<()> {
    use clap::Parser;

    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let config_path = cli
        .config
        .as_deref()
        .map(resolve_config_path)
        .transpose()
        .map_err(Error::Config)?;

    let mut config = Config::load(config_path.as_deref())?;
    if let Some(platform) = cli.platform {
        config.platform = platform;
    }
    config.validate()?;

    info!("Running `{}` on {:?}", cli.command.name(), config.platform);
    let app = ScannerApp::new(config, cli.simulate).await?;

    let outcome = match cli.command {
        Commands::Scan { duration, json } => {
            let duration = duration
                .map(Duration::from_secs)
                .or(app.config.scan.duration);
            commands::run_scan(&app, duration, json).await
        }
        Commands::Interactive => commands::run_interactive(&app).await,
        Commands::State => commands::run_state(&app).await,
    };

    app.shutdown().await;
    outcome
}
