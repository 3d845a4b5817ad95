//! Duelroom - unified CLI

#![warn(missing_docs)]

use anyhow::Result;
use clap::Parser;
use duelroom_server::{Cli, Command, ServerConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command() {
        Command::Serve { config, host, port } => run_server(config, host, port).await,
        Command::CheckConfig { config } => check_config(config),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<ServerConfig> {
    let config = match path {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    Ok(config)
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();
}

/// Run the WebSocket room server
async fn run_server(path: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = load_config(path)?
        .with_env_overrides()?
        .with_bind(host, port);
    init_tracing(config.log_filter());

    info!(game = %config.game(), "Starting duelroom server");
    duelroom_server::serve(config).await
}

/// Validate a config file
fn check_config(path: PathBuf) -> Result<()> {
    init_tracing("warn");
    let config = ServerConfig::from_file(&path)?;
    println!(
        "{} is valid: {} on {}:{}{}",
        path.display(),
        config.game(),
        config.host(),
        config.port(),
        config.ws_path()
    );
    Ok(())
}
