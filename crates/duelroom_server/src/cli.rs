//! Command-line interface for duelroom.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Duelroom - two-player room coordinator over WebSockets
#[derive(Parser, Debug)]
#[command(name = "duelroom")]
#[command(about = "Room and session coordinator for two-player board games", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the WebSocket room server
    Serve {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Host to bind to (overrides config and DUELROOM_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides config and DUELROOM_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate a config file and exit
    CheckConfig {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: PathBuf,
    },
}

impl Cli {
    /// Selected command, falling back to `serve` with no overrides.
    pub fn command(self) -> Command {
        self.command.unwrap_or(Command::Serve {
            config: None,
            host: None,
            port: None,
        })
    }
}
