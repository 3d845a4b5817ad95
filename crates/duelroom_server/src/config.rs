//! Server configuration.

use crate::error::ConfigError;
use crate::registry::DEFAULT_ROOM_CODE_LENGTH;
use derive_getters::Getters;
use duelroom_rules::GameKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Environment variable overriding the bind host.
pub const HOST_ENV: &str = "DUELROOM_HOST";
/// Environment variable overriding the bind port.
pub const PORT_ENV: &str = "DUELROOM_PORT";

const ROOM_CODE_LENGTHS: std::ops::RangeInclusive<usize> = 4..=16;

/// Settings for the room server.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    host: String,
    /// Port to bind to.
    port: u16,
    /// Path the WebSocket endpoint is mounted at.
    ws_path: String,
    /// Length of generated room codes.
    room_code_length: usize,
    /// Rule set for every room, by name.
    game: String,
    /// Fallback `tracing` filter when `RUST_LOG` is unset.
    log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            ws_path: "/ws".to_string(),
            room_code_length: DEFAULT_ROOM_CODE_LENGTH,
            game: GameKind::default().to_string(),
            log_filter: "info,duelroom_server=debug".to_string(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file. Missing keys take defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        info!(host = %config.host, port = config.port, "Config loaded successfully");
        Ok(config)
    }

    /// Applies `DUELROOM_HOST` / `DUELROOM_PORT` from the process environment.
    #[instrument(skip(self))]
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies host/port overrides looked up through `lookup`.
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(host) = lookup(HOST_ENV) {
            debug!(%host, "Host overridden from environment");
            self.host = host;
        }
        if let Some(port) = lookup(PORT_ENV) {
            self.port = port
                .parse()
                .map_err(|e| ConfigError::new(format!("Invalid {}={:?}: {}", PORT_ENV, port, e)))?;
            debug!(port = self.port, "Port overridden from environment");
        }
        Ok(self)
    }

    /// Overrides host and port, e.g. from command-line flags.
    pub fn with_bind(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    /// Checks value ranges and names.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !ROOM_CODE_LENGTHS.contains(&self.room_code_length) {
            return Err(ConfigError::new(format!(
                "room_code_length must be between {} and {}, got {}",
                ROOM_CODE_LENGTHS.start(),
                ROOM_CODE_LENGTHS.end(),
                self.room_code_length
            )));
        }
        if !self.ws_path.starts_with('/') {
            return Err(ConfigError::new(format!(
                "ws_path must start with '/', got {:?}",
                self.ws_path
            )));
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::new("host must not be empty"));
        }
        self.game_kind()?;
        Ok(())
    }

    /// Parses the configured rule set name.
    pub fn game_kind(&self) -> Result<GameKind, ConfigError> {
        self.game
            .parse()
            .map_err(|_| ConfigError::new(format!("Unknown game {:?}", self.game)))
    }

    /// Host and port to bind the listener to. Hostnames are resolved at bind time.
    pub fn bind_addr(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}
