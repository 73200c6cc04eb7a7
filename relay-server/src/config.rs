//! Startup configuration, read once from a YAML file.
//!
//! Grounded on `original_source/config/config.go`'s viper-based
//! `LoadServerConfig` (a `server.port` string read from `config/server.yaml`);
//! supplemented with `debugMode` and `tickIntervalMS`, which
//! `lobby.rs::reload_config` reads from its own `GameConfig.json` as plain
//! untyped strings-to-numbers. Here the whole document deserializes into one
//! typed struct via `serde_yaml`, the YAML analogue the corpus reaches for in
//! place of viper.

use serde::Deserialize;
use std::path::Path;

fn default_port() -> String {
    "8080".to_string()
}

fn default_tick_interval_ms() -> u64 {
    50
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default, rename = "debugMode")]
    pub debug_mode: bool,
    #[serde(default = "default_tick_interval_ms", rename = "tickIntervalMS")]
    pub tick_interval_ms: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        ServerSection {
            port: default_port(),
            debug_mode: false,
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,
}

/// Reads and parses `path`. Unlike `reload_config`, this is invoked once at
/// startup only — there is no hot reload.
pub async fn load_server_config(path: impl AsRef<Path>) -> Result<ServerConfig, String> {
    let raw = tokio::fs::read_to_string(path.as_ref())
        .await
        .map_err(|e| format!("failed to read server config {:?}: {e}", path.as_ref()))?;
    serde_yaml::from_str(&raw).map_err(|e| format!("failed to parse server config: {e}"))
}
