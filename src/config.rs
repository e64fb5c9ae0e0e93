//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;

use crate::error::SyncError;
use crate::ws::route::normalize_path;

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Path of the sync WebSocket route.
    pub sync_path: String,

    /// Maximum WebSocket frame size; `None` keeps the transport default.
    pub max_frame_size: Option<usize>,

    /// Maximum WebSocket message size; `None` keeps the transport default.
    pub max_message_size: Option<usize>,

    /// Starting value of the demo counter.
    pub initial_counter: i64,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] if `LISTEN_ADDR` cannot be
    /// parsed.
    pub fn from_env() -> Result<Self, SyncError> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .map_err(|e| SyncError::InvalidConfig(format!("LISTEN_ADDR: {e}")))?;

        let sync_path =
            normalize_path(&std::env::var("SYNC_PATH").unwrap_or_else(|_| "/sync".to_string()));

        let max_frame_size = parse_env_opt("SYNC_MAX_FRAME_SIZE");
        let max_message_size = parse_env_opt("SYNC_MAX_MESSAGE_SIZE");
        let initial_counter = parse_env("SYNC_INITIAL_COUNTER", 0);

        Ok(Self {
            listen_addr,
            sync_path,
            max_frame_size,
            max_message_size,
            initial_counter,
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    parse_env_opt(key).unwrap_or(default)
}

/// Parses an environment variable as `T`, returning `None` on missing or
/// invalid values.
fn parse_env_opt<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_variable_uses_default() {
        assert_eq!(parse_env("SYNC_WS_GATEWAY_TEST_UNSET", 42usize), 42);
        assert_eq!(parse_env_opt::<usize>("SYNC_WS_GATEWAY_TEST_UNSET"), None);
    }
}
