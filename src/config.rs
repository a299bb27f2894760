//! # Configuration Management
//!
//! Loads application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (APP_SERVER_HOST, APP_UPSTREAM_MODEL, etc.)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)
//!
//! Deployment platforms commonly inject `HOST`, `PORT`, and
//! `OPENAI_API_KEY` without the APP_ prefix; those are handled as
//! explicit overrides.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration that contains all settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub rooms: RoomsConfig,
}

/// Server-specific configuration settings.
///
/// ## Fields:
/// - `host`: IP address or hostname to bind to ("127.0.0.1" for development,
///   "0.0.0.0" to accept connections from anywhere)
/// - `port`: TCP port number to listen on
/// - `cors_origin`: the single browser origin allowed to call this server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

/// Upstream realtime-provider settings.
///
/// ## Fields:
/// - `api_key`: server-held API key; never sent to clients. Absent by
///   default so a missing key is detected per request, not at startup
/// - `sessions_url`: endpoint that mints short-lived client credentials
/// - `realtime_url`: endpoint that answers SDP offers
/// - `model` / `voice`: session parameters forwarded on credential minting
/// - `request_timeout_secs`: timeout for the relay's own upstream call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub api_key: Option<String>,
    pub sessions_url: String,
    pub realtime_url: String,
    pub model: String,
    pub voice: String,
    pub request_timeout_secs: u64,
}

/// Room registry limits.
///
/// `max_rooms` bounds how many distinct rooms may exist at once so an
/// unauthenticated client cannot grow the registry without limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomsConfig {
    pub max_rooms: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origin: "http://localhost:3000".to_string(),
            },
            upstream: UpstreamConfig {
                api_key: None,
                sessions_url: "https://api.openai.com/v1/realtime/sessions".to_string(),
                realtime_url: "https://api.openai.com/v1/realtime".to_string(),
                model: "gpt-4o-realtime-preview-2024-12-17".to_string(),
                voice: "verse".to_string(),
                request_timeout_secs: 30,
            },
            rooms: RoomsConfig { max_rooms: 256 },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle the unprefixed HOST / PORT / OPENAI_API_KEY variables
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            // APP_SERVER_HOST becomes server.host, and so on
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        if let Ok(key) = env::var("OPENAI_API_KEY") {
            settings = settings.set_override("upstream.api_key", key)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// The API key is deliberately NOT validated here: its absence is a
    /// per-request error on `POST /session`, not a startup failure, so the
    /// health and room endpoints stay available without a key.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.server.cors_origin.is_empty() {
            return Err(anyhow::anyhow!("CORS origin cannot be empty"));
        }

        if self.upstream.sessions_url.is_empty() || self.upstream.realtime_url.is_empty() {
            return Err(anyhow::anyhow!("Upstream URLs cannot be empty"));
        }

        if self.upstream.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Upstream request timeout must be greater than 0"));
        }

        if self.rooms.max_rooms == 0 {
            return Err(anyhow::anyhow!("Max rooms must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.upstream.voice, "verse");
        assert!(config.upstream.api_key.is_none());
        // Absent key must not fail validation
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.rooms.max_rooms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.upstream.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
