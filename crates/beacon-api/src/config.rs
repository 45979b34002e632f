//! Configuration management for the Beacon service.

use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use beacon_delivery::{BroadcastConfig, ClientConfig, CompletionConfig};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::state::AuthSettings;

const CONFIG_FILE: &str = "config.toml";

/// Complete service configuration with defaults, file, and environment
/// overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables (highest priority)
/// 2. Configuration file (`config.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// Credentials (`CHANNEL_SECRET`, `CHANNEL_ACCESS_TOKEN`, `ADMIN_TOKEN`,
/// `COMPLETION_API_KEY`) have empty defaults and are expected from the
/// environment. An empty value disables the feature that needs it.
///
/// # Example
///
/// ```no_run
/// use beacon_api::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
///
/// println!("Server will bind to {}:{}", config.host, config.port);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Database
    /// PostgreSQL connection URL.
    ///
    /// Environment variable: `DATABASE_URL`
    #[serde(default = "default_database_url", alias = "DATABASE_URL")]
    pub database_url: String,
    /// Maximum number of database connections in the pool.
    ///
    /// Environment variable: `DATABASE_MAX_CONNECTIONS`
    #[serde(default = "default_max_connections", alias = "DATABASE_MAX_CONNECTIONS")]
    pub database_max_connections: u32,
    /// Minimum number of connections to maintain in the pool.
    ///
    /// Environment variable: `DATABASE_MIN_CONNECTIONS`
    #[serde(default = "default_min_connections", alias = "DATABASE_MIN_CONNECTIONS")]
    pub database_min_connections: u32,
    /// Database connection acquire timeout in seconds.
    ///
    /// Environment variable: `DATABASE_CONNECTION_TIMEOUT`
    #[serde(default = "default_acquire_timeout", alias = "DATABASE_CONNECTION_TIMEOUT")]
    pub database_connection_timeout: u64,
    /// Database connection idle timeout in seconds.
    ///
    /// Environment variable: `DATABASE_IDLE_TIMEOUT`
    #[serde(default = "default_idle_timeout", alias = "DATABASE_IDLE_TIMEOUT")]
    pub database_idle_timeout: u64,
    /// Maximum lifetime of database connections in seconds.
    ///
    /// Environment variable: `DATABASE_MAX_LIFETIME`
    #[serde(default = "default_max_lifetime", alias = "DATABASE_MAX_LIFETIME")]
    pub database_max_lifetime: u64,

    // Server
    /// Server bind address.
    ///
    /// Environment variable: `HOST`
    #[serde(default = "default_host", alias = "HOST")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `PORT`
    #[serde(default = "default_port", alias = "PORT")]
    pub port: u16,
    /// HTTP request timeout in seconds.
    ///
    /// Environment variable: `REQUEST_TIMEOUT`
    #[serde(default = "default_request_timeout", alias = "REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    // Messaging platform
    /// Secret keying the webhook signature.
    ///
    /// Environment variable: `CHANNEL_SECRET`
    #[serde(default, alias = "CHANNEL_SECRET")]
    pub channel_secret: String,
    /// Bearer credential for push and reply calls.
    ///
    /// Environment variable: `CHANNEL_ACCESS_TOKEN`
    #[serde(default, alias = "CHANNEL_ACCESS_TOKEN")]
    pub channel_access_token: String,
    /// Header carrying the webhook signature.
    ///
    /// Environment variable: `SIGNATURE_HEADER`
    #[serde(default = "default_signature_header", alias = "SIGNATURE_HEADER")]
    pub signature_header: String,
    /// Base URL of the messaging API.
    ///
    /// Environment variable: `MESSAGING_API_BASE_URL`
    #[serde(default = "default_messaging_api_base_url", alias = "MESSAGING_API_BASE_URL")]
    pub messaging_api_base_url: String,

    // Broadcast
    /// Timeout for a single push in seconds.
    ///
    /// Environment variable: `DELIVERY_TIMEOUT_SECONDS`
    #[serde(default = "default_delivery_timeout", alias = "DELIVERY_TIMEOUT_SECONDS")]
    pub delivery_timeout_seconds: u64,
    /// Maximum pushes in flight during a broadcast.
    ///
    /// Environment variable: `BROADCAST_CONCURRENCY`
    #[serde(default = "default_broadcast_concurrency", alias = "BROADCAST_CONCURRENCY")]
    pub broadcast_concurrency: usize,
    /// Bearer token protecting administrative routes. Empty disables the check.
    ///
    /// Environment variable: `ADMIN_TOKEN`
    #[serde(default, alias = "ADMIN_TOKEN")]
    pub admin_token: String,

    // Text generation
    /// Base URL of the text-generation service.
    ///
    /// Environment variable: `COMPLETION_API_BASE_URL`
    #[serde(default = "default_completion_api_base_url", alias = "COMPLETION_API_BASE_URL")]
    pub completion_api_base_url: String,
    /// API key for the text-generation service. Empty means replies echo.
    ///
    /// Environment variable: `COMPLETION_API_KEY`
    #[serde(default, alias = "COMPLETION_API_KEY")]
    pub completion_api_key: String,
    /// Model requested from the text-generation service.
    ///
    /// Environment variable: `COMPLETION_MODEL`
    #[serde(default = "default_completion_model", alias = "COMPLETION_MODEL")]
    pub completion_model: String,
    /// System prompt sent with every completion. Empty sends none.
    ///
    /// Environment variable: `COMPLETION_SYSTEM_PROMPT`
    #[serde(default, alias = "COMPLETION_SYSTEM_PROMPT")]
    pub completion_system_prompt: String,
    /// Reply used when the text-generation service fails.
    ///
    /// Environment variable: `REPLY_FALLBACK_TEXT`
    #[serde(default = "default_reply_fallback_text", alias = "REPLY_FALLBACK_TEXT")]
    pub reply_fallback_text: String,

    // Logging
    /// Tracing filter directives, e.g. `info,beacon=debug`.
    ///
    /// Environment variable: `RUST_LOG`
    #[serde(default = "default_log_level", alias = "RUST_LOG")]
    pub rust_log: String,
}

impl Config {
    /// Load configuration from defaults, config file, and environment variable
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns error if a source cannot be parsed or validation fails.
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(""));

        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Convert to messaging client configuration.
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.messaging_api_base_url.clone(),
            channel_access_token: self.channel_access_token.clone(),
            timeout: Duration::from_secs(self.delivery_timeout_seconds),
            user_agent: "Beacon/1.0".to_string(),
        }
    }

    /// Convert to broadcast configuration.
    pub fn to_broadcast_config(&self) -> BroadcastConfig {
        BroadcastConfig {
            concurrency: self.broadcast_concurrency,
            delivery_timeout: Duration::from_secs(self.delivery_timeout_seconds),
        }
    }

    /// Convert to completion client configuration.
    ///
    /// Returns `None` when no API key is configured.
    pub fn to_completion_config(&self) -> Option<CompletionConfig> {
        if self.completion_api_key.trim().is_empty() {
            return None;
        }

        let system_prompt = Some(self.completion_system_prompt.trim())
            .filter(|prompt| !prompt.is_empty())
            .map(str::to_string);

        Some(CompletionConfig {
            base_url: self.completion_api_base_url.clone(),
            api_key: self.completion_api_key.clone(),
            model: self.completion_model.clone(),
            system_prompt,
            ..CompletionConfig::default()
        })
    }

    /// Inbound authentication settings for the router.
    pub fn to_auth_settings(&self) -> AuthSettings {
        AuthSettings {
            channel_secret: self.channel_secret.clone(),
            signature_header: self.signature_header.clone(),
            admin_token: Some(self.admin_token.trim())
                .filter(|token| !token.is_empty())
                .map(str::to_string),
        }
    }

    /// Request timeout for the HTTP server.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Parse server socket address from host and port configuration.
    ///
    /// # Errors
    ///
    /// Returns error if host and port do not form a socket address.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Get database URL with password masked for logging.
    pub fn database_url_masked(&self) -> String {
        if let Some(at_pos) = self.database_url.find('@') {
            if let Some(colon_pos) = self.database_url[..at_pos].rfind(':') {
                let mut masked = self.database_url.clone();
                masked.replace_range(colon_pos + 1..at_pos, "***");
                return masked;
            }
        }
        self.database_url.clone()
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.database_max_connections == 0 {
            anyhow::bail!("database max_connections must be greater than 0");
        }

        if self.database_min_connections > self.database_max_connections {
            anyhow::bail!("database min_connections cannot exceed max_connections");
        }

        if self.broadcast_concurrency == 0 {
            anyhow::bail!("broadcast_concurrency must be greater than 0");
        }

        if self.delivery_timeout_seconds == 0 {
            anyhow::bail!("delivery_timeout_seconds must be greater than 0");
        }

        if self.signature_header.trim().is_empty() {
            anyhow::bail!("signature_header must not be empty");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            database_max_connections: default_max_connections(),
            database_min_connections: default_min_connections(),
            database_connection_timeout: default_acquire_timeout(),
            database_idle_timeout: default_idle_timeout(),
            database_max_lifetime: default_max_lifetime(),
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            channel_secret: String::new(),
            channel_access_token: String::new(),
            signature_header: default_signature_header(),
            messaging_api_base_url: default_messaging_api_base_url(),
            delivery_timeout_seconds: default_delivery_timeout(),
            broadcast_concurrency: default_broadcast_concurrency(),
            admin_token: String::new(),
            completion_api_base_url: default_completion_api_base_url(),
            completion_api_key: String::new(),
            completion_model: default_completion_model(),
            completion_system_prompt: String::new(),
            reply_fallback_text: default_reply_fallback_text(),
            rust_log: default_log_level(),
        }
    }
}

fn default_database_url() -> String {
    "postgresql://localhost/beacon".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_acquire_timeout() -> u64 {
    10
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_max_lifetime() -> u64 {
    1800
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_signature_header() -> String {
    "x-line-signature".to_string()
}

fn default_messaging_api_base_url() -> String {
    "https://api.line.me".to_string()
}

fn default_delivery_timeout() -> u64 {
    beacon_delivery::DEFAULT_DELIVERY_TIMEOUT_SECONDS
}

fn default_broadcast_concurrency() -> usize {
    beacon_delivery::DEFAULT_BROADCAST_CONCURRENCY
}

fn default_completion_api_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_completion_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_reply_fallback_text() -> String {
    "Sorry, I can't answer right now. Please try again later.".to_string()
}

fn default_log_level() -> String {
    "info,beacon=debug,tower_http=debug".to_string()
}
