//! Configuration management for header-session.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::net::IpAddr;
use std::path::Path;

use axum::http::HeaderName;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::ServerConfig;
use crate::cli::Args;
use crate::session::DEFAULT_SID_LENGTH;

/// Largest accepted session TTL. Redis stores expiry in milliseconds as a
/// signed 64-bit value and rejects anything beyond it.
pub const MAX_TTL_SECS: u64 = i64::MAX as u64 / 1000;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerSection,
    /// Session configuration.
    pub session: SessionConfig,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Enable graceful shutdown.
    pub graceful_shutdown: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            graceful_shutdown: true,
        }
    }
}

/// Session behaviour. Fixed once a [`SessionManager`](crate::SessionManager)
/// is built from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds a session lives without being refreshed.
    #[serde(alias = "ttl")]
    pub ttl_secs: u64,
    /// Log store failures at error level instead of debug level.
    pub debug: bool,
    /// Allow `destroy_all` and `get_all_keys`.
    pub admin_operations: bool,
    /// Number of symbols in a generated session identifier.
    #[serde(alias = "sidLength")]
    pub sid_length: usize,
    /// Store sessions without expiry.
    pub persist: bool,
    /// Request/response header carrying the session identifier.
    #[serde(alias = "sidHeader")]
    pub sid_header: String,
    /// Namespace prepended to every session key in the store.
    pub key_prefix: String,
    /// Store endpoint.
    pub connection: ConnectionConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            debug: false,
            admin_operations: false,
            sid_length: DEFAULT_SID_LENGTH,
            persist: false,
            sid_header: "Session-Id".to_string(),
            key_prefix: "sess:".to_string(),
            connection: ConnectionConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Check the configuration and parse the header name.
    pub fn validate(&self) -> Result<HeaderName, ConfigError> {
        if self.sid_length == 0 {
            return Err(ConfigError::InvalidValue("sid_length", "0".into()));
        }
        if !self.persist && self.ttl_secs == 0 {
            return Err(ConfigError::InvalidValue("ttl_secs", "0".into()));
        }
        if self.ttl_secs > MAX_TTL_SECS {
            return Err(ConfigError::InvalidValue(
                "ttl_secs",
                self.ttl_secs.to_string(),
            ));
        }
        HeaderName::try_from(self.sid_header.as_str())
            .map_err(|_| ConfigError::InvalidHeader(self.sid_header.clone()))
    }
}

/// Store endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Full `redis://` URL. Overrides every other field when set.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    /// Logical database index.
    pub db: Option<i64>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "127.0.0.1".to_string(),
            port: 6379,
            db: None,
            username: None,
            password: None,
        }
    }
}

impl ConnectionConfig {
    /// Render the endpoint as a `redis://` URL.
    pub fn to_url(&self) -> String {
        if let Some(url) = self.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            return url.to_string();
        }

        let credentials = match (&self.username, &self.password) {
            (Some(user), Some(pass)) => {
                format!("{}:{}@", percent_encode(user), percent_encode(pass))
            }
            (Some(user), None) => format!("{}@", percent_encode(user)),
            (None, Some(pass)) => format!(":{}@", percent_encode(pass)),
            (None, None) => String::new(),
        };
        let db = self.db.map(|db| format!("/{db}")).unwrap_or_default();

        format!("redis://{}{}:{}{}", credentials, self.host, self.port, db)
    }
}

/// Percent-encode everything outside the URL unreserved set.
fn percent_encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log filter (error, warn, info, debug, trace, or full directives).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("HEADER_SESSION_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("HEADER_SESSION_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        if let Ok(url) =
            std::env::var("HEADER_SESSION_REDIS_URL").or_else(|_| std::env::var("REDIS_URL"))
        {
            if !url.trim().is_empty() {
                self.session.connection.url = Some(url);
            }
        }

        if let Ok(ttl) = std::env::var("HEADER_SESSION_TTL") {
            match ttl.parse() {
                Ok(ttl) => self.session.ttl_secs = ttl,
                Err(_) => tracing::warn!(
                    env_var = "HEADER_SESSION_TTL",
                    value = %ttl,
                    "invalid session ttl env value; keeping configured value"
                ),
            }
        }

        if let Some(persist) = env_flag("HEADER_SESSION_PERSIST") {
            self.session.persist = persist;
        }

        if let Some(debug) = env_flag("HEADER_SESSION_DEBUG") {
            self.session.debug = debug;
        }

        if let Some(admin) = env_flag("HEADER_SESSION_ADMIN") {
            self.session.admin_operations = admin;
        }

        if let Ok(header) = std::env::var("HEADER_SESSION_SID_HEADER") {
            self.session.sid_header = header;
        }

        if let Ok(level) = std::env::var("HEADER_SESSION_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = args.host {
            self.server.host = host.to_string();
        }

        if let Some(port) = args.port {
            self.server.port = port;
        }

        if let Some(ref url) = args.redis_url {
            self.session.connection.url = Some(url.clone());
        }

        if let Some(ttl) = args.ttl {
            self.session.ttl_secs = ttl;
        }

        if args.persist {
            self.session.persist = true;
        }

        if args.debug {
            self.session.debug = true;
        }

        if args.admin {
            self.session.admin_operations = true;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        config.apply_env();
        config.apply_args(args);

        config.session.validate()?;
        Ok(config)
    }

    /// Convert to ServerConfig for the API server.
    pub fn to_server_config(&self) -> Result<ServerConfig, ConfigError> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;

        let mut server_config = ServerConfig::new(host.to_string(), self.server.port);
        if !self.server.graceful_shutdown {
            server_config = server_config.without_graceful_shutdown();
        }

        Ok(server_config)
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing error.
    #[error("failed to parse config file: {0}")]
    Json(#[from] serde_json::Error),
    /// Invalid host address.
    #[error("invalid host address: {0}")]
    InvalidHost(String),
    /// Session header is not a valid HTTP header name.
    #[error("invalid session header name: {0}")]
    InvalidHeader(String),
    /// A setting has an unusable value.
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
