//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits so a TOML file can supply any subset of
//! fields; environment variables are layered on top by the loader.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener and process settings.
    pub server: ServerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Authentication and rate limiting.
    pub security: SecurityConfig,

    /// Cross-origin settings.
    pub cors: CorsConfig,
}

impl ServiceConfig {
    /// Summary safe to log: the API key secret is reduced to a flag.
    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            host: self.server.host.clone(),
            port: self.server.port,
            environment: self.server.environment,
            log_level: self.observability.log_level,
            cors_origins: self.cors.origins.clone(),
            rate_limit_window_ms: self.security.window_ms,
            rate_limit_max_requests: self.security.max_requests,
            api_key_auth_enabled: self.security.api_key_required(),
        }
    }
}

/// Redacted view of the configuration, logged at startup.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub log_level: LogLevel,
    pub cors_origins: String,
    pub rate_limit_window_ms: u64,
    pub rate_limit_max_requests: u32,
    pub api_key_auth_enabled: bool,
}

/// Deployment mode. Production redacts internal error details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" => Ok(Environment::Development),
            "production" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(format!(
                "expected one of development, production, test (got {other:?})"
            )),
        }
    }
}

/// Minimum severity emitted by the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            other => Err(format!(
                "expected one of error, warn, info, debug (got {other:?})"
            )),
        }
    }
}

/// Log line encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable output for local development.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!("expected json or pretty (got {other:?})")),
        }
    }
}

/// Listener and process configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind (hostname or IP).
    pub host: String,

    /// TCP port, 1-65535.
    pub port: u16,

    /// Deployment mode.
    pub environment: Environment,

    /// Number of reverse proxies in front of the service whose
    /// `X-Forwarded-For` entries are trusted. 0 uses the socket peer.
    pub trust_proxy_hops: usize,

    /// Time allowed for in-flight requests to drain after a shutdown signal.
    pub shutdown_timeout_ms: u64,

    /// Maximum accepted request body size in bytes.
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9000,
            environment: Environment::default(),
            trust_proxy_hops: 1,
            shutdown_timeout_ms: 10_000,
            body_limit_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (error, warn, info, debug).
    pub log_level: LogLevel,

    /// Log encoding (json, pretty).
    pub log_format: LogFormat,

    /// Prometheus exporter bind address. Disabled when unset.
    pub metrics_address: Option<String>,
}

/// Request security configuration.
///
/// Immutable once loaded; the middleware instances built from it live for
/// the whole process.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Shared secret expected in `x-api-key`. Authentication is off when unset.
    pub api_key_secret: Option<String>,

    /// Rate limit window length in milliseconds.
    pub window_ms: u64,

    /// Requests admitted per key and window.
    pub max_requests: u32,

    /// Add hardening headers (nosniff, frame options, HSTS, ...) to responses.
    pub response_headers: bool,
}

impl SecurityConfig {
    /// Whether API key authentication (and user-keyed limiting) is active.
    pub fn api_key_required(&self) -> bool {
        self.api_key_secret.is_some()
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            api_key_secret: None,
            window_ms: 300_000,
            max_requests: 100,
            response_headers: true,
        }
    }
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field(
                "api_key_secret",
                &self.api_key_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("window_ms", &self.window_ms)
            .field("max_requests", &self.max_requests)
            .field("response_headers", &self.response_headers)
            .finish()
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Comma-separated origin list, or `*` for any origin.
    pub origins: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: "*".to_string(),
        }
    }
}
