//! Configuration loading from disk and the environment.

use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: defaults, then the optional TOML file, then the
/// process environment. The result is validated before it is returned.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_file(path)?,
        None => ServiceConfig::default(),
    };
    apply_env(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Build a validated configuration from defaults and a variable lookup.
pub fn from_lookup<F>(lookup: F) -> Result<ServiceConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ServiceConfig::default();
    apply_env(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Parse a TOML file. Not validated on its own; env overrides come next.
pub fn load_file(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Overlay environment variables onto `config`.
///
/// Empty values count as unset, except `API_KEY_SECRET`: a blank secret is
/// kept so validation refuses it. `NODE_ENV` is read when `APP_ENV` is unset.
pub fn apply_env<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |var: &'static str| {
        lookup(var)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    if let Some(host) = get("HOST") {
        config.server.host = host;
    }
    if let Some(port) = parse_var(&get, "PORT")? {
        config.server.port = port;
    }
    let environment_var = if get("APP_ENV").is_some() {
        "APP_ENV"
    } else {
        "NODE_ENV"
    };
    if let Some(environment) = parse_var(&get, environment_var)? {
        config.server.environment = environment;
    }
    if let Some(hops) = parse_var(&get, "TRUST_PROXY_HOPS")? {
        config.server.trust_proxy_hops = hops;
    }
    if let Some(timeout) = parse_var(&get, "SHUTDOWN_TIMEOUT_MS")? {
        config.server.shutdown_timeout_ms = timeout;
    }
    if let Some(limit) = parse_var(&get, "BODY_LIMIT_BYTES")? {
        config.server.body_limit_bytes = limit;
    }

    if let Some(level) = parse_var(&get, "LOG_LEVEL")? {
        config.observability.log_level = level;
    }
    if let Some(format) = parse_var(&get, "LOG_FORMAT")? {
        config.observability.log_format = format;
    }
    if let Some(address) = get("METRICS_ADDRESS") {
        config.observability.metrics_address = Some(address);
    }

    if let Some(secret) = lookup("API_KEY_SECRET") {
        config.security.api_key_secret = Some(secret.trim().to_string());
    }
    if let Some(window) = parse_var(&get, "RATE_LIMIT_WINDOW_MS")? {
        config.security.window_ms = window;
    }
    if let Some(max) = parse_var(&get, "RATE_LIMIT_MAX_REQUESTS")? {
        config.security.max_requests = max;
    }
    if let Some(enabled) = parse_var(&get, "SECURITY_HEADERS")? {
        config.security.response_headers = enabled;
    }

    if let Some(origins) = get("CORS_ORIGINS") {
        config.cors.origins = origins;
    }

    Ok(())
}

fn parse_var<T, G>(get: &G, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&'static str) -> Option<String>,
{
    get(var)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ConfigError::InvalidVar {
                var,
                reason: format!("{raw:?}: {e}"),
            })
        })
        .transpose()
}
