//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: `{value}`")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay `JWT_SECRET`, `JWT_EXPIRES_IN` and `API_PORT` onto the config.
///
/// `lookup` abstracts the environment so tests don't mutate process state.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(secret) = lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
        config.auth.jwt_secret = secret;
    }

    if let Some(raw) = lookup("JWT_EXPIRES_IN").filter(|s| !s.is_empty()) {
        config.auth.token_ttl_secs = parse_duration_secs(&raw).ok_or(ConfigError::Env {
            var: "JWT_EXPIRES_IN",
            value: raw,
        })?;
    }

    if let Some(port) = lookup("API_PORT").filter(|s| !s.is_empty()) {
        let port = port.trim_start_matches(':');
        let port: u16 = port.parse().map_err(|_| ConfigError::Env {
            var: "API_PORT",
            value: port.to_string(),
        })?;
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{}:{}", host, port);
    }

    Ok(())
}

/// Parse `90`, `90s`, `15m` or `1h` into seconds.
fn parse_duration_secs(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let (digits, multiplier) = match raw.char_indices().last()? {
        (idx, 's') => (&raw[..idx], 1),
        (idx, 'm') => (&raw[..idx], 60),
        (idx, 'h') => (&raw[..idx], 3600),
        _ => (raw, 1),
    };
    digits.parse::<u64>().ok()?.checked_mul(multiplier)
}
