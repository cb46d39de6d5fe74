//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows > 0, limits > 0)
//! - Reject configs the pipeline cannot run safely with (no signing secret)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("listener.tls.{field} `{path}` does not exist")]
    TlsFileMissing { field: &'static str, path: String },

    #[error("rate_limit.max_requests must be greater than zero")]
    ZeroRequestLimit,

    #[error("rate_limit.window_secs must be greater than zero")]
    ZeroWindow,

    #[error("auth.jwt_secret is empty (set it in the config file or JWT_SECRET)")]
    MissingSecret,

    #[error("auth.cookie_name is empty")]
    MissingCookieName,

    #[error("auth.token_ttl_secs must be greater than zero")]
    ZeroTokenTtl,

    #[error("cors.allowed_origins is empty; every request would be rejected")]
    EmptyAllowList,

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if let Some(tls) = &config.listener.tls {
        for (field, path) in [("cert_path", &tls.cert_path), ("key_path", &tls.key_path)] {
            if !Path::new(path).exists() {
                errors.push(ValidationError::TlsFileMissing {
                    field,
                    path: path.clone(),
                });
            }
        }
    }

    if config.rate_limit.enabled {
        if config.rate_limit.max_requests == 0 {
            errors.push(ValidationError::ZeroRequestLimit);
        }
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError::ZeroWindow);
        }
    }

    if config.auth.jwt_secret.trim().is_empty() {
        errors.push(ValidationError::MissingSecret);
    }
    if config.auth.cookie_name.is_empty() {
        errors.push(ValidationError::MissingCookieName);
    }
    if config.auth.token_ttl_secs == 0 {
        errors.push(ValidationError::ZeroTokenTtl);
    }

    if config.cors.allowed_origins.is_empty() {
        errors.push(ValidationError::EmptyAllowList);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.auth.jwt_secret = "test-secret".to_string();
        config
    }

    #[test]
    fn test_defaults_with_secret_are_valid() {
        assert_eq!(validate_config(&valid()), Ok(()));
    }

    #[test]
    fn test_default_config_requires_secret() {
        let errors = validate_config(&GatewayConfig::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingSecret]);
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid();
        config.listener.bind_address = "not-an-address".to_string();
        config.rate_limit.max_requests = 0;
        config.rate_limit.window_secs = 0;
        config.cors.allowed_origins.clear();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroWindow));
        assert!(errors.contains(&ValidationError::EmptyAllowList));
    }

    #[test]
    fn test_disabled_rate_limit_skips_range_checks() {
        let mut config = valid();
        config.rate_limit.enabled = false;
        config.rate_limit.max_requests = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_missing_tls_files() {
        let mut config = valid();
        config.listener.tls = Some(crate::config::TlsConfig {
            cert_path: "/nonexistent/cert.pem".to_string(),
            key_path: "/nonexistent/key.pem".to_string(),
        });
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
