//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Per-client admission control.
    pub rate_limit: RateLimitConfig,

    /// Token authentication settings.
    pub auth: AuthConfig,

    /// Origin access control.
    pub cors: CorsConfig,

    /// Parameter pollution guard.
    pub hpp: HppConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests admitted per client per window.
    pub max_requests: u32,

    /// Fixed window length in seconds.
    pub window_secs: u64,

    /// Periodically drop windows that have already rolled over.
    pub sweep: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 5,
            window_secs: 60,
            sweep: true,
        }
    }
}

/// Token authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Cookie carrying the signed token.
    pub cookie_name: String,

    /// HMAC secret for signing and verification. Overridden by `JWT_SECRET`.
    pub jwt_secret: String,

    /// Lifetime of issued tokens in seconds. Overridden by `JWT_EXPIRES_IN`.
    pub token_ttl_secs: u64,

    /// Paths served without authentication (exact match).
    pub excluded_paths: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "Bearer".to_string(),
            jwt_secret: String::new(),
            token_ttl_secs: 15 * 60,
            excluded_paths: vec![
                "/health".to_string(),
                "/execs/login".to_string(),
                "/execs/forgotpassword".to_string(),
                "/execs/resetpassword/reset".to_string(),
            ],
        }
    }
}

/// Origin access control configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Permitted origins. `*` allows any origin, `scheme://host:*` any port on that host.
    pub allowed_origins: Vec<String>,

    /// Methods advertised on preflight.
    pub allowed_methods: Vec<String>,

    /// Request headers advertised on preflight.
    pub allowed_headers: Vec<String>,

    /// Response headers exposed to scripts.
    pub expose_headers: Vec<String>,

    /// Preflight cache lifetime in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "https://my-origin-url.com".to_string(),
                "https://www.myfrontend.com".to_string(),
                "https://localhost:3000".to_string(),
                "http://localhost:*".to_string(),
            ],
            allowed_methods: ["GET", "POST", "PUT", "PATCH", "DELETE"]
                .map(String::from)
                .to_vec(),
            allowed_headers: ["Content-Type", "Authorization"].map(String::from).to_vec(),
            expose_headers: vec!["Authorization".to_string()],
            max_age_secs: 3600,
        }
    }
}

/// Parameter pollution guard configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HppConfig {
    /// Sanitize query-string parameters.
    pub check_query: bool,

    /// Sanitize body parameters of matching requests.
    pub check_body: bool,

    /// Media type whose bodies are sanitized.
    pub body_content_type: String,

    /// Parameter names that keep every occurrence.
    pub whitelist: Vec<String>,
}

impl Default for HppConfig {
    fn default() -> Self {
        Self {
            check_query: true,
            check_body: true,
            body_content_type: "application/x-www-form-urlencoded".to_string(),
            whitelist: ["sortBy", "sortOrder", "name", "age", "class"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [rate_limit]
            max_requests = 100

            [auth]
            jwt_secret = "s3cret"
            "#,
        )
        .unwrap();

        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.auth.cookie_name, "Bearer");
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert!(config.hpp.whitelist.contains(&"sortBy".to_string()));
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_log_format_parses_lowercase() {
        let config: ObservabilityConfig = toml::from_str(r#"log_format = "json""#).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
