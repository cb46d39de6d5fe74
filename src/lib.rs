//! Security-focused HTTP request pipeline.
//!
//! Wraps a set of resource handlers in an ordered interceptor chain:
//! hardening headers, latency reporting, gzip, per-client rate limiting,
//! strict CORS, parameter-pollution cleanup and cookie-token
//! authentication.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resources;
pub mod security;

pub use config::schema::GatewayConfig;
pub use http::{Chain, HttpServer};
pub use lifecycle::Shutdown;
