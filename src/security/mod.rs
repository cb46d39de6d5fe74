//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client fixed window, 429)
//!     → cors.rs (origin allow-list, preflight, 403)
//!     → hpp.rs (collapse duplicated parameters)
//!     → auth.rs (cookie token → Identity, 401)
//!     → Pass to resource handlers
//! Outgoing response:
//!     ← headers.rs (hardening headers on everything)
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Fail closed: reject on any security check failure
//! - No trust in client input; the rate-limit key is the socket peer, not a header

pub mod auth;
pub mod cors;
pub mod headers;
pub mod hpp;
pub mod rate_limit;
pub mod token;

pub use auth::{authorize_role, AuthError, AuthGate, AuthzError, Identity};
pub use cors::{CorsPolicy, OriginAllowList};
pub use hpp::HppPolicy;
pub use rate_limit::{Admission, ClientKey, RateLimiter};
pub use token::{Claims, TokenError, TokenKeys};
