//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, outer layers, graceful shutdown)
//!     → chain.rs (ordered interceptors around the resource router)
//!         → response_time.rs, compression.rs (response wrappers)
//!         → exclude.rs (skip a stage for listed paths)
//!     → response.rs (rejections short-circuit here)
//!     → Send to client
//! ```

pub mod chain;
pub mod compression;
pub mod exclude;
pub mod response;
pub mod response_time;
pub mod server;

pub use chain::Chain;
pub use exclude::ExcludePaths;
pub use response::Rejection;
pub use server::{standard_chain, HttpServer, ServerError, X_REQUEST_ID};
