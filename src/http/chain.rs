//! Interceptor chain builder.
//!
//! A [`Chain`] is an ordered list of interceptors (tower layers) that is
//! folded around a terminal [`Router`]. The first stage added is the
//! outermost: it sees the request first and the response last.
//!
//! ```text
//! Chain::new().stage(a).stage(b).stage(c).build(router)
//!
//!     request → a → b → c → router
//!     response ← a ← b ← c ← router
//! ```
//!
//! The builder never reorders or deduplicates stages.

use std::convert::Infallible;

use axum::{
    extract::Request,
    response::IntoResponse,
    routing::Route,
    Router,
};
use tower::{Layer, Service};

type Stage = Box<dyn FnOnce(Router) -> Router + Send>;

/// Ordered sequence of interceptors awaiting a terminal handler.
#[derive(Default)]
pub struct Chain {
    stages: Vec<Stage>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor. It runs after every stage already added.
    pub fn stage<L>(mut self, layer: L) -> Self
    where
        L: Layer<Route> + Clone + Send + Sync + 'static,
        L::Service: Service<Request> + Clone + Send + Sync + 'static,
        <L::Service as Service<Request>>::Response: IntoResponse + 'static,
        <L::Service as Service<Request>>::Error: Into<Infallible> + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        self.stages.push(Box::new(move |router: Router| router.layer(layer)));
        self
    }

    /// Append an interceptor only when `enabled` is set.
    pub fn stage_if<L>(self, enabled: bool, layer: L) -> Self
    where
        L: Layer<Route> + Clone + Send + Sync + 'static,
        L::Service: Service<Request> + Clone + Send + Sync + 'static,
        <L::Service as Service<Request>>::Response: IntoResponse + 'static,
        <L::Service as Service<Request>>::Error: Into<Infallible> + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        if enabled {
            self.stage(layer)
        } else {
            self
        }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Wrap `terminal` so the first stage added is the outermost.
    pub fn build(self, terminal: Router) -> Router {
        // Router::layer wraps around whatever is already there, so the
        // innermost stage has to be applied first.
        self.stages
            .into_iter()
            .rev()
            .fold(terminal, |router, stage| stage(router))
    }
}
