//! Path-exclusion adapter.
//!
//! Wraps any interceptor so that requests for a fixed set of paths bypass it
//! and go straight to the next stage. Used to keep login and health
//! endpoints reachable without a token.

use std::collections::HashSet;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use futures_util::future::Either;
use tower::{util::Oneshot, Layer, Service, ServiceExt};

/// Layer that applies `L` everywhere except the excluded paths.
#[derive(Clone)]
pub struct ExcludePaths<L> {
    layer: L,
    paths: Arc<HashSet<String>>,
}

impl<L> ExcludePaths<L> {
    /// Paths are matched by exact string equality against the request path.
    pub fn new<I, P>(layer: L, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            layer,
            paths: Arc::new(paths.into_iter().map(Into::into).collect()),
        }
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.paths.contains(path)
    }
}

impl<S, L> Layer<S> for ExcludePaths<L>
where
    S: Clone,
    L: Layer<S>,
{
    type Service = ExcludePathsService<L::Service, S>;

    fn layer(&self, inner: S) -> Self::Service {
        ExcludePathsService {
            guarded: self.layer.layer(inner.clone()),
            bypass: inner,
            paths: Arc::clone(&self.paths),
        }
    }
}

/// Dispatches to the wrapped interceptor or straight to the next stage.
#[derive(Clone)]
pub struct ExcludePathsService<G, B> {
    guarded: G,
    bypass: B,
    paths: Arc<HashSet<String>>,
}

impl<G, B> Service<Request> for ExcludePathsService<G, B>
where
    G: Service<Request> + Clone,
    B: Service<Request, Response = G::Response, Error = G::Error> + Clone,
{
    type Response = G::Response;
    type Error = G::Error;
    type Future = Either<Oneshot<G, Request>, Oneshot<B, Request>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Readiness is driven per call by the oneshot on whichever branch is taken.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request) -> Self::Future {
        if self.paths.contains(req.uri().path()) {
            tracing::trace!(path = %req.uri().path(), "Excluded path, bypassing stage");
            Either::Right(self.bypass.clone().oneshot(req))
        } else {
            Either::Left(self.guarded.clone().oneshot(req))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::StatusCode,
        middleware::{self, Next},
        response::{IntoResponse, Response},
        routing::get,
        Router,
    };

    async fn deny(_req: Request, _next: Next) -> Response {
        StatusCode::UNAUTHORIZED.into_response()
    }

    fn app() -> Router {
        Router::new()
            .route("/execs/login", get(|| async { "login" }))
            .route("/execs", get(|| async { "execs" }))
            .route("/execs/login/extra", get(|| async { "extra" }))
            .layer(ExcludePaths::new(middleware::from_fn(deny), ["/execs/login"]))
    }

    async fn status_of(path: &str) -> StatusCode {
        app()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_excluded_path_bypasses_stage() {
        assert_eq!(status_of("/execs/login").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_other_paths_hit_stage() {
        assert_eq!(status_of("/execs").await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_matching_is_exact() {
        // Prefix and query variations are not exclusions.
        assert_eq!(status_of("/execs/login/extra").await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_of("/execs/login?next=/").await, StatusCode::OK);
    }

    #[test]
    fn test_is_excluded() {
        let layer = ExcludePaths::new(tower::layer::util::Identity::new(), vec!["/a".to_string()]);
        assert!(layer.is_excluded("/a"));
        assert!(!layer.is_excluded("/a/"));
    }
}
