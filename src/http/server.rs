//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Assemble the interceptor chain from configuration
//! - Wire up outer middleware (tracing, request ID)
//! - Serve plain TCP or TLS with graceful shutdown
//! - Own the rate-limit sweeper task

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderName, Request},
    middleware, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{GatewayConfig, TlsConfig};
use crate::http::chain::Chain;
use crate::http::compression::compression_middleware;
use crate::http::exclude::ExcludePaths;
use crate::http::response_time::response_time_middleware;
use crate::security::{
    auth::auth_middleware, cors::cors_middleware, headers::security_headers_middleware,
    hpp::hpp_middleware, rate_limit::rate_limit_middleware, AuthGate, CorsPolicy, HppPolicy,
    RateLimiter, TokenKeys,
};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// How long in-flight TLS connections get to finish after shutdown.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to load TLS material from {cert} / {key}: {source}")]
    Tls {
        cert: String,
        key: String,
        source: std::io::Error,
    },
}

/// The request pipeline in its standard order.
///
/// ```text
/// security headers → response time → timeout → body limit → compression
///     → rate limit → cors → hpp → auth (minus excluded paths) → resources
/// ```
#[allow(deprecated)]
pub fn standard_chain(
    config: &GatewayConfig,
    limiter: Arc<RateLimiter>,
    keys: Arc<TokenKeys>,
) -> Chain {
    let cors = Arc::new(CorsPolicy::from_config(&config.cors));
    let hpp = Arc::new(HppPolicy::from_config(&config.hpp, config.security.max_body_size));
    let gate = Arc::new(AuthGate::from_config(keys, &config.auth));

    Chain::new()
        .stage(middleware::from_fn(security_headers_middleware))
        .stage(middleware::from_fn(response_time_middleware))
        .stage(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
        .stage(RequestBodyLimitLayer::new(config.security.max_body_size))
        .stage(middleware::from_fn(compression_middleware))
        .stage_if(
            config.rate_limit.enabled,
            middleware::from_fn_with_state(limiter, rate_limit_middleware),
        )
        .stage(middleware::from_fn_with_state(cors, cors_middleware))
        .stage(middleware::from_fn_with_state(hpp, hpp_middleware))
        .stage(ExcludePaths::new(
            middleware::from_fn_with_state(gate, auth_middleware),
            &config.auth.excluded_paths,
        ))
}

/// HTTP server fronting a set of resource handlers.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    limiter: Arc<RateLimiter>,
}

impl HttpServer {
    /// Wrap `resources` in the full pipeline described by `config`.
    pub fn new(config: GatewayConfig, keys: Arc<TokenKeys>, resources: Router) -> Self {
        let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
        let chain = standard_chain(&config, Arc::clone(&limiter), keys);
        tracing::debug!(stages = chain.len(), "Interceptor chain assembled");

        let router = Self::build_router(chain.build(resources));
        Self {
            router,
            config,
            limiter,
        }
    }

    /// Add request tracing and request IDs in front of the interceptor chain.
    fn build_router(pipeline: Router) -> Router {
        pipeline
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                let request_id = req
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    request_id = %request_id,
                    method = %req.method(),
                    path = %req.uri().path(),
                )
            }))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    /// The fully layered router, for driving the pipeline without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn start_sweeper(&self, shutdown: &broadcast::Receiver<()>) {
        if self.config.rate_limit.enabled && self.config.rate_limit.sweep {
            self.limiter.spawn_sweeper(shutdown.resubscribe());
        }
    }

    /// Serve plain HTTP on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        self.start_sweeper(&shutdown);

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` with the certificate pair in `tls`.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: &TlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let rustls = load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path))
            .await
            .map_err(|source| ServerError::Tls {
                cert: tls.cert_path.clone(),
                key: tls.key_path.clone(),
                source,
            })?;
        tracing::info!(address = %addr, "HTTPS server starting");

        self.start_sweeper(&shutdown);

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Draining connections");
            drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(self.router.into_make_service_with_connect_info::<SocketAddr>())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Load a PEM certificate chain and private key.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, std::io::Error> {
    for (what, path) in [("Certificate", cert_path), ("Private key", key_path)] {
        if !path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} file not found: {:?}", what, path),
            ));
        }
    }
    RustlsConfig::from_pem_file(cert_path, key_path).await
}
