//! Per-client admission control (fixed window).
//!
//! Each client address gets a `RateWindow` counting requests since the
//! window opened. Once the window is `window` old the next request resets it.
//! Exactly `max_requests` requests pass per window; the one after is blocked.
//!
//! Windows live in a sharded `DashMap`. The entry API holds the shard lock
//! for the whole reset-increment-compare sequence, so concurrent requests
//! from one client are serialized while other clients proceed, and a
//! client's first requests racing each other always land on the same window.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::RateLimitConfig;
use crate::http::response::Rejection;
use crate::observability::metrics;

/// Rate-limit identity: the peer's IP address, port stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    /// Key used when the transport did not record a peer address.
    pub fn unknown() -> Self {
        Self("unknown".to_string())
    }

    pub fn from_request(req: &Request) -> Self {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| Self::from(addr.ip()))
            .unwrap_or_else(Self::unknown)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<IpAddr> for ClientKey {
    fn from(ip: IpAddr) -> Self {
        Self(ip.to_string())
    }
}

impl std::fmt::Display for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request count for one client in the current window.
#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    window_start: Instant,
}

/// Outcome of [`RateLimiter::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted { remaining: u32 },
    Blocked { retry_after: Duration },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }
}

/// Fixed-window rate limiter keyed by client address.
pub struct RateLimiter {
    windows: DashMap<ClientKey, RateWindow>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count one request from `key` at `now` and decide whether it may pass.
    pub fn admit(&self, key: &ClientKey, now: Instant) -> Admission {
        let mut entry = self.windows.entry(key.clone()).or_insert(RateWindow {
            count: 0,
            window_start: now,
        });
        let state = entry.value_mut();

        if now.saturating_duration_since(state.window_start) >= self.window {
            state.count = 0;
            state.window_start = now;
        }

        state.count = state.count.saturating_add(1);

        if state.count > self.max_requests {
            let elapsed = now.saturating_duration_since(state.window_start);
            Admission::Blocked {
                retry_after: self.window.saturating_sub(elapsed),
            }
        } else {
            Admission::Admitted {
                remaining: self.max_requests - state.count,
            }
        }
    }

    /// Drop windows that have rolled over. A dropped client is recreated
    /// with a fresh window on its next request, exactly as a reset would.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, state| now.saturating_duration_since(state.window_start) < self.window);
        before.saturating_sub(self.windows.len())
    }

    /// Number of clients currently holding a window.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Sweep once per window until shutdown.
    pub fn spawn_sweeper(self: &Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(limiter.window);
            // First tick fires immediately; nothing to evict yet.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = limiter.sweep(Instant::now());
                        let tracked = limiter.tracked_clients();
                        metrics::record_tracked_clients(tracked);
                        if evicted > 0 {
                            tracing::debug!(evicted, tracked, "Evicted idle rate-limit windows");
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
            tracing::debug!("Rate-limit sweeper stopped");
        })
    }
}

/// Middleware function for per-client rate limiting.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let key = ClientKey::from_request(&request);

    match limiter.admit(&key, Instant::now()) {
        Admission::Admitted { .. } => next.run(request).await,
        Admission::Blocked { retry_after } => {
            tracing::warn!(client = %key, "Rate limit exceeded");
            metrics::record_rejection("rate_limit", "window_exhausted");
            // Round up so a client honouring the header lands in the next window.
            let retry_after_secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            Rejection::RateLimited { retry_after_secs }.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn key(ip: &str) -> ClientKey {
        ClientKey::from(ip.parse::<IpAddr>().unwrap())
    }

    #[test]
    fn test_exact_limit_then_blocked() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let client = key("127.0.0.1");
        let now = Instant::now();

        for i in 0..5 {
            assert_eq!(
                limiter.admit(&client, now),
                Admission::Admitted { remaining: 4 - i }
            );
        }
        assert!(!limiter.admit(&client, now).is_admitted());
        // Stays blocked for the rest of the window.
        assert!(!limiter.admit(&client, now + Duration::from_secs(59)).is_admitted());
    }

    #[test]
    fn test_budget_restored_after_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));
        let client = key("10.0.0.1");
        let start = Instant::now();

        assert!(limiter.admit(&client, start).is_admitted());
        assert!(limiter.admit(&client, start).is_admitted());
        assert!(!limiter.admit(&client, start).is_admitted());

        let later = start + Duration::from_secs(10);
        assert!(limiter.admit(&client, later).is_admitted());
        assert!(limiter.admit(&client, later).is_admitted());
        assert!(!limiter.admit(&client, later).is_admitted());
    }

    #[test]
    fn test_fixed_window_allows_boundary_burst() {
        let limiter = RateLimiter::new(3, Duration::from_secs(10));
        let client = key("10.0.0.2");
        let start = Instant::now();

        // First request opens the window; the rest arrive just before rollover.
        assert!(limiter.admit(&client, start).is_admitted());
        let edge = start + Duration::from_millis(9_900);
        assert!(limiter.admit(&client, edge).is_admitted());
        assert!(limiter.admit(&client, edge).is_admitted());

        let after = start + Duration::from_secs(10);
        for _ in 0..3 {
            assert!(limiter.admit(&client, after).is_admitted());
        }
    }

    #[test]
    fn test_retry_after_counts_down() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let client = key("10.0.0.3");
        let start = Instant::now();

        limiter.admit(&client, start);
        assert_eq!(
            limiter.admit(&client, start + Duration::from_secs(20)),
            Admission::Blocked { retry_after: Duration::from_secs(40) }
        );
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let now = Instant::now();
        let a = key("127.0.0.1");
        let b = key("127.0.0.2");

        for _ in 0..3 {
            limiter.admit(&a, now);
        }
        assert!(!limiter.admit(&a, now).is_admitted());
        assert!(limiter.admit(&b, now).is_admitted());
    }

    #[test]
    fn test_instances_do_not_share_state() {
        let now = Instant::now();
        let client = key("127.0.0.1");
        let first = RateLimiter::new(1, Duration::from_secs(60));
        first.admit(&client, now);
        assert!(!first.admit(&client, now).is_admitted());

        let second = RateLimiter::new(1, Duration::from_secs(60));
        assert!(second.admit(&client, now).is_admitted());
    }

    #[test]
    fn test_sweep_only_drops_rolled_over_windows() {
        let limiter = RateLimiter::new(5, Duration::from_secs(10));
        let start = Instant::now();
        limiter.admit(&key("10.0.0.1"), start);
        limiter.admit(&key("10.0.0.2"), start + Duration::from_secs(5));

        assert_eq!(limiter.sweep(start + Duration::from_secs(10)), 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_concurrent_admission_never_exceeds_limit() {
        let limiter = Arc::new(RateLimiter::new(100, Duration::from_secs(60)));
        let client = key("192.0.2.7");
        let now = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let client = client.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .filter(|_| limiter.admit(&client, now).is_admitted())
                        .count()
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 100);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    fn app(limiter: Arc<RateLimiter>) -> Router {
        Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
    }

    fn request_from(addr: &str) -> Request {
        let mut req = Request::builder().uri("/test").body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(addr.parse::<SocketAddr>().unwrap()));
        req
    }

    #[tokio::test]
    async fn test_middleware_rejects_over_limit() {
        let limiter = Arc::new(RateLimiter::new(5, Duration::from_secs(60)));
        let app = app(limiter);

        for _ in 0..5 {
            let res = app.clone().oneshot(request_from("127.0.0.1:12345")).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }

        // Different source port, same host: same budget.
        let res = app.clone().oneshot(request_from("127.0.0.1:54321")).await.unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers()["retry-after"], "60");

        let res = app.oneshot(request_from("127.0.0.2:12345")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_peer_address_uses_shared_key() {
        let limiter = Arc::new(RateLimiter::new(1, Duration::from_secs(60)));
        let app = app(Arc::clone(&limiter));
        let bare = || Request::builder().uri("/test").body(Body::empty()).unwrap();

        assert_eq!(app.clone().oneshot(bare()).await.unwrap().status(), StatusCode::OK);
        assert_eq!(
            app.oneshot(bare()).await.unwrap().status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
