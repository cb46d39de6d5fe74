//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use gatekeeper::config::GatewayConfig;
use gatekeeper::security::TokenKeys;
use gatekeeper::{HttpServer, Shutdown};

pub const SECRET: &str = "integration-test-secret";
pub const ORIGIN: &str = "https://my-origin-url.com";

/// A gateway running on a loopback port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub keys: Arc<TokenKeys>,
    shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// `Cookie` header value carrying a fresh token for `role`.
    #[allow(dead_code)]
    pub fn cookie_for(&self, role: &str) -> String {
        let token = self.keys.sign(42, "tester", role).unwrap();
        format!("Bearer={}", token)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Defaults with a test secret and a budget large enough not to interfere.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.auth.jwt_secret = SECRET.to_string();
    config.rate_limit.max_requests = 1_000;
    config
}

/// Start the full pipeline in front of `resources` on 127.0.0.1:0.
pub async fn start_gateway(config: GatewayConfig, resources: Router) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let keys = Arc::new(TokenKeys::from_config(&config.auth));
    let server = HttpServer::new(config, Arc::clone(&keys), resources);
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();

    tokio::spawn(async move {
        if let Err(e) = server.run(listener, rx).await {
            eprintln!("test gateway failed: {}", e);
        }
    });

    TestGateway {
        addr,
        keys,
        shutdown,
    }
}
