//! Authentication gate.
//!
//! Reads the session token from a cookie, verifies it and attaches the
//! caller's [`Identity`] to the request. Any failure ends the request with
//! 401; the cause is only visible in logs and metrics.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::config::AuthConfig;
use crate::http::response::Rejection;
use crate::observability::metrics;
use crate::security::token::{Claims, TokenKeys};

/// Why a request failed authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no session cookie")]
    MissingToken,
    #[error("token is malformed or its signature does not verify")]
    InvalidToken,
    #[error("token has expired")]
    Expired,
}

impl AuthError {
    /// Stable label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing",
            AuthError::InvalidToken => "invalid",
            AuthError::Expired => "expired",
        }
    }
}

/// Verified caller, attached to authenticated requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub subject_id: i64,
    pub username: String,
    pub role: String,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            subject_id: claims.uid,
            username: claims.user,
            role: claims.role,
        }
    }
}

impl Identity {
    /// Require one of `allowed` roles.
    pub fn authorize(&self, allowed: &[&str]) -> Result<(), AuthzError> {
        authorize_role(&self.role, allowed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("role `{role}` does not have permission")]
pub struct AuthzError {
    pub role: String,
}

impl IntoResponse for AuthzError {
    fn into_response(self) -> Response {
        tracing::info!(role = %self.role, "Role not permitted");
        Rejection::Forbidden.into_response()
    }
}

/// `Ok` when `role` is non-empty and listed in `allowed`.
pub fn authorize_role(role: &str, allowed: &[&str]) -> Result<(), AuthzError> {
    if !role.is_empty() && allowed.contains(&role) {
        Ok(())
    } else {
        Err(AuthzError {
            role: role.to_string(),
        })
    }
}

/// Handlers behind the gate extract the caller directly.
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(Rejection::Unauthorized(AuthError::MissingToken))
    }
}

/// State required for the authentication gate.
pub struct AuthGate {
    keys: Arc<TokenKeys>,
    cookie_name: String,
}

impl AuthGate {
    pub fn new(keys: Arc<TokenKeys>, cookie_name: impl Into<String>) -> Self {
        Self {
            keys,
            cookie_name: cookie_name.into(),
        }
    }

    pub fn from_config(keys: Arc<TokenKeys>, config: &AuthConfig) -> Self {
        Self::new(keys, config.cookie_name.clone())
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, AuthError> {
        let token = cookie_value(headers, &self.cookie_name)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;
        self.keys.verify(token).map(Identity::from)
    }
}

/// Find `name` across every `Cookie` header (HTTP/2 may split them).
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"'))
}

pub async fn auth_middleware(
    State(gate): State<Arc<AuthGate>>,
    mut req: Request,
    next: Next,
) -> Response {
    match gate.authenticate(req.headers()) {
        Ok(identity) => {
            tracing::debug!(
                subject_id = identity.subject_id,
                role = %identity.role,
                "Authenticated"
            );
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(err) => {
            tracing::warn!(path = %req.uri().path(), reason = err.reason(), "Authentication failed");
            metrics::record_rejection("auth", err.reason());
            Rejection::Unauthorized(err).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use jsonwebtoken::get_current_timestamp;
    use std::time::Duration;
    use tower::ServiceExt;

    const SECRET: &str = "test-secret-key-for-jwt-middleware";

    fn keys() -> Arc<TokenKeys> {
        Arc::new(TokenKeys::new(SECRET, Duration::from_secs(900)))
    }

    fn app() -> Router {
        let gate = Arc::new(AuthGate::new(keys(), "Bearer"));
        Router::new()
            .route("/test", get(|identity: Identity| async move { identity.role }))
            .layer(middleware::from_fn_with_state(gate, auth_middleware))
    }

    fn with_cookie(cookie: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/test");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_attaches_identity() {
        let token = keys().sign(1, "testuser", "admin").unwrap();
        let res = app()
            .oneshot(with_cookie(Some(&format!("theme=dark; Bearer={}", token))))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"admin");
    }

    #[tokio::test]
    async fn test_missing_cookie() {
        let res = app().oneshot(with_cookie(None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app().oneshot(with_cookie(Some("Bearer="))).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_token() {
        let res = app()
            .oneshot(with_cookie(Some("Bearer=invalid.token.here")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_expired_token() {
        let now = get_current_timestamp();
        let token = keys()
            .sign_claims(&Claims {
                uid: 1,
                user: "testuser".to_string(),
                role: "admin".to_string(),
                iat: now - 2 * 86_400,
                exp: now - 86_400,
            })
            .unwrap();

        let res = app()
            .oneshot(with_cookie(Some(&format!("Bearer={}", token))))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_rejection_causes_are_distinguished() {
        let gate = AuthGate::new(keys(), "Bearer");
        let mut headers = HeaderMap::new();
        assert_eq!(gate.authenticate(&headers), Err(AuthError::MissingToken));

        headers.insert(header::COOKIE, "Bearer=abc".parse().unwrap());
        assert_eq!(gate.authenticate(&headers), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_cookie_lookup() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, "a=1; Bearer=\"tok\"".parse().unwrap());
        headers.append(header::COOKIE, "b=2".parse().unwrap());

        assert_eq!(cookie_value(&headers, "Bearer"), Some("tok"));
        assert_eq!(cookie_value(&headers, "b"), Some("2"));
        assert_eq!(cookie_value(&headers, "bearer"), None);
    }

    #[test]
    fn test_authorize_role() {
        assert!(authorize_role("admin", &["admin", "user"]).is_ok());
        assert!(authorize_role("admin", &["admin"]).is_ok());
        assert!(authorize_role("guest", &["admin", "user"]).is_err());
        assert!(authorize_role("admin", &[]).is_err());
        assert!(authorize_role("", &["admin"]).is_err());
    }

    #[tokio::test]
    async fn test_identity_extractor_without_gate() {
        let app = Router::new().route("/test", get(|identity: Identity| async move { identity.username }));
        let res = app.oneshot(with_cookie(None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
