//! Short-circuit responses.
//!
//! # Responsibilities
//! - Map every pipeline rejection to its HTTP status code
//! - Keep client-facing bodies uniform (auth failures never reveal the cause)
//!
//! # Design Decisions
//! - Stages terminate a request only by returning a `Rejection`
//! - Bodies are plain text; callers that care inspect the status

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::security::auth::AuthError;

/// Why a stage refused to forward a request.
#[derive(Debug)]
pub enum Rejection {
    /// Client exhausted its budget for the current window.
    RateLimited { retry_after_secs: u64 },
    /// Credential missing, forged/malformed or expired.
    Unauthorized(AuthError),
    /// Verified identity lacks a permitted role.
    Forbidden,
    /// `Origin` absent or not on the allow-list.
    OriginRejected,
    /// The request could not be read.
    BadRequest(&'static str),
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Rejection::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Rejection::Forbidden | Rejection::OriginRejected => StatusCode::FORBIDDEN,
            Rejection::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Rejection::RateLimited { retry_after_secs } => {
                let mut response = (status, "Too many requests").into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                response
            }
            Rejection::Unauthorized(_) => (status, "Unauthorized").into_response(),
            Rejection::Forbidden => (status, "Insufficient permissions").into_response(),
            Rejection::OriginRejected => (status, "Not allowed by CORS").into_response(),
            Rejection::BadRequest(msg) => (status, msg).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            Rejection::RateLimited { retry_after_secs: 1 }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            Rejection::Unauthorized(AuthError::Expired).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(Rejection::OriginRejected.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = Rejection::RateLimited { retry_after_secs: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }
}
