//! Origin access control.
//!
//! Strict policy: a request without an `Origin` header is rejected just like
//! one from an unknown origin. Allowed origins are echoed back verbatim (never
//! `*`) so credentialed requests keep working. Preflights are answered here
//! and never reach the handlers.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::CorsConfig;
use crate::http::response::Rejection;
use crate::observability::metrics;

/// Set of trusted origins.
///
/// Entries are matched exactly, except `*` (any origin) and `scheme://host:*`
/// (that host on any port, for local development).
#[derive(Debug, Clone, Default)]
pub struct OriginAllowList {
    exact: HashSet<String>,
    any_port: Vec<String>,
    allow_all: bool,
}

impl OriginAllowList {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::default();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry == "*" {
                list.allow_all = true;
            } else if let Some(base) = entry.strip_suffix(":*") {
                list.any_port.push(base.to_string());
            } else if !entry.is_empty() {
                list.exact.insert(entry.to_string());
            }
        }
        list
    }

    pub fn allows(&self, origin: &str) -> bool {
        if origin.is_empty() {
            return false;
        }
        if self.allow_all || self.exact.contains(origin) {
            return true;
        }
        self.any_port.iter().any(|base| {
            origin == base
                || origin
                    .strip_prefix(base.as_str())
                    .and_then(|rest| rest.strip_prefix(':'))
                    .is_some_and(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
        })
    }
}

/// Precomputed CORS response headers plus the allow-list.
pub struct CorsPolicy {
    allow_list: OriginAllowList,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
    expose_headers: HeaderValue,
    max_age: HeaderValue,
}

impl CorsPolicy {
    pub fn from_config(config: &CorsConfig) -> Self {
        Self {
            allow_list: OriginAllowList::new(&config.allowed_origins),
            allow_methods: joined(&config.allowed_methods),
            allow_headers: joined(&config.allowed_headers),
            expose_headers: joined(&config.expose_headers),
            max_age: HeaderValue::from(config.max_age_secs),
        }
    }

    fn apply(&self, headers: &mut HeaderMap, origin: HeaderValue) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, self.expose_headers.clone());
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
    }

    fn preflight(&self, origin: HeaderValue) -> Response {
        let mut response = StatusCode::OK.into_response();
        let headers = response.headers_mut();
        self.apply(headers, origin);
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, self.max_age.clone());
        response
    }
}

fn joined(values: &[String]) -> HeaderValue {
    HeaderValue::from_str(&values.join(", ")).unwrap_or_else(|_| HeaderValue::from_static(""))
}

pub async fn cors_middleware(
    State(policy): State<Arc<CorsPolicy>>,
    req: Request,
    next: Next,
) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .filter(|v| v.to_str().is_ok_and(|o| policy.allow_list.allows(o)))
        .cloned();

    let Some(origin) = origin else {
        tracing::warn!(
            origin = ?req.headers().get(header::ORIGIN),
            path = %req.uri().path(),
            "Origin rejected"
        );
        metrics::record_rejection("cors", "origin");
        return Rejection::OriginRejected.into_response();
    };

    if req.method() == Method::OPTIONS {
        tracing::debug!(origin = ?origin, "Answering preflight");
        return policy.preflight(origin);
    }

    let mut response = next.run(req).await;
    policy.apply(response.headers_mut(), origin);
    response
}
