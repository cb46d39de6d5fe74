//! HTTP parameter pollution guard.
//!
//! A parameter repeated in one request (`?role=user&role=admin`) can be read
//! differently by different layers. Every repeated name that is not
//! whitelisted is collapsed to its **last** value before the request moves
//! on; whitelisted names (multi-valued sort keys and the like) keep all
//! occurrences. The guard never rejects a request for pollution.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, uri::PathAndQuery, HeaderValue, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use url::form_urlencoded;

use crate::config::HppConfig;
use crate::http::response::Rejection;

pub struct HppPolicy {
    check_query: bool,
    check_body: bool,
    body_content_type: String,
    whitelist: HashSet<String>,
    max_body_size: usize,
}

/// Decoded name of one `name=value` segment.
fn decoded_name(segment: &[u8]) -> Cow<'_, str> {
    let raw = segment.split(|&b| b == b'=').next().unwrap_or_default();
    form_urlencoded::parse(raw)
        .next()
        .map(|(name, _)| name)
        .unwrap_or_default()
}

impl HppPolicy {
    pub fn from_config(config: &HppConfig, max_body_size: usize) -> Self {
        Self {
            check_query: config.check_query,
            check_body: config.check_body,
            body_content_type: config.body_content_type.clone(),
            whitelist: config.whitelist.iter().cloned().collect(),
            max_body_size,
        }
    }

    /// Collapse duplicated parameters in a urlencoded string.
    ///
    /// Returns `None` when nothing needed collapsing, so clean input is
    /// forwarded byte-for-byte. Names are compared after decoding, but every
    /// kept pair is emitted in its original encoding. Each collapsed name
    /// keeps the position of its first occurrence.
    pub fn sanitize(&self, input: &[u8]) -> Option<Vec<u8>> {
        let pairs: Vec<(Cow<'_, str>, &[u8])> = input
            .split(|&b| b == b'&')
            .filter(|segment| !segment.is_empty())
            .map(|segment| (decoded_name(segment), segment))
            .collect();

        let mut last: HashMap<&str, &[u8]> = HashMap::new();
        let mut polluted = false;
        for (name, segment) in &pairs {
            if self.whitelist.contains(name.as_ref()) {
                continue;
            }
            polluted |= last.insert(name.as_ref(), *segment).is_some();
        }
        if !polluted {
            return None;
        }

        let mut emitted = HashSet::new();
        let mut kept: Vec<&[u8]> = Vec::with_capacity(pairs.len());
        for (name, segment) in &pairs {
            let name = name.as_ref();
            if self.whitelist.contains(name) {
                kept.push(*segment);
            } else if emitted.insert(name) {
                kept.push(last[name]);
            }
        }
        Some(kept.join(&b'&'))
    }

    fn applies_to_body(&self, req: &Request) -> bool {
        self.check_body
            && req
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(';').next())
                .is_some_and(|media| media.trim().eq_ignore_ascii_case(&self.body_content_type))
    }

    fn sanitize_query(&self, uri: &Uri) -> Option<Uri> {
        let query = uri.query()?;
        // Only whole segments of a valid query are kept, so this cannot fail.
        let cleaned = String::from_utf8(self.sanitize(query.as_bytes())?).ok()?;

        let path_and_query = if cleaned.is_empty() {
            uri.path().to_string()
        } else {
            format!("{}?{}", uri.path(), cleaned)
        };
        let mut parts = uri.clone().into_parts();
        parts.path_and_query = PathAndQuery::try_from(path_and_query).ok();
        Uri::from_parts(parts).ok()
    }
}

pub async fn hpp_middleware(
    State(policy): State<Arc<HppPolicy>>,
    mut req: Request,
    next: Next,
) -> Response {
    if policy.check_query {
        if let Some(uri) = policy.sanitize_query(req.uri()) {
            tracing::debug!(before = ?req.uri().query(), after = ?uri.query(), "Collapsed duplicate query parameters");
            *req.uri_mut() = uri;
        }
    }

    if policy.applies_to_body(&req) {
        let (mut parts, body) = req.into_parts();
        let bytes = match axum::body::to_bytes(body, policy.max_body_size).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read form body");
                return Rejection::BadRequest("Unreadable request body").into_response();
            }
        };

        let body = match policy.sanitize(&bytes) {
            Some(cleaned) => {
                tracing::debug!("Collapsed duplicate body parameters");
                parts
                    .headers
                    .insert(header::CONTENT_LENGTH, HeaderValue::from(cleaned.len()));
                Body::from(cleaned)
            }
            None => Body::from(bytes),
        };
        req = Request::from_parts(parts, body);
    }

    next.run(req).await
}
