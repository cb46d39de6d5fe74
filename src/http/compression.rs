//! gzip response compression.
//!
//! When the client lists `gzip` in `Accept-Encoding`, the response body is
//! re-streamed through a gzip encoder. Each downstream chunk is fed to the
//! encoder as it arrives; the gzip trailer is written once, when the inner
//! body ends.

use std::io::Write;

use axum::{
    body::{Body, BodyDataStream, Bytes},
    extract::Request,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use flate2::{write::GzEncoder, Compression};
use futures_util::{stream, StreamExt};

/// Substring match, as clients send lists like `gzip, deflate, br`.
pub fn accepts_gzip(req: &Request) -> bool {
    req.headers()
        .get_all(header::ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains("gzip"))
}

pub async fn compression_middleware(req: Request, next: Next) -> Response {
    let wants_gzip = accepts_gzip(&req) && req.method() != Method::HEAD;
    let response = next.run(req).await;

    if !wants_gzip
        || response.headers().contains_key(header::CONTENT_ENCODING)
        || matches!(response.status(), StatusCode::NO_CONTENT | StatusCode::NOT_MODIFIED)
    {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    parts
        .headers
        .append(header::VARY, HeaderValue::from_static("Accept-Encoding"));

    Response::from_parts(parts, gzip_body(body))
}

struct GzipState {
    inner: BodyDataStream,
    /// `None` once the trailer has been emitted.
    encoder: Option<GzEncoder<Vec<u8>>>,
}

/// Wrap `body` so its bytes come out gzip-encoded.
pub fn gzip_body(body: Body) -> Body {
    let state = GzipState {
        inner: body.into_data_stream(),
        encoder: Some(GzEncoder::new(Vec::new(), Compression::default())),
    };

    Body::from_stream(stream::unfold(state, |mut state| async move {
        loop {
            let encoder = state.encoder.as_mut()?;
            match state.inner.next().await {
                Some(Ok(chunk)) => {
                    if let Err(e) = encoder.write_all(&chunk) {
                        state.encoder = None;
                        return Some((Err(axum::Error::new(e)), state));
                    }
                    let compressed = std::mem::take(encoder.get_mut());
                    if !compressed.is_empty() {
                        return Some((Ok(Bytes::from(compressed)), state));
                    }
                }
                Some(Err(e)) => {
                    state.encoder = None;
                    return Some((Err(e), state));
                }
                None => {
                    let encoder = state.encoder.take()?;
                    let item = encoder
                        .finish()
                        .map(Bytes::from)
                        .map_err(axum::Error::new);
                    return Some((item, state));
                }
            }
        }
    }))
}
