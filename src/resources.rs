//! Built-in resource handlers served behind the pipeline.
//!
//! These are deliberately small: a liveness probe, a "who am I" endpoint and
//! one role-gated route. Real deployments mount their own router instead.

use axum::{response::IntoResponse, routing::get, Json, Router};
use serde_json::json;

use crate::security::{AuthzError, Identity};

/// Roles allowed on `/admin`.
pub const ADMIN_ROLES: &[&str] = &["admin", "manager"];

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/me", get(me))
        .route("/admin", get(admin))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn me(identity: Identity) -> Json<Identity> {
    Json(identity)
}

async fn admin(identity: Identity) -> Result<impl IntoResponse, AuthzError> {
    identity.authorize(ADMIN_ROLES)?;
    Ok(Json(json!({
        "message": format!("welcome, {}", identity.username),
        "role": identity.role,
    })))
}
