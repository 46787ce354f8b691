//! Operator authentication for the `/v1/admin/*` routes.
//!
//! Only the operational surface (session listing and eviction) is guarded
//! here.  Client calls on `/v1/gate/:method` are never token-checked; their
//! admission is the gate's policy tier, keyed on the caller's session.
//!
//! The operator token comes from `admin.token`, falling back to the env var
//! named by `admin.token_env` (default `CG_ADMIN_TOKEN`).  `bootstrap::assemble`
//! hashes it once and stores the digest in `AppState::admin_token_hash`; with
//! no token configured that field is `None` and the admin routes are open.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::state::AppState;

/// Token presented as `Authorization: Bearer <token>`, or `""`.
fn presented_token(headers: &HeaderMap) -> &str {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("")
}

/// Compare the digest of `presented` against the operator digest.
/// Digests are fixed-length, so timing does not depend on the token.
fn operator_token_matches(expected_digest: &[u8], presented: &str) -> bool {
    Sha256::digest(presented.as_bytes())
        .ct_eq(expected_digest)
        .into()
}

/// Middleware for the admin router, attached with
/// `axum::middleware::from_fn_with_state`.
pub async fn require_admin_token(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.admin_token_hash.as_deref() else {
        return next.run(req).await;
    };

    if !operator_token_matches(expected, presented_token(req.headers())) {
        tracing::warn!(
            method = %req.method(),
            path = %req.uri().path(),
            "admin request without a valid operator token"
        );
        return (
            StatusCode::UNAUTHORIZED,
            axum::Json(serde_json::json!({ "error": "invalid or missing admin token" })),
        )
            .into_response();
    }

    next.run(req).await
}
