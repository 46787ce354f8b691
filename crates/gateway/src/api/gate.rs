//! Client call surface: `POST /v1/gate/:method`.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};

use cg_protocol::{Method, REMOTE_METADATA_KEY};

use crate::gate::{CallContext, GateError, GateReply};
use crate::state::AppState;

/// Build the call context for one request.
///
/// With `trust_remote_header` the `remote` header is the only source: a
/// fronting transport is expected to set it for every call.  Otherwise the
/// TCP peer address is used.
pub fn call_context(
    trust_remote_header: bool,
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
) -> CallContext {
    if trust_remote_header {
        let remote = headers
            .get(REMOTE_METADATA_KEY)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        return CallContext::new(remote);
    }
    CallContext::new(peer.map(|p| p.to_string()))
}

pub async fn call(
    State(state): State<AppState>,
    Path(method_name): Path<String>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<GateReply>, GateError> {
    let method: Method = method_name.parse()?;

    // The caller's address is checked before the body is looked at.
    let ctx = call_context(
        state.config.server.trust_remote_header,
        &headers,
        connect.map(|ConnectInfo(addr)| addr),
    );
    if let Err(e) = ctx.remote_address() {
        tracing::debug!(method = %method, "call without a caller address");
        return Err(e);
    }

    let body = if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|e| GateError::InvalidRequest {
            method,
            reason: e.to_string(),
        })?
    };

    let reply = state.gate.dispatch(&ctx, method, body).await?;
    Ok(Json(reply))
}

impl GateError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidContext | Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Self::UnknownMethod(_) => StatusCode::NOT_FOUND,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(serde_json::json!({
                "error": self.to_string(),
                "kind": self.kind(),
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("192.168.1.7:40000".parse().unwrap())
    }

    #[test]
    fn peer_address_is_used_by_default() {
        let mut headers = HeaderMap::new();
        headers.insert("remote", HeaderValue::from_static("10.0.0.1:5000"));
        let ctx = call_context(false, &headers, peer());
        assert_eq!(ctx.remote_address(), Ok("192.168.1.7:40000"));
    }

    #[test]
    fn trusted_remote_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("remote", HeaderValue::from_static("10.0.0.1:5000"));
        let ctx = call_context(true, &headers, peer());
        assert_eq!(ctx.remote_address(), Ok("10.0.0.1:5000"));
    }

    #[test]
    fn trusted_mode_without_header_is_invalid() {
        let ctx = call_context(true, &HeaderMap::new(), peer());
        assert_eq!(ctx.remote_address(), Err(GateError::InvalidContext));
    }

    #[test]
    fn statuses() {
        assert_eq!(GateError::InvalidContext.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            GateError::NotImplemented(Method::Heartbeat).status(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            GateError::UnknownMethod("x".into()).status(),
            StatusCode::NOT_FOUND
        );
    }
}
