pub mod admin;
pub mod auth;
pub mod gate;

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// Routes are split into **public** (gate calls, health) and **admin**
/// (gated behind the admin bearer-token middleware).
///
/// `state` is needed to wire up the auth middleware at build time.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/v1/health", get(admin::health))
        .route("/v1/gate/:method", post(gate::call));

    let admin = Router::new()
        .route("/v1/admin/sessions", get(admin::list_sessions))
        .route("/v1/admin/sessions/:address", delete(admin::evict_session))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_admin_token,
        ));

    public.merge(admin)
}
