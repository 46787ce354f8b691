use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use cg_domain::config::Config;
use cg_sessions::SessionRegistry;

use crate::gate::Gate;

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gate: Arc<Gate>,
    pub sessions: Arc<SessionRegistry>,
    /// SHA-256 of the admin bearer token; `None` leaves admin routes open.
    pub admin_token_hash: Option<Vec<u8>>,
    /// Cancelled once the server has stopped; background tasks hang off it.
    pub shutdown: CancellationToken,
    pub started_at: Instant,
}
