//! AppState construction and background-task spawning extracted from `main.rs`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use cg_backend::{create_allocator, create_store, AccountStore, IdAllocator};
use cg_domain::config::{Config, ConfigSeverity};
use cg_sessions::{spawn_sweeper, EvictionPolicy, SessionRegistry, SweeperHandle};

use crate::gate::Gate;
use crate::state::AppState;

/// Log every config issue and fail when any of them is an error.
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("config validation failed with {errors} error(s)");
    }
    Ok(())
}

/// Connect to both collaborators, check they are healthy, and return a
/// fully-wired [`AppState`].
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── ID allocator ─────────────────────────────────────────────────
    let allocator: Arc<dyn IdAllocator> =
        create_allocator(&config.master).context("creating ID allocator client")?;
    let health = allocator
        .health()
        .await
        .context("ID allocator health check")?;
    tracing::info!(
        transport = ?config.master.transport,
        health = %health,
        "ID allocator ready"
    );

    // ── Account store ────────────────────────────────────────────────
    let store: Arc<dyn AccountStore> =
        create_store(&config.store).context("creating account store client")?;
    let health = store
        .health()
        .await
        .context("account store health check")?;
    tracing::info!(
        transport = ?config.store.transport,
        health = %health,
        "account store ready"
    );

    Ok(assemble(config, allocator, store))
}

/// Wire an [`AppState`] around already-built collaborators.
pub fn assemble(
    config: Arc<Config>,
    allocator: Arc<dyn IdAllocator>,
    store: Arc<dyn AccountStore>,
) -> AppState {
    let sessions = Arc::new(SessionRegistry::new());
    let gate = Arc::new(Gate::new(
        sessions.clone(),
        allocator,
        store,
        Duration::from_millis(config.gate.call_timeout_ms),
    ));
    tracing::info!(
        call_timeout_ms = config.gate.call_timeout_ms,
        "gate ready"
    );

    // ── Admin bearer token ───────────────────────────────────────────
    let admin_token_hash = {
        let env_var = &config.admin.token_env;
        let token = config
            .admin
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .map(|t| ("config".to_owned(), t))
            .or_else(|| {
                std::env::var(env_var)
                    .ok()
                    .filter(|t| !t.is_empty())
                    .map(|t| (format!("env:{env_var}"), t))
            });
        match token {
            Some((source, t)) => {
                tracing::info!(source = %source, "admin bearer-token auth enabled");
                Some(Sha256::digest(t.as_bytes()).to_vec())
            }
            None => {
                tracing::warn!(
                    "admin bearer-token auth DISABLED; set admin.token in config.toml or {env_var} env var"
                );
                None
            }
        }
    };

    AppState {
        config,
        gate,
        sessions,
        admin_token_hash,
        shutdown: CancellationToken::new(),
        started_at: Instant::now(),
    }
}

/// Spawn the idle-session sweeper.  It stops when `state.shutdown` is
/// cancelled or the returned handle is shut down.
pub fn spawn_background_tasks(state: &AppState) -> SweeperHandle {
    let cfg = &state.config.sessions;
    let handle = spawn_sweeper(
        state.sessions.clone(),
        EvictionPolicy::from_config(cfg),
        Duration::from_secs(cfg.sweep_interval_secs),
        state.shutdown.clone(),
    );
    tracing::info!(
        sweep_interval_secs = cfg.sweep_interval_secs,
        idle_timeout_secs = cfg.idle_timeout_secs,
        "session sweeper spawned"
    );
    handle
}
