//! Collaborator clients for the chatgate gateway.
//!
//! Provides the [`IdAllocator`] and [`AccountStore`] traits the gate calls,
//! REST implementations ([`RestIdAllocator`], [`RestAccountStore`]), and
//! in-process implementations for development and tests.
//!
//! # Transport selection
//!
//! | Transport | Allocator            | Store                 |
//! |-----------|----------------------|-----------------------|
//! | `rest`    | `RestIdAllocator`    | `RestAccountStore`    |
//! | `memory`  | `MemoryIdAllocator`  | `MemoryAccountStore`  |

pub mod memory;
pub mod provider;
pub mod rest;
pub mod types;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use memory::{MemoryAccountStore, MemoryIdAllocator};
pub use provider::{AccountStore, IdAllocator};
pub use rest::{from_reqwest, RestAccountStore, RestIdAllocator};
pub use types::UserInfo;

use std::sync::Arc;

use cg_domain::config::{BackendTransport, MasterConfig, StoreConfig};
use cg_domain::error::Result;

/// Build the ID allocator selected by `master.transport`.
pub fn create_allocator(cfg: &MasterConfig) -> Result<Arc<dyn IdAllocator>> {
    match cfg.transport {
        BackendTransport::Rest => {
            let client = RestIdAllocator::new(cfg)?;
            tracing::info!(base_url = %cfg.base_url, "using REST ID allocator");
            Ok(Arc::new(client))
        }
        BackendTransport::Memory => {
            tracing::warn!(first_id = cfg.first_id, "using in-process ID allocator");
            Ok(Arc::new(MemoryIdAllocator::new(cfg.first_id)))
        }
    }
}

/// Build the account store selected by `store.transport`.
pub fn create_store(cfg: &StoreConfig) -> Result<Arc<dyn AccountStore>> {
    match cfg.transport {
        BackendTransport::Rest => {
            let client = RestAccountStore::new(cfg)?;
            tracing::info!(base_url = %cfg.base_url, "using REST account store");
            Ok(Arc::new(client))
        }
        BackendTransport::Memory => {
            tracing::warn!("using in-process account store; accounts are not persisted");
            Ok(Arc::new(MemoryAccountStore::new()))
        }
    }
}
