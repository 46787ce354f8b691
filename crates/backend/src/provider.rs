//! Collaborator interfaces used by the gate.
//!
//! Every implementation (REST, in-process, test doubles) returns
//! `cg_domain::error::Result`.  A refusal by the collaborator (duplicate
//! user, wrong password, ...) is an `Err`, the same as a transport failure;
//! the gate renders both into a business-failure envelope.

use async_trait::async_trait;
use cg_domain::error::Result;

use crate::types::UserInfo;

/// Issues globally unique identifiers for users and groups.
#[async_trait]
pub trait IdAllocator: Send + Sync {
    /// Allocate the next identifier (POST /api/ids).
    async fn allocate_id(&self) -> Result<i64>;

    /// Health check (GET /health).
    async fn health(&self) -> Result<serde_json::Value>;
}

/// Account records, credentials, friend graph and groups.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Create an account under a pre-allocated id (POST /api/users).
    async fn register(&self, user: &str, password: &str, id: i64) -> Result<()>;

    /// Update profile fields; returns the account id (PUT /api/users/{user}).
    async fn update_user_info(&self, user: &str, nick_name: &str, avatar: &[u8]) -> Result<i64>;

    /// Fetch a profile (GET /api/users/{user}).
    async fn get_user_info(&self, user: &str) -> Result<UserInfo>;

    /// Check credentials; returns the account id (POST /api/auth).
    async fn authenticate(&self, user: &str, password: &str) -> Result<i64>;

    /// Send or confirm a friend request from `from_id` to `to_id`.
    /// Returns `true` once both sides have confirmed (POST /api/friends).
    async fn add_friend(&self, from_id: i64, to_id: i64, confirm: bool) -> Result<bool>;

    /// Resolve a user name to its id (GET /api/users/{user}/id).
    async fn find_user(&self, user: &str) -> Result<i64>;

    /// Record a new group owned by `owner_id` (POST /api/groups).
    async fn create_group(&self, owner_id: i64, group_id: i64) -> Result<()>;

    /// Health check (GET /health).
    async fn health(&self) -> Result<serde_json::Value>;
}
