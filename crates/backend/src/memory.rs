//! In-process collaborators for development and tests.
//!
//! `MemoryIdAllocator` hands out sequential ids from an atomic counter.
//! `MemoryAccountStore` keeps accounts, SHA-256 password digests, pending
//! friend requests and groups in memory.  Nothing survives a restart.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use cg_domain::error::{Error, Result};

use crate::provider::{AccountStore, IdAllocator};
use crate::types::UserInfo;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ID allocator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug)]
pub struct MemoryIdAllocator {
    next: AtomicI64,
}

impl MemoryIdAllocator {
    pub fn new(first_id: i64) -> Self {
        Self {
            next: AtomicI64::new(first_id),
        }
    }
}

impl Default for MemoryIdAllocator {
    fn default() -> Self {
        Self::new(1)
    }
}

#[async_trait]
impl IdAllocator for MemoryIdAllocator {
    async fn allocate_id(&self) -> Result<i64> {
        Ok(self.next.fetch_add(1, Ordering::Relaxed))
    }

    async fn health(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({
            "status": "ok",
            "transport": "memory",
            "next_id": self.next.load(Ordering::Relaxed),
        }))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Account store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone)]
struct Account {
    id: i64,
    password_digest: String,
    nick_name: String,
    avatar: Vec<u8>,
}

#[derive(Debug, Default)]
struct StoreState {
    accounts: HashMap<String, Account>,
    /// id → user name, for friend lookups.
    names: HashMap<i64, String>,
    /// Outstanding requests as (from, to).
    pending: HashSet<(i64, i64)>,
    /// Confirmed pairs, stored as (min, max).
    friends: HashSet<(i64, i64)>,
    /// group id → owner id.
    groups: HashMap<i64, i64>,
}

#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    state: RwLock<StoreState>,
}

fn digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn pair(a: i64, b: i64) -> (i64, i64) {
    (a.min(b), a.max(b))
}

fn rejected(message: impl Into<String>) -> Error {
    Error::backend("store", message)
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account_count(&self) -> usize {
        self.state.read().accounts.len()
    }

    pub fn group_owner(&self, group_id: i64) -> Option<i64> {
        self.state.read().groups.get(&group_id).copied()
    }

    pub fn are_friends(&self, a: i64, b: i64) -> bool {
        self.state.read().friends.contains(&pair(a, b))
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn register(&self, user: &str, password: &str, id: i64) -> Result<()> {
        if user.is_empty() {
            return Err(rejected("user name must not be empty"));
        }

        let mut state = self.state.write();
        if state.accounts.contains_key(user) {
            return Err(rejected(format!("user {user} already exists")));
        }
        if state.names.contains_key(&id) {
            return Err(rejected(format!("id {id} already in use")));
        }

        state.accounts.insert(
            user.to_owned(),
            Account {
                id,
                password_digest: digest(password),
                nick_name: String::new(),
                avatar: Vec::new(),
            },
        );
        state.names.insert(id, user.to_owned());
        tracing::debug!(user, id, "account registered");
        Ok(())
    }

    async fn update_user_info(&self, user: &str, nick_name: &str, avatar: &[u8]) -> Result<i64> {
        let mut state = self.state.write();
        let account = state
            .accounts
            .get_mut(user)
            .ok_or_else(|| rejected(format!("no such user: {user}")))?;
        account.nick_name = nick_name.to_owned();
        account.avatar = avatar.to_vec();
        Ok(account.id)
    }

    async fn get_user_info(&self, user: &str) -> Result<UserInfo> {
        let state = self.state.read();
        let account = state
            .accounts
            .get(user)
            .ok_or_else(|| rejected(format!("no such user: {user}")))?;
        Ok(UserInfo {
            id: account.id,
            user: user.to_owned(),
            nick_name: account.nick_name.clone(),
            avatar: account.avatar.clone(),
        })
    }

    async fn authenticate(&self, user: &str, password: &str) -> Result<i64> {
        let state = self.state.read();
        match state.accounts.get(user) {
            Some(account) if account.password_digest == digest(password) => Ok(account.id),
            _ => Err(rejected("invalid user name or password")),
        }
    }

    async fn add_friend(&self, from_id: i64, to_id: i64, confirm: bool) -> Result<bool> {
        if from_id == to_id {
            return Err(rejected("cannot add yourself as a friend"));
        }

        let mut state = self.state.write();
        if !state.names.contains_key(&to_id) {
            return Err(rejected(format!("no such user id: {to_id}")));
        }
        if state.friends.contains(&pair(from_id, to_id)) {
            return Ok(true);
        }

        // The other side already asked: either flag completes the pair.
        if state.pending.remove(&(to_id, from_id)) {
            state.friends.insert(pair(from_id, to_id));
            return Ok(true);
        }
        if confirm {
            return Err(rejected(format!("no pending friend request from {to_id}")));
        }

        state.pending.insert((from_id, to_id));
        Ok(false)
    }

    async fn find_user(&self, user: &str) -> Result<i64> {
        self.state
            .read()
            .accounts
            .get(user)
            .map(|a| a.id)
            .ok_or_else(|| rejected(format!("no such user: {user}")))
    }

    async fn create_group(&self, owner_id: i64, group_id: i64) -> Result<()> {
        let mut state = self.state.write();
        if state.groups.contains_key(&group_id) {
            return Err(rejected(format!("group {group_id} already exists")));
        }
        state.groups.insert(group_id, owner_id);
        Ok(())
    }

    async fn health(&self) -> Result<serde_json::Value> {
        let state = self.state.read();
        Ok(serde_json::json!({
            "status": "ok",
            "transport": "memory",
            "accounts": state.accounts.len(),
            "groups": state.groups.len(),
        }))
    }
}
