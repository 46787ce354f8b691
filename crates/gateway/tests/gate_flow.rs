//! Gate behaviour against counting collaborator doubles: policy tiers,
//! session transitions, envelopes, and the collaborator deadline.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use cg_backend::{AccountStore, IdAllocator, MemoryAccountStore, UserInfo};
use cg_domain::error::{Error, Result};
use cg_gateway::gate::{CallContext, Gate, GateError, GateReply};
use cg_protocol::{
    AddFriendRequest, CreateGroupRequest, FindUserRequest, GetUserInfoRequest, LoginRequest,
    Method, RegisterRequest, UpdateUserInfoRequest,
};
use cg_sessions::{EvictionPolicy, SessionRegistry, SessionState};

// ── Doubles ─────────────────────────────────────────────────────────────

struct CountingAllocator {
    next: AtomicI64,
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl CountingAllocator {
    fn starting_at(first: i64) -> Self {
        Self {
            next: AtomicI64::new(first),
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdAllocator for CountingAllocator {
    async fn allocate_id(&self) -> Result<i64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::backend("master", "id space exhausted"));
        }
        Ok(self.next.fetch_add(1, Ordering::SeqCst))
    }

    async fn health(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({ "status": "ok" }))
    }
}

/// Wraps the in-memory store, counting calls and optionally stalling.
struct CountingStore {
    inner: MemoryAccountStore,
    calls: AtomicUsize,
    stall: Option<Duration>,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: MemoryAccountStore::new(),
            calls: AtomicUsize::new(0),
            stall: None,
        }
    }

    fn stalling(stall: Duration) -> Self {
        Self {
            stall: Some(stall),
            ..Self::new()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.stall {
            tokio::time::sleep(d).await;
        }
    }
}

#[async_trait]
impl AccountStore for CountingStore {
    async fn register(&self, user: &str, password: &str, id: i64) -> Result<()> {
        self.enter().await;
        self.inner.register(user, password, id).await
    }
    async fn update_user_info(&self, user: &str, nick_name: &str, avatar: &[u8]) -> Result<i64> {
        self.enter().await;
        self.inner.update_user_info(user, nick_name, avatar).await
    }
    async fn get_user_info(&self, user: &str) -> Result<UserInfo> {
        self.enter().await;
        self.inner.get_user_info(user).await
    }
    async fn authenticate(&self, user: &str, password: &str) -> Result<i64> {
        self.enter().await;
        self.inner.authenticate(user, password).await
    }
    async fn add_friend(&self, from_id: i64, to_id: i64, confirm: bool) -> Result<bool> {
        self.enter().await;
        self.inner.add_friend(from_id, to_id, confirm).await
    }
    async fn find_user(&self, user: &str) -> Result<i64> {
        self.enter().await;
        self.inner.find_user(user).await
    }
    async fn create_group(&self, owner_id: i64, group_id: i64) -> Result<()> {
        self.enter().await;
        self.inner.create_group(owner_id, group_id).await
    }
    async fn health(&self) -> Result<serde_json::Value> {
        self.inner.health().await
    }
}

struct Harness {
    gate: Gate,
    registry: Arc<SessionRegistry>,
    allocator: Arc<CountingAllocator>,
    store: Arc<CountingStore>,
}

fn harness_with(store: CountingStore, timeout: Duration) -> Harness {
    let registry = Arc::new(SessionRegistry::new());
    let allocator = Arc::new(CountingAllocator::starting_at(42));
    let store = Arc::new(store);
    let gate = Gate::new(registry.clone(), allocator.clone(), store.clone(), timeout);
    Harness {
        gate,
        registry,
        allocator,
        store,
    }
}

fn harness() -> Harness {
    harness_with(CountingStore::new(), Duration::from_secs(5))
}

const ADDR: &str = "10.0.0.1:5000";

fn ctx() -> CallContext {
    CallContext::with_remote(ADDR)
}

fn login(user: &str, password: &str) -> LoginRequest {
    LoginRequest {
        user: user.into(),
        password: password.into(),
    }
}

async fn register_alice(h: &Harness) {
    let reply = h
        .gate
        .register(
            &ctx(),
            RegisterRequest {
                user: "alice".into(),
                password: "secret".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(reply.body.id, 42);
}

// ── Scenarios ───────────────────────────────────────────────────────────

#[tokio::test]
async fn login_binds_session_and_unlocks_profile_reads() {
    let h = harness();
    register_alice(&h).await;
    assert_eq!(h.registry.get(ADDR).unwrap().state(), SessionState::Offline);

    let reply = h.gate.login(&ctx(), login("alice", "secret")).await.unwrap();
    assert!(!reply.is_rejected());
    assert_eq!(reply.body.id, 42);

    let session = h.registry.get(ADDR).unwrap();
    assert_eq!(session.state(), SessionState::Online);
    assert_eq!(session.online_identity(), Some(42));

    let info = h
        .gate
        .get_user_info(&ctx(), GetUserInfoRequest { user: "alice".into() })
        .await
        .unwrap();
    assert!(!info.is_rejected());
    assert_eq!(info.body.id, 42);
    assert_eq!(info.body.user, "alice");
}

#[tokio::test]
async fn register_allocates_exactly_once_and_returns_that_id() {
    let h = harness();
    register_alice(&h).await;
    assert_eq!(h.allocator.calls(), 1);
    assert_eq!(h.store.calls(), 1);
    assert_eq!(h.store.inner.find_user("alice").await.unwrap(), 42);
}

#[tokio::test]
async fn failed_allocation_skips_the_store() {
    let h = harness();
    h.allocator.fail.store(true, Ordering::SeqCst);

    let reply = h
        .gate
        .register(
            &ctx(),
            RegisterRequest {
                user: "alice".into(),
                password: "secret".into(),
            },
        )
        .await
        .unwrap();
    let header = reply.header.expect("rejected reply");
    assert_eq!(header.code, -1);
    assert_eq!(header.msg, "master: id space exhausted");
    assert_eq!(h.store.calls(), 0);
}

#[tokio::test]
async fn failed_login_leaves_session_unchanged() {
    let h = harness();
    register_alice(&h).await;

    let reply = h.gate.login(&ctx(), login("alice", "wrong")).await.unwrap();
    assert_eq!(reply.header.as_ref().map(|hd| hd.code), Some(-1));
    assert_eq!(h.registry.get(ADDR).unwrap().state(), SessionState::Offline);

    h.gate.login(&ctx(), login("alice", "secret")).await.unwrap();
    let reply = h.gate.login(&ctx(), login("alice", "wrong")).await.unwrap();
    assert!(reply.is_rejected());
    assert_eq!(h.registry.get(ADDR).unwrap().online_identity(), Some(42));
}

#[tokio::test]
async fn add_friend_before_login_is_unauthenticated() {
    let h = harness();

    let err = h
        .gate
        .add_friend(
            &ctx(),
            AddFriendRequest {
                user_id: 7,
                confirm: false,
            },
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        GateError::Unauthenticated {
            method: Method::AddFriend
        }
    );
    assert_eq!(h.store.calls(), 0);
}

#[tokio::test]
async fn every_authenticated_operation_rejects_offline_sessions() {
    let h = harness();
    let c = ctx();

    let errs = vec![
        h.gate
            .update_user_info(
                &c,
                UpdateUserInfoRequest {
                    user: "alice".into(),
                    nick_name: "A".into(),
                    avatar: vec![],
                },
            )
            .await
            .unwrap_err(),
        h.gate
            .get_user_info(&c, GetUserInfoRequest { user: "alice".into() })
            .await
            .unwrap_err(),
        h.gate
            .find_user(&c, FindUserRequest { user: "alice".into() })
            .await
            .unwrap_err(),
        h.gate
            .create_group(&c, CreateGroupRequest {})
            .await
            .unwrap_err(),
    ];

    for err in errs {
        assert_eq!(err.kind(), "unauthenticated", "{err}");
    }
    assert_eq!(h.store.calls(), 0);
    assert_eq!(h.allocator.calls(), 0);
}

#[tokio::test]
async fn unimplemented_methods_fail_without_touching_the_registry() {
    let h = harness();
    for method in [
        Method::UpdateUserPassword,
        Method::Logout,
        Method::UserMessage,
        Method::Heartbeat,
        Method::UploadImage,
        Method::DownloadImage,
        Method::Notice,
    ] {
        let err = h
            .gate
            .dispatch(&ctx(), method, serde_json::json!({}))
            .await
            .unwrap_err();
        assert_eq!(err, GateError::NotImplemented(method));
    }
    assert!(h.registry.is_empty());
}

#[tokio::test]
async fn create_group_allocates_once_and_records_owner() {
    let h = harness();
    register_alice(&h).await;
    h.gate.login(&ctx(), login("alice", "secret")).await.unwrap();

    let reply = h
        .gate
        .create_group(&ctx(), CreateGroupRequest {})
        .await
        .unwrap();
    assert_eq!(reply.body.id, 43);
    assert_eq!(h.allocator.calls(), 2);
    assert_eq!(h.store.inner.group_owner(43), Some(42));
}

#[tokio::test]
async fn friend_request_flow_between_two_addresses() {
    let h = harness();
    let alice = CallContext::with_remote("10.0.0.1:5000");
    let bob = CallContext::with_remote("10.0.0.2:5000");

    for (c, user) in [(&alice, "alice"), (&bob, "bob")] {
        h.gate
            .register(
                c,
                RegisterRequest {
                    user: user.into(),
                    password: "pw".into(),
                },
            )
            .await
            .unwrap();
        h.gate.login(c, login(user, "pw")).await.unwrap();
    }

    let bob_id = h
        .gate
        .find_user(&alice, FindUserRequest { user: "bob".into() })
        .await
        .unwrap()
        .body
        .id;
    assert_eq!(bob_id, 43);

    let sent = h
        .gate
        .add_friend(
            &alice,
            AddFriendRequest {
                user_id: bob_id,
                confirm: false,
            },
        )
        .await
        .unwrap();
    assert!(!sent.body.confirm);

    let confirmed = h
        .gate
        .add_friend(
            &bob,
            AddFriendRequest {
                user_id: 42,
                confirm: true,
            },
        )
        .await
        .unwrap();
    assert!(confirmed.body.confirm);
}

#[tokio::test]
async fn slow_collaborator_yields_business_failure_after_deadline() {
    let h = harness_with(
        CountingStore::stalling(Duration::from_secs(2)),
        Duration::from_millis(50),
    );

    let started = std::time::Instant::now();
    let reply = h.gate.login(&ctx(), login("alice", "secret")).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));

    let header = reply.header.expect("rejected reply");
    assert_eq!(header.code, -1);
    assert!(header.msg.contains("did not answer within 50ms"), "{}", header.msg);
    assert_eq!(h.registry.get(ADDR).unwrap().state(), SessionState::Offline);
}

#[tokio::test]
async fn login_survives_a_sweep_while_the_store_answers() {
    let h = harness_with(
        CountingStore::stalling(Duration::from_millis(300)),
        Duration::from_secs(5),
    );
    register_alice(&h).await;

    let sweep = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let idle_since = h.registry.get(ADDR).unwrap().last_activity();
        h.registry.sweep(&EvictionPolicy::new(1), idle_since + 10)
    };
    let login_ctx = ctx();
    let (reply, swept) = tokio::join!(h.gate.login(&login_ctx, login("alice", "secret")), sweep);

    assert_eq!(swept, 1);
    let reply = reply.unwrap();
    assert!(!reply.is_rejected());
    assert_eq!(reply.body.id, 42);

    let session = h.registry.get(ADDR).expect("session bound by login");
    assert_eq!(session.online_identity(), Some(42));

    let info = h
        .gate
        .get_user_info(&ctx(), GetUserInfoRequest { user: "alice".into() })
        .await
        .unwrap();
    assert!(!info.is_rejected());
}

#[tokio::test]
async fn missing_address_is_invalid_context() {
    let h = harness();
    let err = h
        .gate
        .login(&CallContext::default(), login("alice", "secret"))
        .await
        .unwrap_err();
    assert_eq!(err, GateError::InvalidContext);
    assert!(h.registry.is_empty());
    assert_eq!(h.store.calls(), 0);
}

#[tokio::test]
async fn dispatch_decodes_json_bodies() {
    let h = harness();
    let reply = h
        .gate
        .dispatch(
            &ctx(),
            Method::Register,
            serde_json::json!({ "user": "alice", "password": "secret" }),
        )
        .await
        .unwrap();
    assert!(matches!(reply, GateReply::Id(ref r) if r.body.id == 42));

    let err = h
        .gate
        .dispatch(&ctx(), Method::Login, serde_json::json!({ "user": 5 }))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_request");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_logins_from_one_address_share_a_session() {
    let h = Arc::new(harness());
    register_alice(&h).await;

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let h = h.clone();
        tasks.push(tokio::spawn(async move {
            h.gate.login(&ctx(), login("alice", "secret")).await.unwrap()
        }));
    }
    for t in tasks {
        assert_eq!(t.await.unwrap().body.id, 42);
    }
    assert_eq!(h.registry.len(), 1);
    assert_eq!(h.registry.online_count(), 1);
}
