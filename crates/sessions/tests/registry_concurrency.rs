//! Registry behaviour under concurrent first contact.

use std::sync::Arc;

use cg_sessions::{SessionRegistry, SessionState};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_resolve_yields_one_session() {
    let registry = Arc::new(SessionRegistry::new());
    let barrier = Arc::new(tokio::sync::Barrier::new(32));

    let mut tasks = Vec::new();
    for _ in 0..32 {
        let registry = registry.clone();
        let barrier = barrier.clone();
        tasks.push(tokio::spawn(async move {
            barrier.wait().await;
            registry.resolve("10.0.0.1:5000")
        }));
    }

    let mut sessions = Vec::new();
    for t in tasks {
        sessions.push(t.await.unwrap());
    }

    assert_eq!(registry.len(), 1);
    let first = &sessions[0];
    assert!(sessions.iter().all(|s| Arc::ptr_eq(s, first)));
    assert_eq!(first.state(), SessionState::Offline);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn login_on_one_handle_is_visible_on_all() {
    let registry = Arc::new(SessionRegistry::new());

    let writer = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.resolve("10.0.0.1:5000").authenticate(42) })
    };
    writer.await.unwrap();

    let reader = registry.resolve("10.0.0.1:5000");
    assert_eq!(reader.online_identity(), Some(42));
    assert_eq!(registry.online_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_addresses_resolve_independently() {
    let registry = Arc::new(SessionRegistry::new());

    let mut tasks = Vec::new();
    for i in 0..64u16 {
        let registry = registry.clone();
        tasks.push(tokio::spawn(async move {
            let addr = format!("10.0.0.{}:{}", i % 8, 5000 + i);
            registry.resolve(&addr);
            registry.resolve(&addr);
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }

    assert_eq!(registry.len(), 64);
    assert!(registry.list().iter().all(|s| s.state == SessionState::Offline));
}
