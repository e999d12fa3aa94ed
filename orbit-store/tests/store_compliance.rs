//! Backend compliance suite
//!
//! Every backend must satisfy the same store semantics; the in-memory
//! implementation is the reference, and this suite pins the others to it.

use std::sync::Arc;

use orbit_store::{EmbeddedStore, KeyValueStore, LoggedStore, MemoryStore, RedisStore, StoreError};
use tokio_util::sync::CancellationToken;

async fn compliance(store: &dyn KeyValueStore) {
    let cancel = CancellationToken::new();

    // Missing keys
    assert!(matches!(
        store.get(&cancel, b"missing").await,
        Err(StoreError::NotFound)
    ));
    assert!(matches!(
        store.delete(&cancel, b"missing").await,
        Err(StoreError::NotFound)
    ));

    // Empty keys are rejected everywhere
    assert!(matches!(
        store.get(&cancel, b"").await,
        Err(StoreError::InvalidArgument(_))
    ));
    assert!(matches!(
        store.put(&cancel, b"", b"v").await,
        Err(StoreError::InvalidArgument(_))
    ));

    // Put / get / overwrite / delete
    store.put(&cancel, b"node/a", b"1").await.unwrap();
    assert_eq!(store.get(&cancel, b"node/a").await.unwrap(), b"1");
    store.put(&cancel, b"node/a", b"2").await.unwrap();
    assert_eq!(store.get(&cancel, b"node/a").await.unwrap(), b"2");
    store.delete(&cancel, b"node/a").await.unwrap();
    assert!(matches!(
        store.get(&cancel, b"node/a").await,
        Err(StoreError::NotFound)
    ));

    // List: lexicographic, prefix-scoped, limit-capped
    for (key, value) in [
        (&b"node/c"[..], &b"3"[..]),
        (b"node/a", b"1"),
        (b"node/b", b"2"),
        (b"other/x", b"9"),
    ] {
        store.put(&cancel, key, value).await.unwrap();
    }
    let entries = store.list(&cancel, b"node/", 10).await.unwrap();
    let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_slice()).collect();
    assert_eq!(keys, vec![&b"node/a"[..], b"node/b", b"node/c"]);

    let capped = store.list(&cancel, b"node/", 2).await.unwrap();
    assert_eq!(capped.len(), 2);
    assert_eq!(capped[0].0, b"node/a");

    assert!(store.list(&cancel, b"node/", 0).await.unwrap().is_empty());

    // Compare-and-swap state machine
    store
        .compare_and_swap(&cancel, b"cas", None, Some(b"v1"))
        .await
        .unwrap();
    assert!(matches!(
        store.compare_and_swap(&cancel, b"cas", None, Some(b"v2")).await,
        Err(StoreError::AlreadyExists)
    ));
    assert!(matches!(
        store
            .compare_and_swap(&cancel, b"cas", Some(b"stale"), Some(b"v2"))
            .await,
        Err(StoreError::Conflict)
    ));
    store
        .compare_and_swap(&cancel, b"cas", Some(b"v1"), Some(b"v2"))
        .await
        .unwrap();
    assert_eq!(store.get(&cancel, b"cas").await.unwrap(), b"v2");
    store
        .compare_and_swap(&cancel, b"cas", Some(b"v2"), None)
        .await
        .unwrap();
    assert!(matches!(
        store.get(&cancel, b"cas").await,
        Err(StoreError::NotFound)
    ));
    assert!(matches!(
        store
            .compare_and_swap(&cancel, b"cas", Some(b"v2"), Some(b"v3"))
            .await,
        Err(StoreError::NotFound)
    ));

    // Cancellation short-circuits before touching state
    let cancelled = CancellationToken::new();
    cancelled.cancel();
    assert!(matches!(
        store.put(&cancelled, b"late", b"v").await,
        Err(StoreError::Cancelled)
    ));
    assert!(matches!(
        store.get(&cancelled, b"late").await,
        Err(StoreError::Cancelled)
    ));
}

#[tokio::test]
async fn memory_store_compliance() {
    compliance(&MemoryStore::new()).await;
}

#[tokio::test]
async fn embedded_store_compliance() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = EmbeddedStore::open(dir.path().join("store.db"), "compliance").unwrap();
    compliance(&store).await;
}

#[tokio::test]
async fn logged_store_is_transparent() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let store = LoggedStore::new("test", Arc::new(MemoryStore::new()));
    compliance(&store).await;
}

/// Runs only when a reachable server is configured; the suite must pass
/// with no redis available.
#[tokio::test]
async fn redis_store_compliance() {
    let Ok(url) = std::env::var("ORBIT_TEST_REDIS_URL") else {
        eprintln!("skipping redis compliance; set ORBIT_TEST_REDIS_URL to run");
        return;
    };
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    let namespace = format!("compliance-{}-{}", std::process::id(), nanos);
    let store = RedisStore::open(&url, &namespace).await.unwrap();
    compliance(&store).await;
}
