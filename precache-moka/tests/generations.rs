//! Generation bookkeeping for the Moka store.

use bytes::Bytes;
use precache_backend::{Backend, BackendError, DeleteStatus, OpenStatus};
use precache_core::{CachedResponse, GenerationId, RequestKey};
use precache_moka::MokaBackend;
use pretty_assertions::assert_eq;

fn key(target: &str) -> RequestKey {
    RequestKey::get(target.parse().unwrap())
}

fn snapshot(body: &'static [u8]) -> CachedResponse {
    CachedResponse::from_response(http::Response::new(Bytes::from_static(body)))
}

#[tokio::test]
async fn test_open_is_idempotent() {
    let backend = MokaBackend::builder().build();
    let v1 = GenerationId::new_static("v1");

    assert_eq!(backend.open(&v1).await.unwrap(), OpenStatus::Created);
    assert_eq!(backend.open(&v1).await.unwrap(), OpenStatus::Existing);

    assert_eq!(backend.generations().await.unwrap(), vec![v1.clone()]);
    assert_eq!(backend.entry_count(&v1).await.unwrap(), 0);
}

#[tokio::test]
async fn test_last_write_wins() {
    let backend = MokaBackend::builder().build();
    let v1 = GenerationId::new_static("v1");
    backend.open(&v1).await.unwrap();

    backend.write(&v1, &key("/a"), snapshot(b"old")).await.unwrap();
    backend.write(&v1, &key("/a"), snapshot(b"new")).await.unwrap();

    let stored = backend.read(&v1, &key("/a")).await.unwrap().unwrap();
    assert_eq!(stored.body(), &Bytes::from_static(b"new"));
    assert_eq!(backend.entry_count(&v1).await.unwrap(), 1);
}

#[tokio::test]
async fn test_generations_are_isolated() {
    let backend = MokaBackend::builder().build();
    let v1 = GenerationId::new_static("v1");
    let v2 = GenerationId::new_static("v2");
    backend.open(&v1).await.unwrap();
    backend.open(&v2).await.unwrap();

    backend.write(&v1, &key("/a"), snapshot(b"one")).await.unwrap();
    backend.write(&v2, &key("/b"), snapshot(b"two")).await.unwrap();

    assert!(backend.read(&v2, &key("/a")).await.unwrap().is_none());
    assert!(backend.read(&v1, &key("/b")).await.unwrap().is_none());

    let missing = GenerationId::new_static("never-opened");
    assert!(backend.read(&missing, &key("/a")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_generation_purges_entries() {
    let backend = MokaBackend::builder().build();
    let v1 = GenerationId::new_static("v1");
    let v2 = GenerationId::new_static("v2");
    backend.open(&v1).await.unwrap();
    backend.open(&v2).await.unwrap();

    backend.write(&v1, &key("/a"), snapshot(b"a")).await.unwrap();
    backend.write(&v1, &key("/b"), snapshot(b"b")).await.unwrap();
    backend.write(&v2, &key("/a"), snapshot(b"a2")).await.unwrap();

    assert_eq!(
        backend.delete_generation(&v1).await.unwrap(),
        DeleteStatus::Deleted(2)
    );
    assert_eq!(
        backend.delete_generation(&v1).await.unwrap(),
        DeleteStatus::Missing
    );

    assert_eq!(backend.generations().await.unwrap(), vec![v2.clone()]);
    assert!(backend.read(&v1, &key("/a")).await.unwrap().is_none());
    assert!(backend.read(&v2, &key("/a")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_keys_lists_generation_contents() {
    let backend = MokaBackend::builder().initial_capacity(4).build();
    let v1 = GenerationId::new_static("v1");
    backend.open(&v1).await.unwrap();

    backend.write(&v1, &key("/a"), snapshot(b"a")).await.unwrap();
    backend.write(&v1, &key("/b"), snapshot(b"b")).await.unwrap();

    let mut targets: Vec<String> = backend
        .keys(&v1)
        .await
        .unwrap()
        .iter()
        .map(|key| key.target().to_owned())
        .collect();
    targets.sort();
    assert_eq!(targets, vec!["/a".to_owned(), "/b".to_owned()]);
}

#[tokio::test]
async fn test_quota_rejects_oversized_write() {
    let first = snapshot(b"small");
    let quota = first.memory_size() as u64 + 8;
    let backend = MokaBackend::builder().quota_bytes(quota).build();
    let v1 = GenerationId::new_static("v1");
    backend.open(&v1).await.unwrap();

    backend.write(&v1, &key("/a"), first).await.unwrap();

    let result = backend
        .write(&v1, &key("/b"), snapshot(b"does not fit"))
        .await;
    assert!(matches!(result, Err(BackendError::QuotaExceeded(_))));
    assert_eq!(backend.entry_count(&v1).await.unwrap(), 1);

    // Replacing an entry only counts the size difference.
    backend.write(&v1, &key("/a"), snapshot(b"smal")).await.unwrap();
    assert!(backend.usage_bytes() <= quota);
}

#[tokio::test]
async fn test_write_never_recreates_a_deleted_generation() {
    let backend = MokaBackend::builder().build();
    let v1 = GenerationId::new_static("v1");
    backend.open(&v1).await.unwrap();
    backend.write(&v1, &key("/a"), snapshot(b"a")).await.unwrap();
    backend.delete_generation(&v1).await.unwrap();

    let result = backend.write(&v1, &key("/c"), snapshot(b"late")).await;

    assert!(matches!(result, Err(BackendError::MissingGeneration(ref missing)) if *missing == v1));
    assert!(backend.generations().await.unwrap().is_empty());
    assert!(backend.read(&v1, &key("/c")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_clones_share_the_active_generation() {
    let backend = MokaBackend::builder().build();
    let shared = backend.clone();
    let v1 = GenerationId::new_static("v1");

    backend.active().promote(v1.clone());
    assert_eq!(shared.active().get(), Some(v1));
}

#[tokio::test]
async fn test_label() {
    let backend = MokaBackend::builder().label("assets").build();
    assert_eq!(backend.label().as_str(), "assets");
}
