use std::sync::Arc;
use std::time::Duration;

use http::{Method, Request, StatusCode};
use precache::{
    Backend, CacheEvent, CacheStatus, CacheWorker, FetchError, GenerationId, Interceptor,
    PrecacheConfig, RequestKey, Resolution,
};
use precache_test::{MockBackend, MockNetwork};
use pretty_assertions::assert_eq;

fn get(target: &str) -> Request<()> {
    Request::get(target).body(()).unwrap()
}

async fn activated(
    backend: &MockBackend,
    network: &MockNetwork,
    manifest: &[&str],
    fetch_timeout: Option<Duration>,
) -> (CacheWorker<MockBackend>, Interceptor<MockBackend>) {
    let mut builder = PrecacheConfig::builder()
        .generation("v1")
        .manifest(manifest.iter().copied());
    if let Some(timeout) = fetch_timeout {
        builder = builder.fetch_timeout(timeout);
    }
    let worker = CacheWorker::with_shared_backend(builder.build().unwrap(), Arc::new(backend.clone()));
    let interceptor = worker.start(network.clone()).await.unwrap();
    (worker, interceptor)
}

#[tokio::test]
async fn test_precached_hit_makes_no_network_call() {
    let backend = MockBackend::new();
    let network = MockNetwork::new().with("/a", "A").with("/b", "B");
    let (_worker, interceptor) = activated(&backend, &network, &["/a", "/b"], None).await;
    let calls_after_install = network.call_count();

    let resolution = interceptor.intercept(get("/a"), network.clone()).await;

    assert_eq!(resolution.status(), CacheStatus::Hit);
    assert_eq!(resolution.into_response().unwrap().body(), "A");
    assert_eq!(network.call_count(), calls_after_install);
}

#[tokio::test]
async fn test_miss_is_fetched_then_served_from_cache() {
    let backend = MockBackend::new();
    let network = MockNetwork::new()
        .with("/a", "A")
        .with("/b", "B")
        .with("/c", "X");
    let (_worker, interceptor) = activated(&backend, &network, &["/a", "/b"], None).await;

    let first = interceptor.intercept(get("/c"), network.clone()).await;
    assert_eq!(first.status(), CacheStatus::Miss);
    assert_eq!(first.into_response().unwrap().body(), "X");

    interceptor.offload().wait_all().await;
    let v1 = GenerationId::new_static("v1");
    let stored = backend
        .read(&v1, &RequestKey::get("/c".parse().unwrap()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.body(), "X");

    let calls = network.call_count();
    let second = interceptor.intercept(get("/c"), network.clone()).await;
    assert_eq!(second.status(), CacheStatus::Hit);
    assert_eq!(second.into_response().unwrap().body(), "X");
    assert_eq!(network.call_count(), calls);
    assert_eq!(
        network.calls().iter().filter(|call| *call == "GET /c").count(),
        1
    );
}

#[tokio::test]
async fn test_non_get_never_touches_the_store() {
    let backend = MockBackend::new();
    let network = MockNetwork::new().with("/a", "A");
    let (_worker, interceptor) = activated(&backend, &network, &["/a"], None).await;
    backend.counters.reset();

    for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
        let request = Request::builder()
            .method(method.clone())
            .uri("/a")
            .body(())
            .unwrap();
        let resolution = interceptor.intercept(request, network.clone()).await;
        assert!(
            matches!(resolution, Resolution::Bypassed(Ok(_))),
            "{method} was not bypassed"
        );
    }

    interceptor.offload().wait_all().await;
    assert_eq!(backend.read_count(), 0);
    assert_eq!(backend.write_count(), 0);
    assert_eq!(network.calls()[1..], ["POST /a", "PUT /a", "DELETE /a", "HEAD /a"]);
}

#[tokio::test]
async fn test_bypass_reports_network_failure() {
    let backend = MockBackend::new();
    let network = MockNetwork::new().with("/a", "A");
    let (_worker, interceptor) = activated(&backend, &network, &["/a"], None).await;

    let request = Request::post("/offline").body(()).unwrap();
    let resolution = interceptor.intercept(request, network.clone()).await;
    assert!(matches!(resolution, Resolution::Bypassed(Err(FetchError::Upstream(_)))));
}

#[tokio::test]
async fn test_miss_without_network_is_unresolved() {
    let backend = MockBackend::new();
    let network = MockNetwork::new().with("/a", "A");
    let (_worker, interceptor) = activated(&backend, &network, &["/a"], None).await;
    backend.counters.reset();

    let resolution = interceptor.intercept(get("/offline"), network.clone()).await;

    assert_eq!(resolution.status(), CacheStatus::Unresolved);
    assert!(resolution.into_result().is_err());
    interceptor.offload().wait_all().await;
    assert_eq!(backend.write_count(), 0);
}

#[tokio::test]
async fn test_non_success_response_is_returned_and_stored() {
    let backend = MockBackend::new();
    let network = MockNetwork::new().with("/a", "A");
    network.route("/gone", StatusCode::NOT_FOUND, "not here");
    let (_worker, interceptor) = activated(&backend, &network, &["/a"], None).await;

    let resolution = interceptor.intercept(get("/gone"), network.clone()).await;
    let response = resolution.into_response().unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    interceptor.offload().wait_all().await;
    network.unplug("/gone");
    let again = interceptor.intercept(get("/gone"), network.clone()).await;
    assert_eq!(again.status(), CacheStatus::Hit);
    assert_eq!(again.into_response().unwrap().status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_read_failure_degrades_to_network() {
    let backend = MockBackend::new();
    let network = MockNetwork::new().with("/a", "A");
    let (_worker, interceptor) = activated(&backend, &network, &["/a"], None).await;
    backend.fail_reads(true);

    let calls = network.call_count();
    let resolution = interceptor.intercept(get("/a"), network.clone()).await;

    assert_eq!(resolution.status(), CacheStatus::Miss);
    assert_eq!(resolution.into_response().unwrap().body(), "A");
    assert_eq!(network.call_count(), calls + 1);
}

#[tokio::test]
async fn test_write_back_failure_does_not_affect_response() {
    let backend = MockBackend::new();
    let network = MockNetwork::new().with("/a", "A").with("/c", "X");
    let (worker, interceptor) = activated(&backend, &network, &["/a"], None).await;
    let mut events = worker.subscribe();
    backend.fail_writes(true);

    let resolution = interceptor.intercept(get("/c"), network.clone()).await;
    assert_eq!(resolution.status(), CacheStatus::Miss);
    assert_eq!(resolution.into_response().unwrap().body(), "X");

    interceptor.offload().wait_all().await;
    let event = events.recv().await.unwrap();
    let CacheEvent::WriteBackFailed {
        generation, key, ..
    } = event
    else {
        panic!("expected a write-back failure event");
    };
    assert_eq!(generation.as_str(), "v1");
    assert_eq!(key.to_string(), "GET /c");
    assert_eq!(backend.total_entries(), 1);
}

#[tokio::test]
async fn test_fetch_timeout_is_a_network_failure() {
    let backend = MockBackend::new();
    let network = MockNetwork::new().with("/a", "A").with("/slow", "S");
    network.slow("/slow", Duration::from_secs(30));
    let limit = Duration::from_millis(50);
    let (_worker, interceptor) = activated(&backend, &network, &["/a"], Some(limit)).await;

    let resolution = interceptor.intercept(get("/slow"), network.clone()).await;

    assert!(matches!(&resolution, Resolution::Unresolved(err) if err.is_timeout()));
    match resolution {
        Resolution::Unresolved(FetchError::Timeout(elapsed)) => assert_eq!(elapsed, limit),
        other => panic!("expected a timeout, got {:?}", other.status()),
    }
}

#[tokio::test]
async fn test_concurrent_misses_store_one_entry() {
    let backend = MockBackend::new();
    let network = MockNetwork::new().with("/a", "A").with("/c", "X");
    let (_worker, interceptor) = activated(&backend, &network, &["/a"], None).await;

    let requests = (0..8).map(|_| interceptor.intercept(get("/c"), network.clone()));
    for resolution in futures::future::join_all(requests).await {
        assert_eq!(resolution.into_response().unwrap().body(), "X");
    }

    interceptor.offload().wait_all().await;
    let v1 = GenerationId::new_static("v1");
    assert_eq!(backend.entry_count(&v1).await.unwrap(), 2);
}

#[tokio::test]
async fn test_only_current_generation_is_consulted() {
    let backend = MockBackend::new();
    let network = MockNetwork::new().with("/a", "A").with("/old", "fresh");
    let stale = precache::CachedResponse::from_response(http::Response::new(
        bytes::Bytes::from_static(b"stale"),
    ));
    backend.seed(
        &GenerationId::new_static("v0"),
        RequestKey::get("/old".parse().unwrap()),
        stale,
    );

    let interceptor = Interceptor::new(Arc::new(backend.clone()), GenerationId::new_static("v1"));
    let resolution = interceptor.intercept(get("/old"), network.clone()).await;

    assert_eq!(resolution.status(), CacheStatus::Miss);
    assert_eq!(resolution.into_response().unwrap().body(), "fresh");
}
