use std::collections::HashMap;
use std::future::Ready;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use precache::{
    Backend, CacheEvent, CacheStatus, CacheWorker, LifecycleError, PrecacheConfig, WorkerState,
};
use precache_core::Upstream;
use precache_moka::MokaBackend;
use pretty_assertions::assert_eq;

/// Serves fixed bodies by path; unknown paths are a network error.
#[derive(Clone, Default)]
struct StaticNetwork {
    bodies: Arc<HashMap<&'static str, &'static str>>,
    calls: Arc<AtomicUsize>,
}

impl StaticNetwork {
    fn new(bodies: &[(&'static str, &'static str)]) -> Self {
        Self {
            bodies: Arc::new(bodies.iter().copied().collect()),
            calls: Arc::default(),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Upstream<Request<()>> for StaticNetwork {
    type Response = Result<Response<Bytes>, String>;
    type Future = Ready<Self::Response>;

    fn call(&mut self, req: Request<()>) -> Self::Future {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = match self.bodies.get(req.uri().path()) {
            Some(body) => Ok(Response::new(Bytes::from_static(body.as_bytes()))),
            None => Err(format!("connection refused for {}", req.uri())),
        };
        std::future::ready(result)
    }
}

fn config(generation: &str, manifest: &[&str]) -> PrecacheConfig {
    PrecacheConfig::builder()
        .generation(generation)
        .manifest(manifest.iter().copied())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_worker_lifecycle() {
    let network = StaticNetwork::new(&[("/a", "A"), ("/b", "B")]);
    let worker = CacheWorker::new(config("v1", &["/a", "/b"]), MokaBackend::builder().build());
    let mut events = worker.subscribe();
    let mut states = worker.watch_state();

    assert_eq!(worker.state(), WorkerState::Parsed);
    assert!(matches!(
        worker.interceptor(),
        Err(LifecycleError::InvalidState {
            state: WorkerState::Parsed,
            ..
        })
    ));

    let report = worker.install(network.clone()).await.unwrap();
    assert_eq!(report.entries, 2);
    assert_eq!(worker.state(), WorkerState::Installed);
    assert!(states.has_changed().unwrap());
    assert_eq!(*states.borrow_and_update(), WorkerState::Installed);
    assert_eq!(
        events.recv().await.unwrap(),
        CacheEvent::ReadyToTakeOver {
            generation: worker.generation().clone()
        }
    );

    worker.activate().await.unwrap();
    assert_eq!(worker.state(), WorkerState::Activated);
    assert_eq!(
        events.recv().await.unwrap(),
        CacheEvent::Serving {
            generation: worker.generation().clone()
        }
    );

    let interceptor = worker.interceptor().unwrap();
    let before = network.calls();
    let resolution = interceptor
        .intercept(Request::get("/a").body(()).unwrap(), network.clone())
        .await;
    assert_eq!(resolution.status(), CacheStatus::Hit);
    assert_eq!(resolution.into_response().unwrap().body(), "A");
    assert_eq!(network.calls(), before);
}

#[tokio::test]
async fn test_transitions_are_ordered() {
    let network = StaticNetwork::new(&[("/a", "A")]);
    let worker = CacheWorker::new(config("v1", &["/a"]), MokaBackend::builder().build());

    assert!(matches!(
        worker.activate().await,
        Err(LifecycleError::InvalidState {
            operation: "activate",
            state: WorkerState::Parsed
        })
    ));

    worker.install(network.clone()).await.unwrap();
    assert!(matches!(
        worker.install(network).await,
        Err(LifecycleError::InvalidState {
            operation: "install",
            state: WorkerState::Installed
        })
    ));
}

#[tokio::test]
async fn test_failed_install_is_redundant() {
    let backend = Arc::new(MokaBackend::builder().build());
    let network = StaticNetwork::new(&[("/a", "A")]);

    let worker = CacheWorker::with_shared_backend(config("v1", &["/a", "/missing"]), backend.clone());
    let mut events = worker.subscribe();

    let error = worker.install(network).await.unwrap_err();
    let LifecycleError::Install(install) = error else {
        panic!("expected an install error");
    };
    let failed: Vec<&str> = install
        .failed_resources()
        .into_iter()
        .map(|resource| resource.as_str())
        .collect();
    assert_eq!(failed, vec!["/missing"]);

    assert_eq!(worker.state(), WorkerState::Redundant);
    assert!(backend.generations().await.unwrap().is_empty());
    assert!(matches!(
        events.recv().await.unwrap(),
        CacheEvent::InstallFailed { .. }
    ));
    assert!(worker.interceptor().is_err());
}

#[tokio::test]
async fn test_start_sweeps_previous_generation() {
    let backend = Arc::new(MokaBackend::builder().build());
    let network = StaticNetwork::new(&[("/a", "A"), ("/b", "B")]);

    let v1 = CacheWorker::with_shared_backend(config("v1", &["/a"]), backend.clone());
    v1.start(network.clone()).await.unwrap();

    let v2 = CacheWorker::with_shared_backend(config("v2", &["/b"]), backend.clone());
    let interceptor = v2.start(network.clone()).await.unwrap();

    assert_eq!(
        backend.generations().await.unwrap(),
        vec![v2.generation().clone()]
    );
    assert_eq!(v1.state(), WorkerState::Redundant);
    assert_eq!(v2.state(), WorkerState::Activated);

    // "/a" belonged to v1 only; the new generation goes to the network.
    let before = network.calls();
    let resolution = interceptor
        .intercept(Request::get("/a").body(()).unwrap(), network.clone())
        .await;
    assert_eq!(resolution.status(), CacheStatus::Miss);
    assert_eq!(network.calls(), before + 1);
}

#[tokio::test]
async fn test_non_success_status_fails_install() {
    #[derive(Clone)]
    struct NotFound;

    impl Upstream<Request<()>> for NotFound {
        type Response = Result<Response<Bytes>, String>;
        type Future = Ready<Self::Response>;

        fn call(&mut self, _req: Request<()>) -> Self::Future {
            let mut response = Response::new(Bytes::new());
            *response.status_mut() = StatusCode::NOT_FOUND;
            std::future::ready(Ok(response))
        }
    }

    let worker = CacheWorker::new(config("v1", &["/a"]), MokaBackend::builder().build());
    let error = worker.install(NotFound).await.unwrap_err();
    assert!(error.to_string().contains("404"), "{error}");
    assert_eq!(worker.state(), WorkerState::Redundant);
}
