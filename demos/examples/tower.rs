//! Precaching an in-process origin with the Tower layer.
//!
//! The origin below serves the shell of a small offline-capable web app.
//! The worker installs the generation described in `manifest.yaml`, sweeps
//! whatever generation was there before, then answers requests through
//! `PrecacheLayer`.
//!
//! Run with `RUST_LOG=precache=debug cargo run -p precache-demos --example tower`.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use precache::{Backend, CacheWorker, PrecacheConfig};
use precache_moka::MokaBackend;
use precache_tower::{PrecacheLayer, TowerUpstream};
use tower::{Service, ServiceBuilder, ServiceExt, service_fn};
use tracing_subscriber::EnvFilter;

async fn origin(req: Request<Full<Bytes>>) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path();
    let body = match path {
        "/" => Bytes::from_static(b"<!doctype html><title>localdex</title>"),
        "/assets/manifest.json" => Bytes::from_static(br#"{"name":"localdex"}"#),
        "/api/pokemon/25" => Bytes::from_static(br#"{"id":25,"name":"pikachu"}"#),
        p if p.starts_with("/assets/") => Bytes::from(format!("binary {p}")),
        _ => {
            let mut response = Response::new(Full::new(Bytes::from_static(b"not found")));
            *response.status_mut() = StatusCode::NOT_FOUND;
            return Ok(response);
        }
    };
    Ok(Response::new(Full::new(body)))
}

async fn get<S>(service: &mut S, target: &str) -> Result<(), Box<dyn std::error::Error>>
where
    S: Service<Request<Full<Bytes>>, Response = Response<Full<Bytes>>>,
    S::Error: std::error::Error + 'static,
{
    let request = Request::get(target).body(Full::default())?;
    let response = service.ready().await?.call(request).await?;
    let status = response.headers().get("x-cache-status").cloned();
    let body = response.into_body().collect().await?.to_bytes();
    println!("GET {target:<24} {status:?} ({} bytes)", body.len());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("precache=info")),
        )
        .init();

    let backend = Arc::new(MokaBackend::builder().quota_bytes(16 * 1024 * 1024).build());
    let network = service_fn(origin);

    // A previous release left its generation behind.
    let previous = PrecacheConfig::builder()
        .generation("localdex-pwa-cache-v0")
        .manifest(["/"])
        .build()?;
    CacheWorker::with_shared_backend(previous, backend.clone())
        .start(TowerUpstream::new(network))
        .await?;

    let config = PrecacheConfig::from_yaml(include_str!("../manifest.yaml"))?;
    let worker = CacheWorker::with_shared_backend(config, backend.clone());
    let mut events = worker.subscribe();

    let report = worker.install(TowerUpstream::new(network)).await?;
    println!("installed {} with {} entries", report.generation, report.entries);
    let sweep = worker.activate().await?;
    println!("swept {:?}", sweep.deleted);
    while let Ok(event) = events.try_recv() {
        println!("event: {event:?}");
    }

    let interceptor = worker.interceptor()?;
    let offload = interceptor.offload().clone();
    let mut service = ServiceBuilder::new()
        .layer(PrecacheLayer::new(interceptor).with_status_header())
        .service(network);

    get(&mut service, "/").await?;
    get(&mut service, "/assets/favicon.png").await?;
    get(&mut service, "/api/pokemon/25").await?;
    offload.wait_all().await;
    get(&mut service, "/api/pokemon/25").await?;

    println!(
        "generations: {:?}, entries: {}",
        backend.generations().await?,
        backend.entry_count(worker.generation()).await?
    );
    Ok(())
}
