//! Precaching a remote origin with the reqwest middleware.
//!
//! Point `PRECACHE_ORIGIN` at a server hosting the manifest resources
//! (defaults to `http://localhost:8080`).

use std::sync::Arc;

use precache::{CacheWorker, Origin, PrecacheConfig};
use precache_moka::MokaBackend;
use precache_reqwest::{ClientUpstream, PrecacheMiddleware};
use reqwest::Client;
use reqwest_middleware::ClientBuilder;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("precache=debug")
        .init();

    let origin =
        std::env::var("PRECACHE_ORIGIN").unwrap_or_else(|_| "http://localhost:8080".to_owned());

    // The origin makes manifest keys match the absolute URLs reqwest sends.
    let mut config = PrecacheConfig::from_yaml(include_str!("../manifest.yaml"))?;
    config.origin = Some(Origin::new(&origin)?);

    let backend = Arc::new(MokaBackend::builder().build());
    let worker = CacheWorker::with_shared_backend(config, backend);
    let interceptor = match worker.start(ClientUpstream::new(Client::new())).await {
        Ok(interceptor) => interceptor,
        Err(error) => {
            eprintln!("install failed, nothing is served offline: {error}");
            return Ok(());
        }
    };

    let client = ClientBuilder::new(Client::new())
        .with(PrecacheMiddleware::new(interceptor).with_status_header())
        .build();

    for target in ["/", "/assets/manifest.json", "/api/pokemon/25"] {
        let response = client.get(format!("{origin}{target}")).send().await?;
        println!(
            "GET {target:<24} {} {:?}",
            response.status(),
            response.headers().get("X-Cache-Status")
        );
    }
    Ok(())
}
