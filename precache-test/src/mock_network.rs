//! Scripted network for driving installs and interceptions.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use futures::future::BoxFuture;
use http::{Method, Request, Response, StatusCode};
use precache_core::Upstream;

/// Network failure produced by [`MockNetwork`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkError(pub String);

impl std::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for NetworkError {}

#[derive(Debug, Clone)]
struct Route {
    status: StatusCode,
    body: Bytes,
    delay: Option<Duration>,
}

/// Network answering from a route table.
///
/// Unknown targets fail like an unreachable host. Every call is logged as
/// `"METHOD target"`, in call order, and shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MockNetwork {
    routes: Arc<DashMap<String, Route>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `body` with `200 OK` at `target`.
    pub fn with(self, target: &str, body: &'static str) -> Self {
        self.route(target, StatusCode::OK, body);
        self
    }

    /// Serves `body` with `status` at `target`.
    pub fn route(&self, target: &str, status: StatusCode, body: &'static str) {
        self.routes.insert(
            target.to_owned(),
            Route {
                status,
                body: Bytes::from_static(body.as_bytes()),
                delay: None,
            },
        );
    }

    /// Delays the answer for `target` by `delay`.
    pub fn slow(&self, target: &str, delay: Duration) {
        if let Some(mut route) = self.routes.get_mut(target) {
            route.delay = Some(delay);
        }
    }

    /// Makes `target` unreachable.
    pub fn unplug(&self, target: &str) {
        self.routes.remove(target);
    }

    /// Every call so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Number of calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or_default()
    }

    fn record(&self, method: &Method, target: &str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(format!("{method} {target}"));
        }
    }
}

impl Upstream<Request<()>> for MockNetwork {
    type Response = Result<Response<Bytes>, NetworkError>;
    type Future = BoxFuture<'static, Self::Response>;

    fn call(&mut self, req: Request<()>) -> Self::Future {
        let target = req.uri().to_string();
        self.record(req.method(), &target);
        let route = self.routes.get(&target).map(|route| route.clone());

        Box::pin(async move {
            let route = route.ok_or_else(|| NetworkError(format!("{target} is unreachable")))?;
            if let Some(delay) = route.delay {
                tokio::time::sleep(delay).await;
            }
            let mut response = Response::new(route.body);
            *response.status_mut() = route.status;
            Ok(response)
        })
    }
}
