//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, Response};
use axum::Router;
use mock_api::config::MockConfig;
use mock_api::observability::MemorySink;
use mock_api::security::{ManualClock, RateLimiter, SlidingWindowLimiter};
use mock_api::{HttpServer, Shutdown};
use tokio::task::JoinHandle;
use tower::ServiceExt;

/// An in-process server driven by a manual clock.
pub struct Harness {
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub sink: MemorySink,
}

impl Harness {
    pub fn new(config: MockConfig) -> Self {
        let clock = Arc::new(ManualClock::new());
        let limiter: Arc<dyn RateLimiter> = Arc::new(SlidingWindowLimiter::with_clock(
            config.rate_limit.max_requests,
            config.rate_limit.window(),
            clock.clone(),
        ));
        let sink = MemorySink::new();
        let server = HttpServer::with_components(config, limiter, Arc::new(sink.clone()));

        Self {
            router: server.router(),
            clock,
            sink,
        }
    }

    pub fn with_limit(max_requests: u32, window_secs: u64) -> Self {
        let mut config = MockConfig::default();
        config.rate_limit.max_requests = max_requests;
        config.rate_limit.window_secs = window_secs;
        Self::new(config)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// `GET path` as seen from the given client address.
    pub async fn get_from(&self, path: &str, client: [u8; 4]) -> Response<Body> {
        self.send(get(path, client)).await
    }
}

pub fn get(path: &str, client: [u8; 4]) -> Request<Body> {
    let mut request = Request::get(path).body(Body::empty()).unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((client, 40_000))));
    request
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// A server listening on an ephemeral localhost port.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub sink: MemorySink,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

pub async fn start_server(mut config: MockConfig) -> RunningServer {
    config.listener.bind_address = "127.0.0.1:0".into();
    let listener = mock_api::net::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let limiter: Arc<dyn RateLimiter> =
        Arc::new(SlidingWindowLimiter::from_config(&config.rate_limit));
    let sink = MemorySink::new();
    let server = HttpServer::with_components(config, limiter, Arc::new(sink.clone()));

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    tokio::time::sleep(Duration::from_millis(50)).await;

    RunningServer {
        addr,
        sink,
        shutdown,
        handle,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
