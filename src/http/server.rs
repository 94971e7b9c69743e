//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the echo route and 404 fallback
//! - Wire up middleware (request ID, access log, rate limit)
//! - Serve on a bound listener with connection info
//! - Purge idle rate limiter keys in the background
//! - Stop on the shutdown broadcast

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::MockConfig;
use crate::http::{echo, request, response};
use crate::observability::metrics;
use crate::observability::logging::{access_log_middleware, AccessLog, AccessLogSink, StdoutSink};
use crate::security::rate_limit::{
    rate_limit_middleware, KeyExtractor, RateLimitState, RateLimiter, SlidingWindowLimiter,
};

/// HTTP server for the mock API.
pub struct HttpServer {
    router: Router,
    config: MockConfig,
    limiter: Option<Arc<dyn RateLimiter>>,
}

impl HttpServer {
    /// Create a server using the wall clock and stdout access log.
    pub fn new(config: MockConfig) -> Self {
        let limiter: Arc<dyn RateLimiter> =
            Arc::new(SlidingWindowLimiter::from_config(&config.rate_limit));
        Self::with_components(config, limiter, Arc::new(StdoutSink))
    }

    /// Create a server with an injected limiter and access log sink.
    ///
    /// The limiter is ignored when `rate_limit.enabled` is false.
    pub fn with_components(
        config: MockConfig,
        limiter: Arc<dyn RateLimiter>,
        sink: Arc<dyn AccessLogSink>,
    ) -> Self {
        let limiter = config.rate_limit.enabled.then_some(limiter);
        let router = Self::build_router(&config, limiter.clone(), sink);
        Self {
            router,
            config,
            limiter,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers wrap everything added before them, so they are applied
    /// innermost first: rate limit, access log, metrics, then request ID.
    fn build_router(
        config: &MockConfig,
        limiter: Option<Arc<dyn RateLimiter>>,
        sink: Arc<dyn AccessLogSink>,
    ) -> Router {
        let mut router = Router::new()
            .route("/x/{id}", get(echo::echo_id))
            .route("/x/", get(echo::echo_id))
            .fallback(response::not_found);

        if let Some(limiter) = limiter {
            let state = RateLimitState::new(limiter, KeyExtractor::from_config(&config.rate_limit));
            router = router.layer(middleware::from_fn_with_state(state, rate_limit_middleware));
        }

        if config.access_log.enabled {
            router = router.layer(middleware::from_fn_with_state(
                AccessLog::new(sink),
                access_log_middleware,
            ));
        }

        if config.observability.metrics_enabled {
            router = router.layer(middleware::from_fn(metrics::track_requests));
        }

        router
            .layer(request::propagate_request_id_layer())
            .layer(request::set_request_id_layer())
            .layer(TraceLayer::new_for_http())
    }

    /// A clone of the fully layered router, for serving in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            rate_limit = self.limiter.is_some(),
            "HTTP server starting"
        );

        if let Some(limiter) = self.limiter.clone() {
            let window = self.config.rate_limit.window().max(Duration::from_secs(1));
            tokio::spawn(purge_idle_clients(limiter, window, shutdown.resubscribe()));
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Drop clients whose window emptied, once per window.
async fn purge_idle_clients(
    limiter: Arc<dyn RateLimiter>,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = limiter.purge_expired();
                if removed > 0 {
                    tracing::debug!(removed, "Purged idle rate limit entries");
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}
