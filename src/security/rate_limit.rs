//! Sliding-window rate limiting middleware.
//!
//! Each client key owns a log of the instants at which its requests were
//! accepted. A request is admitted only while fewer than `max_requests`
//! entries are younger than the window, so no trailing window of length
//! `window` ever holds more than `max_requests` accepted requests.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::observability::metrics;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Key used when neither the configured header nor connection info is available.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Source of the current instant.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_nanos: AtomicU64::new(0),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.offset_nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

impl<C: Clock> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Outcome of a single check-and-increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request was counted and may proceed.
    Allowed {
        /// Requests still available in the current window.
        remaining: u32,
        /// Time until the oldest counted request leaves the window.
        reset: Duration,
    },
    /// The window is full; nothing was counted.
    Denied {
        /// Time until a slot frees up.
        retry_after: Duration,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

/// Per-key admission control.
///
/// `check` must be atomic per key: concurrent calls for the same key never
/// admit more than `limit()` requests within one window.
pub trait RateLimiter: Send + Sync {
    fn check(&self, key: &str) -> Decision;

    /// Maximum requests admitted per window.
    fn limit(&self) -> u32;

    /// Drop keys with no requests left in the window. Returns how many were removed.
    fn purge_expired(&self) -> usize;
}

/// Sliding-log limiter keyed by client.
pub struct SlidingWindowLimiter<C: Clock = SystemClock> {
    windows: DashMap<String, VecDeque<Instant>>,
    max_requests: u32,
    window: Duration,
    clock: C,
}

impl SlidingWindowLimiter<SystemClock> {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self::with_clock(max_requests, window, SystemClock)
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, config.window())
    }
}

impl<C: Clock> SlidingWindowLimiter<C> {
    pub fn with_clock(max_requests: u32, window: Duration, clock: C) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
            clock,
        }
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    fn prune(hits: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(oldest) = hits.front() {
            if now.saturating_duration_since(*oldest) >= window {
                hits.pop_front();
            } else {
                break;
            }
        }
    }

    fn until_expiry(&self, oldest: Instant, now: Instant) -> Duration {
        (oldest + self.window).saturating_duration_since(now)
    }
}

impl<C: Clock> RateLimiter for SlidingWindowLimiter<C> {
    fn check(&self, key: &str) -> Decision {
        let now = self.clock.now();
        let max = self.max_requests as usize;

        // The entry guard holds the shard lock for the whole check-and-increment.
        let mut entry = self.windows.entry(key.to_owned()).or_default();
        let hits = entry.value_mut();
        Self::prune(hits, now, self.window);

        if hits.len() >= max {
            let retry_after = hits
                .front()
                .map(|oldest| self.until_expiry(*oldest, now))
                .unwrap_or(self.window);
            return Decision::Denied { retry_after };
        }

        hits.push_back(now);
        let reset = hits
            .front()
            .map(|oldest| self.until_expiry(*oldest, now))
            .unwrap_or(self.window);

        Decision::Allowed {
            remaining: (max - hits.len()) as u32,
            reset,
        }
    }

    fn limit(&self) -> u32 {
        self.max_requests
    }

    fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let window = self.window;
        let before = self.windows.len();
        self.windows.retain(|_, hits| {
            Self::prune(hits, now, window);
            !hits.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }
}

/// How the middleware derives a client key from a request.
#[derive(Debug, Clone, Default)]
pub enum KeyExtractor {
    /// Remote IP address from the connection.
    #[default]
    RemoteAddr,
    /// First comma-separated value of a header, falling back to the remote IP.
    Header(HeaderName),
}

impl KeyExtractor {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        config
            .key_header
            .as_deref()
            .and_then(|name| HeaderName::from_bytes(name.as_bytes()).ok())
            .map(KeyExtractor::Header)
            .unwrap_or_default()
    }

    pub fn key_for<B>(&self, request: &Request<B>) -> String {
        if let KeyExtractor::Header(name) = self {
            let from_header = request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(key) = from_header {
                return key.to_string();
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }
}

/// State shared by every invocation of [`rate_limit_middleware`].
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<dyn RateLimiter>,
    pub key: KeyExtractor,
}

impl RateLimitState {
    pub fn new(limiter: Arc<dyn RateLimiter>, key: KeyExtractor) -> Self {
        Self { limiter, key }
    }
}

/// Round up to whole seconds, as the headers carry integers.
fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

fn too_many_requests(retry_after: Duration) -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::RETRY_AFTER, ceil_secs(retry_after).to_string())],
        "Too Many Requests",
    )
        .into_response()
}

/// Middleware function for sliding-window rate limiting.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = state.key.key_for(&request);

    match state.limiter.check(&key) {
        Decision::Allowed { remaining, reset } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(state.limiter.limit()));
            headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
            headers.insert(X_RATELIMIT_RESET, HeaderValue::from(ceil_secs(reset)));
            response
        }
        Decision::Denied { retry_after } => {
            tracing::warn!(client = %key, retry_after = ?retry_after, "Rate limit exceeded");
            metrics::record_rate_limited();
            too_many_requests(retry_after)
        }
    }
}
