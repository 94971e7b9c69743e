//! Diagnostic logging setup and the per-request access log.
//!
//! Diagnostics go through `tracing` to stderr. The access log is a separate
//! stream: one plain line per completed request on stdout, in the form
//! `<pid> <request-id> <status> - <method> <path>`.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::http::request::RequestIdExt;

/// Initialize the tracing subscriber. `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("mock_api={0},tower_http={0}", config.log_level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Destination for access log lines.
pub trait AccessLogSink: Send + Sync {
    /// Write one line. `line` carries no trailing newline.
    fn write_line(&self, line: &str);
}

/// Writes access lines to the process stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl AccessLogSink for StdoutSink {
    fn write_line(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{line}") {
            tracing::debug!(error = %e, "Failed to write access log line");
        }
    }
}

/// Keeps lines in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl AccessLogSink for MemorySink {
    fn write_line(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}

/// One completed request as it appears in the access log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRecord<'a> {
    pub pid: u32,
    pub request_id: &'a str,
    pub status: StatusCode,
    pub method: &'a Method,
    pub path: &'a str,
}

impl std::fmt::Display for AccessRecord<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} - {} {}",
            self.pid,
            self.request_id,
            self.status.as_u16(),
            self.method,
            self.path
        )
    }
}

/// State for [`access_log_middleware`].
#[derive(Clone)]
pub struct AccessLog {
    pid: u32,
    sink: Arc<dyn AccessLogSink>,
}

impl AccessLog {
    pub fn new(sink: Arc<dyn AccessLogSink>) -> Self {
        Self {
            pid: std::process::id(),
            sink,
        }
    }
}

/// Emits one access line after the rest of the chain has produced a response.
pub async fn access_log_middleware(
    State(log): State<AccessLog>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request.request_id().unwrap_or("-").to_string();

    let response = next.run(request).await;
    let status = response.status();

    let record = AccessRecord {
        pid: log.pid,
        request_id: &request_id,
        status,
        method: &method,
        path: &path,
    };
    log.sink.write_line(&record.to_string());

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = status.as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );
    response
}
