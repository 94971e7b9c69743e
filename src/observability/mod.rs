//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request:
//!     → logging.rs (one access line on stdout)
//!     → metrics.rs (counters, histograms)
//!
//! All subsystems:
//!     → tracing events on stderr, filtered by RUST_LOG
//! ```
//!
//! # Design Decisions
//! - Request ID flows from the request-id layer into the access line
//! - Access log and diagnostics use separate streams
//! - Metrics are opt-in and cheap when off

pub mod logging;
pub mod metrics;

pub use logging::{access_log_middleware, init_logging, AccessLog, AccessLogSink, MemorySink, StdoutSink};
