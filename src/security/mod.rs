//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client sliding window)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Rejection is a normal 429 response, never an error
//! - Limiter sits behind a trait so tests can drive it with a manual clock

pub mod rate_limit;

pub use rate_limit::{
    Clock, Decision, KeyExtractor, ManualClock, RateLimiter, SlidingWindowLimiter, SystemClock,
};
