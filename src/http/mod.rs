//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware chain)
//!     → request.rs (assign request ID)
//!     → [access log] (observability::logging)
//!     → [rate limit] (security::rate_limit)
//!     → echo.rs, or response.rs fallback for unmatched paths
//!     → Send to client
//! ```

pub mod echo;
pub mod request;
pub mod response;
pub mod server;

pub use echo::EchoResponse;
pub use request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
