//! Mock API server library.
//!
//! A single `GET /x/{id}` route that echoes its path parameter as JSON,
//! behind request-id, access log, and sliding-window rate limit middleware.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;

pub use config::schema::MockConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
