//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MockConfig (validated, immutable)
//!     → handed to HttpServer at startup
//! ```
//!
//! # Design Decisions
//! - All fields have defaults; no file means the stock server on :8081
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::AccessLogConfig;
pub use schema::ListenerConfig;
pub use schema::MockConfig;
pub use schema::ObservabilityConfig;
pub use schema::RateLimitConfig;
pub use validation::ValidationError;
