//! Configuration validation.
//!
//! Serde handles the syntax; this module checks values that parse but cannot
//! run (zero-length windows, bad addresses, bad header names). All errors are
//! collected so a single pass reports everything wrong with a file.

use std::net::SocketAddr;

use axum::http::HeaderName;

use crate::config::schema::MockConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration, returning every error found.
pub fn validate_config(config: &MockConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let rate_limit = &config.rate_limit;
    if rate_limit.enabled {
        if rate_limit.max_requests == 0 {
            errors.push(ValidationError::new(
                "rate_limit.max_requests",
                "must be at least 1 when rate limiting is enabled",
            ));
        }
        if rate_limit.window_secs == 0 {
            errors.push(ValidationError::new(
                "rate_limit.window_secs",
                "must be at least 1 when rate limiting is enabled",
            ));
        }
    }

    if let Some(name) = &rate_limit.key_header {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                "rate_limit.key_header",
                format!("'{name}' is not a valid header name"),
            ));
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&MockConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = MockConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.rate_limit.max_requests = 0;
        config.rate_limit.window_secs = 0;
        config.rate_limit.key_header = Some("bad header".into());

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "rate_limit.max_requests",
                "rate_limit.window_secs",
                "rate_limit.key_header",
            ]
        );
    }

    #[test]
    fn zero_limits_allowed_when_disabled() {
        let mut config = MockConfig::default();
        config.rate_limit.enabled = false;
        config.rate_limit.max_requests = 0;
        config.rate_limit.window_secs = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = MockConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "observability.metrics_address");
    }
}
