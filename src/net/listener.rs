//! TCP listener binding.
//!
//! # Responsibilities
//! - Parse the configured bind address
//! - Bind the socket, failing startup on error

use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// The configured address does not parse.
    #[error("Invalid bind address '{address}': {source}")]
    Address {
        address: String,
        source: std::net::AddrParseError,
    },
    /// Failed to bind to address.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        source: std::io::Error,
    },
}

/// Bind to the configured address.
pub async fn bind(config: &ListenerConfig) -> Result<TcpListener, ListenerError> {
    let address: SocketAddr = config
        .bind_address
        .parse()
        .map_err(|source| ListenerError::Address {
            address: config.bind_address.clone(),
            source,
        })?;

    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| ListenerError::Bind { address, source })?;

    if let Ok(local_addr) = listener.local_addr() {
        tracing::info!(address = %local_addr, "Listener bound");
    }

    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_ephemeral_port() {
        let config = ListenerConfig {
            bind_address: "127.0.0.1:0".into(),
        };
        let listener = bind(&config).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn rejects_bad_address() {
        let config = ListenerConfig {
            bind_address: "localhost".into(),
        };
        let err = bind(&config).await.unwrap_err();
        assert!(matches!(err, ListenerError::Address { .. }));
    }

    #[tokio::test]
    async fn reports_port_in_use() {
        let first = bind(&ListenerConfig {
            bind_address: "127.0.0.1:0".into(),
        })
        .await
        .unwrap();
        let taken = first.local_addr().unwrap();

        let err = bind(&ListenerConfig {
            bind_address: taken.to_string(),
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ListenerError::Bind { .. }));
    }
}
