use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::{ConnectorError, ResolverError};

/// One open, full-duplex text connection to the feed
#[async_trait]
pub trait FeedSocket: Send {
    /// Send a text frame to the feed
    async fn send_text(&mut self, text: String) -> Result<(), ConnectorError>;

    /// Wait for the next text frame.
    /// Returns Ok(None) once the peer has closed the connection.
    async fn recv(&mut self) -> Result<Option<String>, ConnectorError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), ConnectorError>;
}

/// Connector trait for feed sources.
///
/// Every call to `connect` performs a fresh handshake; sessions call it again
/// after each disconnect.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a new connection to the feed
    async fn connect(&self) -> Result<Box<dyn FeedSocket>, ConnectorError>;

    /// Endpoint description that is safe to log
    fn describe(&self) -> String;
}

/// KeyResolver trait for credential sources (env vars, Vault, etc.)
pub trait KeyResolver: Send + Sync {
    /// Resolve keys from a source string (e.g., "env:VAR1,VAR2")
    fn resolve(&self, source: &str) -> Result<HashMap<String, String>, ResolverError>;

    /// Resolve a source that names exactly one key and return its value
    fn resolve_single(&self, source: &str) -> Result<String, ResolverError> {
        let keys = self.resolve(source)?;
        if keys.len() != 1 {
            return Err(ResolverError::UnsupportedSource(format!(
                "expected exactly one key in {}, got {}",
                source,
                keys.len()
            )));
        }
        keys.into_values()
            .next()
            .ok_or_else(|| ResolverError::MissingKey(source.to_string()))
    }
}
