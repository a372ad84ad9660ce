use std::sync::Arc;

use tickwire_metadata::{Environment, TransportType};
use tracing::info;

use crate::error::StreamError;
use crate::memory::InMemoryEventStream;
use crate::nats::JetStreamEventStream;
use crate::stream::EventStream;

/// Error creating middleware
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("configuration error: {0}")]
    ConfigError(String),
    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// Factory for creating middleware instances based on environment config
pub struct MiddlewareFactory;

impl MiddlewareFactory {
    /// Create the event stream records are published to.
    ///
    /// For NATS this connects and makes sure the JetStream stream exists.
    pub async fn create_event_stream(env: &Environment) -> Result<Arc<dyn EventStream>, FactoryError> {
        match env.transport.transport_type {
            TransportType::Memory => {
                info!(env = %env.name, "Using in-memory event stream");
                Ok(Arc::new(InMemoryEventStream::new()))
            }
            TransportType::Nats => {
                let url = env.transport.url.as_deref().ok_or_else(|| {
                    FactoryError::ConfigError("nats transport requires a url".to_string())
                })?;
                let stream = JetStreamEventStream::connect(
                    url,
                    env.stream.subject_prefix(),
                    env.stream.name.clone(),
                )
                .await?;
                stream.ensure_stream().await?;
                info!(
                    env = %env.name,
                    url = %url,
                    stream = %env.stream.name,
                    region = %env.stream.region,
                    "Connected to JetStream event stream"
                );
                Ok(Arc::new(stream))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn make_test_env(transport_type: TransportType, url: Option<&str>) -> Environment {
        let mut env = Environment::parse("name: test\ntransport:\n  type: memory\n").unwrap();
        env.transport.transport_type = transport_type;
        env.transport.url = url.map(str::to_string);
        env
    }

    #[tokio::test]
    async fn test_create_memory_stream() {
        let env = make_test_env(TransportType::Memory, None);
        let stream = MiddlewareFactory::create_event_stream(&env).await.unwrap();
        let out = stream
            .put_record(&env.stream.name, Bytes::from("{}"), "AAPL")
            .await
            .unwrap();
        assert!(!out.sequence_number.is_empty());
    }

    #[tokio::test]
    async fn test_nats_without_url_is_config_error() {
        let env = make_test_env(TransportType::Nats, None);
        let result = MiddlewareFactory::create_event_stream(&env).await;
        assert!(matches!(result, Err(FactoryError::ConfigError(_))));
    }
}
