//! Publisher for sending ingested records to the event stream
//!
//! - Local validation before any downstream call (non-empty key, size limit)
//! - Retryable failures (throttling, transient network) are retried with
//!   exponential backoff up to a fixed number of attempts
//! - Everything else fails on the first attempt

use std::sync::Arc;

use bytes::Bytes;
use tickwire_metadata::{PublishConfig, DEFAULT_MAX_RECORD_BYTES};
use tickwire_middleware::{EventStream, PutRecordOutput, StreamError};
use tracing::{debug, warn};

use crate::backoff::{Backoff, BackoffConfig};
use crate::error::PublishError;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total downstream calls per record, the first one included
    pub max_attempts: u32,
    pub backoff: BackoffConfig,
}

impl RetryPolicy {
    pub fn from_config(config: &PublishConfig) -> Self {
        Self {
            max_attempts: config.retry_attempts.max(1),
            backoff: BackoffConfig::from_publish_config(config),
        }
    }

    /// Retry without sleeping between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: BackoffConfig::immediate(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&PublishConfig::default())
    }
}

/// Writes one record at a time to a named stream.
///
/// Shared between sessions behind an `Arc`; holds no per-record state.
pub struct StreamPublisher {
    stream: Arc<dyn EventStream>,
    stream_name: String,
    max_record_bytes: usize,
    retry: RetryPolicy,
}

impl StreamPublisher {
    pub fn new(stream: Arc<dyn EventStream>, stream_name: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            stream,
            stream_name: stream_name.into(),
            max_record_bytes: DEFAULT_MAX_RECORD_BYTES,
            retry,
        }
    }

    pub fn with_max_record_bytes(mut self, max_record_bytes: usize) -> Self {
        self.max_record_bytes = max_record_bytes;
        self
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Publish one payload under `partition_key` and return the stream's
    /// acknowledgement.
    pub async fn publish(
        &self,
        payload: Bytes,
        partition_key: &str,
    ) -> Result<PutRecordOutput, PublishError> {
        self.validate(&payload, partition_key)?;

        let mut backoff = Backoff::new(self.retry.backoff.clone());
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self
                .stream
                .put_record(&self.stream_name, payload.clone(), partition_key)
                .await
            {
                Ok(output) => {
                    if attempt > 1 {
                        debug!(
                            partition_key = %partition_key,
                            attempts = attempt,
                            "Publish succeeded after retry"
                        );
                    }
                    return Ok(output);
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = backoff.next_delay();
                    warn!(
                        error = %e,
                        partition_key = %partition_key,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Retryable publish failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(into_publish_error(e, attempt)),
            }
        }
    }

    fn validate(&self, payload: &Bytes, partition_key: &str) -> Result<(), PublishError> {
        if partition_key.is_empty() {
            return Err(PublishError::Validation(
                "partition key must not be empty".to_string(),
            ));
        }
        if payload.len() > self.max_record_bytes {
            return Err(PublishError::Validation(format!(
                "payload of {} bytes exceeds limit of {} bytes",
                payload.len(),
                self.max_record_bytes
            )));
        }
        Ok(())
    }
}

fn into_publish_error(err: StreamError, attempts: u32) -> PublishError {
    match err {
        StreamError::Throttled(message) => PublishError::Throttling { attempts, message },
        StreamError::Transient(message) | StreamError::ConnectionFailed(message) => {
            PublishError::TransientNetwork { attempts, message }
        }
        StreamError::Validation(message) => PublishError::Validation(message),
    }
}
