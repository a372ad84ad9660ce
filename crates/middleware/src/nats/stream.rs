use std::time::Duration;

use async_nats::jetstream::context::{PublishError, PublishErrorKind};
use async_nats::jetstream::stream::{Config, RetentionPolicy, StorageType};
use async_nats::jetstream::{self, Context};
use async_nats::Client;
use async_trait::async_trait;
use bytes::Bytes;
use tracing::{info, warn};

use crate::error::StreamError;
use crate::nats::subjects::{sanitize_subject_token, SubjectBuilder};
use crate::stream::{EventStream, PutRecordOutput};

/// Header carrying the unsanitized partition key alongside each record
pub const PARTITION_KEY_HEADER: &str = "Tickwire-Partition-Key";

/// Event stream backed by a NATS JetStream stream.
///
/// Each partition key maps to one subject under the configured prefix, so
/// records sharing a key are stored in publish order.
pub struct JetStreamEventStream {
    jetstream: Context,
    subjects: SubjectBuilder,
}

impl JetStreamEventStream {
    pub fn new(client: Client, subject_prefix: impl Into<String>, stream_name: impl Into<String>) -> Self {
        Self {
            jetstream: jetstream::new(client),
            subjects: SubjectBuilder::new(subject_prefix, stream_name),
        }
    }

    /// Connect to the NATS server and bind to the given stream
    pub async fn connect(
        url: &str,
        subject_prefix: impl Into<String>,
        stream_name: impl Into<String>,
    ) -> Result<Self, StreamError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| StreamError::ConnectionFailed(e.to_string()))?;
        Ok(Self::new(client, subject_prefix, stream_name))
    }

    pub fn subjects(&self) -> &SubjectBuilder {
        &self.subjects
    }

    /// Create the JetStream stream if it does not exist yet
    pub async fn ensure_stream(&self) -> Result<(), StreamError> {
        let config = Config {
            name: self.subjects.stream_name().to_string(),
            subjects: vec![self.subjects.all().to_string()],
            retention: RetentionPolicy::Limits,
            storage: StorageType::File,
            max_age: Duration::from_secs(7 * 24 * 60 * 60), // 7 days
            ..Default::default()
        };

        self.jetstream
            .get_or_create_stream(config)
            .await
            .map_err(|e| StreamError::ConnectionFailed(format!("stream creation failed: {}", e)))?;

        info!(
            stream = %self.subjects.stream_name(),
            subjects = %self.subjects.all(),
            "JetStream stream ready"
        );
        Ok(())
    }
}

/// Map a JetStream publish failure onto the stream error taxonomy
fn classify_publish_error(err: PublishError) -> StreamError {
    let message = err.to_string();
    match err.kind() {
        PublishErrorKind::TimedOut | PublishErrorKind::BrokenPipe => StreamError::Transient(message),
        PublishErrorKind::StreamNotFound
        | PublishErrorKind::WrongLastMessageId
        | PublishErrorKind::WrongLastSequence => StreamError::Validation(message),
        _ if is_backpressure(&message) => StreamError::Throttled(message),
        _ => StreamError::Transient(message),
    }
}

/// JetStream signals backpressure only through error text (ack pending
/// limits, stream limits with discard-new).
fn is_backpressure(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("ack pending") || lower.contains("maximum messages") || lower.contains("rate limit")
}

#[async_trait]
impl EventStream for JetStreamEventStream {
    async fn put_record(
        &self,
        stream_name: &str,
        data: Bytes,
        partition_key: &str,
    ) -> Result<PutRecordOutput, StreamError> {
        let token = sanitize_subject_token(partition_key);
        if token.is_empty() {
            return Err(StreamError::Validation(format!(
                "partition key {:?} has no subject-safe characters",
                partition_key
            )));
        }
        let subject = self.subjects.partition(&token);

        let mut headers = async_nats::HeaderMap::new();
        headers.insert(PARTITION_KEY_HEADER, partition_key.to_string());

        let ack = self
            .jetstream
            .publish_with_headers(subject.to_string(), headers, data)
            .await
            .map_err(classify_publish_error)?
            .await
            .map_err(classify_publish_error)?;

        if ack.stream != stream_name {
            warn!(
                expected = %stream_name,
                actual = %ack.stream,
                subject = %subject,
                "Record captured by a different stream"
            );
        }

        Ok(PutRecordOutput {
            sequence_number: ack.sequence.to_string(),
            shard_id: ack.stream,
        })
    }
}
