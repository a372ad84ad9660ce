use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("disconnected: {0}")]
    Disconnected(String),
    #[error("no frame received within {0:?}")]
    ReadTimeout(Duration),
}

/// Inbound frame text that is not valid JSON
#[derive(Error, Debug)]
#[error("frame is not valid JSON: {source}")]
pub struct DecodeError {
    pub raw: String,
    #[source]
    pub source: serde_json::Error,
}

/// A trade entry that cannot be turned into an ingested record
#[derive(Error, Debug)]
#[error("trade record must be a JSON object, got {found}")]
pub struct MalformedRecordError {
    pub found: &'static str,
    pub raw: String,
}

/// Publish failure as seen by the session, after retries are exhausted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("stream throttled after {attempts} attempts: {message}")]
    Throttling { attempts: u32, message: String },
    #[error("network failure after {attempts} attempts: {message}")]
    TransientNetwork { attempts: u32, message: String },
    #[error("record rejected: {0}")]
    Validation(String),
}

impl PublishError {
    /// Downstream calls made before giving up (0 when rejected locally)
    pub fn attempts(&self) -> u32 {
        match self {
            PublishError::Throttling { attempts, .. }
            | PublishError::TransientNetwork { attempts, .. } => *attempts,
            PublishError::Validation(_) => 0,
        }
    }
}

/// Anything that stops one record from reaching the stream
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    MalformedRecord(#[from] MalformedRecordError),
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("missing key: {0}")]
    MissingKey(String),
    #[error("unsupported source: {0}")]
    UnsupportedSource(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_error_attempts() {
        let throttled = PublishError::Throttling {
            attempts: 5,
            message: "slow down".into(),
        };
        assert_eq!(throttled.attempts(), 5);
        assert_eq!(PublishError::Validation("too big".into()).attempts(), 0);
        assert_eq!(
            throttled.to_string(),
            "stream throttled after 5 attempts: slow down"
        );
    }

    #[test]
    fn test_decode_error_keeps_raw_text() {
        let source = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = ProcessError::from(DecodeError {
            raw: "not json".into(),
            source,
        });
        match err {
            ProcessError::Decode(e) => assert_eq!(e.raw, "not json"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
