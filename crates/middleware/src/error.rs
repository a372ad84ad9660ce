use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("throttled: {0}")]
    Throttled(String),
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("validation failed: {0}")]
    Validation(String),
}

impl StreamError {
    /// Whether the same put may succeed if attempted again later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StreamError::Throttled(_) | StreamError::Transient(_) | StreamError::ConnectionFailed(_)
        )
    }
}
