use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::MetadataError;

/// Default event stream name
pub const DEFAULT_STREAM_NAME: &str = "datalake-stream";
/// Default region the event stream lives in
pub const DEFAULT_REGION: &str = "us-east-1";
/// Largest record accepted by the event stream (1 MiB)
pub const DEFAULT_MAX_RECORD_BYTES: usize = 1024 * 1024;
/// Default total publish attempts per record (first call included)
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 5;
/// Default delay before the first publish retry in milliseconds
pub const DEFAULT_RETRY_DELAY_MS: u64 = 100;
/// Default ceiling for the publish retry delay in milliseconds
pub const DEFAULT_MAX_RETRY_DELAY_MS: u64 = 5_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TransportType {
    Nats,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(rename = "type")]
    pub transport_type: TransportType,
    pub url: Option<String>,
}

/// Target event stream for ingested records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_stream_name")]
    pub name: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Subject prefix records are published under.
    /// If not set, defaults to "{region}.{name}"
    #[serde(default)]
    pub subject_prefix: Option<String>,
    #[serde(default = "default_max_record_bytes")]
    pub max_record_bytes: usize,
}

fn default_stream_name() -> String {
    DEFAULT_STREAM_NAME.to_string()
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_max_record_bytes() -> usize {
    DEFAULT_MAX_RECORD_BYTES
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            name: default_stream_name(),
            region: default_region(),
            subject_prefix: None,
            max_record_bytes: default_max_record_bytes(),
        }
    }
}

impl StreamConfig {
    pub fn subject_prefix(&self) -> String {
        self.subject_prefix
            .clone()
            .unwrap_or_else(|| format!("{}.{}", self.region, self.name))
    }
}

/// Retry policy for a single record publish
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Total downstream calls allowed per record, first call included
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
}

fn default_retry_attempts() -> u32 {
    DEFAULT_RETRY_ATTEMPTS
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

fn default_max_retry_delay_ms() -> u64 {
    DEFAULT_MAX_RETRY_DELAY_MS
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
        }
    }
}

impl PublishConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(self.max_retry_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    pub transport: TransportConfig,
}

impl Environment {
    pub fn load(path: &Path) -> Result<Self, MetadataError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate an environment from YAML text
    pub fn parse(content: &str) -> Result<Self, MetadataError> {
        let env: Environment = serde_yaml::from_str(content)?;
        env.validate()?;
        Ok(env)
    }

    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.stream.name.trim().is_empty() {
            return Err(MetadataError::Validation(format!(
                "environment {}: stream name must not be empty",
                self.name
            )));
        }
        if self.stream.max_record_bytes == 0 {
            return Err(MetadataError::Validation(format!(
                "environment {}: max_record_bytes must be positive",
                self.name
            )));
        }
        if self.publish.retry_attempts == 0 {
            return Err(MetadataError::Validation(format!(
                "environment {}: retry_attempts must be at least 1",
                self.name
            )));
        }
        if self.transport.transport_type == TransportType::Nats && self.transport.url.is_none() {
            return Err(MetadataError::Validation(format!(
                "environment {}: nats transport requires a url",
                self.name
            )));
        }
        Ok(())
    }
}
