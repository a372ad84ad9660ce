//! tickwire-metadata: Feed and environment configuration loaded from YAML

pub mod environment;
pub mod error;
pub mod feed;

pub use environment::{
    Environment, PublishConfig, StreamConfig, TransportConfig, TransportType,
    DEFAULT_MAX_RECORD_BYTES, DEFAULT_REGION, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY_MS,
    DEFAULT_STREAM_NAME,
};
pub use error::MetadataError;
pub use feed::{Feed, ReconnectSettings, DEFAULT_SYMBOLS, DEFAULT_TOKEN_SOURCE};
