//! tickwire-connector: feed ingestion runtime components
//!
//! This crate connects to a streaming trade feed, classifies and stamps each
//! trade, and publishes it to a partitioned event stream keyed by symbol.

pub mod backoff;
pub mod classifier;
pub mod error;
pub mod pipeline;
pub mod publisher;
pub mod resolver;
pub mod session;
pub mod shards;
pub mod traits;
pub mod transform;
pub mod websocket;

pub use backoff::{Backoff, BackoffConfig};
pub use classifier::{classify, subscribe_frame, FeedFrame, FrameKind};
pub use error::{
    ConnectorError, DecodeError, MalformedRecordError, ProcessError, PublishError, ResolverError,
};
pub use pipeline::{FrameOutcome, Pipeline};
pub use publisher::{RetryPolicy, StreamPublisher};
pub use resolver::EnvResolver;
pub use session::{FeedSession, SessionConfig, SessionState, SessionStats};
pub use shards::{plan_shards, run_sharded};
pub use traits::{Connector, FeedSocket, KeyResolver};
pub use transform::{transform, Clock, IngestedRecord, SystemClock, UNKNOWN_SYMBOL};
pub use websocket::{WebSocketConnector, WsFeedSocket};
