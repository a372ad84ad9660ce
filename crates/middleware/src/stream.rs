use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StreamError;

/// Result of a successful put
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRecordOutput {
    /// Sequence identifier assigned by the stream
    pub sequence_number: String,
    /// Shard the record was routed to
    pub shard_id: String,
}

/// Durable, partitioned append log that records are published to.
///
/// Implementations must be safe for concurrent use: one handle is shared by
/// every feed session in the process.
#[async_trait]
pub trait EventStream: Send + Sync {
    /// Append a single record. Records sharing a partition key keep their
    /// relative order.
    async fn put_record(
        &self,
        stream_name: &str,
        data: Bytes,
        partition_key: &str,
    ) -> Result<PutRecordOutput, StreamError>;
}
