use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use crate::error::StreamError;
use crate::stream::{EventStream, PutRecordOutput};

const DEFAULT_SHARD_COUNT: u32 = 4;

/// A record accepted by the in-memory stream
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub stream_name: String,
    pub partition_key: String,
    pub shard_id: String,
    pub sequence: u64,
    pub data: Bytes,
}

/// Shard-partitioned append log held in memory.
///
/// Routes keys to shards by MD5 hash like a hosted partitioned stream, keeps
/// per-key append order, and can be told to fail upcoming puts so retry
/// behaviour can be exercised.
pub struct InMemoryEventStream {
    shard_count: u32,
    partitions: DashMap<String, Vec<StoredRecord>>,
    sequence: AtomicU64,
    attempts: AtomicU64,
    scripted_failures: Mutex<VecDeque<StreamError>>,
}

impl InMemoryEventStream {
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARD_COUNT)
    }

    pub fn with_shards(shard_count: u32) -> Self {
        Self {
            shard_count: shard_count.max(1),
            partitions: DashMap::new(),
            sequence: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
            scripted_failures: Mutex::new(VecDeque::new()),
        }
    }

    /// Queue errors returned by the next puts, in order, before records are accepted again
    pub fn fail_next(&self, errors: impl IntoIterator<Item = StreamError>) {
        let mut queue = self
            .scripted_failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        queue.extend(errors);
    }

    /// Number of put calls received, failed ones included
    pub fn put_attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Records stored under one partition key, in append order
    pub fn records_for(&self, partition_key: &str) -> Vec<StoredRecord> {
        self.partitions
            .get(partition_key)
            .map(|records| records.value().clone())
            .unwrap_or_default()
    }

    /// Every stored record ordered by sequence
    pub fn records(&self) -> Vec<StoredRecord> {
        let mut all: Vec<StoredRecord> = self
            .partitions
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect();
        all.sort_by_key(|r| r.sequence);
        all
    }

    pub fn len(&self) -> usize {
        self.partitions.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shard a partition key routes to
    pub fn shard_for(&self, partition_key: &str) -> String {
        let digest = md5::compute(partition_key.as_bytes());
        let hash = u128::from_be_bytes(digest.0);
        format!("shardId-{:012}", hash % u128::from(self.shard_count))
    }

    fn next_scripted_failure(&self) -> Option<StreamError> {
        self.scripted_failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
    }

    #[inline]
    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Default for InMemoryEventStream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStream for InMemoryEventStream {
    async fn put_record(
        &self,
        stream_name: &str,
        data: Bytes,
        partition_key: &str,
    ) -> Result<PutRecordOutput, StreamError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = self.next_scripted_failure() {
            return Err(err);
        }
        if partition_key.is_empty() {
            return Err(StreamError::Validation("partition key must not be empty".to_string()));
        }

        let shard_id = self.shard_for(partition_key);
        // Sequence is taken while holding the partition entry so per-key order matches sequence order
        let mut partition = self.partitions.entry(partition_key.to_string()).or_default();
        let sequence = self.next_sequence();
        partition.push(StoredRecord {
            stream_name: stream_name.to_string(),
            partition_key: partition_key.to_string(),
            shard_id: shard_id.clone(),
            sequence,
            data,
        });

        Ok(PutRecordOutput {
            sequence_number: format!("{:020}", sequence),
            shard_id,
        })
    }
}
