use std::sync::Arc;

use serde_json::Value;
use tickwire_middleware::PutRecordOutput;
use tracing::{debug, info, trace, warn};

use crate::classifier::{classify, FeedFrame};
use crate::error::ProcessError;
use crate::publisher::StreamPublisher;
use crate::transform::{transform, Clock};

/// Result of handling one inbound frame
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameOutcome {
    pub published: usize,
    pub failed: usize,
}

/// Classify -> transform -> publish for each inbound frame.
///
/// Records of one frame are published sequentially in feed order. Failures
/// are logged and counted; none of them stops the caller.
#[derive(Clone)]
pub struct Pipeline {
    publisher: Arc<StreamPublisher>,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    pub fn new(publisher: Arc<StreamPublisher>, clock: Arc<dyn Clock>) -> Self {
        Self { publisher, clock }
    }

    pub fn publisher(&self) -> &StreamPublisher {
        &self.publisher
    }

    pub async fn handle(&self, session: &str, raw: &str) -> FrameOutcome {
        trace!(session, raw = %raw, "Received feed frame");

        let frame = match classify(raw) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(session, error = %e, raw = %e.raw, "Failed to decode feed frame");
                return FrameOutcome {
                    published: 0,
                    failed: 1,
                };
            }
        };

        match frame {
            FeedFrame::Ping => {
                debug!(session, "Keep-alive ping");
                FrameOutcome::default()
            }
            FeedFrame::Other { frame_type } => {
                info!(
                    session,
                    frame_type = frame_type.as_deref().unwrap_or("<none>"),
                    "Ignoring non-trade frame"
                );
                FrameOutcome::default()
            }
            FeedFrame::Trade(entries) => {
                let mut outcome = FrameOutcome::default();
                for entry in entries {
                    let raw_entry = entry.to_string();
                    match self.ingest(session, entry).await {
                        Ok(_) => outcome.published += 1,
                        Err(e) => {
                            outcome.failed += 1;
                            warn!(session, error = %e, record = %raw_entry, "Failed to ingest trade record");
                        }
                    }
                }
                outcome
            }
        }
    }

    async fn ingest(&self, session: &str, entry: Value) -> Result<PutRecordOutput, ProcessError> {
        let record = transform(entry, self.clock.as_ref())?;
        let payload = record.to_payload()?;
        let output = self
            .publisher
            .publish(payload, record.partition_key())
            .await?;

        info!(
            session,
            partition_key = %record.partition_key(),
            sequence_number = %output.sequence_number,
            shard_id = %output.shard_id,
            "Record published"
        );
        Ok(output)
    }
}
