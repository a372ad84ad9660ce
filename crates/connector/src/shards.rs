//! Splits a feed's symbols across several sessions
//!
//! Each shard is an independent `FeedSession` with its own connection and
//! backoff; all shards share one pipeline and therefore one publisher.

use std::collections::HashSet;

use tokio::sync::watch;
use tracing::{error, info};

use crate::error::ConnectorError;
use crate::pipeline::Pipeline;
use crate::session::{FeedSession, SessionConfig, SessionStats};
use crate::traits::Connector;

/// Group symbols into per-session batches.
///
/// Duplicates are dropped, keeping first occurrence order. A batch size of 0
/// puts every symbol on a single session.
pub fn plan_shards(symbols: &[String], symbols_per_session: usize) -> Vec<Vec<String>> {
    let mut seen = HashSet::new();
    let unique: Vec<String> = symbols
        .iter()
        .filter(|s| seen.insert(s.as_str()))
        .cloned()
        .collect();

    if symbols_per_session == 0 || unique.len() <= symbols_per_session {
        return vec![unique];
    }
    unique
        .chunks(symbols_per_session)
        .map(<[String]>::to_vec)
        .collect()
}

/// Run one session per shard until shutdown and return their final stats
/// in shard order.
pub async fn run_sharded<C>(
    template: SessionConfig,
    connector: C,
    symbols_per_session: usize,
    pipeline: Pipeline,
    shutdown: watch::Receiver<bool>,
) -> Result<Vec<SessionStats>, ConnectorError>
where
    C: Connector + Clone + 'static,
{
    let shards = plan_shards(&template.symbols, symbols_per_session);
    let shard_count = shards.len();
    info!(
        feed = %template.name,
        shard_count,
        symbols_per_session,
        "Starting feed sessions"
    );

    let mut handles = Vec::with_capacity(shard_count);
    for (shard_id, symbols) in shards.into_iter().enumerate() {
        let name = if shard_count == 1 {
            template.name.clone()
        } else {
            format!("{}-{}", template.name, shard_id)
        };
        let config = SessionConfig {
            name,
            symbols,
            ..template.clone()
        };
        let session = FeedSession::new(config, connector.clone(), pipeline.clone());
        let shutdown = shutdown.clone();
        handles.push(tokio::spawn(async move {
            let result = session.run(shutdown).await;
            (result, session.stats())
        }));
    }

    let mut stats = Vec::with_capacity(shard_count);
    let mut first_error = None;
    for (shard_id, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok((Ok(()), shard_stats)) => stats.push(shard_stats),
            Ok((Err(e), shard_stats)) => {
                error!(shard_id, error = %e, "Feed session failed");
                stats.push(shard_stats);
                first_error.get_or_insert(e);
            }
            Err(e) => {
                error!(shard_id, error = %e, "Feed session task panicked");
                first_error.get_or_insert_with(|| {
                    ConnectorError::Disconnected(format!("shard {} task failed: {}", shard_id, e))
                });
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(stats),
    }
}
