use std::sync::Arc;

use dashmap::DashMap;

/// Reduce an arbitrary partition key to a single NATS subject token.
///
/// '/' and ':' become '-', alphanumerics plus '-' and '_' are kept, and
/// everything else (including the '.', '*' and '>' delimiters) is dropped.
pub fn sanitize_subject_token(token: &str) -> String {
    token
        .chars()
        .filter_map(|c| match c {
            '/' | ':' => Some('-'),
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => Some(c),
            _ => None,
        })
        .collect()
}

/// Helper for subject formatting under a fixed prefix.
/// Caches formatted subjects to avoid repeated allocations in hot path.
pub struct SubjectBuilder {
    /// Pre-computed base prefix: "{prefix}."
    base_prefix: Arc<str>,
    /// Pre-computed wildcard subject
    wildcard: Arc<str>,
    stream_name: Arc<str>,
    /// Cache of partition token -> full subject
    partition_cache: DashMap<Arc<str>, Arc<str>>,
}

impl SubjectBuilder {
    pub fn new(prefix: impl Into<String>, stream_name: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            base_prefix: format!("{}.", prefix).into(),
            wildcard: format!("{}.>", prefix).into(),
            stream_name: stream_name.into().into(),
            partition_cache: DashMap::new(),
        }
    }

    /// Build subject for one partition: {prefix}.{token}
    /// Cached - first call allocates, subsequent calls return Arc clone (cheap).
    #[inline]
    pub fn partition(&self, token: &str) -> Arc<str> {
        if let Some(cached) = self.partition_cache.get(token) {
            return Arc::clone(cached.value());
        }

        let token_arc: Arc<str> = token.into();
        let subject: Arc<str> = format!("{}{}", self.base_prefix, token).into();
        self.partition_cache.insert(token_arc, Arc::clone(&subject));
        subject
    }

    /// Wildcard covering every partition: {prefix}.>
    #[inline]
    pub fn all(&self) -> &str {
        &self.wildcard
    }

    #[inline]
    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_subject() {
        let builder = SubjectBuilder::new("us-east-1.datalake-stream", "datalake-stream");
        assert_eq!(
            builder.partition("AAPL").as_ref(),
            "us-east-1.datalake-stream.AAPL"
        );
    }

    #[test]
    fn test_partition_subject_cached() {
        let builder = SubjectBuilder::new("prod.trades", "trades");
        let first = builder.partition("MSFT");
        let second = builder.partition("MSFT");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_wildcard_and_stream_name() {
        let builder = SubjectBuilder::new("prod.trades", "TRADES");
        assert_eq!(builder.all(), "prod.trades.>");
        assert_eq!(builder.stream_name(), "TRADES");
    }

    #[test]
    fn test_sanitize_keeps_plain_symbols() {
        assert_eq!(sanitize_subject_token("AAPL"), "AAPL");
        assert_eq!(sanitize_subject_token("unknown_symbol"), "unknown_symbol");
        assert_eq!(sanitize_subject_token("BRK-B"), "BRK-B");
    }

    #[test]
    fn test_sanitize_maps_separators() {
        assert_eq!(sanitize_subject_token("BTC/USD"), "BTC-USD");
        assert_eq!(sanitize_subject_token("BINANCE:BTCUSDT"), "BINANCE-BTCUSDT");
    }

    #[test]
    fn test_sanitize_strips_nats_wildcards() {
        assert_eq!(sanitize_subject_token("BRK.B"), "BRKB");
        assert_eq!(sanitize_subject_token("A>B"), "AB");
        assert_eq!(sanitize_subject_token("A*B"), "AB");
        assert_eq!(sanitize_subject_token("BTC/USD *"), "BTC-USD");
        assert_eq!(sanitize_subject_token(".>*"), "");
    }
}
