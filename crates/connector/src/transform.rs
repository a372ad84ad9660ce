use bytes::Bytes;
use serde_json::{Map, Value};

use crate::error::MalformedRecordError;

/// Partition key for trades that carry no usable symbol
pub const UNKNOWN_SYMBOL: &str = "unknown_symbol";
pub const INGESTION_TIMESTAMP_FIELD: &str = "ingestion_timestamp";
pub const SYMBOL_FIELD: &str = "s";

/// Wall-clock source for ingestion timestamps, in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

impl<F> Clock for F
where
    F: Fn() -> i64 + Send + Sync,
{
    fn now_millis(&self) -> i64 {
        self()
    }
}

/// A trade entry stamped for the stream.
///
/// Holds every field the feed sent plus `ingestion_timestamp`; the partition
/// key is derived from the symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedRecord {
    partition_key: String,
    ingestion_timestamp: i64,
    fields: Map<String, Value>,
}

impl IngestedRecord {
    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    pub fn ingestion_timestamp(&self) -> i64 {
        self.ingestion_timestamp
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn symbol(&self) -> Option<&str> {
        self.fields
            .get(SYMBOL_FIELD)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn price(&self) -> Option<f64> {
        self.fields.get("p").and_then(Value::as_f64)
    }

    pub fn volume(&self) -> Option<f64> {
        self.fields.get("v").and_then(Value::as_f64)
    }

    /// Exchange timestamp from the feed, epoch millis
    pub fn feed_timestamp(&self) -> Option<i64> {
        self.fields.get("t").and_then(Value::as_i64)
    }

    /// UTF-8 JSON object sent as the record payload
    pub fn to_payload(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(&self.fields).map(Bytes::from)
    }
}

/// Stamp a trade entry with the ingestion time and derive its partition key.
///
/// Fields other than `ingestion_timestamp` pass through untouched; an
/// existing `ingestion_timestamp` is overwritten.
pub fn transform<C>(record: Value, clock: &C) -> Result<IngestedRecord, MalformedRecordError>
where
    C: Clock + ?Sized,
{
    let mut fields = match record {
        Value::Object(fields) => fields,
        other => {
            return Err(MalformedRecordError {
                found: json_type_name(&other),
                raw: other.to_string(),
            })
        }
    };

    let partition_key = match fields.get(SYMBOL_FIELD).and_then(Value::as_str) {
        Some(symbol) if !symbol.is_empty() => symbol.to_string(),
        _ => UNKNOWN_SYMBOL.to_string(),
    };

    let ingestion_timestamp = clock.now_millis();
    fields.insert(
        INGESTION_TIMESTAMP_FIELD.to_string(),
        Value::from(ingestion_timestamp),
    );

    Ok(IngestedRecord {
        partition_key,
        ingestion_timestamp,
        fields,
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
