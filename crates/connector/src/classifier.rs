//! Frame classification for the feed's JSON protocol.
//!
//! Inbound frames are objects carrying a `type` discriminator. Trade frames
//! hold a `data` array of trade entries; ping frames are keep-alives; anything
//! else is informational and skipped by the pipeline.

use serde_json::Value;

use crate::error::DecodeError;

pub const TRADE_TYPE: &str = "trade";
pub const PING_TYPE: &str = "ping";
pub const SUBSCRIBE_TYPE: &str = "subscribe";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Trade,
    Ping,
    Other,
}

impl FrameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameKind::Trade => "trade",
            FrameKind::Ping => "ping",
            FrameKind::Other => "other",
        }
    }
}

/// A decoded inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum FeedFrame {
    /// Trade entries in the order the feed sent them
    Trade(Vec<Value>),
    Ping,
    /// Unrecognized frame; carries its `type` when one was present
    Other { frame_type: Option<String> },
}

impl FeedFrame {
    pub fn kind(&self) -> FrameKind {
        match self {
            FeedFrame::Trade(_) => FrameKind::Trade,
            FeedFrame::Ping => FrameKind::Ping,
            FeedFrame::Other { .. } => FrameKind::Other,
        }
    }
}

/// Decode raw frame text and sort it into trade, ping or other.
///
/// A trade frame without `data` is treated as other. A `data` value that is
/// not an array is taken as a single trade entry.
pub fn classify(raw: &str) -> Result<FeedFrame, DecodeError> {
    let value: Value = serde_json::from_str(raw).map_err(|source| DecodeError {
        raw: raw.to_string(),
        source,
    })?;

    let Value::Object(mut frame) = value else {
        return Ok(FeedFrame::Other { frame_type: None });
    };

    let frame_type = frame
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_owned);

    match frame_type.as_deref() {
        Some(TRADE_TYPE) => match frame.remove("data") {
            Some(Value::Array(entries)) => Ok(FeedFrame::Trade(entries)),
            Some(entry) => Ok(FeedFrame::Trade(vec![entry])),
            None => Ok(FeedFrame::Other { frame_type }),
        },
        Some(PING_TYPE) => Ok(FeedFrame::Ping),
        _ => Ok(FeedFrame::Other { frame_type }),
    }
}

/// Outbound subscription request for one symbol
pub fn subscribe_frame(symbol: &str) -> String {
    // Value's Display writes the symbol as an escaped JSON string
    format!(
        r#"{{"type":"{}","symbol":{}}}"#,
        SUBSCRIBE_TYPE,
        Value::from(symbol)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_trade_frame() {
        let raw = r#"{"type":"trade","data":[{"s":"AAPL","p":189.5,"v":100,"t":1700000000000},{"s":"MSFT","p":370.1,"v":5,"t":1700000000001}]}"#;
        match classify(raw).unwrap() {
            FeedFrame::Trade(entries) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0]["s"], "AAPL");
                assert_eq!(entries[1]["s"], "MSFT");
            }
            other => panic!("expected trade frame, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_empty_trade_batch() {
        let frame = classify(r#"{"type":"trade","data":[]}"#).unwrap();
        assert_eq!(frame, FeedFrame::Trade(vec![]));
    }

    #[test]
    fn test_classify_trade_without_data_is_other() {
        let frame = classify(r#"{"type":"trade"}"#).unwrap();
        assert_eq!(
            frame,
            FeedFrame::Other {
                frame_type: Some("trade".to_string())
            }
        );
    }

    #[test]
    fn test_classify_single_object_data() {
        let frame = classify(r#"{"type":"trade","data":{"s":"TSLA","p":1.0}}"#).unwrap();
        assert_eq!(frame, FeedFrame::Trade(vec![json!({"s":"TSLA","p":1.0})]));
    }

    #[test]
    fn test_classify_ping() {
        assert_eq!(classify(r#"{"type":"ping"}"#).unwrap(), FeedFrame::Ping);
        assert_eq!(classify(r#"{"type":"ping"}"#).unwrap().kind(), FrameKind::Ping);
    }

    #[test]
    fn test_classify_other_frames() {
        let frame = classify(r#"{"type":"error","msg":"Invalid symbol"}"#).unwrap();
        assert_eq!(
            frame,
            FeedFrame::Other {
                frame_type: Some("error".to_string())
            }
        );

        let frame = classify(r#"{"msg":"hello"}"#).unwrap();
        assert_eq!(frame, FeedFrame::Other { frame_type: None });

        // Non-string discriminator
        let frame = classify(r#"{"type":7,"data":[]}"#).unwrap();
        assert_eq!(frame.kind(), FrameKind::Other);
    }

    #[test]
    fn test_classify_non_object_json_is_other() {
        assert_eq!(
            classify("[1,2,3]").unwrap(),
            FeedFrame::Other { frame_type: None }
        );
        assert_eq!(classify("42").unwrap().kind(), FrameKind::Other);
    }

    #[test]
    fn test_classify_invalid_json() {
        let err = classify("not json").unwrap_err();
        assert_eq!(err.raw, "not json");
        assert!(classify(r#"{"type":"trade","data":["#).is_err());
    }

    #[test]
    fn test_subscribe_frame() {
        assert_eq!(
            subscribe_frame("AAPL"),
            r#"{"type":"subscribe","symbol":"AAPL"}"#
        );
    }

    #[test]
    fn test_subscribe_frame_escapes_symbol() {
        let frame: Value = serde_json::from_str(&subscribe_frame("A\"B")).unwrap();
        assert_eq!(frame["symbol"], "A\"B");
        assert_eq!(frame["type"], "subscribe");
    }
}
