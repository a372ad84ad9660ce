//! End-to-end session tests against a loopback websocket feed
//!
//! A local tokio-tungstenite server plays scripted frames per accepted
//! connection; records land in the in-memory event stream.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

use tickwire_connector_lib::{
    BackoffConfig, FeedSession, Pipeline, RetryPolicy, SessionConfig, SessionState,
    StreamPublisher, WebSocketConnector,
};
use tickwire_middleware::InMemoryEventStream;

#[derive(Default)]
struct Observed {
    subscriptions: Mutex<Vec<String>>,
    request_uris: Mutex<Vec<String>>,
    pongs: AtomicUsize,
}

/// Serve one scripted connection per entry of `connections`, in order.
/// Each connection first reads `symbol_count` subscribe frames.
async fn start_feed(symbol_count: usize, connections: Vec<Vec<Message>>) -> (String, Arc<Observed>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/", listener.local_addr().unwrap());
    let observed = Arc::new(Observed::default());

    let seen = Arc::clone(&observed);
    tokio::spawn(async move {
        for frames in connections {
            let (tcp, _) = listener.accept().await.unwrap();
            let uris = Arc::clone(&seen);
            let mut ws = accept_hdr_async(tcp, move |req: &Request, resp: Response| {
                uris.request_uris.lock().unwrap().push(req.uri().to_string());
                Ok::<Response, ErrorResponse>(resp)
            })
            .await
            .unwrap();

            let mut subscribed = 0;
            while subscribed < symbol_count {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => {
                        seen.subscriptions.lock().unwrap().push(text);
                        subscribed += 1;
                    }
                    Some(Ok(_)) => continue,
                    _ => return,
                }
            }

            for frame in frames {
                let expects_pong = matches!(frame, Message::Ping(_));
                if ws.send(frame).await.is_err() {
                    return;
                }
                if expects_pong {
                    loop {
                        match ws.next().await {
                            Some(Ok(Message::Pong(_))) => {
                                seen.pongs.fetch_add(1, Ordering::SeqCst);
                                break;
                            }
                            Some(Ok(_)) => continue,
                            _ => return,
                        }
                    }
                }
            }

            // Drain until the client goes away
            while let Some(Ok(msg)) = ws.next().await {
                if msg.is_close() {
                    break;
                }
            }
        }
    });

    (url, observed)
}

fn session(url: &str, symbols: &[&str], stream: Arc<InMemoryEventStream>) -> FeedSession<WebSocketConnector> {
    let connector = WebSocketConnector::new(url, Some("test-token")).unwrap();
    let publisher = StreamPublisher::new(stream, "datalake-stream", RetryPolicy::immediate(3));
    let pipeline = Pipeline::new(Arc::new(publisher), Arc::new(|| 1_700_000_000_500_i64));
    let config = SessionConfig {
        name: "loopback".to_string(),
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        reconnect: BackoffConfig::immediate(),
        read_timeout: Some(Duration::from_secs(10)),
    };
    FeedSession::new(config, connector, pipeline)
}

async fn wait_until(check: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn text(s: &str) -> Message {
    Message::Text(s.to_string())
}

#[tokio::test]
async fn test_trades_flow_from_websocket_to_stream() {
    let (url, observed) = start_feed(
        2,
        vec![vec![
            text(r#"{"type":"ping"}"#),
            text(r#"{"type":"trade","data":[{"s":"AAPL","p":150.0,"v":10,"t":1690000000000}]}"#),
            Message::Binary(br#"{"type":"trade","data":[{"s":"MSFT","p":300.0}]}"#.to_vec()),
            text(r#"{"type":"trade","data":[{"p":1.0}]}"#),
        ]],
    )
    .await;
    let stream = Arc::new(InMemoryEventStream::new());
    let session = Arc::new(session(&url, &["AAPL", "MSFT"], stream.clone()));

    let (tx, rx) = watch::channel(false);
    let runner = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.run(rx).await }
    });

    wait_until(|| stream.len() == 3).await;
    tx.send(true).unwrap();
    runner.await.unwrap().unwrap();

    assert_eq!(session.state(), SessionState::Terminated);
    assert_eq!(
        *observed.subscriptions.lock().unwrap(),
        vec![
            r#"{"type":"subscribe","symbol":"AAPL"}"#.to_string(),
            r#"{"type":"subscribe","symbol":"MSFT"}"#.to_string(),
        ]
    );
    assert!(observed.request_uris.lock().unwrap()[0].contains("token=test-token"));

    let aapl = stream.records_for("AAPL");
    assert_eq!(aapl.len(), 1);
    let payload: serde_json::Value = serde_json::from_slice(&aapl[0].data).unwrap();
    assert_eq!(payload["p"], 150.0);
    assert!(payload["ingestion_timestamp"].as_i64().unwrap() >= 1_690_000_000_000);
    assert_eq!(stream.records_for("MSFT").len(), 1);
    assert_eq!(stream.records_for("unknown_symbol").len(), 1);
}

#[tokio::test]
async fn test_reconnects_after_server_close_and_resubscribes() {
    let (url, observed) = start_feed(
        2,
        vec![
            vec![
                text(r#"{"type":"trade","data":[{"s":"AAPL","n":1}]}"#),
                Message::Ping(vec![1, 2, 3]),
                Message::Close(None),
            ],
            vec![text(r#"{"type":"trade","data":[{"s":"AAPL","n":2}]}"#)],
        ],
    )
    .await;
    let stream = Arc::new(InMemoryEventStream::new());
    let session = Arc::new(session(&url, &["AAPL", "TSLA"], stream.clone()));

    let (tx, rx) = watch::channel(false);
    let runner = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.run(rx).await }
    });

    wait_until(|| stream.len() == 2).await;
    tx.send(true).unwrap();
    runner.await.unwrap().unwrap();

    assert_eq!(observed.subscriptions.lock().unwrap().len(), 4);
    assert_eq!(observed.request_uris.lock().unwrap().len(), 2);
    assert!(observed.pongs.load(Ordering::SeqCst) >= 1);
    assert_eq!(session.stats().connections, 2);

    let order: Vec<i64> = stream
        .records_for("AAPL")
        .iter()
        .map(|r| {
            let v: serde_json::Value = serde_json::from_slice(&r.data).unwrap();
            v["n"].as_i64().unwrap()
        })
        .collect();
    assert_eq!(order, vec![1, 2]);
}
