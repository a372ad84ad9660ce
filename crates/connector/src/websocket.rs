use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};
use tracing::{info, trace};
use url::Url;

use crate::error::ConnectorError;
use crate::traits::{Connector, FeedSocket};

/// Query parameter carrying the feed token
const TOKEN_PARAM: &str = "token";
const REDACTED: &str = "REDACTED";

/// WebSocket connector for token-authenticated JSON feeds.
///
/// The token travels as a `token` query parameter; it is never logged.
#[derive(Clone)]
pub struct WebSocketConnector {
    url: Url,
    redacted: String,
}

impl WebSocketConnector {
    pub fn new(endpoint: &str, token: Option<&str>) -> Result<Self, ConnectorError> {
        let mut url = Url::parse(endpoint)
            .map_err(|e| ConnectorError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(ConnectorError::InvalidEndpoint(format!(
                    "unsupported scheme '{}', expected ws or wss",
                    other
                )))
            }
        }

        if let Some(token) = token {
            url.query_pairs_mut().append_pair(TOKEN_PARAM, token);
        }
        let redacted = redact(&url);
        Ok(Self { url, redacted })
    }

    /// Endpoint with the token value masked
    pub fn redacted_url(&self) -> &str {
        &self.redacted
    }
}

impl std::fmt::Debug for WebSocketConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketConnector")
            .field("url", &self.redacted)
            .finish()
    }
}

fn redact(url: &Url) -> String {
    if !url.query_pairs().any(|(key, _)| key == TOKEN_PARAM) {
        return url.to_string();
    }
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if key == TOKEN_PARAM {
                REDACTED.to_string()
            } else {
                value.into_owned()
            };
            (key.into_owned(), value)
        })
        .collect();

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<Box<dyn FeedSocket>, ConnectorError> {
        let (ws, response) = connect_async(self.url.as_str()).await.map_err(|e| {
            ConnectorError::ConnectionFailed(format!("{}: {}", self.redacted, e))
        })?;

        info!(url = %self.redacted, status = %response.status(), "WebSocket connected");
        Ok(Box::new(WsFeedSocket { ws }))
    }

    fn describe(&self) -> String {
        self.redacted.clone()
    }
}

/// An open websocket to the feed
pub struct WsFeedSocket {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FeedSocket for WsFeedSocket {
    async fn send_text(&mut self, text: String) -> Result<(), ConnectorError> {
        self.ws
            .send(WsMessage::Text(text))
            .await
            .map_err(|e| ConnectorError::Disconnected(e.to_string()))
    }

    async fn recv(&mut self) -> Result<Option<String>, ConnectorError> {
        loop {
            match self.ws.next().await {
                Some(Ok(WsMessage::Text(text))) => return Ok(Some(text)),
                Some(Ok(WsMessage::Binary(data))) => {
                    return Ok(Some(String::from_utf8_lossy(&data).into_owned()))
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    trace!("Received WS ping, sending pong");
                    self.ws
                        .send(WsMessage::Pong(data))
                        .await
                        .map_err(|e| ConnectorError::Disconnected(e.to_string()))?;
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    info!(frame = ?frame, "WebSocket closed by peer");
                    return Ok(None);
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(ConnectorError::Disconnected(e.to_string())),
                None => return Ok(None),
            }
        }
    }

    async fn close(&mut self) -> Result<(), ConnectorError> {
        self.ws
            .close(None)
            .await
            .map_err(|e| ConnectorError::Disconnected(e.to_string()))
    }
}
