//! Feed session: owns one logical connection to the feed.
//!
//! The session connects, subscribes every configured symbol, hands each
//! inbound frame to the pipeline and reconnects with backoff whenever the
//! connection ends, until shutdown is requested.
//!
//! ```text
//! Disconnected -> Connecting -> Open -> Disconnected -> ... -> Closing -> Terminated
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backoff::{Backoff, BackoffConfig};
use crate::classifier::subscribe_frame;
use crate::error::ConnectorError;
use crate::pipeline::Pipeline;
use crate::traits::{Connector, FeedSocket};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Open,
    Closing,
    Terminated,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name used in every log line of this session
    pub name: String,
    pub symbols: Vec<String>,
    pub reconnect: BackoffConfig,
    /// Drop the connection when no frame arrives for this long
    pub read_timeout: Option<Duration>,
}

/// Record counters over the lifetime of a session
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub connections: u64,
    pub frames: u64,
    pub published: u64,
    pub failed: u64,
}

enum SocketExit {
    Shutdown,
    PeerClosed,
}

pub struct FeedSession<C: Connector> {
    config: SessionConfig,
    connector: C,
    pipeline: Pipeline,
    state: watch::Sender<SessionState>,
    connections: AtomicU64,
    frames: AtomicU64,
    published: AtomicU64,
    failed: AtomicU64,
}

impl<C: Connector> FeedSession<C> {
    pub fn new(config: SessionConfig, connector: C, pipeline: Pipeline) -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self {
            config,
            connector,
            pipeline,
            state,
            connections: AtomicU64::new(0),
            frames: AtomicU64::new(0),
            published: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Returns a handle that follows state changes
    pub fn state_handle(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            connections: self.connections.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Run until shutdown is signalled.
    ///
    /// Connection loss never ends the session; it reconnects with backoff.
    /// A frame that is being processed when shutdown arrives is finished
    /// first. Dropping the shutdown sender also stops the session.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), ConnectorError> {
        let session = self.config.name.as_str();
        let mut backoff = Backoff::new(self.config.reconnect.clone());
        info!(
            session,
            endpoint = %self.connector.describe(),
            symbols = %self.config.symbols.join(", "),
            "Starting feed session"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.set_state(SessionState::Connecting);
            let connected = tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => break,
                result = self.connector.connect() => result,
            };

            match connected {
                Ok(mut socket) => {
                    self.connections.fetch_add(1, Ordering::Relaxed);
                    self.set_state(SessionState::Open);
                    info!(session, "Feed connection open");

                    match self.drive(socket.as_mut(), &mut shutdown, &mut backoff).await {
                        Ok(SocketExit::Shutdown) => {
                            self.set_state(SessionState::Closing);
                            if let Err(e) = socket.close().await {
                                debug!(session, error = %e, "Error closing feed connection");
                            }
                            break;
                        }
                        Ok(SocketExit::PeerClosed) => {
                            info!(session, "Feed connection closed by peer");
                        }
                        Err(e) => {
                            warn!(session, error = %e, "Feed connection lost");
                        }
                    }
                }
                Err(e) => {
                    warn!(session, error = %e, "Feed handshake failed");
                }
            }

            self.set_state(SessionState::Disconnected);
            let delay = backoff.next_delay();
            info!(
                session,
                attempt = backoff.attempt_count(),
                delay_ms = delay.as_millis() as u64,
                "Reconnecting after backoff"
            );
            tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.set_state(SessionState::Closing);
        self.set_state(SessionState::Terminated);
        let stats = self.stats();
        info!(
            session,
            connections = stats.connections,
            frames = stats.frames,
            published = stats.published,
            failed = stats.failed,
            "Feed session terminated"
        );
        Ok(())
    }

    /// Subscribe, then pump frames until shutdown or the connection ends.
    ///
    /// Backoff is reset on the first frame, so a feed that accepts and then
    /// drops the connection straight away keeps backing off.
    async fn drive(
        &self,
        socket: &mut dyn FeedSocket,
        shutdown: &mut watch::Receiver<bool>,
        backoff: &mut Backoff,
    ) -> Result<SocketExit, ConnectorError> {
        let session = self.config.name.as_str();
        for symbol in &self.config.symbols {
            socket.send_text(subscribe_frame(symbol)).await?;
            info!(session, symbol = %symbol, "Subscribed");
        }

        loop {
            let received = tokio::select! {
                _ = wait_for_shutdown(shutdown) => return Ok(SocketExit::Shutdown),
                result = recv_with_timeout(socket, self.config.read_timeout) => result?,
            };

            let Some(raw) = received else {
                return Ok(SocketExit::PeerClosed);
            };
            if backoff.attempt_count() > 0 {
                backoff.reset();
            }

            // Outside the select so shutdown never interrupts a publish
            self.frames.fetch_add(1, Ordering::Relaxed);
            let outcome = self.pipeline.handle(session, &raw).await;
            self.published
                .fetch_add(outcome.published as u64, Ordering::Relaxed);
            self.failed.fetch_add(outcome.failed as u64, Ordering::Relaxed);
        }
    }

    fn set_state(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(session = %self.config.name, from = ?previous, to = ?next, "Session state change");
        }
    }
}

async fn recv_with_timeout(
    socket: &mut dyn FeedSocket,
    timeout: Option<Duration>,
) -> Result<Option<String>, ConnectorError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, socket.recv())
            .await
            .map_err(|_| ConnectorError::ReadTimeout(limit))?,
        None => socket.recv().await,
    }
}

/// Resolves once shutdown is requested or the sender is gone
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
