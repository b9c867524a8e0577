//! WebSocket client with automatic reconnection
//!
//! Bidirectional: callers receive inbound text plus connection lifecycle
//! events, and can push outbound text through the returned sender. On every
//! successful connect the backoff schedule resets to its seed, so a flaky
//! link always retries from 1s again.

use super::types::{Backoff, WsConfig, WsError, WsMessage};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Resolves at the deadline; never resolves while it is unarmed
async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Reusable WebSocket client with reconnection and ping/pong keepalive
pub struct WsClient {
    config: WsConfig,
}

impl WsClient {
    /// Create a new WebSocket client with the given configuration
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    /// Get the configured URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Connect and return a receiver for messages plus a sender for outbound text
    ///
    /// Spawns a background task that owns the connection, reconnects with
    /// exponential backoff, and emits `Connected` after every (re)connect so
    /// the caller can re-issue subscriptions. The task stops when the
    /// receiver or sender side is dropped.
    pub fn connect(&self) -> (mpsc::Receiver<WsMessage>, mpsc::Sender<String>) {
        let (msg_tx, msg_rx) = mpsc::channel(1024);
        let (send_tx, send_rx) = mpsc::channel(256);
        let config = self.config.clone();

        tokio::spawn(async move {
            if let Err(e) = Self::run_connection_loop(config, msg_tx, send_rx).await {
                tracing::error!(error = %e, "WebSocket connection loop failed");
            }
        });

        (msg_rx, send_tx)
    }

    /// Run the connection loop with automatic reconnection
    async fn run_connection_loop(
        config: WsConfig,
        tx: mpsc::Sender<WsMessage>,
        mut send_rx: mpsc::Receiver<String>,
    ) -> Result<(), WsError> {
        let mut attempts = 0u32;
        let mut backoff = Backoff::new(
            config.initial_reconnect_delay,
            config.max_reconnect_delay,
        );

        loop {
            match connect_async(&config.url).await {
                Ok((ws_stream, _response)) => {
                    tracing::info!(url = %config.url, "WebSocket connected");
                    attempts = 0;
                    backoff.reset();

                    if tx.send(WsMessage::Connected).await.is_err() {
                        return Ok(());
                    }

                    let (write, read) = ws_stream.split();
                    match Self::stream_messages(&config, write, read, &tx, &mut send_rx).await {
                        Ok(()) => {
                            // Deliberate close (caller dropped the channel)
                            let _ = tx.send(WsMessage::Disconnected).await;
                            return Ok(());
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "WebSocket stream error");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "WebSocket connect failed");
                }
            }

            if tx.is_closed() {
                tracing::debug!("Receiver dropped, stopping reconnection");
                return Ok(());
            }

            attempts += 1;
            if config.max_reconnect_attempts > 0 && attempts >= config.max_reconnect_attempts {
                tracing::error!("Max reconnection attempts reached");
                let _ = tx.send(WsMessage::Disconnected).await;
                return Err(WsError::MaxReconnectsExceeded);
            }

            let delay = backoff.next_delay();
            let _ = tx
                .send(WsMessage::Reconnecting {
                    attempt: attempts,
                    delay,
                })
                .await;
            sleep(delay).await;
        }
    }

    /// Pump one live connection until it fails or the caller goes away
    ///
    /// `Ok(())` means a deliberate stop; `Err` means the transport dropped
    /// and the outer loop should reconnect.
    async fn stream_messages(
        config: &WsConfig,
        mut write: WsSink,
        mut read: WsSource,
        tx: &mpsc::Sender<WsMessage>,
        send_rx: &mut mpsc::Receiver<String>,
    ) -> Result<(), WsError> {
        let mut ping_interval = tokio::time::interval(config.ping_interval);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick fires immediately; skip it so the ping cadence starts later
        ping_interval.tick().await;

        // Armed when a ping goes out, cleared by the matching pong
        let mut pong_deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if tx.send(WsMessage::Text(text)).await.is_err() {
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            pong_deadline = None;
                        }
                        Some(Ok(Message::Close(_))) => {
                            return Err(WsError::ConnectionFailed("Server closed connection".into()));
                        }
                        Some(Err(e)) => {
                            return Err(WsError::ConnectionFailed(e.to_string()));
                        }
                        None => {
                            return Err(WsError::ConnectionFailed("Stream ended unexpectedly".into()));
                        }
                        _ => {}
                    }
                }

                msg = send_rx.recv() => {
                    match msg {
                        Some(text) => {
                            write.send(Message::Text(text)).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        }
                        None => {
                            // Sender dropped, deliberate stop
                            return Ok(());
                        }
                    }
                }

                _ = ping_interval.tick() => {
                    write.send(Message::Ping(vec![])).await
                        .map_err(|e| WsError::SendFailed(e.to_string()))?;
                    if pong_deadline.is_none() {
                        pong_deadline = Some(Instant::now() + config.pong_timeout);
                    }
                }

                _ = deadline_elapsed(pong_deadline) => {
                    return Err(WsError::ConnectionFailed("Pong timeout".into()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_ws_client_creation() {
        let client = WsClient::new(WsConfig::new("wss://example.com"));
        assert_eq!(client.url(), "wss://example.com");
    }

    #[tokio::test]
    async fn test_connection_failure_reports_backoff_delays() {
        // Connecting to an unroutable URL fails immediately; the observed
        // Reconnecting events must carry the doubling delay schedule.
        let client = WsClient::new(
            WsConfig::new("ws://127.0.0.1:1")
                .max_reconnects(4)
                .initial_delay(Duration::from_millis(1))
                .max_delay(Duration::from_millis(4)),
        );

        let (mut rx, _tx) = client.connect();
        let mut delays = Vec::new();

        let timeout = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(msg) = rx.recv().await {
                match msg {
                    WsMessage::Reconnecting { delay, .. } => delays.push(delay),
                    WsMessage::Disconnected => break,
                    _ => {}
                }
            }
        });
        timeout.await.expect("Test timed out");

        assert_eq!(
            delays,
            vec![
                Duration::from_millis(1),
                Duration::from_millis(2),
                Duration::from_millis(4),
            ]
        );
    }

    #[tokio::test]
    async fn test_pong_timeout_drops_silent_connection() {
        // Server completes the handshake, then goes silent: it never reads,
        // so no pong ever comes back.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let Ok(_ws) = tokio_tungstenite::accept_async(stream).await else {
                        return;
                    };
                    tokio::time::sleep(Duration::from_secs(30)).await;
                });
            }
        });

        let client = WsClient::new(
            WsConfig::new(format!("ws://{addr}"))
                .max_reconnects(2)
                .initial_delay(Duration::from_millis(1))
                .ping_interval(Duration::from_millis(20))
                .pong_timeout(Duration::from_millis(40)),
        );

        let (mut rx, _tx) = client.connect();
        let mut connected = false;
        let mut reconnected = false;

        let timeout = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(msg) = rx.recv().await {
                match msg {
                    WsMessage::Connected if !connected => connected = true,
                    WsMessage::Reconnecting { .. } => {
                        reconnected = true;
                        break;
                    }
                    _ => {}
                }
            }
        });
        timeout.await.expect("Test timed out");

        assert!(connected, "handshake should have succeeded");
        assert!(reconnected, "missing pong should have dropped the connection");
    }

    #[tokio::test]
    async fn test_max_reconnects_gives_up() {
        let client = WsClient::new(
            WsConfig::new("ws://127.0.0.1:1")
                .max_reconnects(2)
                .initial_delay(Duration::from_millis(1)),
        );

        let (mut rx, _tx) = client.connect();
        let mut got_disconnect = false;

        let timeout = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(msg) = rx.recv().await {
                if matches!(msg, WsMessage::Disconnected) {
                    got_disconnect = true;
                    break;
                }
            }
        });
        timeout.await.expect("Test timed out");
        assert!(got_disconnect);
    }
}
