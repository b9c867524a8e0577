//! Kalshi order book feed with per-ticker fan-out
//!
//! Owns one WebSocket connection. Each trader registers its ticker and gets
//! a private channel of decoded updates; the dispatch loop never blocks on a
//! slow consumer, so one stalled trader cannot stall the rest.

use super::types::{command, MarketUpdate, WireMessage};
use crate::telemetry::{incr_counter, CounterMetric};
use crate::ws::{WsClient, WsConfig, WsMessage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};

/// Per-ticker channel capacity
const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Market data feed with automatic reconnect and re-subscription
pub struct PriceFeed {
    ws_url: String,
    registry: Mutex<HashMap<String, mpsc::Sender<MarketUpdate>>>,
    subscribed: Mutex<Vec<String>>,
    send_tx: Mutex<Option<mpsc::Sender<String>>>,
    next_id: AtomicU64,
}

impl PriceFeed {
    pub fn new(ws_url: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            ws_url: ws_url.into(),
            registry: Mutex::new(HashMap::new()),
            subscribed: Mutex::new(Vec::new()),
            send_tx: Mutex::new(None),
            next_id: AtomicU64::new(1),
        })
    }

    /// Register a ticker and receive its private update channel
    pub fn register(&self, ticker: &str) -> mpsc::Receiver<MarketUpdate> {
        let (tx, rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        self.registry
            .lock()
            .unwrap()
            .insert(ticker.to_string(), tx);
        rx
    }

    /// Drop a ticker's update channel
    pub fn unregister(&self, ticker: &str) {
        self.registry.lock().unwrap().remove(ticker);
    }

    /// Subscribe additional tickers on the live connection
    pub async fn subscribe(&self, tickers: &[String]) {
        let new: Vec<String> = {
            let mut subscribed = self.subscribed.lock().unwrap();
            let new: Vec<String> = tickers
                .iter()
                .filter(|t| !subscribed.contains(t))
                .cloned()
                .collect();
            subscribed.extend(new.iter().cloned());
            new
        };
        if new.is_empty() {
            return;
        }
        self.send_command("subscribe", &new).await;
    }

    /// Unsubscribe tickers from the live connection
    pub async fn unsubscribe(&self, tickers: &[String]) {
        {
            let mut subscribed = self.subscribed.lock().unwrap();
            subscribed.retain(|t| !tickers.contains(t));
        }
        self.send_command("unsubscribe", tickers).await;
    }

    async fn send_command(&self, cmd: &str, tickers: &[String]) {
        let sender = self.send_tx.lock().unwrap().clone();
        if let Some(tx) = sender {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let msg = command(id, cmd, tickers);
            if tx.send(msg).await.is_err() {
                tracing::warn!(cmd, "Feed connection gone, command dropped");
            }
        }
    }

    /// Drive the feed until shutdown
    ///
    /// On every (re)connect the full current ticker set is re-subscribed
    /// before updates resume. A deliberate stop does not reconnect.
    pub async fn run(self: Arc<Self>, tickers: Vec<String>, mut shutdown: watch::Receiver<bool>) {
        {
            let mut subscribed = self.subscribed.lock().unwrap();
            *subscribed = tickers;
        }

        let client = WsClient::new(WsConfig::new(self.ws_url.clone()));
        let (mut ws_rx, send_tx) = client.connect();
        *self.send_tx.lock().unwrap() = Some(send_tx);

        loop {
            tokio::select! {
                msg = ws_rx.recv() => {
                    match msg {
                        Some(WsMessage::Connected) => {
                            let current = self.subscribed.lock().unwrap().clone();
                            tracing::info!(tickers = current.len(), "Feed connected, subscribing");
                            self.send_command("subscribe", &current).await;
                        }
                        Some(WsMessage::Text(text)) => {
                            self.dispatch(&text);
                        }
                        Some(WsMessage::Reconnecting { attempt, delay }) => {
                            incr_counter(CounterMetric::FeedReconnects);
                            tracing::warn!(attempt, ?delay, "Feed reconnecting");
                        }
                        Some(WsMessage::Disconnected) | None => {
                            tracing::warn!("Feed disconnected");
                            break;
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("Feed shutting down");
                        break;
                    }
                }
            }
        }

        // Dropping the sender stops the ws client's reconnect loop
        *self.send_tx.lock().unwrap() = None;
    }

    /// Decode one wire message and fan it out to its ticker's channel
    fn dispatch(&self, text: &str) {
        let message: WireMessage = match serde_json::from_str(text) {
            Ok(m) => m,
            Err(e) => {
                incr_counter(CounterMetric::MalformedMessages);
                tracing::debug!(error = %e, "Dropping malformed feed message");
                return;
            }
        };

        match message {
            WireMessage::OrderbookSnapshot(snap) => {
                let update = snap.to_update();
                self.deliver(&snap.market_ticker, update);
            }
            WireMessage::OrderbookDelta(delta) => {
                let update = MarketUpdate::Delta {
                    side: delta.side,
                    price: delta.price,
                    delta: delta.delta,
                };
                self.deliver(&delta.market_ticker, update);
            }
            WireMessage::Subscribed(msg) => {
                tracing::debug!(?msg, "Subscription confirmed");
            }
            WireMessage::Error(msg) => {
                tracing::warn!(?msg, "Feed error message");
            }
        }
    }

    fn deliver(&self, ticker: &str, update: MarketUpdate) {
        let mut registry = self.registry.lock().unwrap();
        let Some(tx) = registry.get(ticker) else {
            return;
        };
        match tx.try_send(update) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(ticker, "Trader update channel full, dropping update");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                registry.remove(ticker);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::OrderSide;

    fn feed() -> Arc<PriceFeed> {
        PriceFeed::new("wss://example.invalid/ws")
    }

    #[tokio::test]
    async fn test_dispatch_routes_by_ticker() {
        let feed = feed();
        let mut rx_a = feed.register("A");
        let mut rx_b = feed.register("B");

        feed.dispatch(
            r#"{"type":"orderbook_snapshot","msg":{"market_ticker":"A","yes":[[30,10]],"no":[[64,5]]}}"#,
        );
        feed.dispatch(
            r#"{"type":"orderbook_delta","msg":{"market_ticker":"B","side":"yes","price":42,"delta":3}}"#,
        );

        let update_a = rx_a.recv().await.unwrap();
        assert!(matches!(
            update_a,
            MarketUpdate::Snapshot { yes_bid: 30, .. }
        ));

        let update_b = rx_b.recv().await.unwrap();
        assert_eq!(
            update_b,
            MarketUpdate::Delta {
                side: OrderSide::Yes,
                price: 42,
                delta: 3
            }
        );
    }

    #[tokio::test]
    async fn test_dispatch_unknown_ticker_ignored() {
        let feed = feed();
        let mut rx = feed.register("A");

        feed.dispatch(
            r#"{"type":"orderbook_delta","msg":{"market_ticker":"OTHER","side":"yes","price":42,"delta":3}}"#,
        );

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dispatch_malformed_never_panics() {
        let feed = feed();
        let _rx = feed.register("A");

        feed.dispatch("not json at all");
        feed.dispatch(r#"{"type":"orderbook_delta","msg":{"market_ticker":"A"}}"#);
        feed.dispatch(r#"{"type":"mystery","msg":{}}"#);
    }

    #[tokio::test]
    async fn test_dispatch_preserves_per_ticker_order() {
        let feed = feed();
        let mut rx = feed.register("A");

        for price in [40u32, 41, 42] {
            feed.dispatch(&format!(
                r#"{{"type":"orderbook_delta","msg":{{"market_ticker":"A","side":"yes","price":{price},"delta":1}}}}"#,
            ));
        }

        for expected in [40u32, 41, 42] {
            match rx.recv().await.unwrap() {
                MarketUpdate::Delta { price, .. } => assert_eq!(price, expected),
                other => panic!("unexpected update: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_unregister_removes_channel() {
        let feed = feed();
        let mut rx = feed.register("A");
        feed.unregister("A");

        feed.dispatch(
            r#"{"type":"orderbook_delta","msg":{"market_ticker":"A","side":"yes","price":42,"delta":3}}"#,
        );
        // Channel sender dropped; receiver sees disconnect, not data
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_subscribe_tracks_set_without_connection() {
        let feed = feed();
        feed.subscribe(&["A".to_string(), "B".to_string()]).await;
        feed.subscribe(&["B".to_string(), "C".to_string()]).await;

        let subscribed = feed.subscribed.lock().unwrap().clone();
        assert_eq!(subscribed, vec!["A", "B", "C"]);

        feed.unsubscribe(&["B".to_string()]).await;
        let subscribed = feed.subscribed.lock().unwrap().clone();
        assert_eq!(subscribed, vec!["A", "C"]);
    }
}
