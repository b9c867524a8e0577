//! Kalshi REST gateway
//!
//! Order placement, account queries, and paginated market discovery.
//! Request signing is out of scope; the api key travels as a bearer header.

use super::types::{
    ExchangePosition, GatewayError, MarketInfo, OpenOrder, OrderAction, OrderId, OrderSide,
};
use super::{MarketDiscovery, OrderGateway};
use crate::config::GatewayConfig;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Pagination safety bound for market discovery
const MAX_MARKET_PAGES: usize = 20;

/// REST client for the Kalshi trade API
pub struct KalshiGateway {
    base_url: String,
    api_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    /// Balance in cents
    balance: i64,
}

#[derive(Debug, Deserialize)]
struct MarketsResponse {
    #[serde(default)]
    markets: Vec<MarketInfo>,
    #[serde(default)]
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PositionsResponse {
    #[serde(default)]
    market_positions: Vec<ExchangePosition>,
}

#[derive(Debug, Deserialize)]
struct OrdersResponse {
    #[serde(default)]
    orders: Vec<OpenOrder>,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    order: OrderBody,
}

#[derive(Debug, Deserialize)]
struct OrderBody {
    order_id: OrderId,
}

impl KalshiGateway {
    /// Create a gateway from configuration
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.rest_url().to_string(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<reqwest::Response, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await?;
        Self::check_status(response).await
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::Api { status, body })
    }

    /// Fetch one page of open markets
    async fn get_markets_page(
        &self,
        cursor: Option<&str>,
    ) -> Result<MarketsResponse, GatewayError> {
        let mut query = vec![
            ("limit", "200".to_string()),
            ("status", "open".to_string()),
        ];
        if let Some(c) = cursor {
            query.push(("cursor", c.to_string()));
        }
        let response = self.get("/markets", &query).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl OrderGateway for KalshiGateway {
    async fn place_order(
        &self,
        ticker: &str,
        side: OrderSide,
        action: OrderAction,
        price: u32,
        count: u32,
    ) -> Result<OrderId, GatewayError> {
        if !(1..=99).contains(&price) {
            return Err(GatewayError::InvalidOrder(format!(
                "price {price} outside 1..=99"
            )));
        }
        if count == 0 {
            return Err(GatewayError::InvalidOrder("count must be > 0".into()));
        }

        let mut payload = json!({
            "ticker": ticker,
            "side": side.as_str(),
            "action": action.as_str(),
            "type": "limit",
            "count": count,
        });
        let price_field = match side {
            OrderSide::Yes => "yes_price",
            OrderSide::No => "no_price",
        };
        payload[price_field] = json!(price);

        let url = format!("{}/portfolio/orders", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let body: OrderResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        Ok(body.order.order_id)
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), GatewayError> {
        let url = format!("{}/portfolio/orders/{}", self.base_url, order_id);
        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn get_balance(&self) -> Result<Decimal, GatewayError> {
        let response = self.get("/portfolio/balance", &[]).await?;
        let body: BalanceResponse = response.json().await?;
        Ok(Decimal::from(body.balance) / Decimal::from(100))
    }

    async fn get_positions(&self) -> Result<Vec<ExchangePosition>, GatewayError> {
        let response = self.get("/portfolio/positions", &[]).await?;
        let body: PositionsResponse = response.json().await?;
        Ok(body.market_positions)
    }

    async fn get_open_orders(&self) -> Result<Vec<OpenOrder>, GatewayError> {
        let query = [("status", "resting".to_string())];
        let response = self.get("/portfolio/orders", &query).await?;
        let body: OrdersResponse = response.json().await?;
        Ok(body.orders)
    }
}

#[async_trait]
impl MarketDiscovery for KalshiGateway {
    async fn discover_markets(&self) -> Result<Vec<MarketInfo>, GatewayError> {
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_MARKET_PAGES {
            let page = self.get_markets_page(cursor.as_deref()).await?;
            let empty = page.markets.is_empty();
            all.extend(page.markets);
            cursor = page.cursor.filter(|c| !c.is_empty());
            if cursor.is_none() || empty {
                break;
            }
        }

        tracing::debug!(market_count = all.len(), "Discovered open markets");
        Ok(all)
    }
}
