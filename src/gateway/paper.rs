//! Paper trading gateway
//!
//! Accepts every order and synthesizes order ids so the engine can run
//! unfunded against live market data. Balance moves by order notional only;
//! realized P&L lives in the risk ledger and trade tracker.

use super::types::{
    ExchangePosition, GatewayError, OpenOrder, OrderAction, OrderId, OrderSide,
};
use super::OrderGateway;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Mutex;
use uuid::Uuid;

/// Order gateway that fills everything instantly
pub struct PaperGateway {
    balance: Mutex<Decimal>,
}

impl PaperGateway {
    /// Create a paper gateway with the given starting balance in dollars
    pub fn new(starting_balance: Decimal) -> Self {
        Self {
            balance: Mutex::new(starting_balance),
        }
    }
}

#[async_trait]
impl OrderGateway for PaperGateway {
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

        let notional = Decimal::from(u64::from(price) * u64::from(count)) / Decimal::from(100);
        {
            let mut balance = self.balance.lock().unwrap();
            match action {
                OrderAction::Buy => *balance -= notional,
                OrderAction::Sell => *balance += notional,
            }
        }

        let order_id = Uuid::new_v4().to_string();
        tracing::info!(
            ticker,
            %side,
            %action,
            price,
            count,
            order_id = %order_id,
            "Paper order filled"
        );
        Ok(order_id)
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), GatewayError> {
        tracing::debug!(order_id, "Paper order cancelled");
        Ok(())
    }

    async fn get_balance(&self) -> Result<Decimal, GatewayError> {
        Ok(*self.balance.lock().unwrap())
    }

    async fn get_positions(&self) -> Result<Vec<ExchangePosition>, GatewayError> {
        Ok(vec![])
    }

    async fn get_open_orders(&self) -> Result<Vec<OpenOrder>, GatewayError> {
        Ok(vec![])
    }
}
