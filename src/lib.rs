//! kalshi-momentum: momentum convergence trading bot for Kalshi yes/no markets
//!
//! This library provides the core components for:
//! - Real-time order book feed with per-ticker fan-out
//! - Momentum convergence detection over bounded price history
//! - Centrally-synchronized risk ledger with a daily-loss circuit breaker
//! - One independent trader state machine per market
//! - Durable trade/P&L tracking that survives restarts
//! - Market scanning and trader lifecycle orchestration
//! - Paper/live order gateway

pub mod cli;
pub mod config;
pub mod feed;
pub mod gateway;
pub mod market;
pub mod orchestrator;
pub mod risk;
pub mod strategy;
pub mod telemetry;
pub mod tracker;
pub mod trader;
pub mod ws;
