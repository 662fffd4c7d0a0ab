use chrono::{DateTime, Utc};

use crate::account::Account;
use crate::error::EngineError;
use crate::tick::Tick;

#[derive(Debug, Clone)]
pub struct MarketOrder {
	pub instrument: String,
	// Positive for long, negative for short
	pub units: f64,
	pub stop_loss: Option<f64>,
	pub take_profit: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderFill {
	pub trade_id: u64,
	pub instrument: String,
	pub units: f64,
	pub price: f64,
	pub time: DateTime<Utc>,
}

// The surface strategies trade through. The simulation engine implements
// this trait directly; strategies hold a borrowed handle.
pub trait Broker {
	fn get_account(&self) -> Account;
	fn get_tick(&self, instrument: &str) -> Result<Tick, EngineError>;
	fn create_market_order(&self, order: &MarketOrder) -> Result<OrderFill, EngineError>;
	fn close_trade(&self, trade_id: u64, reason: &str) -> Result<(), EngineError>;
	fn is_trade_open(&self, trade_id: u64) -> bool;
}
