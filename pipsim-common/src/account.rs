use chrono::{DateTime, Utc};
use strum_macros::Display;

use crate::tick::Tick;

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
	pub id: String,
	pub currency: String,
	// Only changes when a trade is closed
	pub balance: f64,
	// balance plus the unrealized PnL of all open trades
	pub equity: f64,
	pub margin_used: f64,
	pub free_margin: f64,
	// equity / margin_used, or zero while no margin is in use
	pub margin_level: f64,
}

impl Account {
	pub fn new(id: &str, currency: &str, balance: f64) -> Account {
		Account {
			id: id.to_string(),
			currency: currency.to_string(),
			balance,
			equity: balance,
			margin_used: 0.0,
			free_margin: balance,
			margin_level: 0.0
		}
	}
}

/*
A single position. Created open by an order fill and closed exactly once,
either by the stop/take evaluation, a manual close or a forced liquidation.
Closed trades are kept around for inspection but never reopened.
*/
#[derive(Debug, Clone)]
pub struct Trade {
	pub id: u64,
	pub instrument: String,
	// Positive for long, negative for short
	pub units: f64,
	pub entry_price: f64,
	pub entry_time: DateTime<Utc>,
	pub stop_loss: Option<f64>,
	pub take_profit: Option<f64>,
	pub close_price: Option<f64>,
	pub close_time: Option<DateTime<Utc>>,
	pub realized_pl: Option<f64>,
	pub open: bool,
}

impl Trade {
	pub fn is_long(&self) -> bool {
		self.units > 0.0
	}

	// Long positions are valued at the bid, short positions at the ask
	pub fn mark_price(&self, tick: &Tick) -> f64 {
		if self.is_long() {
			tick.bid
		} else {
			tick.ask
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CloseReason {
	#[strum(serialize = "StopLoss")]
	StopLoss,
	#[strum(serialize = "TakeProfit")]
	TakeProfit,
	#[strum(serialize = "ManualClose")]
	ManualClose,
	#[strum(serialize = "LIQUIDATION")]
	Liquidation,
	#[strum(serialize = "EndOfReplay")]
	EndOfReplay,
	#[strum(serialize = "STOP")]
	Stop,
	#[strum(serialize = "TAKE")]
	Take,
	#[strum(serialize = "STOP&TAKE same bar (stop-first)")]
	StopAndTake
}
