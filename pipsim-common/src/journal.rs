use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

// Immutable row written once per trade close
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
	pub trade_id: u64,
	pub instrument: String,
	pub units: f64,
	pub entry_price: f64,
	pub close_price: f64,
	pub entry_time: DateTime<Utc>,
	pub close_time: DateTime<Utc>,
	pub realized_pl: f64,
	pub reason: String,
}

// Append-only account valuation row, one per price update and manual close
#[derive(Debug, Clone, PartialEq)]
pub struct EquitySnapshot {
	pub time: DateTime<Utc>,
	pub balance: f64,
	pub equity: f64,
	pub margin_used: f64,
	pub free_margin: f64,
	pub margin_level: f64,
}

/*
Durable journal consumed by the engines. Backends are expected to be
synchronous and internally thread-safe; the engines hold their own lock
across journal writes, so writes for a single engine never interleave.
*/
pub trait Journal: Send + Sync {
	fn record_trade(&self, record: &TradeRecord) -> Result<()>;
	fn record_equity(&self, snapshot: &EquitySnapshot) -> Result<()>;
	fn list_trades_closed_between(&self, from: DateTime<Utc>, to_exclusive: DateTime<Utc>) -> Result<Vec<TradeRecord>>;
	fn close(&self) -> Result<()>;
}

// In-memory journal used by tests and local replays
#[derive(Default)]
pub struct MemoryJournal {
	trades: Mutex<Vec<TradeRecord>>,
	snapshots: Mutex<Vec<EquitySnapshot>>,
}

impl MemoryJournal {
	pub fn new() -> MemoryJournal {
		MemoryJournal::default()
	}

	pub fn trades(&self) -> Vec<TradeRecord> {
		self.trades.lock().clone()
	}

	pub fn snapshots(&self) -> Vec<EquitySnapshot> {
		self.snapshots.lock().clone()
	}
}

impl Journal for MemoryJournal {
	fn record_trade(&self, record: &TradeRecord) -> Result<()> {
		self.trades.lock().push(record.clone());
		Ok(())
	}

	fn record_equity(&self, snapshot: &EquitySnapshot) -> Result<()> {
		self.snapshots.lock().push(snapshot.clone());
		Ok(())
	}

	fn list_trades_closed_between(&self, from: DateTime<Utc>, to_exclusive: DateTime<Utc>) -> Result<Vec<TradeRecord>> {
		let records = self.trades.lock()
			.iter()
			.filter(|x| x.close_time >= from && x.close_time < to_exclusive)
			.cloned()
			.collect();
		Ok(records)
	}

	fn close(&self) -> Result<()> {
		Ok(())
	}
}
