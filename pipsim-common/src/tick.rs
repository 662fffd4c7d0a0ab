use chrono::{DateTime, Utc};
use dashmap::DashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
	pub instrument: String,
	pub time: DateTime<Utc>,
	pub bid: f64,
	pub ask: f64,
}

impl Tick {
	pub fn mid(&self) -> f64 {
		(self.bid + self.ask) / 2.0
	}

	pub fn spread(&self) -> f64 {
		self.ask - self.bid
	}
}

// Last observed tick per instrument.
// Reads vastly outnumber writes, writes to the same instrument are serialized.
#[derive(Default)]
pub struct TickStore {
	ticks: DashMap<String, Tick>,
}

impl TickStore {
	pub fn new() -> TickStore {
		TickStore {
			ticks: DashMap::new()
		}
	}

	pub fn set(&self, tick: Tick) {
		self.ticks.insert(tick.instrument.clone(), tick);
	}

	pub fn get(&self, instrument: &str) -> Option<Tick> {
		self.ticks.get(instrument)
			.map(|x| x.value().clone())
	}
}
