use std::sync::Arc;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use parking_lot::RwLock;
use tracing::warn;

use crate::account::{Account, CloseReason, Trade};
use crate::broker::{Broker, MarketOrder, OrderFill};
use crate::convert::quote_to_account_rate;
use crate::error::EngineError;
use crate::instrument::{lookup_instrument, Instrument};
use crate::journal::{EquitySnapshot, Journal, TradeRecord};
use crate::tick::{Tick, TickStore};

/*
Quote-driven simulation engine. Maintains a single account and its trades,
advances on every incoming tick and journals trade closes and equity
snapshots.

All mutating operations run under one writer lock, read accessors take the
shared side. The trade map is insertion-ordered so that a given tick
sequence always produces the same journal; stop/take evaluation and the
liquidation scan walk trades in the order they were opened.
*/
pub struct Simulator {
	state: RwLock<SimulatorState>,
	ticks: TickStore,
	journal: Arc<dyn Journal>,
}

struct SimulatorState {
	account: Account,
	trades: IndexMap<u64, Trade>,
	next_trade_id: u64,
	tainted: bool,
}

impl Simulator {
	pub fn new(account_id: &str, currency: &str, starting_balance: f64, journal: Arc<dyn Journal>) -> Simulator {
		Simulator {
			state: RwLock::new(SimulatorState {
				account: Account::new(account_id, currency, starting_balance),
				trades: IndexMap::new(),
				next_trade_id: 1,
				tainted: false
			}),
			ticks: TickStore::new(),
			journal
		}
	}

	/*
	The primary state advance. In order: cache the tick, close trades whose
	stop or take was crossed, revalue the account, recompute margin, journal
	an equity snapshot, then liquidate the worst-losing trades while equity
	no longer covers the margin requirement.
	*/
	pub fn update_price(&self, tick: Tick) -> Result<(), EngineError> {
		let mut state = self.state.write();
		if state.tainted {
			return Err(EngineError::Tainted);
		}
		let Some(instrument) = lookup_instrument(&tick.instrument) else {
			return Err(EngineError::UnknownInstrument(tick.instrument));
		};
		// Store the tick under the canonical instrument name
		let tick = Tick {
			instrument: instrument.name.clone(),
			..tick
		};
		self.ticks.set(tick.clone());
		let hits: Vec<(u64, f64, CloseReason)> = state.trades
			.values()
			.filter(|trade| trade.open && trade.instrument == tick.instrument)
			.filter_map(|trade| Self::stop_take_hit(trade, &tick))
			.collect();
		for (trade_id, mark, reason) in hits {
			self.close_trade_locked(&mut state, trade_id, mark, tick.time, &reason.to_string())?;
		}
		self.revalue_locked(&mut state)?;
		self.recompute_margin_locked(&mut state)?;
		self.record_equity_locked(&mut state, tick.time)?;
		self.enforce_margin_locked(&mut state, tick.time)?;
		Ok(())
	}

	pub fn create_market_order(&self, order: &MarketOrder) -> Result<OrderFill, EngineError> {
		let mut state = self.state.write();
		if state.tainted {
			return Err(EngineError::Tainted);
		}
		let Some(instrument) = lookup_instrument(&order.instrument) else {
			return Err(EngineError::UnknownInstrument(order.instrument.clone()));
		};
		if order.units == 0.0 || !order.units.is_finite() {
			return Err(EngineError::InvalidOrder("units must be a non-zero finite amount".to_string()));
		}
		if order.units.abs() < instrument.min_trade_size {
			return Err(EngineError::InvalidOrder(format!("minimum trade size for {} is {}", instrument.name, instrument.min_trade_size)));
		}
		let tick = self.ticks.get(&instrument.name)
			.ok_or_else(|| EngineError::NoPrice(instrument.name.clone()))?;
		let price = if order.units > 0.0 {
			tick.ask
		} else {
			tick.bid
		};
		let trade_id = state.next_trade_id;
		state.next_trade_id += 1;
		let trade = Trade {
			id: trade_id,
			instrument: instrument.name.clone(),
			units: order.units,
			entry_price: price,
			entry_time: tick.time,
			stop_loss: order.stop_loss,
			take_profit: order.take_profit,
			close_price: None,
			close_time: None,
			realized_pl: None,
			open: true
		};
		state.trades.insert(trade_id, trade);
		Ok(OrderFill {
			trade_id,
			instrument: instrument.name.clone(),
			units: order.units,
			price,
			time: tick.time
		})
	}

	pub fn close_trade(&self, trade_id: u64, reason: &str) -> Result<(), EngineError> {
		let mut state = self.state.write();
		if state.tainted {
			return Err(EngineError::Tainted);
		}
		let (instrument_name, is_long, open) = {
			let trade = state.trades.get(&trade_id)
				.ok_or(EngineError::NotFound(trade_id))?;
			(trade.instrument.clone(), trade.is_long(), trade.open)
		};
		if !open {
			return Err(EngineError::AlreadyClosed(trade_id));
		}
		let tick = self.ticks.get(&instrument_name)
			.ok_or_else(|| EngineError::NoPrice(instrument_name.clone()))?;
		let close_price = if is_long {
			tick.bid
		} else {
			tick.ask
		};
		let reason = if reason.is_empty() {
			CloseReason::ManualClose.to_string()
		} else {
			reason.to_string()
		};
		self.close_trade_locked(&mut state, trade_id, close_price, tick.time, &reason)?;
		self.revalue_locked(&mut state)?;
		self.recompute_margin_locked(&mut state)?;
		self.record_equity_locked(&mut state, tick.time)?;
		self.enforce_margin_locked(&mut state, tick.time)?;
		Ok(())
	}

	/*
	Closes every open trade at the latest tick of its instrument, then emits
	one trailing equity snapshot stamped with the latest close time. Fails
	up front when any involved instrument has no cached price, so that a
	partial sweep never happens.
	*/
	pub fn close_all(&self, reason: &str) -> Result<(), EngineError> {
		let mut state = self.state.write();
		if state.tainted {
			return Err(EngineError::Tainted);
		}
		let open_ids: Vec<u64> = state.trades
			.values()
			.filter(|trade| trade.open)
			.map(|trade| trade.id)
			.collect();
		for trade_id in &open_ids {
			let Some(trade) = state.trades.get(trade_id) else {
				continue;
			};
			if self.ticks.get(&trade.instrument).is_none() {
				return Err(EngineError::NoPrice(trade.instrument.clone()));
			}
		}
		let reason = if reason.is_empty() {
			CloseReason::ManualClose.to_string()
		} else {
			reason.to_string()
		};
		let mut last_close_time: Option<DateTime<Utc>> = None;
		for trade_id in open_ids {
			let (instrument_name, is_long) = {
				let trade = state.trades.get(&trade_id)
					.ok_or(EngineError::NotFound(trade_id))?;
				(trade.instrument.clone(), trade.is_long())
			};
			let tick = self.ticks.get(&instrument_name)
				.ok_or_else(|| EngineError::NoPrice(instrument_name.clone()))?;
			let close_price = if is_long {
				tick.bid
			} else {
				tick.ask
			};
			self.close_trade_locked(&mut state, trade_id, close_price, tick.time, &reason)?;
			last_close_time = Some(match last_close_time {
				Some(current) => current.max(tick.time),
				None => tick.time
			});
		}
		self.revalue_locked(&mut state)?;
		self.recompute_margin_locked(&mut state)?;
		let snapshot_time = last_close_time.unwrap_or_else(Utc::now);
		self.record_equity_locked(&mut state, snapshot_time)?;
		Ok(())
	}

	pub fn get_account(&self) -> Account {
		self.state.read().account.clone()
	}

	pub fn get_tick(&self, instrument: &str) -> Result<Tick, EngineError> {
		let Some(instrument) = lookup_instrument(instrument) else {
			return Err(EngineError::UnknownInstrument(instrument.to_string()));
		};
		self.ticks.get(&instrument.name)
			.ok_or_else(|| EngineError::NoPrice(instrument.name.clone()))
	}

	pub fn is_trade_open(&self, trade_id: u64) -> bool {
		self.state.read().trades
			.get(&trade_id)
			.map_or(false, |trade| trade.open)
	}

	pub fn get_trade(&self, trade_id: u64) -> Option<Trade> {
		self.state.read().trades
			.get(&trade_id)
			.cloned()
	}

	pub fn open_trade_count(&self) -> usize {
		self.state.read().trades
			.values()
			.filter(|trade| trade.open)
			.count()
	}

	// True once a journal write has failed; the in-memory state is then
	// ahead of the journal and the engine refuses further mutations
	pub fn is_tainted(&self) -> bool {
		self.state.read().tainted
	}

	fn stop_take_hit(trade: &Trade, tick: &Tick) -> Option<(u64, f64, CloseReason)> {
		let mark = trade.mark_price(tick);
		if let Some(stop) = trade.stop_loss {
			let hit = if trade.is_long() {
				mark <= stop
			} else {
				mark >= stop
			};
			if hit {
				return Some((trade.id, mark, CloseReason::StopLoss));
			}
		}
		if let Some(take) = trade.take_profit {
			let hit = if trade.is_long() {
				mark >= take
			} else {
				mark <= take
			};
			if hit {
				return Some((trade.id, mark, CloseReason::TakeProfit));
			}
		}
		None
	}

	fn instrument_of(&self, trade: &Trade) -> Result<&'static Instrument, EngineError> {
		lookup_instrument(&trade.instrument)
			.ok_or_else(|| EngineError::UnknownInstrument(trade.instrument.clone()))
	}

	fn unrealized_pl(&self, trade: &Trade, account_currency: &str) -> Result<f64, EngineError> {
		let instrument = self.instrument_of(trade)?;
		let tick = self.ticks.get(&trade.instrument)
			.ok_or_else(|| EngineError::NoPrice(trade.instrument.clone()))?;
		let rate = quote_to_account_rate(instrument, account_currency, &self.ticks)?;
		let mark = trade.mark_price(&tick);
		Ok(trade.units * (mark - trade.entry_price) * rate)
	}

	fn close_trade_locked(&self, state: &mut SimulatorState, trade_id: u64, close_price: f64, close_time: DateTime<Utc>, reason: &str) -> Result<(), EngineError> {
		let account_currency = state.account.currency.clone();
		let (instrument_name, units, entry_price, entry_time, open) = {
			let trade = state.trades.get(&trade_id)
				.ok_or(EngineError::NotFound(trade_id))?;
			(trade.instrument.clone(), trade.units, trade.entry_price, trade.entry_time, trade.open)
		};
		if !open {
			return Err(EngineError::AlreadyClosed(trade_id));
		}
		let instrument = lookup_instrument(&instrument_name)
			.ok_or_else(|| EngineError::UnknownInstrument(instrument_name.clone()))?;
		let rate = quote_to_account_rate(instrument, &account_currency, &self.ticks)?;
		let realized_pl = units * (close_price - entry_price) * rate;
		if let Some(trade) = state.trades.get_mut(&trade_id) {
			trade.open = false;
			trade.close_price = Some(close_price);
			trade.close_time = Some(close_time);
			trade.realized_pl = Some(realized_pl);
		}
		state.account.balance += realized_pl;
		let record = TradeRecord {
			trade_id,
			instrument: instrument_name,
			units,
			entry_price,
			close_price,
			entry_time,
			close_time,
			realized_pl,
			reason: reason.to_string()
		};
		self.record_trade_locked(state, &record)
	}

	fn revalue_locked(&self, state: &mut SimulatorState) -> Result<(), EngineError> {
		let account_currency = state.account.currency.clone();
		let mut unrealized = 0.0;
		for trade in state.trades.values().filter(|trade| trade.open) {
			unrealized += self.unrealized_pl(trade, &account_currency)?;
		}
		state.account.equity = state.account.balance + unrealized;
		Ok(())
	}

	fn recompute_margin_locked(&self, state: &mut SimulatorState) -> Result<(), EngineError> {
		let account_currency = state.account.currency.clone();
		let mut margin_used = 0.0;
		for trade in state.trades.values().filter(|trade| trade.open) {
			let instrument = self.instrument_of(trade)?;
			let tick = self.ticks.get(&trade.instrument)
				.ok_or_else(|| EngineError::NoPrice(trade.instrument.clone()))?;
			let rate = quote_to_account_rate(instrument, &account_currency, &self.ticks)?;
			margin_used += trade.units.abs() * tick.mid() * rate * instrument.margin_rate;
		}
		let account = &mut state.account;
		account.margin_used = margin_used;
		account.free_margin = account.equity - margin_used;
		account.margin_level = if margin_used > 0.0 {
			account.equity / margin_used
		} else {
			0.0
		};
		Ok(())
	}

	fn record_equity_locked(&self, state: &mut SimulatorState, time: DateTime<Utc>) -> Result<(), EngineError> {
		let account = &state.account;
		let snapshot = EquitySnapshot {
			time,
			balance: account.balance,
			equity: account.equity,
			margin_used: account.margin_used,
			free_margin: account.free_margin,
			margin_level: account.margin_level
		};
		if let Err(error) = self.journal.record_equity(&snapshot) {
			state.tainted = true;
			return Err(EngineError::Journal(error.to_string()));
		}
		Ok(())
	}

	fn record_trade_locked(&self, state: &mut SimulatorState, record: &TradeRecord) -> Result<(), EngineError> {
		if let Err(error) = self.journal.record_trade(record) {
			state.tainted = true;
			return Err(EngineError::Journal(error.to_string()));
		}
		Ok(())
	}

	/*
	While equity does not cover the margin requirement, force-close the open
	trade with the lowest unrealized PnL at its current mark. Each pass
	closes exactly one trade and revalues, so the loop runs at most once per
	open trade.
	*/
	fn enforce_margin_locked(&self, state: &mut SimulatorState, time: DateTime<Utc>) -> Result<(), EngineError> {
		loop {
			if !(state.account.margin_used > 0.0 && state.account.equity < state.account.margin_used) {
				break;
			}
			let account_currency = state.account.currency.clone();
			let mut worst: Option<(u64, f64, OrderedFloat<f64>)> = None;
			for trade in state.trades.values().filter(|trade| trade.open) {
				let tick = self.ticks.get(&trade.instrument)
					.ok_or_else(|| EngineError::NoPrice(trade.instrument.clone()))?;
				let mark = trade.mark_price(&tick);
				let pl = OrderedFloat(self.unrealized_pl(trade, &account_currency)?);
				// Strict comparison keeps the earliest trade on ties
				let replace = match &worst {
					None => true,
					Some((_, _, worst_pl)) => pl < *worst_pl
				};
				if replace {
					worst = Some((trade.id, mark, pl));
				}
			}
			let Some((trade_id, mark, _)) = worst else {
				break;
			};
			warn!(trade_id, "equity below margin requirement, liquidating");
			self.close_trade_locked(state, trade_id, mark, time, &CloseReason::Liquidation.to_string())?;
			self.revalue_locked(state)?;
			self.recompute_margin_locked(state)?;
		}
		Ok(())
	}
}

impl Broker for Simulator {
	fn get_account(&self) -> Account {
		Simulator::get_account(self)
	}

	fn get_tick(&self, instrument: &str) -> Result<Tick, EngineError> {
		Simulator::get_tick(self, instrument)
	}

	fn create_market_order(&self, order: &MarketOrder) -> Result<OrderFill, EngineError> {
		Simulator::create_market_order(self, order)
	}

	fn close_trade(&self, trade_id: u64, reason: &str) -> Result<(), EngineError> {
		Simulator::close_trade(self, trade_id, reason)
	}

	fn is_trade_open(&self, trade_id: u64) -> bool {
		Simulator::is_trade_open(self, trade_id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use anyhow::bail;
	use crate::journal::MemoryJournal;

	fn tick_at(seconds: i64, bid: f64, ask: f64) -> Tick {
		Tick {
			instrument: "EUR_USD".to_string(),
			time: DateTime::from_timestamp(seconds, 0).unwrap(),
			bid,
			ask
		}
	}

	fn simulator() -> (Simulator, Arc<MemoryJournal>) {
		let journal = Arc::new(MemoryJournal::new());
		let simulator = Simulator::new("primary", "USD", 10_000.0, journal.clone());
		(simulator, journal)
	}

	fn assert_near(left: f64, right: f64) {
		assert!((left - right).abs() < 1e-9, "{left} != {right}");
	}

	#[test]
	fn order_requires_price() {
		let (simulator, _) = simulator();
		let order = MarketOrder {
			instrument: "EUR_USD".to_string(),
			units: 10_000.0,
			stop_loss: None,
			take_profit: None
		};
		let result = simulator.create_market_order(&order);
		assert!(matches!(result, Err(EngineError::NoPrice(_))));
	}

	#[test]
	fn order_fill_sides() {
		let (simulator, _) = simulator();
		simulator.update_price(tick_at(0, 1.1000, 1.1002)).unwrap();
		let long = simulator.create_market_order(&MarketOrder {
			instrument: "EUR_USD".to_string(),
			units: 10_000.0,
			stop_loss: None,
			take_profit: None
		}).unwrap();
		assert_eq!(long.price, 1.1002);
		let short = simulator.create_market_order(&MarketOrder {
			instrument: "EURUSD".to_string(),
			units: -10_000.0,
			stop_loss: None,
			take_profit: None
		}).unwrap();
		assert_eq!(short.price, 1.1000);
		assert_eq!(short.instrument, "EUR_USD");
		assert_ne!(long.trade_id, short.trade_id);
	}

	#[test]
	fn order_validation() {
		let (simulator, _) = simulator();
		simulator.update_price(tick_at(0, 1.1000, 1.1002)).unwrap();
		let zero = simulator.create_market_order(&MarketOrder {
			instrument: "EUR_USD".to_string(),
			units: 0.0,
			stop_loss: None,
			take_profit: None
		});
		assert!(matches!(zero, Err(EngineError::InvalidOrder(_))));
		let tiny = simulator.create_market_order(&MarketOrder {
			instrument: "EUR_USD".to_string(),
			units: 0.5,
			stop_loss: None,
			take_profit: None
		});
		assert!(matches!(tiny, Err(EngineError::InvalidOrder(_))));
		let unknown = simulator.create_market_order(&MarketOrder {
			instrument: "XAU_XAG".to_string(),
			units: 1.0,
			stop_loss: None,
			take_profit: None
		});
		assert!(matches!(unknown, Err(EngineError::UnknownInstrument(_))));
	}

	#[test]
	fn equity_tracks_unrealized_pl() {
		let (simulator, _) = simulator();
		simulator.update_price(tick_at(0, 1.1000, 1.1002)).unwrap();
		simulator.create_market_order(&MarketOrder {
			instrument: "EUR_USD".to_string(),
			units: 10_000.0,
			stop_loss: None,
			take_profit: None
		}).unwrap();
		simulator.update_price(tick_at(1, 1.1010, 1.1012)).unwrap();
		let account = simulator.get_account();
		// Long 10k from 1.1002, bid now 1.1010
		assert_near(account.equity, 10_000.0 + 10_000.0 * (1.1010 - 1.1002));
		assert_near(account.balance, 10_000.0);
		assert_near(account.margin_used, 10_000.0 * 1.1011 * 0.02);
		assert_near(account.free_margin, account.equity - account.margin_used);
		assert_near(account.margin_level, account.equity / account.margin_used);
	}

	#[test]
	fn manual_close_books_balance() {
		let (simulator, journal) = simulator();
		simulator.update_price(tick_at(0, 1.1000, 1.1002)).unwrap();
		let fill = simulator.create_market_order(&MarketOrder {
			instrument: "EUR_USD".to_string(),
			units: 10_000.0,
			stop_loss: None,
			take_profit: None
		}).unwrap();
		simulator.update_price(tick_at(1, 1.1010, 1.1012)).unwrap();
		simulator.close_trade(fill.trade_id, "").unwrap();
		let account = simulator.get_account();
		assert_near(account.balance, 10_000.0 + 10_000.0 * (1.1010 - 1.1002));
		assert_near(account.equity, account.balance);
		assert_eq!(account.margin_used, 0.0);
		assert_eq!(account.margin_level, 0.0);
		assert!(!simulator.is_trade_open(fill.trade_id));
		let trades = journal.trades();
		assert_eq!(trades.len(), 1);
		assert_eq!(trades[0].reason, "ManualClose");
		assert_near(trades[0].realized_pl, 10_000.0 * (1.1010 - 1.1002));
		// Two ticks plus the manual close snapshot
		assert_eq!(journal.snapshots().len(), 3);
	}

	#[test]
	fn close_is_rejected_twice() {
		let (simulator, _) = simulator();
		simulator.update_price(tick_at(0, 1.1000, 1.1002)).unwrap();
		let fill = simulator.create_market_order(&MarketOrder {
			instrument: "EUR_USD".to_string(),
			units: 10_000.0,
			stop_loss: None,
			take_profit: None
		}).unwrap();
		simulator.close_trade(fill.trade_id, "").unwrap();
		let again = simulator.close_trade(fill.trade_id, "");
		assert!(matches!(again, Err(EngineError::AlreadyClosed(_))));
		let missing = simulator.close_trade(999, "");
		assert!(matches!(missing, Err(EngineError::NotFound(_))));
	}

	#[test]
	fn short_stop_marks_at_ask() {
		let (simulator, journal) = simulator();
		simulator.update_price(tick_at(0, 1.2000, 1.2002)).unwrap();
		simulator.create_market_order(&MarketOrder {
			instrument: "EUR_USD".to_string(),
			units: -10_000.0,
			stop_loss: Some(1.2010),
			take_profit: None
		}).unwrap();
		simulator.update_price(tick_at(1, 1.2008, 1.2010)).unwrap();
		let trades = journal.trades();
		assert_eq!(trades.len(), 1);
		assert_eq!(trades[0].reason, "StopLoss");
		assert_eq!(trades[0].close_price, 1.2010);
	}

	#[test]
	fn stop_takes_precedence_over_take() {
		let (simulator, journal) = simulator();
		simulator.update_price(tick_at(0, 1.1000, 1.1002)).unwrap();
		// Contradictory levels: both stop and take are already crossed
		simulator.create_market_order(&MarketOrder {
			instrument: "EUR_USD".to_string(),
			units: 10_000.0,
			stop_loss: Some(1.2000),
			take_profit: Some(1.0500)
		}).unwrap();
		simulator.update_price(tick_at(1, 1.1000, 1.1002)).unwrap();
		let trades = journal.trades();
		assert_eq!(trades.len(), 1);
		assert_eq!(trades[0].reason, "StopLoss");
	}

	#[test]
	fn close_all_requires_prices() {
		let (simulator, _) = simulator();
		simulator.update_price(tick_at(0, 1.1000, 1.1002)).unwrap();
		simulator.create_market_order(&MarketOrder {
			instrument: "EUR_USD".to_string(),
			units: 10_000.0,
			stop_loss: None,
			take_profit: None
		}).unwrap();
		simulator.close_all("").unwrap();
		assert_eq!(simulator.open_trade_count(), 0);
	}

	#[test]
	fn liquidation_closes_worst_trade_first() {
		let journal = Arc::new(MemoryJournal::new());
		let simulator = Simulator::new("primary", "USD", 2_000.0, journal.clone());
		simulator.update_price(tick_at(0, 1.1999, 1.2000)).unwrap();
		// Two positions; margin for both is well above equity once prices move
		simulator.create_market_order(&MarketOrder {
			instrument: "EUR_USD".to_string(),
			units: 50_000.0,
			stop_loss: None,
			take_profit: None
		}).unwrap();
		simulator.create_market_order(&MarketOrder {
			instrument: "EUR_USD".to_string(),
			units: 50_000.0,
			stop_loss: None,
			take_profit: None
		}).unwrap();
		simulator.update_price(tick_at(1, 1.1900, 1.1902)).unwrap();
		let account = simulator.get_account();
		assert!(account.margin_used == 0.0 || account.equity >= account.margin_used);
		let liquidations: Vec<TradeRecord> = journal.trades()
			.into_iter()
			.filter(|x| x.reason == "LIQUIDATION")
			.collect();
		assert!(!liquidations.is_empty());
		// Equal losses, so the earlier trade goes first
		assert_eq!(liquidations[0].trade_id, 1);
	}

	struct FailingJournal;

	impl Journal for FailingJournal {
		fn record_trade(&self, _: &TradeRecord) -> anyhow::Result<()> {
			bail!("disk full");
		}

		fn record_equity(&self, _: &EquitySnapshot) -> anyhow::Result<()> {
			bail!("disk full");
		}

		fn list_trades_closed_between(&self, _: DateTime<Utc>, _: DateTime<Utc>) -> anyhow::Result<Vec<TradeRecord>> {
			Ok(Vec::new())
		}

		fn close(&self) -> anyhow::Result<()> {
			Ok(())
		}
	}

	#[test]
	fn journal_failure_taints_engine() {
		let simulator = Simulator::new("primary", "USD", 10_000.0, Arc::new(FailingJournal));
		let result = simulator.update_price(tick_at(0, 1.1000, 1.1002));
		assert!(matches!(result, Err(EngineError::Journal(_))));
		assert!(simulator.is_tainted());
		let next = simulator.update_price(tick_at(1, 1.1000, 1.1002));
		assert!(matches!(next, Err(EngineError::Tainted)));
	}
}
