use std::sync::Arc;
use anyhow::{bail, Result};
use strum_macros::Display;
use tracing::warn;

use crate::account::CloseReason;
use crate::instrument::Instrument;
use crate::journal::{Journal, TradeRecord};
use crate::ohlc::{Candle, CandleSet, SlotRef, TIME_FRAME_H1};
use crate::price::{to_float, Price};
use crate::strategy::BarStrategy;
use crate::unix_to_datetime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PositionSide {
	#[strum(serialize = "long")]
	Long,
	#[strum(serialize = "short")]
	Short
}

impl PositionSide {
	pub fn sign(&self) -> i64 {
		match self {
			PositionSide::Long => 1,
			PositionSide::Short => -1
		}
	}
}

// Entry requested by a strategy, filled at the close of the current bar
#[derive(Debug, Clone)]
pub struct OrderRequest {
	pub side: PositionSide,
	pub units: i64,
	pub stop: Option<Price>,
	pub take: Option<Price>,
	pub reason: String,
}

#[derive(Debug, Clone)]
pub struct Position {
	pub id: u64,
	pub side: PositionSide,
	// Always positive; the side carries the direction
	pub units: i64,
	pub entry_price: Price,
	pub entry_index: usize,
	// Unix seconds of the entry bar
	pub entry_time: i64,
	pub stop: Option<Price>,
	pub take: Option<Price>,
}

#[derive(Debug, Clone)]
pub struct BacktestConfiguration {
	pub starting_balance: f64,
	pub account_currency: String,
	// When positive, the strategy's indicator state is reset after a gap
	// of at least this many hours without bars
	pub reset_indicators_on_gap_hours: u32,
}

// Read-only view of the engine handed to the strategy on every bar
pub struct BarContext {
	pub index: usize,
	// Unix seconds of the current bar
	pub time: i64,
	pub balance: f64,
	pub position: Option<Position>,
	pub instrument: &'static Instrument,
	pub scale: u32,
}

#[derive(Debug, Clone)]
pub struct BacktestSummary {
	pub balance: f64,
	pub trades: u32,
	pub wins: u32,
	pub losses: u32,
	pub open_position: Option<Position>,
	// True when PnL was left in the quote currency because it differs from
	// the account currency
	pub quote_currency_pnl: bool,
}

/*
Bar-driven backtest over a dense H1 timeline. Holds at most one position,
fills entries at the close of the signalling bar and evaluates stops and
takes against the full range of each subsequent bar. When a bar crosses
both levels the stop fills.
*/
pub struct Backtest<'a> {
	configuration: BacktestConfiguration,
	candles: &'a CandleSet,
	journal: Arc<dyn Journal>,
	balance: f64,
	position: Option<Position>,
	next_position_id: u64,
	quote_currency_pnl: bool,
	trades: u32,
	wins: u32,
	losses: u32,
}

impl<'a> Backtest<'a> {
	pub fn new(candles: &'a CandleSet, configuration: BacktestConfiguration, journal: Arc<dyn Journal>) -> Result<Backtest<'a>> {
		if candles.time_frame != TIME_FRAME_H1 {
			bail!("The bar engine requires an H1 candle set, got a {} second time frame", candles.time_frame);
		}
		let quote_currency_pnl = candles.instrument.quote_currency != configuration.account_currency;
		if quote_currency_pnl {
			warn!(
				instrument = candles.instrument.name.as_str(),
				account_currency = configuration.account_currency.as_str(),
				"quote currency differs from the account currency, PnL stays in the quote currency"
			);
		}
		let balance = configuration.starting_balance;
		Ok(Backtest {
			configuration,
			candles,
			journal,
			balance,
			position: None,
			next_position_id: 1,
			quote_currency_pnl,
			trades: 0,
			wins: 0,
			losses: 0
		})
	}

	pub fn run(&mut self, strategy: &mut dyn BarStrategy) -> Result<BacktestSummary> {
		let mut previous_index: Option<usize> = None;
		for slot in self.candles.iter() {
			if let Some(previous) = previous_index {
				let gap_bars = slot.index - previous - 1;
				let threshold = self.configuration.reset_indicators_on_gap_hours as usize;
				if threshold > 0 && gap_bars >= threshold {
					strategy.reset();
				}
			}
			if let Some(position) = self.position.clone() {
				if let Some((exit_price, reason)) = check_exit(&position, slot.candle) {
					self.close_position(&position, exit_price, slot.time, reason)?;
				}
			}
			let context = BarContext {
				index: slot.index,
				time: slot.time,
				balance: self.balance,
				position: self.position.clone(),
				instrument: self.candles.instrument,
				scale: self.candles.scale
			};
			if let Some(request) = strategy.on_bar(&context, slot.candle) {
				if self.position.is_none() && request.units != 0 {
					self.open_position(&request, &slot);
				}
			}
			previous_index = Some(slot.index);
		}
		Ok(self.summary())
	}

	pub fn position(&self) -> Option<&Position> {
		self.position.as_ref()
	}

	pub fn balance(&self) -> f64 {
		self.balance
	}

	pub fn summary(&self) -> BacktestSummary {
		BacktestSummary {
			balance: self.balance,
			trades: self.trades,
			wins: self.wins,
			losses: self.losses,
			open_position: self.position.clone(),
			quote_currency_pnl: self.quote_currency_pnl
		}
	}

	fn open_position(&mut self, request: &OrderRequest, slot: &SlotRef) {
		let position = Position {
			id: self.next_position_id,
			side: request.side,
			units: request.units.abs(),
			entry_price: slot.candle.c,
			entry_index: slot.index,
			entry_time: slot.time,
			stop: request.stop,
			take: request.take
		};
		self.next_position_id += 1;
		self.position = Some(position);
	}

	fn close_position(&mut self, position: &Position, exit_price: Price, time: i64, reason: CloseReason) -> Result<()> {
		let scale = self.candles.scale;
		// 64-bit accumulation; the product overflows 32 bits for any
		// realistically sized position
		let pnl_scaled = position.side.sign() * ((exit_price as i64) - (position.entry_price as i64)) * position.units;
		let pnl_quote = (pnl_scaled as f64) / (scale as f64);
		self.balance += pnl_quote;
		self.trades += 1;
		if pnl_quote > 0.0 {
			self.wins += 1;
		} else if pnl_quote < 0.0 {
			self.losses += 1;
		}
		let record = TradeRecord {
			trade_id: position.id,
			instrument: self.candles.instrument.name.clone(),
			units: (position.side.sign() * position.units) as f64,
			entry_price: to_float(position.entry_price, scale),
			close_price: to_float(exit_price, scale),
			entry_time: unix_to_datetime(position.entry_time)?,
			close_time: unix_to_datetime(time)?,
			realized_pl: pnl_quote,
			reason: reason.to_string()
		};
		self.journal.record_trade(&record)?;
		self.position = None;
		Ok(())
	}
}

/*
Evaluates the position's stop and take against the bar's range. Both levels
crossing within the same bar is unresolvable from OHLC data alone, so the
stop wins.
*/
pub fn check_exit(position: &Position, candle: &Candle) -> Option<(Price, CloseReason)> {
	let (stop_hit, take_hit) = match position.side {
		PositionSide::Long => (
			position.stop.map_or(false, |stop| candle.l <= stop),
			position.take.map_or(false, |take| candle.h >= take)
		),
		PositionSide::Short => (
			position.stop.map_or(false, |stop| candle.h >= stop),
			position.take.map_or(false, |take| candle.l <= take)
		)
	};
	match (stop_hit, take_hit) {
		(true, true) => position.stop.map(|stop| (stop, CloseReason::StopAndTake)),
		(true, false) => position.stop.map(|stop| (stop, CloseReason::Stop)),
		(false, true) => position.take.map(|take| (take, CloseReason::Take)),
		(false, false) => None
	}
}
