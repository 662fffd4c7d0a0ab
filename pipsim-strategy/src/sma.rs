use std::collections::VecDeque;
use anyhow::{bail, Result};
use pipsim_common::backtest::{BarContext, OrderRequest, PositionSide};
use pipsim_common::ohlc::Candle;
use pipsim_common::price::{pip_scaled, pips_to_delta, Price};
use pipsim_common::strategy::BarStrategy;

/*
Moving average crossover over bar closes. Goes long when the fast average
crosses above the slow one and short on the opposite cross, with optional
stop and take levels placed a fixed number of pips from the entry. Only
ever requests an entry while flat; the engine's stop/take handling does the
exits.
*/
pub struct SmaCrossStrategy {
	fast_period: usize,
	slow_period: usize,
	units: i64,
	stop_pips: Option<f64>,
	take_pips: Option<f64>,
	closes: VecDeque<Price>,
	fast_was_above: Option<bool>,
}

fn validate_period(period: usize) -> Result<()> {
	if period < 2 {
		bail!("Invalid period {period} for moving average");
	}
	Ok(())
}

impl SmaCrossStrategy {
	pub fn new(fast_period: usize, slow_period: usize, units: i64, stop_pips: Option<f64>, take_pips: Option<f64>) -> Result<SmaCrossStrategy> {
		validate_period(fast_period)?;
		validate_period(slow_period)?;
		if slow_period <= fast_period {
			bail!("The slow period must exceed the fast period");
		}
		if units <= 0 {
			bail!("Units must be positive");
		}
		Ok(SmaCrossStrategy {
			fast_period,
			slow_period,
			units,
			stop_pips,
			take_pips,
			closes: VecDeque::new(),
			fast_was_above: None
		})
	}

	fn average(&self, period: usize) -> f64 {
		let sum: i64 = self.closes
			.iter()
			.rev()
			.take(period)
			.map(|x| *x as i64)
			.sum();
		(sum as f64) / (period as f64)
	}

	fn level(entry: Price, offset: i64) -> Price {
		((entry as i64) + offset) as Price
	}
}

impl BarStrategy for SmaCrossStrategy {
	fn name(&self) -> &str {
		"smacross"
	}

	fn reset(&mut self) {
		self.closes.clear();
		self.fast_was_above = None;
	}

	fn on_bar(&mut self, context: &BarContext, candle: &Candle) -> Option<OrderRequest> {
		self.closes.push_back(candle.c);
		if self.closes.len() > self.slow_period {
			self.closes.pop_front();
		}
		if self.closes.len() < self.slow_period {
			return None;
		}
		let fast = self.average(self.fast_period);
		let slow = self.average(self.slow_period);
		let fast_is_above = fast > slow;
		let crossed = self.fast_was_above
			.map_or(false, |previous| previous != fast_is_above);
		self.fast_was_above = Some(fast_is_above);
		if !crossed || context.position.is_some() {
			return None;
		}
		let side = if fast_is_above {
			PositionSide::Long
		} else {
			PositionSide::Short
		};
		let units_per_pip = pip_scaled(context.scale, context.instrument.pip_location).ok()?;
		let stop = self.stop_pips.map(|pips| {
			let offset = -side.sign() * pips_to_delta(pips, units_per_pip);
			Self::level(candle.c, offset)
		});
		let take = self.take_pips.map(|pips| {
			let offset = side.sign() * pips_to_delta(pips, units_per_pip);
			Self::level(candle.c, offset)
		});
		Some(OrderRequest {
			side,
			units: self.units,
			stop,
			take,
			reason: format!("sma {}/{} cross", self.fast_period, self.slow_period)
		})
	}
}
