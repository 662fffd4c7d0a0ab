use anyhow::Result;
use pipsim_common::broker::{Broker, MarketOrder};
use pipsim_common::driver::TickContext;
use pipsim_common::strategy::TickStrategy;
use pipsim_common::tick::Tick;

// Enters a single position when the mid price crosses a level from below,
// with the stop and take attached to the order.
pub struct ThresholdStrategy {
	instrument: String,
	entry_level: f64,
	units: f64,
	stop_loss: Option<f64>,
	take_profit: Option<f64>,
	previous_mid: Option<f64>,
	entered: bool,
}

impl ThresholdStrategy {
	pub fn new(instrument: &str, entry_level: f64, units: f64, stop_loss: Option<f64>, take_profit: Option<f64>) -> ThresholdStrategy {
		ThresholdStrategy {
			instrument: instrument.to_string(),
			entry_level,
			units,
			stop_loss,
			take_profit,
			previous_mid: None,
			entered: false
		}
	}
}

impl TickStrategy for ThresholdStrategy {
	fn name(&self) -> &str {
		"threshold"
	}

	fn on_tick(&mut self, _: &TickContext, broker: &dyn Broker, tick: &Tick) -> Result<()> {
		if tick.instrument != self.instrument {
			return Ok(());
		}
		let mid = tick.mid();
		let crossed_up = self.previous_mid
			.map_or(false, |previous| previous < self.entry_level && mid >= self.entry_level);
		self.previous_mid = Some(mid);
		if self.entered || !crossed_up {
			return Ok(());
		}
		broker.create_market_order(&MarketOrder {
			instrument: self.instrument.clone(),
			units: self.units,
			stop_loss: self.stop_loss,
			take_profit: self.take_profit
		})?;
		self.entered = true;
		Ok(())
	}
}
