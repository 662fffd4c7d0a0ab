use anyhow::Result;

use crate::backtest::{BarContext, OrderRequest};
use crate::broker::Broker;
use crate::driver::TickContext;
use crate::ohlc::Candle;
use crate::tick::Tick;

// Strategy driven by individual quotes during a replay. The context
// carries the replay position and cancellation handle, the broker is the
// engine the strategy trades through.
pub trait TickStrategy {
	fn name(&self) -> &str;
	fn on_tick(&mut self, context: &TickContext, broker: &dyn Broker, tick: &Tick) -> Result<()>;
}

/*
Strategy driven by completed bars. on_bar may request a single entry which
the engine fills at the close of the same bar; requests are ignored while a
position is already open. reset clears all indicator state after a data gap
large enough to invalidate it.
*/
pub trait BarStrategy {
	fn name(&self) -> &str;
	fn reset(&mut self);
	fn on_bar(&mut self, context: &BarContext, candle: &Candle) -> Option<OrderRequest>;
}
