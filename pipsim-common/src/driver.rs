use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::account::CloseReason;
use crate::journal::Journal;
use crate::simulator::Simulator;
use crate::strategy::TickStrategy;
use crate::tick::Tick;

/*
Source of quotes for a replay. next returns Ok(None) once the feed is
exhausted; the driver closes the feed on every exit path.
*/
pub trait Feed {
	fn next(&mut self) -> Result<Option<Tick>>;
	fn close(&mut self) -> Result<()>;
}

// Replays a pre-recorded sequence of ticks
pub struct MemoryFeed {
	ticks: VecDeque<Tick>,
}

#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
	// Close all remaining positions once the feed is exhausted
	pub close_end: bool,
	// Reason recorded for those closes; empty selects "EndOfReplay"
	pub close_reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayResult {
	pub balance: f64,
	pub equity: f64,
	pub start: Option<DateTime<Utc>>,
	pub end: Option<DateTime<Utc>>,
	pub trades: u32,
	pub wins: u32,
	pub losses: u32,
}

// Cooperative cancellation consulted between ticks; a cancelled replay
// stops cleanly as if the feed had ended
#[derive(Clone, Default)]
pub struct CancellationHandle {
	cancelled: Arc<AtomicBool>,
}

// Read-only view of the replay handed to the strategy with every tick.
// The cancellation handle lets a strategy abort the replay itself.
#[derive(Clone)]
pub struct TickContext {
	// Ordinal of the tick within the replay, starting at zero
	pub index: u64,
	// Time of the current tick
	pub time: DateTime<Utc>,
	pub cancellation: CancellationHandle,
}

/*
Composes a feed, the simulation engine and a strategy into a deterministic
replay. Every tick advances the engine first and is then offered to the
strategy; any feed, engine or strategy error stops the replay. No retries
happen at this level.
*/
pub struct Driver<'a> {
	simulator: &'a Simulator,
	journal: Arc<dyn Journal>,
	options: ReplayOptions,
	cancellation: CancellationHandle,
}

impl MemoryFeed {
	pub fn new(ticks: Vec<Tick>) -> MemoryFeed {
		MemoryFeed {
			ticks: ticks.into()
		}
	}
}

impl Feed for MemoryFeed {
	fn next(&mut self) -> Result<Option<Tick>> {
		Ok(self.ticks.pop_front())
	}

	fn close(&mut self) -> Result<()> {
		self.ticks.clear();
		Ok(())
	}
}

impl CancellationHandle {
	pub fn new() -> CancellationHandle {
		CancellationHandle::default()
	}

	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}
}

impl<'a> Driver<'a> {
	pub fn new(simulator: &'a Simulator, journal: Arc<dyn Journal>, options: ReplayOptions, cancellation: CancellationHandle) -> Driver<'a> {
		Driver {
			simulator,
			journal,
			options,
			cancellation
		}
	}

	pub fn run(&self, feed: &mut dyn Feed, strategy: &mut dyn TickStrategy) -> Result<ReplayResult> {
		let replay_result = self.replay(feed, strategy);
		if let Err(error) = feed.close() {
			match replay_result {
				Ok(_) => return Err(error).with_context(|| "Failed to close the tick feed"),
				Err(replay_error) => {
					warn!(%error, "failed to close the tick feed");
					return Err(replay_error);
				}
			}
		}
		replay_result
	}

	fn replay(&self, feed: &mut dyn Feed, strategy: &mut dyn TickStrategy) -> Result<ReplayResult> {
		let mut start: Option<DateTime<Utc>> = None;
		let mut end: Option<DateTime<Utc>> = None;
		let mut index = 0u64;
		while !self.cancellation.is_cancelled() {
			let Some(tick) = feed.next()? else {
				break;
			};
			start = Some(match start {
				Some(current) => current.min(tick.time),
				None => tick.time
			});
			end = Some(match end {
				Some(current) => current.max(tick.time),
				None => tick.time
			});
			self.simulator.update_price(tick.clone())?;
			let context = TickContext {
				index,
				time: tick.time,
				cancellation: self.cancellation.clone()
			};
			strategy.on_tick(&context, self.simulator, &tick)
				.with_context(|| format!("Strategy \"{}\" failed", strategy.name()))?;
			index += 1;
		}
		if self.options.close_end {
			let reason = if self.options.close_reason.is_empty() {
				CloseReason::EndOfReplay.to_string()
			} else {
				self.options.close_reason.clone()
			};
			if let Err(error) = self.simulator.close_all(&reason) {
				warn!(%error, "failed to close remaining trades at the end of the replay");
			}
		}
		let account = self.simulator.get_account();
		let (trades, wins, losses) = match (start, end) {
			(Some(from), Some(until)) => {
				let records = self.journal.list_trades_closed_between(from, until + Duration::nanoseconds(1))?;
				let wins = records
					.iter()
					.filter(|x| x.realized_pl > 0.0)
					.count() as u32;
				let losses = records
					.iter()
					.filter(|x| x.realized_pl < 0.0)
					.count() as u32;
				(records.len() as u32, wins, losses)
			},
			_ => (0, 0, 0)
		};
		Ok(ReplayResult {
			balance: account.balance,
			equity: account.equity,
			start,
			end,
			trades,
			wins,
			losses
		})
	}
}
