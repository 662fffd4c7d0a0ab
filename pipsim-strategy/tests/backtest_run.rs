use std::sync::Arc;
use pipsim_common::backtest::{Backtest, BacktestConfiguration};
use pipsim_common::driver::{CancellationHandle, Driver, MemoryFeed, ReplayOptions};
use pipsim_common::instrument::lookup_instrument;
use pipsim_common::journal::MemoryJournal;
use pipsim_common::ohlc::{Candle, CandleSet, TIME_FRAME_H1};
use pipsim_common::price::{Price, PRICE_SCALE};
use pipsim_common::simulator::Simulator;
use pipsim_common::tick::Tick;
use pipsim_strategy::{SmaCrossStrategy, ThresholdStrategy};

// 2025-01-06 00:00:00 UTC
const START: i64 = 1_736_121_600;

fn bar(close: Price) -> Candle {
	Candle {
		o: close,
		h: close + 100,
		l: close - 100,
		c: close
	}
}

fn hour_set(closes: &[Price]) -> CandleSet {
	let instrument = lookup_instrument("EUR_USD").unwrap();
	let mut set = CandleSet::new_empty(instrument, START, TIME_FRAME_H1, PRICE_SCALE, closes.len());
	for (index, close) in closes.iter().enumerate() {
		set.set_candle(index, bar(*close));
	}
	set
}

#[test]
fn sma_cross_entry_exits_at_take() {
	let mut set = hour_set(&[1_100_000, 1_099_000, 1_098_000, 1_097_500, 1_104_000, 1_104_000]);
	// The bar after the cross sweeps through the 40 pip take level
	set.set_candle(5, Candle {
		o: 1_104_000,
		h: 1_108_500,
		l: 1_103_500,
		c: 1_107_000
	});
	let journal = Arc::new(MemoryJournal::new());
	let configuration = BacktestConfiguration {
		starting_balance: 10_000.0,
		account_currency: "USD".to_string(),
		reset_indicators_on_gap_hours: 0
	};
	let mut backtest = Backtest::new(&set, configuration, journal.clone()).unwrap();
	let mut strategy = SmaCrossStrategy::new(2, 3, 10_000, Some(20.0), Some(40.0)).unwrap();
	let summary = backtest.run(&mut strategy).unwrap();
	assert_eq!(summary.trades, 1);
	assert_eq!(summary.wins, 1);
	assert_eq!(summary.losses, 0);
	assert!(summary.open_position.is_none());
	// Entry at 1.1040, take at 1.1080, 10k units
	assert!((summary.balance - 10_040.0).abs() < 1e-9);
	let trades = journal.trades();
	assert_eq!(trades.len(), 1);
	assert_eq!(trades[0].reason, "TAKE");
	assert_eq!(trades[0].entry_price, 1.1040);
	assert_eq!(trades[0].close_price, 1.1080);
}

fn tick_at(seconds: i64, bid: f64, ask: f64) -> Tick {
	Tick {
		instrument: "EUR_USD".to_string(),
		time: chrono::DateTime::from_timestamp(seconds, 0).unwrap(),
		bid,
		ask
	}
}

#[test]
fn threshold_replay_end_to_end() {
	let journal = Arc::new(MemoryJournal::new());
	let simulator = Simulator::new("primary", "USD", 10_000.0, journal.clone());
	let options = ReplayOptions {
		close_end: true,
		close_reason: String::new()
	};
	let driver = Driver::new(&simulator, journal.clone(), options, CancellationHandle::new());
	let mut feed = MemoryFeed::new(vec![
		tick_at(0, 1.1000, 1.1002),
		tick_at(1, 1.1005, 1.1007),
		// Crosses the 1.1010 level, entry at the ask
		tick_at(2, 1.1012, 1.1014),
		// Falls through the stop
		tick_at(3, 1.0988, 1.0990),
	]);
	let mut strategy = ThresholdStrategy::new("EUR_USD", 1.1010, 10_000.0, Some(1.0995), None);
	let result = driver.run(&mut feed, &mut strategy).unwrap();
	assert_eq!(result.trades, 1);
	assert_eq!(result.losses, 1);
	let trades = journal.trades();
	assert_eq!(trades.len(), 1);
	assert_eq!(trades[0].reason, "StopLoss");
	assert_eq!(trades[0].close_price, 1.0988);
	assert!((result.balance - (10_000.0 + 10_000.0 * (1.0988 - 1.1014))).abs() < 1e-9);
}
