use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::instrument::Instrument;

/*
Columns of the persisted risk_policy_runs table. The id is a ULID assigned
by whichever store persists the record; the core treats it as opaque.
*/
pub const RISK_POLICY_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS risk_policy_runs (
	id TEXT PRIMARY KEY,
	created_at TEXT NOT NULL,
	account_ccy TEXT NOT NULL,
	start_equity REAL NOT NULL,
	default_risk_pct REAL NOT NULL,
	max_risk_pct REAL NOT NULL,
	max_daily_loss_pct REAL NOT NULL,
	max_weekly_loss_pct REAL NOT NULL,
	max_open_trades INTEGER NOT NULL,
	max_margin_pct REAL NOT NULL,
	min_rr REAL NOT NULL
)";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskPolicy {
	pub id: String,
	pub created_at: DateTime<Utc>,
	pub account_ccy: String,
	pub start_equity: f64,
	pub default_risk_pct: f64,
	pub max_risk_pct: f64,
	pub max_daily_loss_pct: f64,
	pub max_weekly_loss_pct: f64,
	pub max_open_trades: u32,
	pub max_margin_pct: f64,
	pub min_rr: f64,
}

impl RiskPolicy {
	pub fn validate(&self) -> Result<()> {
		if self.start_equity <= 0.0 {
			bail!("Starting equity must be positive");
		}
		if self.default_risk_pct <= 0.0 || self.default_risk_pct > self.max_risk_pct {
			bail!("Default risk percentage must be positive and within the maximum");
		}
		if self.max_open_trades == 0 {
			bail!("At least one open trade must be permitted");
		}
		if self.min_rr < 0.0 {
			bail!("Minimum reward/risk ratio cannot be negative");
		}
		Ok(())
	}
}

// Account-currency value of one pip for the given position size
pub fn pip_value(instrument: &Instrument, units: f64, quote_to_account: f64) -> f64 {
	units.abs() * instrument.pip_size() * quote_to_account
}

pub fn margin_required(instrument: &Instrument, units: f64, mid: f64, quote_to_account: f64) -> f64 {
	units.abs() * mid * quote_to_account * instrument.margin_rate
}

// Quantizes a unit amount to the instrument's trade precision, rounding down
pub fn round_units(instrument: &Instrument, units: f64) -> f64 {
	let factor = 10f64.powi(instrument.trade_units_precision as i32);
	(units * factor).floor() / factor
}

/*
Position size such that the loss at the stop equals the requested fraction
of equity. The raw size is rounded down to the instrument's unit precision
and must not fall below the minimum trade size.
*/
pub fn risk_units(instrument: &Instrument, equity: f64, risk_pct: f64, stop_distance_pips: f64, quote_to_account: f64) -> Result<f64> {
	if equity <= 0.0 {
		bail!("Equity must be positive");
	}
	if risk_pct <= 0.0 {
		bail!("Risk percentage must be positive");
	}
	if stop_distance_pips <= 0.0 {
		bail!("Stop distance must be positive");
	}
	let risk_amount = equity * risk_pct / 100.0;
	let loss_per_unit = instrument.pip_size() * stop_distance_pips * quote_to_account;
	let units = round_units(instrument, risk_amount / loss_per_unit);
	if units < instrument.min_trade_size {
		bail!("Computed size {units} is below the minimum trade size {} for {}", instrument.min_trade_size, instrument.name);
	}
	Ok(units)
}
