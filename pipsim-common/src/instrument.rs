use std::collections::HashMap;
use std::path::PathBuf;
use anyhow::{anyhow, bail, Result};
use lazy_static::lazy_static;
use serde::Deserialize;

use crate::price::pip_scaled;
use crate::read_csv;

lazy_static! {
	static ref REGISTRY: InstrumentRegistry = InstrumentRegistry::builtin();
}

#[derive(Debug, Clone, Deserialize)]
pub struct Instrument {
	pub name: String,
	pub base_currency: String,
	pub quote_currency: String,
	// Negative exponent, e.g. -4 means one pip is 0.0001
	pub pip_location: i32,
	// Number of decimal places permitted in trade unit amounts
	pub trade_units_precision: u32,
	pub min_trade_size: f64,
	// Fraction of the position's notional value required as margin
	pub margin_rate: f64,
}

pub struct InstrumentRegistry {
	instruments: Vec<Instrument>,
	by_name: HashMap<String, usize>,
}

impl Instrument {
	fn new(name: &str, pip_location: i32, margin_rate: f64) -> Instrument {
		let (base, quote) = name.split_once('_')
			.unwrap_or((name, ""));
		Instrument {
			name: name.to_string(),
			base_currency: base.to_string(),
			quote_currency: quote.to_string(),
			pip_location,
			trade_units_precision: 0,
			min_trade_size: 1.0,
			margin_rate
		}
	}

	pub fn pip_size(&self) -> f64 {
		10f64.powi(self.pip_location)
	}

	pub fn units_per_pip(&self, scale: u32) -> Result<u32> {
		pip_scaled(scale, self.pip_location)
	}
}

impl InstrumentRegistry {
	fn builtin() -> InstrumentRegistry {
		let instruments = vec![
			Instrument::new("EUR_USD", -4, 0.02),
			Instrument::new("GBP_USD", -4, 0.03),
			Instrument::new("AUD_USD", -4, 0.03),
			Instrument::new("NZD_USD", -4, 0.03),
			Instrument::new("USD_JPY", -2, 0.02),
			Instrument::new("USD_CHF", -4, 0.03),
			Instrument::new("USD_CAD", -4, 0.02),
			Instrument::new("EUR_GBP", -4, 0.03),
			Instrument::new("EUR_JPY", -2, 0.03),
		];
		Self::from_instruments(instruments)
	}

	fn from_instruments(instruments: Vec<Instrument>) -> InstrumentRegistry {
		let mut registry = InstrumentRegistry {
			instruments: Vec::new(),
			by_name: HashMap::new()
		};
		for instrument in instruments {
			registry.insert(instrument);
		}
		registry
	}

	pub fn from_csv(path: PathBuf) -> Result<InstrumentRegistry> {
		let mut instruments = Vec::new();
		read_csv::<Instrument>(path, |record| {
			instruments.push(record);
		})?;
		if instruments.is_empty() {
			bail!("Instrument file contains no records");
		}
		Ok(Self::from_instruments(instruments))
	}

	pub fn get(&self, name: &str) -> Option<&Instrument> {
		let key = normalize_name(name);
		self.by_name.get(&key)
			.map(|index| &self.instruments[*index])
	}

	fn insert(&mut self, instrument: Instrument) {
		let key = normalize_name(&instrument.name);
		let index = self.instruments.len();
		self.instruments.push(instrument);
		self.by_name.insert(key, index);
	}
}

// Alias keys such as "EUR_USD" and "EURUSD" resolve to the same record
fn normalize_name(name: &str) -> String {
	name.chars()
		.filter(|x| *x != '_')
		.collect::<String>()
		.to_uppercase()
}

pub fn lookup_instrument(name: &str) -> Option<&'static Instrument> {
	REGISTRY.get(name)
}

pub fn get_instrument(name: &str) -> Result<&'static Instrument> {
	lookup_instrument(name)
		.ok_or_else(|| anyhow!("Unknown instrument \"{name}\""))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn alias_resolution() {
		let a = lookup_instrument("EUR_USD").unwrap();
		let b = lookup_instrument("EURUSD").unwrap();
		let c = lookup_instrument("eur_usd").unwrap();
		assert_eq!(a.name, "EUR_USD");
		assert_eq!(a.name, b.name);
		assert_eq!(a.name, c.name);
	}

	#[test]
	fn unknown_instrument() {
		assert!(lookup_instrument("XAU_XAG").is_none());
		assert!(get_instrument("XAU_XAG").is_err());
	}

	#[test]
	fn currencies() {
		let instrument = lookup_instrument("USD_JPY").unwrap();
		assert_eq!(instrument.base_currency, "USD");
		assert_eq!(instrument.quote_currency, "JPY");
		assert_eq!(instrument.pip_location, -2);
	}

	const CSV_HEADER: &str = "name,base_currency,quote_currency,pip_location,trade_units_precision,min_trade_size,margin_rate";

	fn write_instrument_csv(rows: &str) -> (tempfile::TempDir, std::path::PathBuf) {
		let directory = tempfile::tempdir().unwrap();
		let path = directory.path().join("instruments.csv");
		std::fs::write(&path, format!("{CSV_HEADER}\n{rows}")).unwrap();
		(directory, path)
	}

	#[test]
	fn registry_from_csv() {
		let (_directory, path) = write_instrument_csv(
			"XAU_USD,XAU,USD,-1,0,1.0,0.05\nSGD_JPY,SGD,JPY,-2,1,1.0,0.04\n"
		);
		let registry = InstrumentRegistry::from_csv(path).unwrap();
		let gold = registry.get("XAU_USD").unwrap();
		assert_eq!(gold.base_currency, "XAU");
		assert_eq!(gold.pip_location, -1);
		assert_eq!(gold.margin_rate, 0.05);
		// Alias keys apply to loaded universes as well
		assert!(registry.get("XAUUSD").is_some());
		assert!(registry.get("sgd_jpy").is_some());
		// A custom universe does not inherit the built-in pairs
		assert!(registry.get("EUR_USD").is_none());
	}

	#[test]
	fn registry_from_csv_rejects_empty_file() {
		let (_directory, path) = write_instrument_csv("");
		assert!(InstrumentRegistry::from_csv(path).is_err());
	}

	#[test]
	fn registry_from_csv_rejects_malformed_rows() {
		let (_directory, path) = write_instrument_csv(
			"XAU_USD,XAU,USD,not_a_number,0,1.0,0.05\n"
		);
		assert!(InstrumentRegistry::from_csv(path).is_err());
	}
}
