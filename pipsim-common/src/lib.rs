pub mod account;
pub mod backtest;
pub mod broker;
pub mod convert;
pub mod dataset;
pub mod driver;
pub mod error;
pub mod instrument;
pub mod journal;
pub mod ohlc;
pub mod price;
pub mod risk;
pub mod simulator;
pub mod strategy;
pub mod tick;

use std::fs;
use std::path::PathBuf;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use configparser::ini::Ini;
use serde::de::DeserializeOwned;

pub fn get_ini(path: &str) -> Result<Ini> {
	let mut config = Ini::new();
	config.load(path)
		.map_err(|error| anyhow!(error))
		.with_context(|| format!("Failed to read configuration file \"{path}\""))?;
	Ok(config)
}

pub fn read_csv<T>(path: PathBuf, mut on_record: impl FnMut(T)) -> Result<()>
where
	T: DeserializeOwned
{
	let mut reader = csv::Reader::from_path(path.clone())
		.with_context(|| anyhow!("Unable to read .csv file \"{}\"", path.display()))?;
	let headers = reader.headers()?.clone();
	let mut string_record = csv::StringRecord::new();
	while reader.read_record(&mut string_record)? && string_record.len() > 0 {
		let record: T = string_record.deserialize(Some(&headers))?;
		on_record(record);
	}
	Ok(())
}

pub fn get_files_by_extension(directory: &str, extension: &str) -> Result<Vec<(String, PathBuf)>> {
	let entries = fs::read_dir(directory)
		.with_context(|| anyhow!("Unable to read directory \"{directory}\""))?;
	let mut output = Vec::new();
	for entry in entries {
		let path = entry?.path();
		if !path.is_file() {
			continue;
		}
		let matches = path.extension()
			.and_then(|x| x.to_str())
			.map_or(false, |x| x == extension);
		if !matches {
			continue;
		}
		let Some(stem) = path.file_stem().and_then(|x| x.to_str()) else {
			continue;
		};
		output.push((stem.to_string(), path.clone()));
	}
	output.sort();
	Ok(output)
}

pub fn unix_to_datetime(seconds: i64) -> Result<DateTime<Utc>> {
	DateTime::from_timestamp(seconds, 0)
		.with_context(|| anyhow!("Invalid Unix timestamp {seconds}"))
}
