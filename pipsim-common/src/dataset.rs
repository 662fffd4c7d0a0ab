use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDateTime, TimeZone, Timelike};
use chrono_tz::EST;
use lazy_static::lazy_static;
use regex::Regex;
use rkyv::{Archive, Deserialize, Serialize};

use crate::instrument::{get_instrument, Instrument};
use crate::ohlc::{time_frame_label, Bitmap, Candle, CandleSet, TIME_FRAME_H1, TIME_FRAME_M1};
use crate::price::{Price, PRICE_SCALE};

lazy_static! {
	static ref DATASET_FILE_REGEX: Regex = Regex::new(r"^DAT_ASCII_([A-Z]{6,7})_(M1|H1)(?:_([0-9]{4}))?\.csv$").unwrap();
}

/*
Serializable form of a candle set, written to .zrk files.
The instrument is stored by name and resolved against the registry on load.
*/
#[derive(Archive, Serialize, Deserialize)]
pub struct RawDataset {
	pub instrument: String,
	pub start: i64,
	pub time_frame: u32,
	pub scale: u32,
	pub candles: Vec<Candle>,
	pub valid_words: Vec<u64>,
	pub slots: u64,
	pub duplicates: u32,
	pub out_of_range: u32,
	pub bad_lines: u32,
}

struct DatasetRow {
	time: i64,
	candle: Candle,
}

// Recognizes the canonical dataset file name form, e.g. "DAT_ASCII_EURUSD_M1_2025.csv"
pub fn parse_dataset_file_name(file_name: &str) -> Option<(String, u32)> {
	let captures = DATASET_FILE_REGEX.captures(file_name)?;
	let symbol = captures[1].to_string();
	let time_frame = match &captures[2] {
		"M1" => TIME_FRAME_M1,
		"H1" => TIME_FRAME_H1,
		_ => return None
	};
	Some((symbol, time_frame))
}

pub fn get_archive_file_name(symbol: &str, time_frame: u32) -> String {
	format!("{symbol}_{}.zrk", time_frame_label(time_frame))
}

/*
Loads a semicolon-separated OHLC dataset into a dense candle set.

The file is read twice: a first pass determines the covered time range so
that the grid can be allocated up front, a second pass fills the slots.
Rows that cannot be parsed are counted rather than aborting the load.
*/
pub fn load_dataset(path: &Path) -> Result<CandleSet> {
	let file_name = path.file_name()
		.and_then(|x| x.to_str())
		.unwrap_or_default();
	let Some((symbol, time_frame)) = parse_dataset_file_name(file_name) else {
		bail!("Unrecognized dataset file name \"{file_name}\"");
	};
	let instrument = get_instrument(&symbol)?;
	load_dataset_as(path, instrument, time_frame)
}

pub fn load_dataset_as(path: &Path, instrument: &'static Instrument, time_frame: u32) -> Result<CandleSet> {
	let scale = PRICE_SCALE;
	let (min_time, max_time) = scan_bounds(path, scale)?;
	let start = min_time - min_time.rem_euclid(time_frame as i64);
	let slots = ((max_time - start) / (time_frame as i64) + 1) as usize;
	let mut set = CandleSet::new_empty(instrument, start, time_frame, scale, slots);
	fill(path, &mut set)?;
	set.build_gap_report();
	Ok(set)
}

fn open_lines(path: &Path) -> Result<impl Iterator<Item = std::io::Result<String>>> {
	let file = File::open(path)
		.with_context(|| anyhow!("Unable to open dataset file \"{}\"", path.display()))?;
	Ok(BufReader::new(file).lines())
}

fn is_header(line: &str) -> bool {
	line.starts_with("time;") || line.starts_with("Time;")
}

fn scan_bounds(path: &Path, scale: u32) -> Result<(i64, i64)> {
	let mut bounds: Option<(i64, i64)> = None;
	for line in open_lines(path)? {
		let line = line?;
		if line.is_empty() || is_header(&line) {
			continue;
		}
		if let Some(row) = parse_row(&line, scale) {
			bounds = Some(match bounds {
				None => (row.time, row.time),
				Some((min, max)) => (min.min(row.time), max.max(row.time))
			});
		}
	}
	bounds.ok_or_else(|| anyhow!("No timestamps found in \"{}\"", path.display()))
}

fn fill(path: &Path, set: &mut CandleSet) -> Result<()> {
	let start = set.start;
	let time_frame = set.time_frame as i64;
	let slots = set.slots();
	let scale = set.scale;
	for line in open_lines(path)? {
		let line = line?;
		if line.is_empty() || is_header(&line) {
			continue;
		}
		let Some(row) = parse_row(&line, scale) else {
			set.bad_lines += 1;
			continue;
		};
		if row.time < start {
			set.out_of_range += 1;
			continue;
		}
		let index = ((row.time - start) / time_frame) as usize;
		if index >= slots {
			set.out_of_range += 1;
			continue;
		}
		// Keep the first observed bar for a slot
		if set.is_valid(index) {
			set.duplicates += 1;
			continue;
		}
		set.set_candle(index, row.candle);
	}
	Ok(())
}

fn parse_row(line: &str, scale: u32) -> Option<DatasetRow> {
	let mut fields = line.split(';');
	let time = parse_est_timestamp(fields.next()?)?;
	let o = parse_scaled_price(fields.next()?, scale)?;
	let h = parse_scaled_price(fields.next()?, scale)?;
	let l = parse_scaled_price(fields.next()?, scale)?;
	let c = parse_scaled_price(fields.next()?, scale)?;
	// Volume is present in the input but not carried by candles
	fields.next()?;
	Some(DatasetRow {
		time,
		candle: Candle {
			o,
			h,
			l,
			c
		}
	})
}

// Timestamps are recorded in a fixed UTC-5 zone without daylight saving
// and must be minute-aligned
fn parse_est_timestamp(field: &str) -> Option<i64> {
	let naive = NaiveDateTime::parse_from_str(field.trim(), "%Y%m%d %H%M%S").ok()?;
	if naive.second() != 0 {
		return None;
	}
	let time = EST.from_local_datetime(&naive).single()?;
	Some(time.timestamp())
}

/*
Prices are encoded with six implicit decimals, e.g. "1.035030" becomes
1035030. The decimal point is stripped and the remaining digits parsed as
an integer, which keeps the conversion exact.
*/
fn parse_scaled_price(field: &str, scale: u32) -> Option<Price> {
	let field = field.trim();
	let (integer, fraction) = field.split_once('.')?;
	if fraction.len() != decimal_places(scale)? {
		return None;
	}
	let combined = format!("{integer}{fraction}");
	combined.parse::<Price>()
		.ok()
		.filter(|x| *x > 0)
}

fn decimal_places(scale: u32) -> Option<usize> {
	let mut remaining = scale;
	let mut places = 0;
	while remaining > 1 {
		if remaining % 10 != 0 {
			return None;
		}
		remaining /= 10;
		places += 1;
	}
	Some(places)
}

pub fn write_dataset(path: &PathBuf, set: &CandleSet) -> Result<()> {
	let raw = RawDataset::from_set(set);
	let binary_data = rkyv::to_bytes::<_, 1024>(&raw)?;
	let file = File::create(path.clone())?;
	zstd::stream::copy_encode(binary_data.as_slice(), file, 1)?;
	Ok(())
}

pub fn read_dataset(path: &PathBuf) -> Result<CandleSet> {
	let file = File::open(path)
		.with_context(|| anyhow!("Unable to open archive \"{}\"", path.display()))?;
	let mut buffer = Vec::<u8>::new();
	zstd::stream::copy_decode(file, &mut buffer)?;
	let raw: RawDataset = unsafe { rkyv::from_bytes_unchecked(&buffer)? };
	raw.to_set()
}

impl RawDataset {
	pub fn from_set(set: &CandleSet) -> RawDataset {
		RawDataset {
			instrument: set.instrument.name.clone(),
			start: set.start,
			time_frame: set.time_frame,
			scale: set.scale,
			candles: set.candles.clone(),
			valid_words: set.valid.words().clone(),
			slots: set.slots() as u64,
			duplicates: set.duplicates,
			out_of_range: set.out_of_range,
			bad_lines: set.bad_lines
		}
	}

	pub fn to_set(&self) -> Result<CandleSet> {
		let instrument = get_instrument(&self.instrument)?;
		let slots = self.slots as usize;
		if self.candles.len() != slots {
			bail!("Archive holds {} candles for {slots} slots", self.candles.len());
		}
		let valid = Bitmap::from_words(self.valid_words.clone(), slots)?;
		let mut set = CandleSet {
			instrument,
			start: self.start,
			time_frame: self.time_frame,
			scale: self.scale,
			candles: self.candles.clone(),
			valid,
			gaps: Vec::new(),
			duplicates: self.duplicates,
			out_of_range: self.out_of_range,
			bad_lines: self.bad_lines
		};
		set.build_gap_report();
		Ok(set)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn file_name_recognition() {
		let (symbol, time_frame) = parse_dataset_file_name("DAT_ASCII_EURUSD_M1_2025.csv").unwrap();
		assert_eq!(symbol, "EURUSD");
		assert_eq!(time_frame, TIME_FRAME_M1);
		let (_, time_frame) = parse_dataset_file_name("DAT_ASCII_GBPUSD_H1.csv").unwrap();
		assert_eq!(time_frame, TIME_FRAME_H1);
		assert!(parse_dataset_file_name("EURUSD_M1.csv").is_none());
		assert!(parse_dataset_file_name("DAT_ASCII_EURUSD_M5_2025.csv").is_none());
	}

	#[test]
	fn timestamp_parsing() {
		// 2025-01-01 17:00:00 EST is 22:00:00 UTC
		let time = parse_est_timestamp("20250101 170000").unwrap();
		assert_eq!(time, 1_735_768_800);
		assert!(parse_est_timestamp("20250101 170030").is_none());
		assert!(parse_est_timestamp("not a time").is_none());
	}

	#[test]
	fn price_parsing() {
		assert_eq!(parse_scaled_price("1.035030", PRICE_SCALE), Some(1_035_030));
		assert_eq!(parse_scaled_price(" 1.035030 ", PRICE_SCALE), Some(1_035_030));
		assert_eq!(parse_scaled_price("1.0350", PRICE_SCALE), None);
		assert_eq!(parse_scaled_price("1035030", PRICE_SCALE), None);
		assert_eq!(parse_scaled_price("-1.035030", PRICE_SCALE), None);
		assert_eq!(parse_scaled_price("x.y", PRICE_SCALE), None);
	}

	#[test]
	fn row_parsing() {
		let row = parse_row("20250101 170000;1.035030;1.035080;1.035010;1.035050;0", PRICE_SCALE).unwrap();
		assert_eq!(row.time, 1_735_768_800);
		assert_eq!(row.candle.o, 1_035_030);
		assert_eq!(row.candle.h, 1_035_080);
		assert_eq!(row.candle.l, 1_035_010);
		assert_eq!(row.candle.c, 1_035_050);
		assert!(parse_row("20250101 170000;1.035030;1.035080;1.035010", PRICE_SCALE).is_none());
	}

	#[test]
	fn header_detection() {
		assert!(is_header("time;open;high;low;close;volume"));
		assert!(is_header("Time;Open;High;Low;Close;Volume"));
		assert!(!is_header("20250101 170000;1.0;1.0;1.0;1.0;0"));
	}

	#[test]
	fn decimal_places_of_scale() {
		assert_eq!(decimal_places(1_000_000), Some(6));
		assert_eq!(decimal_places(100), Some(2));
		assert_eq!(decimal_places(12345), None);
	}
}
