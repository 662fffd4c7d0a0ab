use anyhow::{bail, Result};
use chrono::{DateTime, Datelike, Weekday};
use rkyv::{Archive, Deserialize, Serialize};
use strum_macros::Display;

use crate::instrument::Instrument;
use crate::price::Price;

pub const TIME_FRAME_M1: u32 = 60;
pub const TIME_FRAME_H1: u32 = 3600;

const MINUTES_PER_HOUR: usize = 60;
const DAY_SECONDS: i64 = 86_400;
const SUSPICIOUS_GAP_SECONDS: i64 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct Candle {
	pub o: Price,
	pub h: Price,
	pub l: Price,
	pub c: Price,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum GapKind {
	#[strum(serialize = "weekend")]
	Weekend,
	#[strum(serialize = "suspicious")]
	Suspicious,
	#[strum(serialize = "minor")]
	Minor
}

// A maximal run of missing slots in the dense grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gap {
	pub index: usize,
	pub length: usize,
	// Unix seconds of the first missing slot
	pub time: i64,
	pub kind: GapKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandleSetStats {
	pub total: usize,
	pub present: usize,
	pub missing: usize,
	pub gaps: usize,
	pub weekend_gaps: usize,
	pub suspicious_gaps: usize,
	// Length of the longest run of missing slots, in slots
	pub longest_gap: usize,
}

// One validity bit per slot in the grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
	words: Vec<u64>,
	len: usize,
}

/*
A dense OHLC timeline for a single instrument.

Every slot between "start" and the last observed bar exists in "candles",
whether or not data was available for it; the bitmap records which slots
actually hold a bar. Consumers must go through the iterator or candle()
so that missing slots are never read.
*/
pub struct CandleSet {
	pub instrument: &'static Instrument,
	// Unix seconds, aligned to the time frame
	pub start: i64,
	// Seconds per slot
	pub time_frame: u32,
	pub scale: u32,
	pub(crate) candles: Vec<Candle>,
	pub(crate) valid: Bitmap,
	pub gaps: Vec<Gap>,
	pub duplicates: u32,
	pub out_of_range: u32,
	pub bad_lines: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct SlotRef<'a> {
	pub index: usize,
	// Unix seconds of the slot
	pub time: i64,
	pub candle: &'a Candle,
}

pub struct CandleIter<'a> {
	set: &'a CandleSet,
	index: usize,
}

impl Bitmap {
	pub fn new(len: usize) -> Bitmap {
		Bitmap {
			words: vec![0u64; len.div_ceil(64)],
			len
		}
	}

	pub fn from_words(words: Vec<u64>, len: usize) -> Result<Bitmap> {
		if words.len() != len.div_ceil(64) {
			bail!("Bitmap length {len} does not match {} words", words.len());
		}
		Ok(Bitmap {
			words,
			len
		})
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	pub fn set(&mut self, index: usize) {
		self.words[index / 64] |= 1u64 << (index % 64);
	}

	pub fn get(&self, index: usize) -> bool {
		if index >= self.len {
			return false;
		}
		self.words[index / 64] & (1u64 << (index % 64)) != 0
	}

	pub fn count(&self) -> usize {
		self.words
			.iter()
			.map(|x| x.count_ones() as usize)
			.sum()
	}

	pub fn words(&self) -> &Vec<u64> {
		&self.words
	}
}

fn classify_gap(length: usize, time_frame: u32, time: i64) -> GapKind {
	let duration = (length as i64) * (time_frame as i64);
	if duration >= DAY_SECONDS {
		let weekday = DateTime::from_timestamp(time, 0)
			.map(|x| x.weekday());
		return match weekday {
			Some(Weekday::Fri | Weekday::Sat | Weekday::Sun) => GapKind::Weekend,
			_ => GapKind::Suspicious
		};
	}
	if duration >= SUSPICIOUS_GAP_SECONDS {
		GapKind::Suspicious
	} else {
		GapKind::Minor
	}
}

impl CandleSet {
	pub fn new_empty(instrument: &'static Instrument, start: i64, time_frame: u32, scale: u32, slots: usize) -> CandleSet {
		let empty = Candle {
			o: 0,
			h: 0,
			l: 0,
			c: 0
		};
		CandleSet {
			instrument,
			start,
			time_frame,
			scale,
			candles: vec![empty; slots],
			valid: Bitmap::new(slots),
			gaps: Vec::new(),
			duplicates: 0,
			out_of_range: 0,
			bad_lines: 0
		}
	}

	pub fn slots(&self) -> usize {
		self.candles.len()
	}

	pub fn time_at(&self, index: usize) -> i64 {
		self.start + (index as i64) * (self.time_frame as i64)
	}

	pub fn is_valid(&self, index: usize) -> bool {
		self.valid.get(index)
	}

	pub fn candle(&self, index: usize) -> Option<&Candle> {
		if self.valid.get(index) {
			Some(&self.candles[index])
		} else {
			None
		}
	}

	pub fn set_candle(&mut self, index: usize, candle: Candle) {
		self.candles[index] = candle;
		self.valid.set(index);
	}

	pub fn present(&self) -> usize {
		self.valid.count()
	}

	// Linear scan collecting maximal runs of missing slots
	pub fn build_gap_report(&mut self) {
		let mut gaps = Vec::new();
		let mut run_start: Option<usize> = None;
		for index in 0..=self.slots() {
			let missing = index < self.slots() && !self.valid.get(index);
			match (run_start, missing) {
				(None, true) => run_start = Some(index),
				(Some(first), false) => {
					let length = index - first;
					let time = self.time_at(first);
					gaps.push(Gap {
						index: first,
						length,
						time,
						kind: classify_gap(length, self.time_frame, time)
					});
					run_start = None;
				},
				_ => ()
			}
		}
		self.gaps = gaps;
	}

	pub fn stats(&self) -> CandleSetStats {
		let present = self.present();
		CandleSetStats {
			total: self.slots(),
			present,
			missing: self.slots() - present,
			gaps: self.gaps.len(),
			weekend_gaps: self.gaps
				.iter()
				.filter(|x| x.kind == GapKind::Weekend)
				.count(),
			suspicious_gaps: self.gaps
				.iter()
				.filter(|x| x.kind == GapKind::Suspicious)
				.count(),
			longest_gap: self.gaps
				.iter()
				.map(|x| x.length)
				.max()
				.unwrap_or(0)
		}
	}

	pub fn iter(&self) -> CandleIter {
		CandleIter {
			set: self,
			index: 0
		}
	}

	/*
	Folds minute bars into hour bars: open of the first valid minute, close
	of the last, high/low across all valid minutes. An hour is only marked
	valid when at least min_valid of its minutes are present.
	*/
	pub fn aggregate_h1(&self, min_valid: u32) -> Result<CandleSet> {
		if self.time_frame != TIME_FRAME_M1 {
			bail!("H1 aggregation requires M1 input, got a {} second time frame", self.time_frame);
		}
		let min_valid = min_valid.clamp(1, MINUTES_PER_HOUR as u32) as usize;
		let hour = TIME_FRAME_H1 as i64;
		let output_start = self.start - self.start.rem_euclid(hour);
		let end = self.start + (self.slots() as i64) * (TIME_FRAME_M1 as i64);
		let output_slots = ((end - output_start + hour - 1) / hour) as usize;
		let mut output = CandleSet::new_empty(self.instrument, output_start, TIME_FRAME_H1, self.scale, output_slots);
		for hour_index in 0..output_slots {
			let hour_time = output_start + (hour_index as i64) * hour;
			let mut folded: Option<Candle> = None;
			let mut valid_minutes = 0;
			for minute in 0..MINUTES_PER_HOUR {
				let slot_time = hour_time + (minute as i64) * (TIME_FRAME_M1 as i64);
				if slot_time < self.start {
					continue;
				}
				let index = ((slot_time - self.start) / (TIME_FRAME_M1 as i64)) as usize;
				if index >= self.slots() {
					break;
				}
				if !self.valid.get(index) {
					continue;
				}
				let minute_candle = self.candles[index];
				valid_minutes += 1;
				folded = Some(match folded {
					None => minute_candle,
					Some(current) => Candle {
						o: current.o,
						h: current.h.max(minute_candle.h),
						l: current.l.min(minute_candle.l),
						c: minute_candle.c
					}
				});
			}
			if valid_minutes >= min_valid {
				if let Some(candle) = folded {
					output.set_candle(hour_index, candle);
				}
			}
		}
		output.build_gap_report();
		Ok(output)
	}
}

impl<'a> Iterator for CandleIter<'a> {
	type Item = SlotRef<'a>;

	fn next(&mut self) -> Option<SlotRef<'a>> {
		while self.index < self.set.slots() {
			let index = self.index;
			self.index += 1;
			if self.set.valid.get(index) {
				return Some(SlotRef {
					index,
					time: self.set.time_at(index),
					candle: &self.set.candles[index]
				});
			}
		}
		None
	}
}

pub fn time_frame_label(time_frame: u32) -> String {
	match time_frame {
		TIME_FRAME_M1 => "M1".to_string(),
		TIME_FRAME_H1 => "H1".to_string(),
		other => format!("{other}s")
	}
}
