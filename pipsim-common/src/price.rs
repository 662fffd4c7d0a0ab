use anyhow::{bail, Result};

// Prices are stored as signed integers scaled by a power of ten.
// The default scale of 1,000,000 yields six decimal places, which is
// sufficient for fractional pips on all supported currency pairs.
pub type Price = i32;

pub const PRICE_SCALE: u32 = 1_000_000;

pub fn to_float(price: Price, scale: u32) -> f64 {
	(price as f64) / (scale as f64)
}

pub fn from_float(value: f64, scale: u32) -> Price {
	(value * (scale as f64)).round() as Price
}

/*
Returns the size of one pip in scaled price units.
A pip is 10^pip_location price units, e.g. pip_location -4 on EUR/USD
with the default scale yields 100 scaled units per pip.
The pip location must be negative and the scale must be divisible by
the corresponding power of ten, otherwise pip deltas would not be
representable as integers.
*/
pub fn pip_scaled(scale: u32, pip_location: i32) -> Result<u32> {
	if pip_location >= 0 {
		bail!("Invalid pip location {pip_location}, must be negative");
	}
	let exponent = (-pip_location) as u32;
	let Some(divisor) = 10u32.checked_pow(exponent) else {
		bail!("Pip location {pip_location} is out of range");
	};
	if scale % divisor != 0 {
		bail!("Scale {scale} is not divisible by 10^{exponent}");
	}
	let pip = scale / divisor;
	if pip == 0 {
		bail!("Scale {scale} is too small for pip location {pip_location}");
	}
	Ok(pip)
}

pub fn delta_to_pips(delta: i64, units_per_pip: u32) -> f64 {
	(delta as f64) / (units_per_pip as f64)
}

pub fn pips_to_delta(pips: f64, units_per_pip: u32) -> i64 {
	(pips * (units_per_pip as f64)).round() as i64
}
