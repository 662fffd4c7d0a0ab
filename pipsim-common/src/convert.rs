use crate::error::EngineError;
use crate::instrument::Instrument;
use crate::tick::TickStore;

/*
Resolves the factor that converts an amount in the instrument's quote
currency into the account currency. Only single-hop conversions are
supported: either the quote currency already is the account currency, or
the base currency is and the latest mid rate is inverted. Anything else
would require a cross rate through a third pair and is rejected.
*/
pub fn quote_to_account_rate(instrument: &Instrument, account_currency: &str, ticks: &TickStore) -> Result<f64, EngineError> {
	if instrument.quote_currency == account_currency {
		return Ok(1.0);
	}
	if instrument.base_currency == account_currency {
		let tick = ticks.get(&instrument.name)
			.ok_or_else(|| EngineError::NoPrice(instrument.name.clone()))?;
		return Ok(1.0 / tick.mid());
	}
	Err(EngineError::CrossNotImplemented {
		quote: instrument.quote_currency.clone(),
		account: account_currency.to_string()
	})
}

pub fn pips_between(instrument: &Instrument, from: f64, to: f64) -> f64 {
	(to - from) / instrument.pip_size()
}

pub fn price_offset(instrument: &Instrument, price: f64, pips: f64) -> f64 {
	price + pips * instrument.pip_size()
}
