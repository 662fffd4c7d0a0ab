use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
	#[error("no price cached for {0}")]
	NoPrice(String),
	#[error("unknown instrument \"{0}\"")]
	UnknownInstrument(String),
	#[error("trade {0} does not exist")]
	NotFound(u64),
	#[error("trade {0} is already closed")]
	AlreadyClosed(u64),
	#[error("conversion from {quote} to {account} requires an unsupported cross-currency hop")]
	CrossNotImplemented {
		quote: String,
		account: String
	},
	#[error("invalid order: {0}")]
	InvalidOrder(String),
	#[error("journal failure: {0}")]
	Journal(String),
	// Set after a journal failure left the in-memory state ahead of the journal;
	// all further mutating operations are rejected
	#[error("engine is tainted after a journal failure")]
	Tainted,
}
