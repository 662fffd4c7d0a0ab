mod sma;
mod threshold;

pub use sma::SmaCrossStrategy;
pub use threshold::ThresholdStrategy;
