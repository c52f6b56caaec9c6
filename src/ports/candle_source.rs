//! Candle data port trait.

use crate::domain::candle::Candle;
use crate::domain::error::CrossbotError;

/// A finite, restartable, time-ordered candle sequence. Each call returns the
/// full window from the start.
pub trait CandleSource {
    fn fetch_candles(&self) -> Result<Vec<Candle>, CrossbotError>;

    /// Human-readable label for logs (symbol, file name).
    fn describe(&self) -> String {
        "candles".to_string()
    }
}
