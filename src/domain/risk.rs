//! Stop-loss and take-profit level calculation.
//!
//! Static levels apply the configured base percentages directly. Dynamic levels
//! widen the stop with volatility (ATR relative to price) and the target with
//! trend strength, then clamp both to fixed bands.

pub const DEFAULT_STOP_LOSS_PCT: f64 = 0.02;
pub const DEFAULT_TAKE_PROFIT_PCT: f64 = 0.03;

pub const MIN_STOP_LOSS_PCT: f64 = 0.005;
pub const MAX_STOP_LOSS_PCT: f64 = 0.05;
pub const MIN_TAKE_PROFIT_PCT: f64 = 0.01;
pub const MAX_TAKE_PROFIT_PCT: f64 = 0.10;

/// ATR stand-in, as a fraction of price, when no ATR is available yet.
pub const FALLBACK_ATR_PCT: f64 = 0.02;

/// Percentage gap between the short and long moving averages.
pub fn trend_strength(ma_short: f64, ma_long: f64) -> f64 {
    (ma_short - ma_long) / ma_long * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskLevels {
    pub stop_loss: f64,
    pub take_profit: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskManager {
    /// Fraction, e.g. 0.02 for 2%.
    pub base_stop_loss_pct: f64,
    /// Fraction, e.g. 0.03 for 3%.
    pub base_take_profit_pct: f64,
}

impl Default for RiskManager {
    fn default() -> Self {
        RiskManager::new(DEFAULT_STOP_LOSS_PCT, DEFAULT_TAKE_PROFIT_PCT)
    }
}

impl RiskManager {
    pub fn new(base_stop_loss_pct: f64, base_take_profit_pct: f64) -> Self {
        RiskManager {
            base_stop_loss_pct,
            base_take_profit_pct,
        }
    }

    /// (stop_loss, take_profit) at the base percentages.
    pub fn static_levels(&self, entry_price: f64) -> (f64, f64) {
        (
            entry_price * (1.0 - self.base_stop_loss_pct),
            entry_price * (1.0 + self.base_take_profit_pct),
        )
    }

    pub fn dynamic_levels(
        &self,
        current_price: f64,
        atr: Option<f64>,
        trend_strength: f64,
    ) -> RiskLevels {
        let atr = atr.unwrap_or(current_price * FALLBACK_ATR_PCT);
        let volatility_factor = atr / current_price;

        let sl_multiplier = 1.0 + volatility_factor * 10.0;
        let tp_multiplier = 1.0 + trend_strength.abs() / 100.0;

        let stop_loss_pct =
            (self.base_stop_loss_pct * sl_multiplier).clamp(MIN_STOP_LOSS_PCT, MAX_STOP_LOSS_PCT);
        let take_profit_pct = (self.base_take_profit_pct * tp_multiplier)
            .clamp(MIN_TAKE_PROFIT_PCT, MAX_TAKE_PROFIT_PCT);

        RiskLevels {
            stop_loss: current_price * (1.0 - stop_loss_pct),
            take_profit: current_price * (1.0 + take_profit_pct),
            stop_loss_pct,
            take_profit_pct,
        }
    }
}
