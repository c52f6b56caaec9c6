//! Backtest replay driver.
//!
//! Computes indicator frames for the whole candle window, drops warm-up rows,
//! then folds [`step`] over the rest. Metrics are computed once at the end.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::domain::candle::Candle;
use crate::domain::error::CrossbotError;
use crate::domain::indicator::{
    compute_frames, IndicatorConfig, IndicatorFrame, DEFAULT_ATR_PERIOD, DEFAULT_LONG_PERIOD,
    DEFAULT_SHORT_PERIOD,
};
use crate::domain::metrics::Metrics;
use crate::domain::order::Order;
use crate::domain::position::Position;
use crate::domain::risk::{RiskManager, DEFAULT_STOP_LOSS_PCT, DEFAULT_TAKE_PROFIT_PCT};
use crate::domain::state_machine::{step, BarContext, Ports, SimulationState};

pub const DEFAULT_INITIAL_BALANCE: f64 = 1000.0;

/// Bars between the evaluated frame and the frame used to confirm a crossover.
pub const CROSSOVER_LAG: usize = 2;

/// Strategy parameters. Percentages are fractions (0.02 = 2%).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyConfig {
    pub short_period: usize,
    pub long_period: usize,
    pub atr_period: usize,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub initial_balance: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            short_period: DEFAULT_SHORT_PERIOD,
            long_period: DEFAULT_LONG_PERIOD,
            atr_period: DEFAULT_ATR_PERIOD,
            stop_loss_pct: DEFAULT_STOP_LOSS_PCT,
            take_profit_pct: DEFAULT_TAKE_PROFIT_PCT,
            initial_balance: DEFAULT_INITIAL_BALANCE,
        }
    }
}

impl StrategyConfig {
    pub fn indicator_config(&self) -> IndicatorConfig {
        IndicatorConfig {
            short_period: self.short_period,
            long_period: self.long_period,
            atr_period: self.atr_period,
        }
    }

    pub fn risk_manager(&self) -> RiskManager {
        RiskManager::new(self.stop_loss_pct, self.take_profit_pct)
    }

    /// Candles needed before the first decision can be made.
    pub fn warmup(&self) -> usize {
        self.indicator_config().warmup()
    }
}

/// Everything a run needs besides the candles themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub strategy: StrategyConfig,
    pub symbol: String,
    pub interval: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub orders: Vec<Order>,
    pub final_balance: f64,
    pub open_position: Option<Position>,
    pub metrics: Option<Metrics>,
    pub candles_processed: usize,
    pub candles_skipped: usize,
    /// Close of the final candle, used to mark an open position.
    pub last_close: Option<f64>,
}

impl BacktestResult {
    /// Balance plus the open position marked at `price`.
    pub fn equity(&self, price: f64) -> f64 {
        self.final_balance
            + self
                .open_position
                .as_ref()
                .map_or(0.0, |p| p.market_value(price))
    }
}

/// Replay `candles` (time-ordered) through the strategy.
///
/// Warm-up candles are skipped and counted, not treated as errors. A position
/// still open after the last candle is returned as-is.
pub fn run_backtest(
    candles: &[Candle],
    config: &StrategyConfig,
    ports: &mut Ports<'_>,
) -> Result<BacktestResult, CrossbotError> {
    let risk = config.risk_manager();
    let frames = compute_frames(candles, &config.indicator_config());

    let ready: Vec<(&Candle, &IndicatorFrame)> = candles
        .iter()
        .zip(frames.iter())
        .filter(|(_, frame)| frame.is_ready())
        .collect();
    let skipped = candles.len() - ready.len();

    if ready.is_empty() {
        warn!(
            candles = candles.len(),
            warmup = config.warmup(),
            "not enough candles to evaluate any signal"
        );
    } else {
        debug!(evaluated = ready.len(), skipped, "starting replay");
    }

    let mut state = SimulationState::new(config.initial_balance);
    for (i, &(candle, frame)) in ready.iter().enumerate() {
        let lagged = i.checked_sub(CROSSOVER_LAG).map(|j| ready[j].1);
        let ctx = BarContext {
            candle,
            frame,
            lagged,
        };
        state = step(state, &ctx, &risk, ports)?;
    }

    let SimulationState { position, ledger } = state;
    let metrics = Metrics::compute(&ledger);
    let final_balance = ledger.balance();

    info!(
        orders = ledger.len(),
        final_balance,
        open_position = position.is_some(),
        "replay finished"
    );

    Ok(BacktestResult {
        orders: ledger.into_orders(),
        final_balance,
        open_position: position,
        metrics,
        candles_processed: ready.len(),
        candles_skipped: skipped,
        last_close: candles.last().map(|c| c.close),
    })
}
