//! Indicator calculator.
//!
//! Derives per-candle rolling values from the candle stream:
//! - `ma_short`: mean close over the trailing `short_period` candles
//! - `ma_long`: mean close over the trailing `long_period` candles
//! - `true_range`: high-low, widened by the gap to the previous close
//! - `atr`: mean true range over the trailing `atr_period` candles
//!
//! Windowed values are `None` until enough history exists. Frames are produced
//! once per candle and never revised.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::domain::candle::Candle;
use crate::domain::risk::trend_strength;

pub const DEFAULT_SHORT_PERIOD: usize = 9;
pub const DEFAULT_LONG_PERIOD: usize = 21;
pub const DEFAULT_ATR_PERIOD: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorConfig {
    pub short_period: usize,
    pub long_period: usize,
    pub atr_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        IndicatorConfig {
            short_period: DEFAULT_SHORT_PERIOD,
            long_period: DEFAULT_LONG_PERIOD,
            atr_period: DEFAULT_ATR_PERIOD,
        }
    }
}

impl IndicatorConfig {
    /// Number of candles needed before a frame carries every indicator.
    pub fn warmup(&self) -> usize {
        self.long_period.max(self.atr_period)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFrame {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub ma_short: Option<f64>,
    pub ma_long: Option<f64>,
    pub true_range: f64,
    pub atr: Option<f64>,
}

impl IndicatorFrame {
    pub fn is_ready(&self) -> bool {
        self.ma_short.is_some() && self.ma_long.is_some() && self.atr.is_some()
    }

    pub fn trend_strength(&self) -> Option<f64> {
        match (self.ma_short, self.ma_long) {
            (Some(short), Some(long)) => Some(trend_strength(short, long)),
            _ => None,
        }
    }
}

/// Fixed-size trailing window yielding its mean once full.
///
/// The mean is summed from the window contents on every push so it matches a
/// direct recompute over the same slice bit for bit.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    period: usize,
    values: VecDeque<f64>,
}

impl RollingWindow {
    pub fn new(period: usize) -> Self {
        RollingWindow {
            period,
            values: VecDeque::with_capacity(period),
        }
    }

    pub fn push(&mut self, value: f64) -> Option<f64> {
        if self.period == 0 {
            return None;
        }
        if self.values.len() == self.period {
            self.values.pop_front();
        }
        self.values.push_back(value);
        self.mean()
    }

    pub fn is_full(&self) -> bool {
        self.period > 0 && self.values.len() == self.period
    }

    pub fn mean(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.period as f64)
    }
}

/// Stateful calculator fed one candle at a time.
#[derive(Debug, Clone)]
pub struct IndicatorCalculator {
    short: RollingWindow,
    long: RollingWindow,
    atr: RollingWindow,
    prev_close: Option<f64>,
}

impl IndicatorCalculator {
    pub fn new(config: &IndicatorConfig) -> Self {
        IndicatorCalculator {
            short: RollingWindow::new(config.short_period),
            long: RollingWindow::new(config.long_period),
            atr: RollingWindow::new(config.atr_period),
            prev_close: None,
        }
    }

    pub fn next(&mut self, candle: &Candle) -> IndicatorFrame {
        let true_range = candle.true_range(self.prev_close);
        self.prev_close = Some(candle.close);

        IndicatorFrame {
            timestamp: candle.timestamp,
            close: candle.close,
            ma_short: self.short.push(candle.close),
            ma_long: self.long.push(candle.close),
            true_range,
            atr: self.atr.push(true_range),
        }
    }
}

/// One frame per candle, in input order.
pub fn compute_frames(candles: &[Candle], config: &IndicatorConfig) -> Vec<IndicatorFrame> {
    let mut calculator = IndicatorCalculator::new(config);
    candles.iter().map(|c| calculator.next(c)).collect()
}
