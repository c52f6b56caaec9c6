//! The single open long position.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::CrossbotError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub entry_price: f64,
    pub amount: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    /// Open a position, enforcing `stop_loss < entry_price < take_profit`
    /// and `amount > 0`.
    pub fn open(
        entry_price: f64,
        amount: f64,
        stop_loss: f64,
        take_profit: f64,
        opened_at: DateTime<Utc>,
    ) -> Result<Self, CrossbotError> {
        if amount.is_nan() || amount <= 0.0 {
            return Err(CrossbotError::InvalidPosition {
                reason: format!("amount must be positive, got {amount}"),
            });
        }
        if !(stop_loss < entry_price && entry_price < take_profit) {
            return Err(CrossbotError::InvalidPosition {
                reason: format!(
                    "levels must bracket entry: stop {stop_loss}, entry {entry_price}, target {take_profit}"
                ),
            });
        }
        Ok(Position {
            entry_price,
            amount,
            stop_loss,
            take_profit,
            opened_at,
        })
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.amount * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.amount * (price - self.entry_price)
    }

    pub fn should_stop_loss(&self, price: f64) -> bool {
        price <= self.stop_loss
    }

    pub fn should_take_profit(&self, price: f64) -> bool {
        price >= self.take_profit
    }
}
