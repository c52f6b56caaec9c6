//! Executed orders recorded in the ledger.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Why a position was closed, in the order exits are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    #[serde(rename = "Stop Loss")]
    StopLoss,
    #[serde(rename = "Take Profit")]
    TakeProfit,
    #[serde(rename = "Downtrend")]
    Downtrend,
    #[serde(rename = "Weak Trend")]
    WeakTrend,
    #[serde(rename = "Price Below Short MA")]
    PriceBelowShortMa,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExitReason::StopLoss => "Stop Loss",
            ExitReason::TakeProfit => "Take Profit",
            ExitReason::Downtrend => "Downtrend",
            ExitReason::WeakTrend => "Weak Trend",
            ExitReason::PriceBelowShortMa => "Price Below Short MA",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyOrder {
    pub order_id: String,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub amount: f64,
    pub cost: f64,
    pub balance_before: f64,
    pub balance_after: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl BuyOrder {
    pub fn new(
        order_id: String,
        timestamp: DateTime<Utc>,
        price: f64,
        amount: f64,
        balance_before: f64,
        stop_loss: f64,
        take_profit: f64,
    ) -> Self {
        let cost = amount * price;
        BuyOrder {
            order_id,
            timestamp,
            price,
            amount,
            cost,
            balance_before,
            balance_after: balance_before - cost,
            stop_loss,
            take_profit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellOrder {
    pub order_id: String,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub amount: f64,
    pub revenue: f64,
    pub profit: f64,
    pub profit_percentage: f64,
    pub reason: ExitReason,
    pub balance_before: f64,
    pub balance_after: f64,
}

impl SellOrder {
    pub fn new(
        order_id: String,
        timestamp: DateTime<Utc>,
        price: f64,
        amount: f64,
        entry_price: f64,
        reason: ExitReason,
        balance_before: f64,
    ) -> Self {
        let revenue = amount * price;
        SellOrder {
            order_id,
            timestamp,
            price,
            amount,
            revenue,
            profit: amount * (price - entry_price),
            profit_percentage: (price / entry_price - 1.0) * 100.0,
            reason,
            balance_before,
            balance_after: balance_before + revenue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "side", rename_all = "UPPERCASE")]
pub enum Order {
    Buy(BuyOrder),
    Sell(SellOrder),
}

impl Order {
    pub fn side(&self) -> Side {
        match self {
            Order::Buy(_) => Side::Buy,
            Order::Sell(_) => Side::Sell,
        }
    }

    pub fn order_id(&self) -> &str {
        match self {
            Order::Buy(b) => &b.order_id,
            Order::Sell(s) => &s.order_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Order::Buy(b) => b.timestamp,
            Order::Sell(s) => s.timestamp,
        }
    }

    pub fn price(&self) -> f64 {
        match self {
            Order::Buy(b) => b.price,
            Order::Sell(s) => s.price,
        }
    }

    pub fn amount(&self) -> f64 {
        match self {
            Order::Buy(b) => b.amount,
            Order::Sell(s) => s.amount,
        }
    }

    pub fn balance_before(&self) -> f64 {
        match self {
            Order::Buy(b) => b.balance_before,
            Order::Sell(s) => s.balance_before,
        }
    }

    pub fn balance_after(&self) -> f64 {
        match self {
            Order::Buy(b) => b.balance_after,
            Order::Sell(s) => s.balance_after,
        }
    }

    /// Signed change this order applies to the running balance.
    pub fn balance_delta(&self) -> f64 {
        match self {
            Order::Buy(b) => -b.cost,
            Order::Sell(s) => s.revenue,
        }
    }

    pub fn as_sell(&self) -> Option<&SellOrder> {
        match self {
            Order::Sell(s) => Some(s),
            Order::Buy(_) => None,
        }
    }
}
