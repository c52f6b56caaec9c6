//! Performance metrics computed once from a finished ledger.

use chrono::{DateTime, Utc};

use super::ledger::Ledger;
use super::order::Order;

const SECONDS_PER_DAY: f64 = 86_400.0;
const SECONDS_PER_HOUR: f64 = 3_600.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub breakeven_trades: usize,
    /// Percent of closed trades with positive profit.
    pub win_rate: f64,
    /// Sum of positive profits.
    pub total_profit: f64,
    /// Sum of negative profits (zero or negative).
    pub total_loss: f64,
    /// |total_profit / total_loss|, infinite when there are no losses.
    pub profit_factor: f64,
    pub net_profit: f64,
    pub net_profit_percentage: f64,
    pub average_profit: f64,
    pub average_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    /// Largest peak-to-trough decline of the post-sell balance, in percent.
    pub max_drawdown: f64,
    pub trades_per_day: f64,
    pub average_holding_hours: f64,
    pub final_balance: f64,
}

impl Metrics {
    /// `None` when the ledger holds no closed trades.
    pub fn compute(ledger: &Ledger) -> Option<Self> {
        let initial_balance = ledger.initial_balance();

        let mut winning_trades = 0usize;
        let mut losing_trades = 0usize;
        let mut breakeven_trades = 0usize;
        let mut total_profit = 0.0_f64;
        let mut total_loss = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut balances = vec![initial_balance];

        for sell in ledger.sells() {
            let profit = sell.profit;
            if profit > 0.0 {
                winning_trades += 1;
                total_profit += profit;
                largest_win = largest_win.max(profit);
            } else if profit < 0.0 {
                losing_trades += 1;
                total_loss += profit;
                largest_loss = largest_loss.min(profit);
            } else {
                breakeven_trades += 1;
            }
            balances.push(sell.balance_after);
        }

        let total_trades = winning_trades + losing_trades + breakeven_trades;
        if total_trades == 0 {
            return None;
        }

        let win_rate = winning_trades as f64 / total_trades as f64 * 100.0;

        let profit_factor = if total_loss == 0.0 {
            f64::INFINITY
        } else {
            (total_profit / total_loss).abs()
        };

        let net_profit = total_profit + total_loss;
        let net_profit_percentage = if initial_balance > 0.0 {
            net_profit / initial_balance * 100.0
        } else {
            0.0
        };

        let average_profit = if winning_trades > 0 {
            total_profit / winning_trades as f64
        } else {
            0.0
        };
        let average_loss = if losing_trades > 0 {
            total_loss / losing_trades as f64
        } else {
            0.0
        };

        let span_days = trading_span_days(ledger.orders());
        let trades_per_day = if span_days > 0.0 {
            total_trades as f64 / span_days
        } else {
            0.0
        };

        Some(Metrics {
            total_trades,
            winning_trades,
            losing_trades,
            breakeven_trades,
            win_rate,
            total_profit,
            total_loss,
            profit_factor,
            net_profit,
            net_profit_percentage,
            average_profit,
            average_loss,
            largest_win,
            largest_loss,
            max_drawdown: compute_max_drawdown(&balances),
            trades_per_day,
            average_holding_hours: average_holding_hours(ledger.orders()),
            final_balance: ledger.balance(),
        })
    }
}

/// Maximum of `(running_max - balance) / running_max * 100` over the trajectory.
pub fn compute_max_drawdown(balances: &[f64]) -> f64 {
    let Some(&first) = balances.first() else {
        return 0.0;
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &balance in balances {
        peak = peak.max(balance);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - balance) / peak * 100.0);
        }
    }
    max_dd
}

/// Days between the earliest and latest order; zero with fewer than two.
pub fn trading_span_days(orders: &[Order]) -> f64 {
    if orders.len() < 2 {
        return 0.0;
    }
    let timestamps = orders.iter().map(Order::timestamp);
    let (Some(earliest), Some(latest)) = (timestamps.clone().min(), timestamps.max()) else {
        return 0.0;
    };
    (latest - earliest).num_seconds() as f64 / SECONDS_PER_DAY
}

fn average_holding_hours(orders: &[Order]) -> f64 {
    let mut opened: Option<DateTime<Utc>> = None;
    let mut total_hours = 0.0_f64;
    let mut round_trips = 0usize;

    for order in orders {
        match order {
            Order::Buy(buy) => opened = Some(buy.timestamp),
            Order::Sell(sell) => {
                if let Some(entry) = opened.take() {
                    total_hours += (sell.timestamp - entry).num_seconds() as f64 / SECONDS_PER_HOUR;
                    round_trips += 1;
                }
            }
        }
    }

    if round_trips > 0 {
        total_hours / round_trips as f64
    } else {
        0.0
    }
}
