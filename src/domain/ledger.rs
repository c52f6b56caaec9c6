//! Append-only trade ledger and running account balance.

use crate::domain::error::CrossbotError;
use crate::domain::order::{Order, SellOrder};

/// Balances are recomputed with the same arithmetic on both sides, so any
/// drift larger than this means the order was built from a stale balance.
const BALANCE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    initial_balance: f64,
    balance: f64,
    orders: Vec<Order>,
}

impl Ledger {
    pub fn new(initial_balance: f64) -> Self {
        Ledger {
            initial_balance,
            balance: initial_balance,
            orders: Vec::new(),
        }
    }

    /// Append an order and apply its balance change. The only mutation path.
    pub fn record(&mut self, order: Order) -> Result<(), CrossbotError> {
        if let Some(last) = self.orders.last() {
            if order.timestamp() < last.timestamp() {
                return Err(CrossbotError::LedgerViolation {
                    reason: format!(
                        "order {} at {} precedes last recorded order at {}",
                        order.order_id(),
                        order.timestamp(),
                        last.timestamp()
                    ),
                });
            }
        }

        let before = order.balance_before();
        let drift = (before - self.balance).abs();
        if drift.is_nan() || drift > BALANCE_TOLERANCE * self.balance.abs().max(1.0) {
            return Err(CrossbotError::LedgerViolation {
                reason: format!(
                    "order {} expects balance {before}, ledger holds {}",
                    order.order_id(),
                    self.balance
                ),
            });
        }

        let delta = order.balance_delta();
        if !delta.is_finite() {
            return Err(CrossbotError::LedgerViolation {
                reason: format!("order {} moves balance by {delta}", order.order_id()),
            });
        }

        self.balance += delta;
        self.orders.push(order);
        Ok(())
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn initial_balance(&self) -> f64 {
        self.initial_balance
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn sells(&self) -> impl Iterator<Item = &SellOrder> {
        self.orders.iter().filter_map(Order::as_sell)
    }

    pub fn last_order(&self) -> Option<&Order> {
        self.orders.last()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn into_orders(self) -> Vec<Order> {
        self.orders
    }
}
