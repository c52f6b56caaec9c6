#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashSet;

use chrono::{DateTime, Duration, TimeZone, Utc};
use crossbot::adapters::simulated_execution::SimulatedExecution;
use crossbot::domain::backtest::{run_backtest, BacktestResult, StrategyConfig};
pub use crossbot::domain::candle::Candle;
use crossbot::domain::error::CrossbotError;
use crossbot::domain::order::Order;
use crossbot::domain::state_machine::Ports;
use crossbot::ports::execution_port::{ExecutionPort, Fill, FillStatus, OrderRequest};
use crossbot::ports::notification_port::NotificationPort;
use crossbot::ports::order_store_port::OrderStore;

/// Index of the bar where [`crossover_closes`] confirms its entry.
pub const CROSSOVER_ENTRY_BAR: usize = 32;

pub struct RecordingNotifier {
    pub messages: RefCell<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            messages: RefCell::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }
}

impl NotificationPort for RecordingNotifier {
    fn notify(&self, message: &str) -> Result<(), CrossbotError> {
        self.messages.borrow_mut().push(message.to_string());
        Ok(())
    }
}

pub struct FailingNotifier;

impl NotificationPort for FailingNotifier {
    fn notify(&self, _message: &str) -> Result<(), CrossbotError> {
        Err(CrossbotError::Notification {
            reason: "channel unavailable".into(),
        })
    }
}

/// Simulated execution that rejects the listed calls (1-based).
pub struct FailingExecution {
    inner: SimulatedExecution,
    fail_on: HashSet<usize>,
    calls: usize,
}

impl FailingExecution {
    pub fn failing_calls(calls: &[usize]) -> Self {
        Self {
            inner: SimulatedExecution::new(),
            fail_on: calls.iter().copied().collect(),
            calls: 0,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl ExecutionPort for FailingExecution {
    fn place_order(&mut self, request: &OrderRequest) -> Result<Fill, CrossbotError> {
        self.calls += 1;
        if self.fail_on.contains(&self.calls) {
            return Err(CrossbotError::ExecutionFailed {
                side: request.side.to_string(),
                reason: format!("rejected call {}", self.calls),
            });
        }
        self.inner.place_order(request)
    }
}

/// Confirms every order as filled at a fixed price.
pub struct FixedPriceExecution {
    price: f64,
    calls: usize,
}

impl FixedPriceExecution {
    pub fn at(price: f64) -> Self {
        Self { price, calls: 0 }
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl ExecutionPort for FixedPriceExecution {
    fn place_order(&mut self, request: &OrderRequest) -> Result<Fill, CrossbotError> {
        self.calls += 1;
        Ok(Fill {
            order_id: format!("fixed-{}", self.calls),
            executed_qty: request.quantity,
            avg_price: self.price,
            status: FillStatus::Filled,
        })
    }
}

#[derive(Default)]
pub struct MemoryOrderStore {
    pub orders: Vec<Order>,
    pub fail: bool,
}

impl MemoryOrderStore {
    pub fn failing() -> Self {
        Self {
            orders: Vec::new(),
            fail: true,
        }
    }
}

impl OrderStore for MemoryOrderStore {
    fn save_order(&mut self, order: &Order) -> Result<(), CrossbotError> {
        if self.fail {
            return Err(CrossbotError::Persistence {
                reason: "disk full".into(),
            });
        }
        self.orders.push(order.clone());
        Ok(())
    }

    fn all_orders(&self) -> Result<Vec<Order>, CrossbotError> {
        Ok(self.orders.clone())
    }
}

pub fn ts(bar: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(15 * bar as i64)
}

pub fn make_candle(bar: usize, close: f64) -> Candle {
    Candle {
        timestamp: ts(bar),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 10.0,
    }
}

pub fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_candle(i, c))
        .collect()
}

/// A steady decline from 130 to 101 followed by a jump to 140. With the
/// default 9/21/14 periods the short MA crosses above the long MA at bar 32,
/// while two bars earlier it was still below.
pub fn crossover_closes() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..30).map(|i| 130.0 - i as f64).collect();
    closes.extend([140.0; 3]);
    closes
}

/// An oscillating series with slow drift that produces several round trips.
pub fn wave_closes(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| {
            let x = i as f64;
            100.0 + 10.0 * (x / 8.0).sin() + 0.05 * x
        })
        .collect()
}

pub fn run_simulated(candles: &[Candle], config: &StrategyConfig) -> (BacktestResult, Vec<String>) {
    let mut executor = SimulatedExecution::new();
    let notifier = RecordingNotifier::new();
    let mut ports = Ports {
        executor: &mut executor,
        notifier: &notifier,
        store: None,
    };
    let result = run_backtest(candles, config, &mut ports).unwrap();
    (result, notifier.messages())
}

/// Panics unless every order moves the balance by exactly its cost or
/// revenue and chains from the previous order's balance.
pub fn assert_balance_chain(initial: f64, orders: &[Order]) {
    let mut balance = initial;
    for order in orders {
        assert!(
            (order.balance_before() - balance).abs() < 1e-9,
            "order {} starts from {} but running balance is {}",
            order.order_id(),
            order.balance_before(),
            balance
        );
        match order {
            Order::Buy(b) => {
                assert!((b.balance_after - (b.balance_before - b.cost)).abs() < 1e-9)
            }
            Order::Sell(s) => {
                assert!((s.balance_after - (s.balance_before + s.revenue)).abs() < 1e-9)
            }
        }
        assert!(order.balance_after() >= 0.0);
        balance = order.balance_after();
    }
}
