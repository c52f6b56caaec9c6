//! Property tests for replay invariants.
//!
//! Uses proptest to verify:
//! 1. Single position: orders alternate Buy/Sell and at most one is open
//! 2. Balance accounting: each order moves the balance by its cost or revenue
//! 3. Trailing monotonicity: an open position's stop never moves down
//! 4. Determinism: the same candles and config give the same result
//! 5. Exit priority: stop loss wins whenever it holds

mod common;

use common::*;
use crossbot::adapters::simulated_execution::SimulatedExecution;
use crossbot::domain::backtest::StrategyConfig;
use crossbot::domain::indicator::{compute_frames, IndicatorFrame};
use crossbot::domain::order::{ExitReason, Side};
use crossbot::domain::position::Position;
use crossbot::domain::state_machine::{exit_signal, step, BarContext, Ports, SimulationState};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_closes() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.03..0.03_f64, 25..250).prop_map(|returns| {
        let mut price = 100.0;
        returns
            .into_iter()
            .map(|r| {
                price *= 1.0 + r;
                (price * 100.0).round() / 100.0
            })
            .collect()
    })
}

fn arb_config() -> impl Strategy<Value = StrategyConfig> {
    (2usize..6, 1usize..15, 2usize..15, 0.005..0.05_f64, 0.01..0.10_f64).prop_map(
        |(short, extra, atr, sl, tp)| StrategyConfig {
            short_period: short,
            long_period: short + extra,
            atr_period: atr,
            stop_loss_pct: sl,
            take_profit_pct: tp,
            initial_balance: 1000.0,
        },
    )
}

fn to_candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            timestamp: ts(i),
            open: close,
            high: close * 1.005,
            low: close * 0.995,
            close,
            volume: 1.0,
        })
        .collect()
}

// ── 1. Single position ───────────────────────────────────────────────

proptest! {
    #[test]
    fn orders_alternate_starting_with_buy(closes in arb_closes(), config in arb_config()) {
        let (result, _) = run_simulated(&to_candles(&closes), &config);

        for (i, order) in result.orders.iter().enumerate() {
            let expected = if i % 2 == 0 { Side::Buy } else { Side::Sell };
            prop_assert_eq!(order.side(), expected);
        }
        let open = result.orders.len() % 2 == 1;
        prop_assert_eq!(result.open_position.is_some(), open);
    }
}

// ── 2. Balance accounting ────────────────────────────────────────────

proptest! {
    #[test]
    fn balance_chain_holds(closes in arb_closes(), config in arb_config()) {
        let (result, _) = run_simulated(&to_candles(&closes), &config);

        let mut balance = config.initial_balance;
        for order in &result.orders {
            prop_assert!((order.balance_before() - balance).abs() < 1e-9);
            prop_assert!((order.balance_after() - (balance + order.balance_delta())).abs() < 1e-9);
            prop_assert!(order.balance_after() >= 0.0);
            balance = order.balance_after();
        }
        prop_assert!((result.final_balance - balance).abs() < 1e-9);
    }

    #[test]
    fn metrics_are_consistent(closes in arb_closes(), config in arb_config()) {
        let (result, _) = run_simulated(&to_candles(&closes), &config);
        let sells = result.orders.iter().filter(|o| o.side() == Side::Sell).count();

        match &result.metrics {
            None => prop_assert_eq!(sells, 0),
            Some(m) => {
                prop_assert_eq!(m.total_trades, sells);
                prop_assert_eq!(m.winning_trades + m.losing_trades + m.breakeven_trades, sells);
                prop_assert!((0.0..=100.0).contains(&m.win_rate));
                prop_assert!((0.0..=100.0).contains(&m.max_drawdown));
                prop_assert!(m.profit_factor >= 0.0);
                prop_assert!((m.net_profit - (m.total_profit + m.total_loss)).abs() < 1e-9);
            }
        }
    }
}

// ── 3. Trailing monotonicity ─────────────────────────────────────────

proptest! {
    #[test]
    fn stop_never_moves_down_while_open(closes in arb_closes(), config in arb_config()) {
        let candles = to_candles(&closes);
        let frames = compute_frames(&candles, &config.indicator_config());
        let ready: Vec<(&Candle, &IndicatorFrame)> = candles
            .iter()
            .zip(frames.iter())
            .filter(|(_, f)| f.is_ready())
            .collect();

        let risk = config.risk_manager();
        let mut executor = SimulatedExecution::new();
        let notifier = RecordingNotifier::new();
        let mut ports = Ports {
            executor: &mut executor,
            notifier: &notifier,
            store: None,
        };

        let mut state = SimulationState::new(config.initial_balance);
        let mut previous: Option<Position> = None;
        for (i, &(candle, frame)) in ready.iter().enumerate() {
            let ctx = BarContext {
                candle,
                frame,
                lagged: i.checked_sub(2).map(|j| ready[j].1),
            };
            state = step(state, &ctx, &risk, &mut ports).unwrap();

            if let (Some(before), Some(after)) = (&previous, &state.position) {
                if before.opened_at == after.opened_at {
                    prop_assert!(after.stop_loss >= before.stop_loss);
                    prop_assert!(after.take_profit >= before.take_profit);
                }
            }
            previous = state.position.clone();
        }
    }
}

// ── 4. Determinism ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn replay_is_deterministic(closes in arb_closes(), config in arb_config()) {
        let candles = to_candles(&closes);
        let (a, notes_a) = run_simulated(&candles, &config);
        let (b, notes_b) = run_simulated(&candles, &config);

        prop_assert_eq!(&a.orders, &b.orders);
        prop_assert_eq!(&a.metrics, &b.metrics);
        prop_assert_eq!(notes_a, notes_b);
        prop_assert_eq!(a.candles_processed, b.candles_processed);
    }
}

// ── 5. Exit priority ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn stop_loss_wins_whenever_it_holds(
        close in 50.0..150.0_f64,
        above in 0.0..10.0_f64,
        below in 0.0..10.0_f64,
        ma_short in 50.0..150.0_f64,
        ma_long in 50.0..150.0_f64,
    ) {
        // Stop at or above the close and target at or below it: both trigger.
        let position = Position {
            entry_price: close,
            amount: 1.0,
            stop_loss: close + above,
            take_profit: close - below,
            opened_at: ts(0),
        };
        let candle = make_candle(1, close);
        let frame = IndicatorFrame {
            timestamp: ts(1),
            close,
            ma_short: Some(ma_short),
            ma_long: Some(ma_long),
            true_range: 2.0,
            atr: Some(2.0),
        };
        let ctx = BarContext {
            candle: &candle,
            frame: &frame,
            lagged: None,
        };
        prop_assert_eq!(exit_signal(&position, &ctx), Some(ExitReason::StopLoss));
    }
}
