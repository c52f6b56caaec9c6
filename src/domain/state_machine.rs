//! Position state machine: the per-candle decision core.
//!
//! States are `Flat` (no position) and `Long` (one open position). Each call to
//! [`step`] consumes the current [`SimulationState`] and returns the next one.
//!
//! - Flat → Long when the short MA is above the long MA, was below it two bars
//!   earlier, and the close is above both.
//! - Long → Flat on the first matching entry of [`EXIT_PRIORITY`].
//! - Long with no exit: the stop trails upward, the target widens only while
//!   trend strength exceeds [`TAKE_PROFIT_TRAIL_THRESHOLD`].
//!
//! State only changes after the execution port confirms a fill. A failed
//! execution leaves the state untouched and is reported to the notifier.

use tracing::{debug, info, warn};

use crate::domain::candle::Candle;
use crate::domain::error::CrossbotError;
use crate::domain::indicator::IndicatorFrame;
use crate::domain::ledger::Ledger;
use crate::domain::order::{BuyOrder, ExitReason, Order, SellOrder, Side};
use crate::domain::position::Position;
use crate::domain::risk::{trend_strength, RiskManager};
use crate::ports::execution_port::{ExecutionPort, Fill, FillStatus, OrderRequest};
use crate::ports::notification_port::NotificationPort;
use crate::ports::order_store_port::OrderStore;

/// Share of the current balance committed on entry.
pub const POSITION_SIZE_FRACTION: f64 = 0.99;

/// Trend strength (percent) below which an open position is closed.
pub const WEAK_TREND_THRESHOLD: f64 = 0.05;

/// Trend strength (percent) above which the take-profit may be raised.
pub const TAKE_PROFIT_TRAIL_THRESHOLD: f64 = 0.1;

/// Exit checks in evaluation order. The first match wins.
pub const EXIT_PRIORITY: [ExitReason; 5] = [
    ExitReason::StopLoss,
    ExitReason::TakeProfit,
    ExitReason::Downtrend,
    ExitReason::WeakTrend,
    ExitReason::PriceBelowShortMa,
];

/// Collaborators the state machine calls through.
pub struct Ports<'a> {
    pub executor: &'a mut dyn ExecutionPort,
    pub notifier: &'a dyn NotificationPort,
    pub store: Option<&'a mut dyn OrderStore>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    pub position: Option<Position>,
    pub ledger: Ledger,
}

impl SimulationState {
    pub fn new(initial_balance: f64) -> Self {
        SimulationState {
            position: None,
            ledger: Ledger::new(initial_balance),
        }
    }

    pub fn is_long(&self) -> bool {
        self.position.is_some()
    }

    pub fn balance(&self) -> f64 {
        self.ledger.balance()
    }
}

/// Inputs for one decision: the candle, its indicators, and the indicators two
/// bars earlier (absent for the first two evaluated bars).
#[derive(Debug, Clone, Copy)]
pub struct BarContext<'a> {
    pub candle: &'a Candle,
    pub frame: &'a IndicatorFrame,
    pub lagged: Option<&'a IndicatorFrame>,
}

/// Crossover confirmed two bars back, with the close above both averages.
pub fn entry_signal(ctx: &BarContext<'_>) -> bool {
    let (Some(ma_short), Some(ma_long)) = (ctx.frame.ma_short, ctx.frame.ma_long) else {
        return false;
    };
    let Some((lag_short, lag_long)) = ctx.lagged.and_then(|f| f.ma_short.zip(f.ma_long)) else {
        return false;
    };
    let close = ctx.candle.close;

    ma_short > ma_long && lag_short < lag_long && close > ma_short && close > ma_long
}

fn exit_triggered(
    reason: ExitReason,
    position: &Position,
    close: f64,
    ma_short: f64,
    ma_long: f64,
    strength: f64,
) -> bool {
    match reason {
        ExitReason::StopLoss => position.should_stop_loss(close),
        ExitReason::TakeProfit => position.should_take_profit(close),
        ExitReason::Downtrend => ma_short < ma_long,
        ExitReason::WeakTrend => strength < WEAK_TREND_THRESHOLD,
        ExitReason::PriceBelowShortMa => close < ma_short,
    }
}

/// First exit in [`EXIT_PRIORITY`] that holds on this bar.
pub fn exit_signal(position: &Position, ctx: &BarContext<'_>) -> Option<ExitReason> {
    let (ma_short, ma_long) = ctx.frame.ma_short.zip(ctx.frame.ma_long)?;
    let strength = trend_strength(ma_short, ma_long);
    let close = ctx.candle.close;

    EXIT_PRIORITY
        .iter()
        .copied()
        .find(|&reason| exit_triggered(reason, position, close, ma_short, ma_long, strength))
}

/// Ratchet the open position's levels. The stop only rises; the target only
/// rises, and only while trend strength exceeds the trail threshold.
pub fn trail_levels(
    mut position: Position,
    ctx: &BarContext<'_>,
    risk: &RiskManager,
    strength: f64,
) -> Position {
    let levels = risk.dynamic_levels(ctx.candle.close, ctx.frame.atr, strength);

    if levels.stop_loss > position.stop_loss {
        debug!(
            from = position.stop_loss,
            to = levels.stop_loss,
            "trailing stop raised"
        );
        position.stop_loss = levels.stop_loss;
    }
    if strength > TAKE_PROFIT_TRAIL_THRESHOLD && levels.take_profit > position.take_profit {
        debug!(
            from = position.take_profit,
            to = levels.take_profit,
            "take profit raised"
        );
        position.take_profit = levels.take_profit;
    }
    position
}

/// Advance the simulation by one candle.
///
/// Bars whose frame lacks either moving average are skipped unchanged.
/// Errors are returned only for broken invariants (ledger or position);
/// execution, notification and persistence failures are absorbed.
pub fn step(
    state: SimulationState,
    ctx: &BarContext<'_>,
    risk: &RiskManager,
    ports: &mut Ports<'_>,
) -> Result<SimulationState, CrossbotError> {
    let Some(strength) = ctx.frame.trend_strength() else {
        debug!(timestamp = %ctx.candle.timestamp, "insufficient history, skipping bar");
        return Ok(state);
    };

    let SimulationState { position, ledger } = state;
    match position {
        None => enter(ledger, ctx, risk, strength, ports),
        Some(position) => match exit_signal(&position, ctx) {
            Some(reason) => exit(ledger, position, reason, ctx, ports),
            None => Ok(SimulationState {
                position: Some(trail_levels(position, ctx, risk, strength)),
                ledger,
            }),
        },
    }
}

fn enter(
    mut ledger: Ledger,
    ctx: &BarContext<'_>,
    risk: &RiskManager,
    strength: f64,
    ports: &mut Ports<'_>,
) -> Result<SimulationState, CrossbotError> {
    if !entry_signal(ctx) {
        return Ok(SimulationState {
            position: None,
            ledger,
        });
    }

    let price = ctx.candle.close;
    let timestamp = ctx.candle.timestamp;
    let balance = ledger.balance();
    let request = OrderRequest {
        side: Side::Buy,
        quantity: balance * POSITION_SIZE_FRACTION / price,
        reference_price: price,
        timestamp,
    };

    let fill = match execute(&request, ports) {
        Ok(fill) => fill,
        Err(e) => {
            report_failure(ports, "buy", &e);
            return Ok(SimulationState {
                position: None,
                ledger,
            });
        }
    };

    let levels = risk.dynamic_levels(fill.avg_price, ctx.frame.atr, strength);
    let position = Position::open(
        fill.avg_price,
        fill.executed_qty,
        levels.stop_loss,
        levels.take_profit,
        timestamp,
    )?;

    let order = Order::Buy(BuyOrder::new(
        fill.order_id,
        timestamp,
        fill.avg_price,
        fill.executed_qty,
        balance,
        levels.stop_loss,
        levels.take_profit,
    ));
    ledger.record(order.clone())?;

    info!(
        price = position.entry_price,
        amount = position.amount,
        stop_loss = position.stop_loss,
        take_profit = position.take_profit,
        "buy executed"
    );
    persist(ports, &order);
    notify(
        ports,
        &format!(
            "🟢 Buy order executed\nPrice: {:.2}\nStop Loss: {:.2}\nTake Profit: {:.2}",
            position.entry_price, position.stop_loss, position.take_profit
        ),
    );

    Ok(SimulationState {
        position: Some(position),
        ledger,
    })
}

fn exit(
    mut ledger: Ledger,
    position: Position,
    reason: ExitReason,
    ctx: &BarContext<'_>,
    ports: &mut Ports<'_>,
) -> Result<SimulationState, CrossbotError> {
    let timestamp = ctx.candle.timestamp;
    let request = OrderRequest {
        side: Side::Sell,
        quantity: position.amount,
        reference_price: ctx.candle.close,
        timestamp,
    };

    let fill = match execute(&request, ports) {
        Ok(fill) => fill,
        Err(e) => {
            report_failure(ports, "sell", &e);
            return Ok(SimulationState {
                position: Some(position),
                ledger,
            });
        }
    };

    let sell = SellOrder::new(
        fill.order_id,
        timestamp,
        fill.avg_price,
        position.amount,
        position.entry_price,
        reason,
        ledger.balance(),
    );
    info!(
        price = sell.price,
        profit = sell.profit,
        reason = %reason,
        "sell executed"
    );
    let message = format!(
        "🔴 Sell order executed ({reason})\nPrice: {:.2}\nProfit: {:.2} ({:.2}%)",
        sell.price, sell.profit, sell.profit_percentage
    );

    let order = Order::Sell(sell);
    ledger.record(order.clone())?;
    persist(ports, &order);
    notify(ports, &message);

    Ok(SimulationState {
        position: None,
        ledger,
    })
}

fn execute(request: &OrderRequest, ports: &mut Ports<'_>) -> Result<Fill, CrossbotError> {
    let fill = ports.executor.place_order(request)?;
    if fill.status != FillStatus::Filled || fill.executed_qty.is_nan() || fill.executed_qty <= 0.0 {
        return Err(CrossbotError::ExecutionFailed {
            side: request.side.to_string(),
            reason: format!(
                "order {} not filled (status {:?}, qty {})",
                fill.order_id, fill.status, fill.executed_qty
            ),
        });
    }
    if !fill.avg_price.is_finite() || fill.avg_price <= 0.0 {
        return Err(CrossbotError::ExecutionFailed {
            side: request.side.to_string(),
            reason: format!("order {} filled at invalid price {}", fill.order_id, fill.avg_price),
        });
    }
    Ok(fill)
}

fn report_failure(ports: &Ports<'_>, action: &str, err: &CrossbotError) {
    warn!(error = %err, "{action} order failed, state unchanged");
    notify(ports, &format!("❌ Error executing {action} order: {err}"));
}

fn notify(ports: &Ports<'_>, message: &str) {
    if let Err(e) = ports.notifier.notify(message) {
        warn!(error = %e, "notification dropped");
    }
}

fn persist(ports: &mut Ports<'_>, order: &Order) {
    if let Some(store) = ports.store.as_mut() {
        if let Err(e) = store.save_order(order) {
            warn!(error = %e, order_id = order.order_id(), "order not persisted");
        }
    }
}
