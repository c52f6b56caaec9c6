//! CLI definition and dispatch.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::adapters::csv_adapter::CsvCandleSource;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_order_store::JsonOrderStore;
use crate::adapters::log_notifier::LogNotifier;
use crate::adapters::simulated_execution::SimulatedExecution;
use crate::domain::backtest::{
    run_backtest, BacktestConfig, BacktestResult, StrategyConfig, DEFAULT_INITIAL_BALANCE,
};
use crate::domain::config_validation::{
    parse_datetime, validate_backtest_config, validate_strategy_config,
};
use crate::domain::error::CrossbotError;
use crate::domain::indicator::{DEFAULT_ATR_PERIOD, DEFAULT_LONG_PERIOD, DEFAULT_SHORT_PERIOD};
use crate::domain::order::Order;
use crate::domain::risk::{DEFAULT_STOP_LOSS_PCT, DEFAULT_TAKE_PROFIT_PCT};
use crate::domain::state_machine::Ports;
use crate::ports::candle_source::CandleSource;
use crate::ports::config_port::ConfigPort;
use crate::ports::order_store_port::OrderStore;

pub const DEFAULT_SYMBOL: &str = "BTCUSDT";
pub const DEFAULT_INTERVAL: &str = "15m";

#[derive(Parser, Debug)]
#[command(name = "crossbot", about = "Moving-average crossover backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a candle file through the strategy
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Candle CSV, overrides [backtest] data_file
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Order history JSON, overrides [backtest] orders_file
        #[arg(short, long)]
        orders: Option<PathBuf>,
        /// Append to the existing order history instead of replacing it
        #[arg(long)]
        append: bool,
        /// Print every executed order
        #[arg(long)]
        trades: bool,
        /// Also write logs to this file
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest {
            config,
            data,
            orders,
            append,
            trades,
            log_file,
        } => init_logging(log_file.as_deref()).and_then(|()| {
            let (bt_config, result) =
                execute_backtest(&config, data.as_deref(), orders.as_deref(), append)?;
            print_summary(&bt_config, &result);
            if trades {
                print_trades(&result.orders);
            }
            Ok(())
        }),
        Command::Validate { config } => init_logging(None).and_then(|()| run_validate(&config)),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Install the stderr subscriber (`RUST_LOG`, default `info`) and an optional
/// plain-text file layer. A subscriber that is already installed is kept.
pub fn init_logging(log_file: Option<&Path>) -> Result<(), CrossbotError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();
    Ok(())
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, CrossbotError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

/// Build strategy parameters from a validated config. Percent keys are
/// converted to fractions.
pub fn build_strategy_config(config: &dyn ConfigPort) -> StrategyConfig {
    let period = |key: &str, default: usize| {
        usize::try_from(config.get_int("strategy", key, default as i64)).unwrap_or(default)
    };
    StrategyConfig {
        short_period: period("short_period", DEFAULT_SHORT_PERIOD),
        long_period: period("long_period", DEFAULT_LONG_PERIOD),
        atr_period: period("atr_period", DEFAULT_ATR_PERIOD),
        stop_loss_pct: config.get_double("strategy", "stop_loss", DEFAULT_STOP_LOSS_PCT * 100.0)
            / 100.0,
        take_profit_pct: config.get_double(
            "strategy",
            "take_profit",
            DEFAULT_TAKE_PROFIT_PCT * 100.0,
        ) / 100.0,
        initial_balance: config.get_double("backtest", "initial_balance", DEFAULT_INITIAL_BALANCE),
    }
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, CrossbotError> {
    let date = |key: &str| -> Result<_, CrossbotError> {
        config
            .get_string("backtest", key)
            .map(|raw| {
                parse_datetime(&raw).ok_or_else(|| CrossbotError::ConfigInvalid {
                    section: "backtest".into(),
                    key: key.into(),
                    reason: format!("invalid date '{raw}'"),
                })
            })
            .transpose()
    };

    Ok(BacktestConfig {
        strategy: build_strategy_config(config),
        symbol: config
            .get_string("backtest", "symbol")
            .unwrap_or_else(|| DEFAULT_SYMBOL.to_string()),
        interval: config
            .get_string("backtest", "interval")
            .unwrap_or_else(|| DEFAULT_INTERVAL.to_string()),
        start: date("start_date")?,
        end: date("end_date")?,
    })
}

/// Load, validate and run a backtest from a config file. With `append` the
/// orders are added to the existing history file rather than replacing it.
pub fn execute_backtest(
    config_path: &Path,
    data_override: Option<&Path>,
    orders_override: Option<&Path>,
    append: bool,
) -> Result<(BacktestConfig, BacktestResult), CrossbotError> {
    let adapter = load_config(config_path)?;
    validate_strategy_config(&adapter)?;
    validate_backtest_config(&adapter)?;
    let bt_config = build_backtest_config(&adapter)?;

    let data_path = data_override
        .map(Path::to_path_buf)
        .or_else(|| adapter.get_string("backtest", "data_file").map(PathBuf::from))
        .ok_or_else(|| CrossbotError::ConfigMissing {
            section: "backtest".into(),
            key: "data_file".into(),
        })?;
    let orders_path = orders_override
        .map(Path::to_path_buf)
        .or_else(|| adapter.get_string("backtest", "orders_file").map(PathBuf::from));

    let source = CsvCandleSource::new(data_path, bt_config.symbol.clone())
        .with_window(bt_config.start, bt_config.end);
    info!(source = %source.describe(), interval = %bt_config.interval, "fetching candles");
    let candles = source.fetch_candles()?;

    if candles.is_empty() {
        return Err(CrossbotError::NoData {
            symbol: bt_config.symbol.clone(),
        });
    }
    let minimum = bt_config.strategy.warmup();
    if candles.len() < minimum {
        warn!(
            symbol = %bt_config.symbol,
            candles = candles.len(),
            minimum,
            "fewer candles than the indicator warm-up, no signal will be evaluated"
        );
    }

    let mut store = orders_path
        .map(|path| {
            if append {
                JsonOrderStore::open(path)
            } else {
                JsonOrderStore::create(path)
            }
        })
        .transpose()?;
    let mut executor = SimulatedExecution::new();
    let notifier = LogNotifier::with_channel(bt_config.symbol.clone());
    let mut ports = Ports {
        executor: &mut executor,
        notifier: &notifier,
        store: store.as_mut().map(|s| s as &mut dyn OrderStore),
    };

    info!(
        symbol = %bt_config.symbol,
        candles = candles.len(),
        short = bt_config.strategy.short_period,
        long = bt_config.strategy.long_period,
        "running backtest"
    );
    let result = run_backtest(&candles, &bt_config.strategy, &mut ports)?;

    if let Some(store) = &store {
        info!(
            path = %store.path().display(),
            orders = store.all_orders()?.len(),
            "order history written"
        );
    }
    Ok((bt_config, result))
}

fn run_validate(config_path: &Path) -> Result<(), CrossbotError> {
    let adapter = load_config(config_path)?;
    validate_strategy_config(&adapter)?;
    validate_backtest_config(&adapter)?;
    let bt_config = build_backtest_config(&adapter)?;
    let s = &bt_config.strategy;

    println!("Configuration is valid.");
    println!("  symbol:        {} ({})", bt_config.symbol, bt_config.interval);
    println!(
        "  moving averages: {} / {}, ATR {}",
        s.short_period, s.long_period, s.atr_period
    );
    println!("  stop loss:     {:.2}%", s.stop_loss_pct * 100.0);
    println!("  take profit:   {:.2}%", s.take_profit_pct * 100.0);
    println!("  balance:       {:.2}", s.initial_balance);
    Ok(())
}

fn print_summary(config: &BacktestConfig, result: &BacktestResult) {
    println!("\n=== Backtest: {} {} ===", config.symbol, config.interval);
    println!(
        "Candles:          {} evaluated, {} warm-up",
        result.candles_processed, result.candles_skipped
    );
    println!("Initial Balance:  {:.2}", config.strategy.initial_balance);
    println!("Final Balance:    {:.2}", result.final_balance);

    if let Some(position) = &result.open_position {
        println!(
            "Open Position:    {:.6} @ {:.2} (SL {:.2}, TP {:.2})",
            position.amount, position.entry_price, position.stop_loss, position.take_profit
        );
        if let Some(close) = result.last_close {
            println!(
                "Unrealized P/L:   {:.2} at {:.2}",
                position.unrealized_pnl(close),
                close
            );
            println!("Equity:           {:.2}", result.equity(close));
        }
    }

    let Some(m) = &result.metrics else {
        println!("No closed trades.");
        return;
    };

    println!("\n--- General ---");
    println!("Total Trades:     {}", m.total_trades);
    println!(
        "Wins/Losses/Even: {}/{}/{}",
        m.winning_trades, m.losing_trades, m.breakeven_trades
    );
    println!("Win Rate:         {:.2}%", m.win_rate);
    println!("Trades per Day:   {:.2}", m.trades_per_day);
    println!("Avg Holding:      {:.1}h", m.average_holding_hours);

    println!("\n--- Profit/Loss ---");
    println!("Total Profit:     {:.2}", m.total_profit);
    println!("Total Loss:       {:.2}", m.total_loss);
    println!(
        "Net Profit:       {:.2} ({:.2}%)",
        m.net_profit, m.net_profit_percentage
    );
    println!("Average Win:      {:.2}", m.average_profit);
    println!("Average Loss:     {:.2}", m.average_loss);
    println!("Largest Win:      {:.2}", m.largest_win);
    println!("Largest Loss:     {:.2}", m.largest_loss);

    println!("\n--- Risk ---");
    if m.profit_factor.is_infinite() {
        println!("Profit Factor:    inf");
    } else {
        println!("Profit Factor:    {:.2}", m.profit_factor);
    }
    println!("Max Drawdown:     {:.2}%", m.max_drawdown);
}

fn print_trades(orders: &[Order]) {
    println!("\n--- Orders ---");
    for order in orders {
        match order {
            Order::Buy(b) => println!(
                "{}  BUY   {:>12.6} @ {:>10.2}  SL {:.2}  TP {:.2}  balance {:.2}",
                b.timestamp.format("%Y-%m-%d %H:%M"),
                b.amount,
                b.price,
                b.stop_loss,
                b.take_profit,
                b.balance_after
            ),
            Order::Sell(s) => println!(
                "{}  SELL  {:>12.6} @ {:>10.2}  P/L {:.2} ({:.2}%)  {}  balance {:.2}",
                s.timestamp.format("%Y-%m-%d %H:%M"),
                s.amount,
                s.price,
                s.profit,
                s.profit_percentage,
                s.reason,
                s.balance_after
            ),
        }
    }
}
