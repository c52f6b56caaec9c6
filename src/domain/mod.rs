//! Core domain types and logic.

pub mod candle;
pub mod indicator;
pub mod risk;
pub mod position;
pub mod order;
pub mod ledger;
pub mod state_machine;
pub mod metrics;
pub mod backtest;
pub mod config_validation;
pub mod error;
