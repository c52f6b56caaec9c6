//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
pub mod json_order_store;
pub mod log_notifier;
pub mod simulated_execution;
