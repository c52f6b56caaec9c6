//! Port traits the core calls through.

pub mod candle_source;
pub mod config_port;
pub mod execution_port;
pub mod notification_port;
pub mod order_store_port;
