//! Order execution port trait.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::CrossbotError;
use crate::domain::order::Side;

/// A market order for `quantity` units. `reference_price` is the close of the
/// candle that produced the signal.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub side: Side,
    pub quantity: f64,
    pub reference_price: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FillStatus {
    Filled,
    Rejected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub order_id: String,
    pub executed_qty: f64,
    pub avg_price: f64,
    pub status: FillStatus,
}

/// Places orders and blocks until the fill is known. Failures are reported as
/// [`CrossbotError::ExecutionFailed`].
pub trait ExecutionPort {
    fn place_order(&mut self, request: &OrderRequest) -> Result<Fill, CrossbotError>;
}
