//! In-process execution for backtests: every order fills immediately at the
//! reference price.

use tracing::debug;

use crate::domain::error::CrossbotError;
use crate::ports::execution_port::{ExecutionPort, Fill, FillStatus, OrderRequest};

#[derive(Debug, Default)]
pub struct SimulatedExecution {
    next_id: u64,
}

impl SimulatedExecution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of orders filled so far.
    pub fn filled(&self) -> u64 {
        self.next_id
    }
}

impl ExecutionPort for SimulatedExecution {
    fn place_order(&mut self, request: &OrderRequest) -> Result<Fill, CrossbotError> {
        if !request.reference_price.is_finite() || request.reference_price <= 0.0 {
            return Err(CrossbotError::ExecutionFailed {
                side: request.side.to_string(),
                reason: format!("invalid reference price {}", request.reference_price),
            });
        }

        self.next_id += 1;
        let fill = Fill {
            order_id: format!("sim-{}", self.next_id),
            executed_qty: request.quantity,
            avg_price: request.reference_price,
            status: FillStatus::Filled,
        };
        debug!(
            order_id = %fill.order_id,
            side = %request.side,
            qty = fill.executed_qty,
            price = fill.avg_price,
            "simulated fill"
        );
        Ok(fill)
    }
}
