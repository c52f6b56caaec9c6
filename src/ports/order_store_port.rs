//! Order persistence port trait.

use crate::domain::error::CrossbotError;
use crate::domain::order::Order;

pub trait OrderStore {
    fn save_order(&mut self, order: &Order) -> Result<(), CrossbotError>;

    fn all_orders(&self) -> Result<Vec<Order>, CrossbotError>;

    fn last_order(&self) -> Result<Option<Order>, CrossbotError> {
        Ok(self.all_orders()?.pop())
    }
}
