//! Notification sink port trait.

use crate::domain::error::CrossbotError;

/// Fire-and-forget message sink. Callers log and discard failures.
pub trait NotificationPort {
    fn notify(&self, message: &str) -> Result<(), CrossbotError>;
}
