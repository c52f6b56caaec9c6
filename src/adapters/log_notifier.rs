//! Notification sink that writes messages to the log.

use tracing::info;

use crate::domain::error::CrossbotError;
use crate::ports::notification_port::NotificationPort;

#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    channel: Option<String>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag every message with a channel name (e.g. the traded symbol).
    pub fn with_channel(channel: impl Into<String>) -> Self {
        Self {
            channel: Some(channel.into()),
        }
    }
}

impl NotificationPort for LogNotifier {
    fn notify(&self, message: &str) -> Result<(), CrossbotError> {
        // Multi-line messages are flattened so each stays one log record.
        let flat = message.replace('\n', " | ");
        match &self.channel {
            Some(channel) => info!(target: "crossbot::notify", channel = %channel, "{flat}"),
            None => info!(target: "crossbot::notify", "{flat}"),
        }
        Ok(())
    }
}
