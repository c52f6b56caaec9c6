//! Domain error types.

/// Top-level error type for crossbot.
#[derive(Debug, thiserror::Error)]
pub enum CrossbotError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("no candle data for {symbol}")]
    NoData { symbol: String },

    #[error("execution failed for {side} order: {reason}")]
    ExecutionFailed { side: String, reason: String },

    #[error("notification failed: {reason}")]
    Notification { reason: String },

    #[error("order persistence failed: {reason}")]
    Persistence { reason: String },

    #[error("invalid position: {reason}")]
    InvalidPosition { reason: String },

    #[error("ledger rejected order: {reason}")]
    LedgerViolation { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<&CrossbotError> for std::process::ExitCode {
    fn from(err: &CrossbotError) -> Self {
        let code: u8 = match err {
            CrossbotError::Io(_) | CrossbotError::Json(_) | CrossbotError::Persistence { .. } => 1,
            CrossbotError::ConfigParse { .. }
            | CrossbotError::ConfigMissing { .. }
            | CrossbotError::ConfigInvalid { .. } => 2,
            CrossbotError::DataSource { .. } | CrossbotError::NoData { .. } => 3,
            CrossbotError::ExecutionFailed { .. } | CrossbotError::Notification { .. } => 4,
            CrossbotError::InvalidPosition { .. } | CrossbotError::LedgerViolation { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
