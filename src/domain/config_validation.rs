//! Configuration validation.
//!
//! Checks every recognised key before a run. Absent keys fall back to their
//! defaults and are not errors; present keys must parse and be in range.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::error::CrossbotError;
use crate::domain::indicator::{DEFAULT_ATR_PERIOD, DEFAULT_LONG_PERIOD, DEFAULT_SHORT_PERIOD};
use crate::ports::config_port::ConfigPort;

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), CrossbotError> {
    validate_periods(config)?;
    validate_percent(config, "stop_loss")?;
    validate_percent(config, "take_profit")?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), CrossbotError> {
    validate_initial_balance(config)?;
    validate_dates(config)?;
    Ok(())
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or RFC 3339.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> CrossbotError {
    CrossbotError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn parse_key<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, CrossbotError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("cannot parse '{raw}'"))),
    }
}

fn validate_periods(config: &dyn ConfigPort) -> Result<(), CrossbotError> {
    let short = parse_key::<i64>(config, "strategy", "short_period")?
        .unwrap_or(DEFAULT_SHORT_PERIOD as i64);
    let long = parse_key::<i64>(config, "strategy", "long_period")?
        .unwrap_or(DEFAULT_LONG_PERIOD as i64);
    let atr = parse_key::<i64>(config, "strategy", "atr_period")?
        .unwrap_or(DEFAULT_ATR_PERIOD as i64);

    if short < 1 {
        return Err(invalid("strategy", "short_period", "short_period must be at least 1"));
    }
    if long <= short {
        return Err(invalid(
            "strategy",
            "long_period",
            format!("long_period ({long}) must exceed short_period ({short})"),
        ));
    }
    if atr < 1 {
        return Err(invalid("strategy", "atr_period", "atr_period must be at least 1"));
    }
    Ok(())
}

fn validate_percent(config: &dyn ConfigPort, key: &str) -> Result<(), CrossbotError> {
    if let Some(value) = parse_key::<f64>(config, "strategy", key)? {
        if !value.is_finite() || value <= 0.0 || value >= 100.0 {
            return Err(invalid(
                "strategy",
                key,
                format!("{key} must be a percentage between 0 and 100"),
            ));
        }
    }
    Ok(())
}

fn validate_initial_balance(config: &dyn ConfigPort) -> Result<(), CrossbotError> {
    if let Some(value) = parse_key::<f64>(config, "backtest", "initial_balance")? {
        if !value.is_finite() || value <= 0.0 {
            return Err(invalid(
                "backtest",
                "initial_balance",
                "initial_balance must be positive",
            ));
        }
    }
    Ok(())
}

fn parse_date_key(
    config: &dyn ConfigPort,
    key: &str,
) -> Result<Option<DateTime<Utc>>, CrossbotError> {
    match config.get_string("backtest", key) {
        None => Ok(None),
        Some(raw) => parse_datetime(&raw).map(Some).ok_or_else(|| {
            invalid(
                "backtest",
                key,
                format!("invalid {key} '{raw}', expected YYYY-MM-DD or RFC 3339"),
            )
        }),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), CrossbotError> {
    let start = parse_date_key(config, "start_date")?;
    let end = parse_date_key(config, "end_date")?;

    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(invalid(
                "backtest",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok(())
}
