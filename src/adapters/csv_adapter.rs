//! CSV candle file adapter.
//!
//! Expected columns: `timestamp,open,high,low,close,volume` with a header row.
//! Timestamps may be epoch milliseconds, RFC 3339, or `YYYY-MM-DD`.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::domain::candle::Candle;
use crate::domain::config_validation::parse_datetime;
use crate::domain::error::CrossbotError;
use crate::ports::candle_source::CandleSource;

pub struct CsvCandleSource {
    path: PathBuf,
    symbol: String,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl CsvCandleSource {
    pub fn new(path: PathBuf, symbol: impl Into<String>) -> Self {
        Self {
            path,
            symbol: symbol.into(),
            start: None,
            end: None,
        }
    }

    /// Restrict output to `start <= timestamp <= end`. Either bound may be open.
    pub fn with_window(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    fn in_window(&self, ts: DateTime<Utc>) -> bool {
        self.start.is_none_or(|s| ts >= s) && self.end.is_none_or(|e| ts <= e)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    match raw.parse::<i64>() {
        Ok(ms) => DateTime::from_timestamp_millis(ms),
        Err(_) => parse_datetime(raw),
    }
}

fn parse_row(record: &csv::StringRecord) -> Result<Candle, String> {
    let field = |idx: usize, name: &str| -> Result<f64, String> {
        let raw = record.get(idx).ok_or_else(|| format!("missing {name} column"))?;
        raw.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid {name} value '{raw}': {e}"))
    };

    let ts_raw = record.get(0).ok_or("missing timestamp column")?;
    let timestamp =
        parse_timestamp(ts_raw).ok_or_else(|| format!("invalid timestamp '{ts_raw}'"))?;

    let candle = Candle {
        timestamp,
        open: field(1, "open")?,
        high: field(2, "high")?,
        low: field(3, "low")?,
        close: field(4, "close")?,
        volume: field(5, "volume")?,
    };

    if !candle.is_well_formed() {
        return Err("non-positive or inconsistent prices".to_string());
    }
    Ok(candle)
}

impl CandleSource for CsvCandleSource {
    fn fetch_candles(&self) -> Result<Vec<Candle>, CrossbotError> {
        let content = fs::read_to_string(&self.path).map_err(|e| CrossbotError::DataSource {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut candles = Vec::new();
        let mut dropped = 0usize;

        for (line, result) in rdr.records().enumerate() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    warn!(line = line + 2, error = %e, "dropping unreadable row");
                    dropped += 1;
                    continue;
                }
            };
            match parse_row(&record) {
                Ok(candle) if self.in_window(candle.timestamp) => candles.push(candle),
                Ok(_) => {}
                Err(reason) => {
                    warn!(line = line + 2, %reason, "dropping malformed row");
                    dropped += 1;
                }
            }
        }

        candles.sort_by_key(|c| c.timestamp);
        let before = candles.len();
        candles.dedup_by_key(|c| c.timestamp);
        let duplicates = before - candles.len();
        if duplicates > 0 {
            warn!(duplicates, "dropped candles with repeated timestamps");
        }

        debug!(
            source = %self.describe(),
            candles = candles.len(),
            dropped,
            "candles loaded"
        );
        Ok(candles)
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.symbol, self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    const HEADER: &str = "timestamp,open,high,low,close,volume\n";

    fn write_csv(body: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("BTCUSDT_1h.csv");
        fs::write(&path, format!("{HEADER}{body}")).unwrap();
        (dir, path)
    }

    #[test]
    fn reads_epoch_millis_rows() {
        let (_dir, path) = write_csv(
            "1704067200000,100.0,110.0,90.0,105.0,5.5\n\
             1704070800000,105.0,115.0,100.0,110.0,6.0\n",
        );
        let candles = CsvCandleSource::new(path, "BTCUSDT").fetch_candles().unwrap();

        assert_eq!(candles.len(), 2);
        assert_eq!(
            candles[0].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(candles[0].open, 100.0);
        assert_eq!(candles[0].high, 110.0);
        assert_eq!(candles[0].low, 90.0);
        assert_eq!(candles[0].close, 105.0);
        assert_eq!(candles[0].volume, 5.5);
    }

    #[test]
    fn reads_rfc3339_rows() {
        let (_dir, path) = write_csv("2024-01-01T01:00:00Z,1,2,0.5,1.5,10\n");
        let candles = CsvCandleSource::new(path, "X").fetch_candles().unwrap();
        assert_eq!(
            candles[0].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap()
        );
    }

    #[test]
    fn drops_malformed_rows_without_filling_gaps() {
        let (_dir, path) = write_csv(
            "2024-01-01T00:00:00Z,100,101,99,100,1\n\
             2024-01-01T01:00:00Z,abc,101,99,100,1\n\
             2024-01-01T02:00:00Z,100,101,99,-5,1\n\
             not-a-date,100,101,99,100,1\n\
             2024-01-01T04:00:00Z,100,101\n\
             2024-01-01T05:00:00Z,100,101,99,100,1\n",
        );
        let candles = CsvCandleSource::new(path, "X").fetch_candles().unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(
            candles[1].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 5, 0, 0).unwrap()
        );
    }

    #[test]
    fn sorts_and_drops_duplicate_timestamps() {
        let (_dir, path) = write_csv(
            "2024-01-01T02:00:00Z,3,3,3,3,1\n\
             2024-01-01T00:00:00Z,1,1,1,1,1\n\
             2024-01-01T02:00:00Z,9,9,9,9,1\n\
             2024-01-01T01:00:00Z,2,2,2,2,1\n",
        );
        let candles = CsvCandleSource::new(path, "X").fetch_candles().unwrap();
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        assert_eq!(closes, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn window_filters_inclusive() {
        let (_dir, path) = write_csv(
            "2024-01-01,1,1,1,1,1\n\
             2024-01-02,2,2,2,2,1\n\
             2024-01-03,3,3,3,3,1\n\
             2024-01-04,4,4,4,4,1\n",
        );
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
        let candles = CsvCandleSource::new(path, "X")
            .with_window(Some(start), Some(end))
            .fetch_candles()
            .unwrap();
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        assert_eq!(closes, vec![2.0, 3.0]);
    }

    #[test]
    fn missing_file_is_data_source_error() {
        let source = CsvCandleSource::new(PathBuf::from("/nonexistent/candles.csv"), "X");
        assert!(matches!(
            source.fetch_candles(),
            Err(CrossbotError::DataSource { .. })
        ));
    }

    #[test]
    fn describe_names_symbol_and_file() {
        let source = CsvCandleSource::new(PathBuf::from("data/btc.csv"), "BTCUSDT");
        assert!(source.describe().starts_with("BTCUSDT"));
    }
}
