//! Data loading
//!
//! Reads OHLCV candles and scripted order files from CSV.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::path::Path;
use tracing::{info, warn};

use crate::{Candle, OrderRequest, OrderSide};

/// Numeric timestamps above this are milliseconds
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Normalise a timestamp to Unix seconds.
///
/// Accepts Unix seconds, Unix milliseconds, RFC 3339,
/// `YYYY-MM-DD HH:MM:SS` (UTC) and `YYYY-MM-DD` (UTC midnight).
pub fn parse_time(raw: &str) -> Result<i64> {
    let raw = raw.trim();

    if let Ok(n) = raw.parse::<i64>() {
        return Ok(if n > MILLIS_THRESHOLD { n / 1000 } else { n });
    }
    if let Ok(f) = raw.parse::<f64>() {
        if !f.is_finite() {
            anyhow::bail!("Non-finite timestamp: {:?}", raw);
        }
        let n = f as i64;
        return Ok(if n > MILLIS_THRESHOLD { n / 1000 } else { n });
    }
    if let Ok(dt) = raw.parse::<DateTime<Utc>>() {
        return Ok(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp());
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(ndt.and_utc().timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(ndt.and_utc().timestamp());
        }
    }

    anyhow::bail!("Failed to parse time: {:?}", raw)
}

fn parse_field(record: &csv::StringRecord, idx: usize, name: &str) -> Result<f64> {
    record
        .get(idx)
        .with_context(|| format!("Missing {} column", name))?
        .trim()
        .parse()
        .with_context(|| format!("Failed to parse {}", name))
}

/// Load OHLCV data from a CSV file with header `time,open,high,low,close,volume`.
///
/// Invalid candles are skipped; at most `max_candles` are returned.
pub fn load_csv(path: impl AsRef<Path>, max_candles: usize) -> Result<Vec<Candle>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path.as_ref())
        .with_context(|| format!("Failed to open CSV file: {}", path.as_ref().display()))?;

    let mut candles: Vec<Candle> = Vec::new();
    let mut skipped = 0usize;

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;

        let time = parse_time(record.get(0).context("Missing time column")?)
            .with_context(|| format!("Row {}", row_idx + 1))?;
        let candle = Candle::new_unchecked(
            time,
            parse_field(&record, 1, "open")?,
            parse_field(&record, 2, "high")?,
            parse_field(&record, 3, "low")?,
            parse_field(&record, 4, "close")?,
            // Missing volume is treated as zero
            record
                .get(5)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0.0),
        );

        if let Err(e) = candle.validate() {
            warn!("Skipping row {}: {}", row_idx + 1, e);
            skipped += 1;
            continue;
        }

        if let Some(prev) = candles.last() {
            if candle.time <= prev.time {
                warn!(
                    "Row {}: time {} does not follow previous {}",
                    row_idx + 1,
                    candle.time,
                    prev.time
                );
            }
        }

        candles.push(candle);
        if candles.len() == max_candles {
            warn!("Reached max_candles ({}), ignoring remaining rows", max_candles);
            break;
        }
    }

    info!(
        "Loaded {} candles from {} ({} skipped)",
        candles.len(),
        path.as_ref().display(),
        skipped
    );
    Ok(candles)
}

/// One scripted order: execute `order` when the replay reaches `bar`
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledOrder {
    pub bar: usize,
    pub order: OrderRequest,
}

/// Load a scripted order file with header `bar,side,qty`, sorted by bar
pub fn load_orders(path: impl AsRef<Path>) -> Result<Vec<ScheduledOrder>> {
    let mut reader = csv::Reader::from_path(path.as_ref())
        .with_context(|| format!("Failed to open order file: {}", path.as_ref().display()))?;

    let mut orders = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;

        let bar: usize = record
            .get(0)
            .context("Missing bar column")?
            .trim()
            .parse()
            .with_context(|| format!("Row {}: failed to parse bar", row_idx + 1))?;
        let side: OrderSide = record
            .get(1)
            .context("Missing side column")?
            .parse()
            .with_context(|| format!("Row {}: bad side", row_idx + 1))?;
        let qty: u64 = record
            .get(2)
            .context("Missing qty column")?
            .trim()
            .parse()
            .with_context(|| format!("Row {}: failed to parse qty", row_idx + 1))?;

        orders.push(ScheduledOrder {
            bar,
            order: OrderRequest::new(side, qty),
        });
    }

    // Stable: orders on the same bar keep file order
    orders.sort_by_key(|o| o.bar);
    Ok(orders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_time_formats() {
        assert_eq!(parse_time("1700000000").unwrap(), 1_700_000_000);
        assert_eq!(parse_time("1700000000123").unwrap(), 1_700_000_000);
        assert_eq!(parse_time("2024-01-02").unwrap(), 1_704_153_600);
        assert_eq!(parse_time("2024-01-02 09:30:00").unwrap(), 1_704_187_800);
        assert_eq!(parse_time("2024-01-02T09:30:00Z").unwrap(), 1_704_187_800);
        assert_eq!(parse_time("2024-01-02T04:30:00-05:00").unwrap(), 1_704_187_800);
        assert!(parse_time("yesterday").is_err());
    }

    #[test]
    fn test_parse_time_rejects_non_finite() {
        assert_eq!(parse_time("1700000000.75").unwrap(), 1_700_000_000);
        assert!(parse_time("NaN").is_err());
        assert!(parse_time("inf").is_err());
        assert!(parse_time("-infinity").is_err());
    }

    #[test]
    fn test_load_csv_skips_invalid_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AAPL_1d.csv");
        fs::write(
            &path,
            "time,open,high,low,close,volume\n\
             2024-01-02,10,11,9,10.5,100\n\
             2024-01-03,10,9,11,10.5,100\n\
             2024-01-04,10.5,12,10,11.5,200\n\
             2024-01-05,11.5,12,11,11.8\n\
             2024-01-08,11.8,12.5,11.5,12,300\n",
        )
        .unwrap();

        let candles = load_csv(&path, 10).unwrap();
        assert_eq!(candles.len(), 4);
        assert_eq!(candles[0].close, 10.5);
        assert_eq!(candles[2].volume, 0.0);

        let truncated = load_csv(&path, 2).unwrap();
        assert_eq!(truncated.len(), 2);
        assert_eq!(truncated[1].close, 11.5);
    }

    #[test]
    fn test_load_orders_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        fs::write(&path, "bar,side,qty\n5,sell,100\n1,buy,100\n5,short,50\n").unwrap();

        let orders = load_orders(&path).unwrap();
        assert_eq!(orders.len(), 3);
        assert_eq!(orders[0], ScheduledOrder { bar: 1, order: OrderRequest::buy(100) });
        assert_eq!(orders[1].order.side, OrderSide::Sell);
        assert_eq!(orders[2].order, OrderRequest::short(50));
    }

    #[test]
    fn test_load_orders_rejects_bad_side() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        fs::write(&path, "bar,side,qty\n1,hold,100\n").unwrap();
        assert!(load_orders(&path).is_err());
    }
}
