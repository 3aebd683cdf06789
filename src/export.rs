//! Trade log CSV export and import

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::{OrderSide, Symbol, Trade, TradeId};

const HEADER: [&str; 9] = [
    "symbol",
    "id",
    "time",
    "side",
    "price",
    "qty",
    "fee",
    "slippage",
    "pnl_realized_after",
];

/// One CSV row: the trade fields plus the symbol label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TradeRow {
    symbol: String,
    id: u64,
    time: i64,
    side: OrderSide,
    price: f64,
    qty: u64,
    fee: f64,
    slippage: f64,
    pnl_realized_after: f64,
}

impl TradeRow {
    fn from_trade(symbol: &Symbol, trade: &Trade) -> Self {
        Self {
            symbol: symbol.as_str().to_string(),
            id: trade.id.0,
            time: trade.time,
            side: trade.side,
            price: trade.price,
            qty: trade.qty,
            fee: trade.fee,
            slippage: trade.slippage,
            pnl_realized_after: trade.pnl_realized_after,
        }
    }

    fn into_trade(self) -> Trade {
        Trade {
            id: TradeId(self.id),
            time: self.time,
            side: self.side,
            price: self.price,
            qty: self.qty,
            fee: self.fee,
            slippage: self.slippage,
            pnl_realized_after: self.pnl_realized_after,
        }
    }
}

/// Write `trades` to `path`, creating parent directories. The header row is
/// always written, even for an empty history.
pub fn write_trades_csv(path: impl AsRef<Path>, symbol: &Symbol, trades: &[Trade]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create trade log: {}", path.display()))?;
    writer.write_record(HEADER)?;
    for trade in trades {
        writer.serialize(TradeRow::from_trade(symbol, trade))?;
    }
    writer.flush()?;

    info!("Exported {} trades to {}", trades.len(), path.display());
    Ok(())
}

/// Read a trade log written by [`write_trades_csv`].
///
/// Returns the symbol label of the first row (if any) and the trades in file order.
pub fn read_trades_csv(path: impl AsRef<Path>) -> Result<(Option<Symbol>, Vec<Trade>)> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open trade log: {}", path.display()))?;

    let mut symbol = None;
    let mut trades = Vec::new();
    for (row_idx, result) in reader.deserialize::<TradeRow>().enumerate() {
        let row = result.with_context(|| format!("Failed to read trade row {}", row_idx + 1))?;
        if symbol.is_none() {
            symbol = Some(Symbol::new(&row.symbol));
        }
        trades.push(row.into_trade());
    }

    Ok((symbol, trades))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_layout_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("AAPL_trades.csv");
        let trades = vec![
            Trade {
                id: TradeId(7),
                time: 1_704_153_600,
                side: OrderSide::Short,
                price: 185.5,
                qty: 10,
                fee: 3.71,
                slippage: 0.9275,
                pnl_realized_after: 0.0,
            },
            Trade {
                id: TradeId(8),
                time: 1_704_240_000,
                side: OrderSide::Cover,
                price: 180.0,
                qty: 10,
                fee: 3.6,
                slippage: 0.9,
                pnl_realized_after: 55.0,
            },
        ];

        write_trades_csv(&path, &Symbol::new("AAPL"), &trades).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "symbol,id,time,side,price,qty,fee,slippage,pnl_realized_after"
        );
        assert!(lines.next().unwrap().starts_with("AAPL,7,1704153600,short,185.5,10,"));

        let (symbol, loaded) = read_trades_csv(&path).unwrap();
        assert_eq!(symbol, Some(Symbol::new("AAPL")));
        assert_eq!(loaded, trades);
    }

    #[test]
    fn test_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_trades_csv(&path, &Symbol::new("MSFT"), &[]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_end(), HEADER.join(","));

        let (symbol, loaded) = read_trades_csv(&path).unwrap();
        assert!(symbol.is_none());
        assert!(loaded.is_empty());
    }
}
