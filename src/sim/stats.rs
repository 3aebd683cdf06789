//! Trading statistics derived from the trade history

use serde::{Deserialize, Serialize};

use crate::Trade;

/// Summary of a trade history. Always recomputed, never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradingStats {
    pub total_trades: usize,
    /// Percentage of trades with a positive realized delta
    pub win_rate: f64,
    /// Average win / average loss magnitude (0 without losses)
    pub profit_loss_ratio: f64,
    pub total_realized_pnl: f64,
    pub average_pnl_per_trade: f64,
    pub max_win: f64,
    /// Most negative delta; stays <= 0
    pub max_loss: f64,
    pub winning_trades: usize,
    pub losing_trades: usize,
}

/// Per-trade realized P&L, reconstructed from the cumulative
/// `pnl_realized_after` values (baseline 0).
pub fn trade_pnls(trades: &[Trade]) -> Vec<f64> {
    let mut previous = 0.0;
    trades
        .iter()
        .map(|trade| {
            let delta = trade.pnl_realized_after - previous;
            previous = trade.pnl_realized_after;
            delta
        })
        .collect()
}

/// Realized P&L curve as `(time, cumulative)` points
pub fn cumulative_pnl_series(trades: &[Trade]) -> Vec<(i64, f64)> {
    trades.iter().map(|t| (t.time, t.pnl_realized_after)).collect()
}

/// Compute statistics over an ordered trade history
pub fn calculate_trading_stats(trades: &[Trade]) -> TradingStats {
    if trades.is_empty() {
        return TradingStats::default();
    }

    let pnls = trade_pnls(trades);
    let wins: Vec<f64> = pnls.iter().copied().filter(|p| *p > 0.0).collect();
    let losses: Vec<f64> = pnls.iter().copied().filter(|p| *p < 0.0).collect();

    let total_trades = pnls.len();
    let win_rate = wins.len() as f64 / total_trades as f64 * 100.0;

    let avg_win = if wins.is_empty() {
        0.0
    } else {
        wins.iter().sum::<f64>() / wins.len() as f64
    };
    let avg_loss = if losses.is_empty() {
        0.0
    } else {
        (losses.iter().sum::<f64>() / losses.len() as f64).abs()
    };
    let profit_loss_ratio = if avg_loss > 0.0 { avg_win / avg_loss } else { 0.0 };

    let total_realized_pnl = trades.last().map_or(0.0, |t| t.pnl_realized_after);

    let max_win = wins.iter().copied().fold(0.0, f64::max);
    let max_loss = losses.iter().copied().fold(0.0, f64::min);

    TradingStats {
        total_trades,
        win_rate,
        profit_loss_ratio,
        total_realized_pnl,
        average_pnl_per_trade: total_realized_pnl / total_trades as f64,
        max_win,
        max_loss,
        winning_trades: wins.len(),
        losing_trades: losses.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OrderSide, TradeId};
    use approx::assert_abs_diff_eq;

    fn history(cumulative: &[f64]) -> Vec<Trade> {
        cumulative
            .iter()
            .enumerate()
            .map(|(i, pnl)| Trade {
                id: TradeId(i as u64 + 1),
                time: 1_000 + i as i64 * 60,
                side: if i % 2 == 0 { OrderSide::Buy } else { OrderSide::Sell },
                price: 10.0,
                qty: 1,
                fee: 0.0,
                slippage: 0.0,
                pnl_realized_after: *pnl,
            })
            .collect()
    }

    #[test]
    fn test_empty_history() {
        assert_eq!(calculate_trading_stats(&[]), TradingStats::default());
    }

    #[test]
    fn test_reconstructed_deltas() {
        let trades = history(&[100.0, 100.0, 50.0, 200.0]);
        assert_eq!(trade_pnls(&trades), vec![100.0, 0.0, -50.0, 150.0]);

        let stats = calculate_trading_stats(&trades);
        assert_eq!(stats.total_trades, 4);
        assert_eq!(stats.winning_trades, 2);
        assert_eq!(stats.losing_trades, 1);
        assert_abs_diff_eq!(stats.win_rate, 50.0);
        assert_eq!(stats.max_win, 150.0);
        assert_eq!(stats.max_loss, -50.0);
        assert_eq!(stats.total_realized_pnl, 200.0);
        assert_abs_diff_eq!(stats.average_pnl_per_trade, 50.0);
        // avg win 125 / avg loss 50
        assert_abs_diff_eq!(stats.profit_loss_ratio, 2.5);
    }

    #[test]
    fn test_no_losses_ratio_zero() {
        let stats = calculate_trading_stats(&history(&[0.0, 10.0, 30.0]));
        assert_eq!(stats.losing_trades, 0);
        assert_eq!(stats.profit_loss_ratio, 0.0);
        assert_eq!(stats.max_loss, 0.0);
        assert_eq!(stats.max_win, 20.0);
    }

    #[test]
    fn test_only_losses() {
        let stats = calculate_trading_stats(&history(&[-10.0, -40.0]));
        assert_eq!(stats.winning_trades, 0);
        assert_eq!(stats.max_win, 0.0);
        assert_eq!(stats.max_loss, -30.0);
        assert_eq!(stats.win_rate, 0.0);
        assert_eq!(stats.total_realized_pnl, -40.0);
    }

    #[test]
    fn test_stats_idempotent() {
        let trades = history(&[5.0, -5.0, 20.0, 12.5]);
        assert_eq!(calculate_trading_stats(&trades), calculate_trading_stats(&trades));
    }

    #[test]
    fn test_cumulative_series() {
        let trades = history(&[1.0, 3.0]);
        assert_eq!(cumulative_pnl_series(&trades), vec![(1_000, 1.0), (1_060, 3.0)]);
    }
}
