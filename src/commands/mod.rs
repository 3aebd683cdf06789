pub mod replay;
pub mod stats;

use stock_replay::sim::TradingStats;

/// Print a statistics block in the same layout for every command
pub fn print_stats(stats: &TradingStats) {
    println!("Total Trades:       {}", stats.total_trades);
    println!("Winning Trades:     {}", stats.winning_trades);
    println!("Losing Trades:      {}", stats.losing_trades);
    println!("Win Rate:           {:.2}%", stats.win_rate);
    println!("Profit/Loss Ratio:  {:.2}", stats.profit_loss_ratio);
    println!("Realized P&L:       ${:.2}", stats.total_realized_pnl);
    println!("Avg P&L per Trade:  ${:.2}", stats.average_pnl_per_trade);
    println!("Largest Win:        ${:.2}", stats.max_win);
    println!("Largest Loss:       ${:.2}", stats.max_loss);
}
