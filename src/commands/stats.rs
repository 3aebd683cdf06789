//! Stats command implementation

use anyhow::Result;
use stock_replay::export::read_trades_csv;
use stock_replay::sim::calculate_trading_stats;
use tracing::info;

pub fn run(trades_path: String, json: bool) -> Result<()> {
    let (symbol, trades) = read_trades_csv(&trades_path)?;
    info!("Loaded {} trades from {}", trades.len(), trades_path);

    let stats = calculate_trading_stats(&trades);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let label = symbol.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
    println!("\n{}", "=".repeat(60));
    println!("TRADING STATISTICS ({})", label);
    println!("{}", "=".repeat(60));
    super::print_stats(&stats);
    println!("{}", "=".repeat(60));

    Ok(())
}
