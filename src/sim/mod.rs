//! Trade simulation core
//!
//! Paper-trading against a single instrument:
//! - Fee and slippage estimation
//! - Unrealized / realized P&L
//! - Order execution (portfolio state transition)
//! - Trading statistics over the trade history
//!
//! Everything here is synchronous and free of I/O. Callers own the
//! portfolio and must apply executions in order.

pub mod execution;
pub mod fees;
pub mod pnl;
pub mod stats;

// Re-export core API
pub use execution::{execute_order, update_portfolio, ExecutionEngine, ExecutionResult};
pub use fees::{estimate_fees, estimate_slippage, FeeModel, FeeType, SlippageModel};
pub use pnl::{compute_pnl_realized, compute_pnl_unrealized};
pub use stats::{calculate_trading_stats, cumulative_pnl_series, trade_pnls, TradingStats};
