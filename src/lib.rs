//! Stock Replay
//!
//! Replays historical OHLC candles bar by bar and paper-trades a single
//! ticker against them: market orders (buy, sell, short, cover) fill at the
//! current close with commission and slippage, the portfolio tracks a
//! signed position with a weighted cost basis, and trading statistics are
//! derived from the trade history.
//!
//! ## Example
//! ```
//! use stock_replay::sim::{execute_order, FeeModel, SlippageModel};
//! use stock_replay::{OrderRequest, Portfolio};
//!
//! let start = Portfolio::new(50_000.0);
//! let fill = execute_order(
//!     &start,
//!     &OrderRequest::buy(100),
//!     50.0,
//!     1_704_153_600,
//!     &FeeModel::default(),
//!     &SlippageModel::default(),
//! )
//! .unwrap();
//! assert_eq!(fill.new_portfolio.position_qty, 100);
//! ```

pub mod config;
pub mod data;
pub mod export;
pub mod replay;
pub mod session;
pub mod sim;
pub mod state_manager;
pub mod types;

pub use config::Config;
pub use replay::{Interval, ReplayEngine, ReplayStatus};
pub use session::Session;
pub use types::*;
