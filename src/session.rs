//! Paper-trading session
//!
//! Owns the live portfolio and the append-only trade history for one
//! symbol, and applies orders through the execution engine one at a time.
//! Mutation goes through `&mut self`, so a session shared across threads
//! must sit behind a mutex.

use tracing::{debug, info};

use crate::sim::{calculate_trading_stats, ExecutionEngine, TradingStats};
use crate::{Config, OrderRequest, OrderSide, Portfolio, SimError, Symbol, Trade};

pub struct Session {
    symbol: Symbol,
    initial_cash: f64,
    engine: ExecutionEngine,
    portfolio: Portfolio,
    trades: Vec<Trade>,
    /// Last replay bar this session has processed
    last_bar: Option<usize>,
}

impl Session {
    pub fn new(symbol: Symbol, config: &Config) -> Self {
        Self::with_engine(
            symbol,
            config.account.initial_cash,
            ExecutionEngine::from_config(config),
        )
    }

    pub fn with_engine(symbol: Symbol, initial_cash: f64, engine: ExecutionEngine) -> Self {
        Self {
            symbol,
            initial_cash,
            engine,
            portfolio: Portfolio::new(initial_cash),
            trades: Vec::new(),
            last_bar: None,
        }
    }

    /// Rebuild a session from persisted state
    pub fn restore(
        symbol: Symbol,
        initial_cash: f64,
        engine: ExecutionEngine,
        portfolio: Portfolio,
        trades: Vec<Trade>,
    ) -> Self {
        Self {
            symbol,
            initial_cash,
            engine,
            portfolio,
            trades,
            last_bar: None,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn last_bar(&self) -> Option<usize> {
        self.last_bar
    }

    /// Remember how far the replay driving this session has progressed
    pub fn record_bar(&mut self, bar: usize) {
        self.last_bar = Some(bar);
    }

    /// Whether `side` may be submitted against the current position.
    ///
    /// `sell` closes longs and needs one open; `cover` likewise needs a short.
    pub fn can_submit(&self, side: OrderSide) -> bool {
        match side {
            OrderSide::Buy | OrderSide::Short => true,
            OrderSide::Sell => self.portfolio.is_long(),
            OrderSide::Cover => self.portfolio.is_short(),
        }
    }

    /// Execute `order` at the current candle's close and record the trade
    pub fn submit(
        &mut self,
        order: &OrderRequest,
        current_price: f64,
        time: i64,
    ) -> Result<&Trade, SimError> {
        if !self.can_submit(order.side) {
            return Err(SimError::OrderNotAllowed {
                side: order.side,
                position_qty: self.portfolio.position_qty,
            });
        }

        let result = self.engine.execute(&self.portfolio, order, current_price, time)?;
        self.portfolio = result.new_portfolio;
        self.trades.push(result.trade);

        let trade = &self.trades[self.trades.len() - 1];
        info!(
            "{} {} {} @ {:.2} (notional {:.2}) | position {} | cash {:.2} | realized {:+.2}",
            self.symbol,
            trade.side,
            trade.qty,
            trade.price,
            trade.notional(),
            self.portfolio.position_qty,
            self.portfolio.cash,
            self.portfolio.pnl_realized
        );
        Ok(trade)
    }

    /// Revalue the open position as the replay moves
    pub fn mark_to_market(&mut self, current_price: f64) {
        self.portfolio.mark_to_market(current_price);
    }

    /// Replace the portfolio, keeping the trade history
    pub fn set_portfolio(&mut self, portfolio: Portfolio) {
        debug!("Portfolio replaced: {:?}", portfolio);
        self.portfolio = portfolio;
    }

    /// Fresh account with the initial cash and no history
    pub fn reset(&mut self) {
        info!("Resetting {} session to {:.2} cash", self.symbol, self.initial_cash);
        self.portfolio = Portfolio::new(self.initial_cash);
        self.trades.clear();
        self.last_bar = None;
    }

    pub fn stats(&self) -> TradingStats {
        calculate_trading_stats(&self.trades)
    }

    /// Equity change since inception, in percent
    pub fn total_return_pct(&self) -> f64 {
        (self.portfolio.equity - self.initial_cash) / self.initial_cash * 100.0
    }
}
