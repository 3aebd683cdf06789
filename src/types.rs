//! Core data types used across the replay simulator

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Errors raised by the trade simulation core
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("invalid amount ({0}): notional must be finite and >= 0")]
    InvalidAmount(f64),

    #[error("invalid execution price ({0}): must be finite and > 0")]
    InvalidPrice(f64),

    #[error("{side} not allowed with position {position_qty}")]
    OrderNotAllowed { side: OrderSide, position_qty: i64 },

    #[error("invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Validation errors for candle data
#[derive(Debug, Error)]
pub enum CandleValidationError {
    #[error("high ({high}) must be >= low ({low})")]
    HighLessThanLow { high: f64, low: f64 },

    #[error("volume ({0}) must be >= 0")]
    NegativeVolume(f64),

    #[error("open ({open}) must be between low ({low}) and high ({high})")]
    OpenOutOfRange { open: f64, low: f64, high: f64 },

    #[error("close ({close}) must be between low ({low}) and high ({high})")]
    CloseOutOfRange { close: f64, low: f64, high: f64 },

    #[error("prices must be positive: open={open}, high={high}, low={low}, close={close}")]
    NonPositivePrice {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },
}

/// OHLCV candlestick data. `time` is Unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Create a new candle with validation
    pub fn new(
        time: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, CandleValidationError> {
        let candle = Self::new_unchecked(time, open, high, low, close, volume);
        candle.validate()?;
        Ok(candle)
    }

    /// Create a candle without validation (for trusted sources or tests)
    pub fn new_unchecked(
        time: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Validate the candle data
    pub fn validate(&self) -> Result<(), CandleValidationError> {
        if self.open <= 0.0 || self.high <= 0.0 || self.low <= 0.0 || self.close <= 0.0 {
            return Err(CandleValidationError::NonPositivePrice {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }

        if self.high < self.low {
            return Err(CandleValidationError::HighLessThanLow {
                high: self.high,
                low: self.low,
            });
        }

        if self.volume < 0.0 {
            return Err(CandleValidationError::NegativeVolume(self.volume));
        }

        if self.open < self.low || self.open > self.high {
            return Err(CandleValidationError::OpenOutOfRange {
                open: self.open,
                low: self.low,
                high: self.high,
            });
        }

        if self.close < self.low || self.close > self.high {
            return Err(CandleValidationError::CloseOutOfRange {
                close: self.close,
                low: self.low,
                high: self.high,
            });
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Ticker symbol using Arc<str> for cheap cloning
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(#[serde(with = "arc_str_serde")] std::sync::Arc<str>);

/// Custom serde for Arc<str>
mod arc_str_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::sync::Arc;

    pub fn serialize<S>(value: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Arc::from(s.as_str()))
    }
}

impl Symbol {
    pub const MAX_LEN: usize = 8;

    /// Wrap a symbol as-is (no normalisation)
    pub fn new(s: impl AsRef<str>) -> Self {
        Symbol(std::sync::Arc::from(s.as_ref()))
    }

    /// Normalise and validate a user-entered ticker.
    ///
    /// Trims and upper-cases the input; the result must be 1..=8 characters,
    /// start with A-Z and contain only A-Z, 0-9, `.` or `-`.
    pub fn parse(raw: &str) -> Result<Self, SimError> {
        let normalized = raw.trim().to_uppercase();
        let mut chars = normalized.chars();
        let valid_head = chars.next().is_some_and(|c| c.is_ascii_uppercase());
        let valid_tail =
            chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.' || c == '-');

        if !valid_head || !valid_tail || normalized.len() > Self::MAX_LEN {
            return Err(SimError::InvalidSymbol(raw.to_string()));
        }
        Ok(Symbol::new(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position direction an order pushes toward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

/// Order side as chosen by the user.
///
/// `Short` trades exactly like `Sell` and `Cover` exactly like `Buy`; the
/// label is kept on the resulting [`Trade`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
    Short,
    Cover,
}

impl OrderSide {
    pub const ALL: [OrderSide; 4] = [
        OrderSide::Buy,
        OrderSide::Sell,
        OrderSide::Short,
        OrderSide::Cover,
    ];

    /// Normalise to the canonical state-transition direction
    pub fn direction(self) -> Direction {
        match self {
            OrderSide::Buy | OrderSide::Cover => Direction::Long,
            OrderSide::Sell | OrderSide::Short => Direction::Short,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
            OrderSide::Short => "short",
            OrderSide::Cover => "cover",
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderSide {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(OrderSide::Buy),
            "sell" => Ok(OrderSide::Sell),
            "short" => Ok(OrderSide::Short),
            "cover" => Ok(OrderSide::Cover),
            other => Err(SimError::InvalidOrder(format!("unknown side {:?}", other))),
        }
    }
}

/// A single market order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub side: OrderSide,
    pub qty: u64,
    /// Limit price, reserved. Every order fills at the current market price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl OrderRequest {
    pub fn new(side: OrderSide, qty: u64) -> Self {
        Self { side, qty, price: None }
    }

    pub fn buy(qty: u64) -> Self {
        Self::new(OrderSide::Buy, qty)
    }

    pub fn sell(qty: u64) -> Self {
        Self::new(OrderSide::Sell, qty)
    }

    pub fn short(qty: u64) -> Self {
        Self::new(OrderSide::Short, qty)
    }

    pub fn cover(qty: u64) -> Self {
        Self::new(OrderSide::Cover, qty)
    }
}

/// Account snapshot. `equity == cash + pnl_unrealized` after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub cash: f64,
    /// Signed: positive long, negative short, zero flat
    pub position_qty: i64,
    /// Weighted cost basis; meaningless while flat
    pub avg_price: f64,
    pub equity: f64,
    pub pnl_unrealized: f64,
    /// Cumulative since inception
    pub pnl_realized: f64,
}

impl Portfolio {
    /// Fresh account holding only cash
    pub fn new(cash: f64) -> Self {
        Self {
            cash,
            position_qty: 0,
            avg_price: 0.0,
            equity: cash,
            pnl_unrealized: 0.0,
            pnl_realized: 0.0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.position_qty == 0
    }

    pub fn is_long(&self) -> bool {
        self.position_qty > 0
    }

    pub fn is_short(&self) -> bool {
        self.position_qty < 0
    }

    /// Revalue the open position at `current_price` without trading
    pub fn mark_to_market(&mut self, current_price: f64) {
        self.pnl_unrealized = crate::sim::pnl::compute_pnl_unrealized(
            self.position_qty,
            self.avg_price,
            current_price,
        );
        self.equity = self.cash + self.pnl_unrealized;
    }
}

/// Trade identifier, unique within the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeId(pub u64);

impl std::fmt::Display for TradeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Atomic counter for trade id generation
static TRADE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate next trade id (thread-safe, lock-free)
pub fn next_trade_id() -> TradeId {
    TradeId(TRADE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Make sure ids up to and including `max` are never handed out again
pub fn reserve_trade_ids_through(max: TradeId) {
    TRADE_ID_COUNTER.fetch_max(max.0.saturating_add(1), Ordering::Relaxed);
}

/// Immutable execution record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub time: i64,
    pub side: OrderSide,
    pub price: f64,
    pub qty: u64,
    pub fee: f64,
    pub slippage: f64,
    /// Portfolio's cumulative realized P&L right after this trade
    pub pnl_realized_after: f64,
}

impl Trade {
    pub fn notional(&self) -> f64 {
        self.price * self.qty as f64
    }
}
