//! Profit and loss calculations

/// Mark-to-market P&L of an open position.
///
/// Positive for a long when price rose, positive for a short when it fell.
pub fn compute_pnl_unrealized(position_qty: i64, avg_price: f64, current_price: f64) -> f64 {
    if position_qty == 0 {
        return 0.0;
    }
    let direction = position_qty.signum() as f64;
    (current_price - avg_price) * position_qty.unsigned_abs() as f64 * direction
}

/// P&L locked in by closing `closing_qty` shares of a position that was
/// `position_qty_before` at `avg_price`.
pub fn compute_pnl_realized(
    closing_qty: u64,
    closing_price: f64,
    avg_price: f64,
    position_qty_before: i64,
) -> f64 {
    if closing_qty == 0 || position_qty_before == 0 {
        return 0.0;
    }
    let direction = position_qty_before.signum() as f64;
    (closing_price - avg_price) * closing_qty as f64 * direction
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrealized_flat_is_zero() {
        assert_eq!(compute_pnl_unrealized(0, 100.0, 150.0), 0.0);
    }

    #[test]
    fn test_unrealized_long_and_short() {
        assert_eq!(compute_pnl_unrealized(100, 10.0, 12.0), 200.0);
        assert_eq!(compute_pnl_unrealized(100, 10.0, 8.0), -200.0);
        assert_eq!(compute_pnl_unrealized(-100, 10.0, 8.0), 200.0);
        assert_eq!(compute_pnl_unrealized(-100, 10.0, 12.0), -200.0);
    }

    #[test]
    fn test_unrealized_break_even() {
        for qty in [-500, -1, 1, 37, 10_000] {
            assert_eq!(compute_pnl_unrealized(qty, 123.45, 123.45), 0.0);
        }
    }

    #[test]
    fn test_realized() {
        assert_eq!(compute_pnl_realized(50, 90.0, 100.0, -50), 500.0);
        assert_eq!(compute_pnl_realized(50, 110.0, 100.0, 80), 500.0);
        assert_eq!(compute_pnl_realized(50, 90.0, 100.0, 80), -500.0);
        assert_eq!(compute_pnl_realized(0, 90.0, 100.0, 80), 0.0);
        assert_eq!(compute_pnl_realized(10, 90.0, 100.0, 0), 0.0);
    }
}
