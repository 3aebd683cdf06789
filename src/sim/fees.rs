//! Commission and market-impact estimation

use serde::{Deserialize, Serialize};

use crate::SimError;

/// How the raw commission is derived from the notional
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeType {
    /// `value` is a rate applied to the notional (0.002 = 0.2%)
    Percentage,
    /// `value` is a flat amount per order
    Fixed,
}

/// Commission schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeModel {
    #[serde(rename = "type")]
    pub fee_type: FeeType,
    pub value: f64,
    /// Floor applied after computing the raw fee
    pub min_fee: f64,
}

impl FeeModel {
    pub fn percentage(rate: f64, min_fee: f64) -> Self {
        Self {
            fee_type: FeeType::Percentage,
            value: rate,
            min_fee,
        }
    }

    pub fn fixed(amount: f64) -> Self {
        Self {
            fee_type: FeeType::Fixed,
            value: amount,
            min_fee: 0.0,
        }
    }

    /// No commission at all
    pub fn zero() -> Self {
        Self::percentage(0.0, 0.0)
    }
}

impl Default for FeeModel {
    fn default() -> Self {
        Self::percentage(0.002, 1.0) // 0.2%, minimum 1
    }
}

/// Linear market-impact model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlippageModel {
    /// Basis points of notional (1 bps = 0.01%)
    pub bps: f64,
}

impl SlippageModel {
    pub fn new(bps: f64) -> Self {
        Self { bps }
    }

    pub fn zero() -> Self {
        Self { bps: 0.0 }
    }
}

impl Default for SlippageModel {
    fn default() -> Self {
        Self { bps: 5.0 }
    }
}

fn check_amount(amount: f64) -> Result<(), SimError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidAmount(amount))
    }
}

/// Commission for a trade of notional `amount`, never below `min_fee`
pub fn estimate_fees(amount: f64, fee_model: &FeeModel) -> Result<f64, SimError> {
    check_amount(amount)?;
    let raw = match fee_model.fee_type {
        FeeType::Percentage => amount * fee_model.value,
        FeeType::Fixed => fee_model.value,
    };
    Ok(raw.max(fee_model.min_fee))
}

/// Market-impact cost for a trade of notional `amount`
pub fn estimate_slippage(amount: f64, slippage_model: &SlippageModel) -> Result<f64, SimError> {
    check_amount(amount)?;
    Ok(amount * slippage_model.bps / 10_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_min_fee_floor() {
        let model = FeeModel::percentage(0.002, 1.0);
        // 100 * 0.002 = 0.2 < 1
        assert_eq!(estimate_fees(100.0, &model).unwrap(), 1.0);
        assert_abs_diff_eq!(estimate_fees(5_000.0, &model).unwrap(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_fixed_fee() {
        let model = FeeModel {
            fee_type: FeeType::Fixed,
            value: 4.95,
            min_fee: 1.0,
        };
        assert_eq!(estimate_fees(0.0, &model).unwrap(), 4.95);
        assert_eq!(estimate_fees(1_000_000.0, &model).unwrap(), 4.95);

        let below_floor = FeeModel {
            fee_type: FeeType::Fixed,
            value: 0.5,
            min_fee: 2.0,
        };
        assert_eq!(estimate_fees(10.0, &below_floor).unwrap(), 2.0);
    }

    #[test]
    fn test_fee_never_below_min() {
        let model = FeeModel::default();
        for amount in [0.0, 1.0, 499.0, 500.0, 501.0, 12_345.6] {
            assert!(estimate_fees(amount, &model).unwrap() >= model.min_fee);
        }
    }

    #[test]
    fn test_slippage_linear() {
        let model = SlippageModel::new(5.0);
        assert_abs_diff_eq!(estimate_slippage(10_000.0, &model).unwrap(), 5.0, epsilon = 1e-12);
        assert_eq!(estimate_slippage(0.0, &model).unwrap(), 0.0);
        assert_eq!(estimate_slippage(10_000.0, &SlippageModel::zero()).unwrap(), 0.0);
    }

    #[test]
    fn test_negative_amount_rejected() {
        assert_eq!(
            estimate_fees(-1.0, &FeeModel::default()),
            Err(SimError::InvalidAmount(-1.0))
        );
        assert!(estimate_slippage(f64::NAN, &SlippageModel::default()).is_err());
    }

    #[test]
    fn test_fee_model_serde() {
        let json = r#"{"type":"percentage","value":0.002,"min_fee":1.0}"#;
        let model: FeeModel = serde_json::from_str(json).unwrap();
        assert_eq!(model, FeeModel::default());
    }
}
