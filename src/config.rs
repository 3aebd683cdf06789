//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files. Every section is
//! optional and falls back to the reference account setup: 50 000 cash,
//! 0.2% commission with a minimum of 1, 5 bps slippage.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::sim::{FeeModel, SlippageModel};
use crate::SimError;

/// Environment variable overriding `account.initial_cash`
pub const INITIAL_CASH_ENV: &str = "STOCK_REPLAY_INITIAL_CASH";

/// Version tag written into persisted sessions
pub const CONFIG_VERSION: &str = "0.2";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub account: AccountConfig,
    pub fees: FeeModel,
    pub slippage: SlippageModel,
    pub replay: ReplayConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(raw) = std::env::var(INITIAL_CASH_ENV) {
            self.account.initial_cash = raw
                .trim()
                .parse()
                .with_context(|| format!("{} is not a number: {:?}", INITIAL_CASH_ENV, raw))?;
        }
        Ok(())
    }

    /// Reject settings that would produce nonsensical accounts
    pub fn validate(&self) -> Result<(), SimError> {
        let invalid = |msg: String| Err(SimError::InvalidConfig(msg));

        if !self.account.initial_cash.is_finite() || self.account.initial_cash <= 0.0 {
            return invalid(format!("initial_cash must be > 0, got {}", self.account.initial_cash));
        }
        if !self.fees.value.is_finite() || self.fees.value < 0.0 {
            return invalid(format!("fees.value must be >= 0, got {}", self.fees.value));
        }
        if !self.fees.min_fee.is_finite() || self.fees.min_fee < 0.0 {
            return invalid(format!("fees.min_fee must be >= 0, got {}", self.fees.min_fee));
        }
        if !self.slippage.bps.is_finite() || self.slippage.bps < 0.0 {
            return invalid(format!("slippage.bps must be >= 0, got {}", self.slippage.bps));
        }
        let speed = self.replay.default_speed;
        if !(ReplayConfig::MIN_SPEED..=ReplayConfig::MAX_SPEED).contains(&speed) {
            return invalid(format!(
                "replay.default_speed must be within {}..={}, got {}",
                ReplayConfig::MIN_SPEED,
                ReplayConfig::MAX_SPEED,
                speed
            ));
        }
        if self.replay.step_size == 0 || self.replay.seek_size == 0 {
            return invalid("replay.step_size and replay.seek_size must be > 0".to_string());
        }
        if self.replay.max_candles == 0 {
            return invalid("replay.max_candles must be > 0".to_string());
        }
        Ok(())
    }
}

/// Account configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub initial_cash: f64,
}

impl Default for AccountConfig {
    fn default() -> Self {
        AccountConfig {
            initial_cash: 50_000.0,
        }
    }
}

/// Replay configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Candles per second at 1x
    pub default_speed: f64,
    pub step_size: usize,
    pub seek_size: usize,
    /// Loaded candle series are truncated to this length
    pub max_candles: usize,
}

impl ReplayConfig {
    pub const SPEED_PRESETS: [f64; 4] = [0.5, 1.0, 2.0, 4.0];
    /// Accepted playback speed range; 1000x is one candle per millisecond
    pub const MIN_SPEED: f64 = 0.01;
    pub const MAX_SPEED: f64 = 1000.0;
}

impl Default for ReplayConfig {
    fn default() -> Self {
        ReplayConfig {
            default_speed: 1.0,
            step_size: 1,
            seek_size: 10,
            max_candles: 10_000,
        }
    }
}

/// Output locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub results_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            results_dir: "results".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::FeeType;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.account.initial_cash, 50_000.0);
        assert_eq!(config.fees.fee_type, FeeType::Percentage);
        assert_eq!(config.fees.value, 0.002);
        assert_eq!(config.fees.min_fee, 1.0);
        assert_eq!(config.slippage.bps, 5.0);
        assert_eq!(config.replay.seek_size, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "account": { "initial_cash": 1000 },
            "fees": { "type": "fixed", "value": 2.5, "min_fee": 0 }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.account.initial_cash, 1000.0);
        assert_eq!(config.fees, FeeModel::fixed(2.5));
        assert_eq!(config.slippage, SlippageModel::default());
        assert_eq!(config.replay, ReplayConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.account.initial_cash = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.slippage.bps = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.replay.default_speed = 0.0;
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));

        config.replay.default_speed = 1e6;
        assert!(config.validate().is_err());
        config.replay.default_speed = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "slippage": { "bps": 10 } }"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.slippage.bps, 10.0);

        fs::write(&path, "{ not json").unwrap();
        assert!(Config::from_file(&path).is_err());
    }
}
