//! Simulation configuration: trading frictions, starting cash, risk knobs.
//!
//! Plain values with documented defaults; deserializable from TOML.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration consumed by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Commission per side, in basis points of traded notional. Default 0.
    pub commission_bps: f64,
    /// Directional slippage on market-style fills, in basis points. Default 0.
    pub slippage_bps: f64,
    /// Starting cash. Default 100_000.
    pub initial_cash: f64,
    pub risk: RiskConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            commission_bps: 0.0,
            slippage_bps: 0.0,
            initial_cash: 100_000.0,
            risk: RiskConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

/// Risk engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Master switch; when off, sizing passes signals through. Default true.
    pub enabled: bool,
    /// Target annualized volatility in percent (e.g. 15.0 for 15%).
    /// `None` disables vol targeting. Default `None`.
    pub vol_target_pct: Option<f64>,
    /// EWMA span for the volatility estimate, in bars; floored at 2.
    /// Default 20.
    pub vol_lookback: usize,
    /// Periods per year for annualization. Default 252.
    pub ann_factor: f64,
    /// Price-drawdown stop threshold in percent (e.g. 5.0 for 5%).
    /// `None` disables the stop. Default `None`.
    pub stop_loss_pct: Option<f64>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            vol_target_pct: None,
            vol_lookback: 20,
            ann_factor: 252.0,
            stop_loss_pct: None,
        }
    }
}
