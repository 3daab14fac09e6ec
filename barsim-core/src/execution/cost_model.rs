//! Cost model — slippage and commission in basis points.
//!
//! Slippage is directional: buyers pay up, sellers receive down. It applies
//! to market-style fill prices only (market orders, gapped stop fills,
//! synthetic trailing exits); limit-priced fills trade at exactly the limit.
//! Commission is symmetric per side and attached to the fill, never netted
//! into the price.

use crate::config::SimConfig;
use crate::domain::OrderSide;

#[derive(Debug, Clone, PartialEq)]
pub struct CostModel {
    /// Slippage in basis points, applied directionally.
    pub slippage_bps: f64,
    /// Commission in basis points per side.
    pub commission_bps: f64,
}

impl CostModel {
    pub fn new(slippage_bps: f64, commission_bps: f64) -> Self {
        Self {
            slippage_bps,
            commission_bps,
        }
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.slippage_bps, config.commission_bps)
    }

    /// Apply directional slippage to a raw market-style price.
    pub fn apply_slippage(&self, raw_price: f64, side: OrderSide) -> f64 {
        if self.slippage_bps == 0.0 {
            return raw_price;
        }
        let fraction = self.slippage_bps / 10_000.0;
        match side {
            OrderSide::Buy => raw_price * (1.0 + fraction),
            OrderSide::Sell => raw_price * (1.0 - fraction),
        }
    }

    /// Commission for a fill: `|fill_price * qty| * commission_bps / 1e4`.
    pub fn commission(&self, fill_price: f64, quantity: f64) -> f64 {
        (fill_price * quantity).abs() * (self.commission_bps / 10_000.0)
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::frictionless()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frictionless_returns_raw_price() {
        let cost = CostModel::frictionless();
        assert_eq!(cost.apply_slippage(100.0, OrderSide::Buy), 100.0);
        assert_eq!(cost.commission(100.0, 50.0), 0.0);
    }

    #[test]
    fn buy_slippage_increases_price() {
        let cost = CostModel::new(10.0, 0.0);
        let price = cost.apply_slippage(100.0, OrderSide::Buy);
        assert!((price - 100.10).abs() < 1e-10);
    }

    #[test]
    fn sell_slippage_decreases_price() {
        let cost = CostModel::new(10.0, 0.0);
        let price = cost.apply_slippage(100.0, OrderSide::Sell);
        assert!((price - 99.90).abs() < 1e-10);
    }

    #[test]
    fn commission_is_bps_of_notional() {
        let cost = CostModel::new(0.0, 10.0);
        // 100 * 50 * 10bps = 5.0, sign-insensitive
        assert!((cost.commission(100.0, 50.0) - 5.0).abs() < 1e-10);
        assert!((cost.commission(100.0, -50.0) - 5.0).abs() < 1e-10);
    }
}
