//! Fill record — immutable result of a matched order.

use super::ids::OrderId;
use serde::{Deserialize, Serialize};

/// A fill. Created exactly once per order (the bar model has no partial
/// fills) and never mutated afterwards.
///
/// Quantity is signed: buys are positive, sells negative. The sign always
/// matches the order side. Commission is carried alongside the price, never
/// netted into it; `slippage_bps` records the adjustment that was applied to
/// market-style fills (zero for limit-priced fills).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: OrderId,
    pub quantity: f64,
    pub price: f64,
    pub commission: f64,
    pub slippage_bps: f64,
}

impl Fill {
    /// Gross traded value, always positive.
    pub fn notional(&self) -> f64 {
        self.quantity.abs() * self.price
    }

    pub fn is_buy(&self) -> bool {
        self.quantity > 0.0
    }
}
