//! Pre-trade risk chain — sizers propose quantity, rules clamp or veto.
//!
//! A `RiskChain` turns trade intent into a concrete order: the sizer picks a
//! quantity from the current context, then each rule in order either passes
//! the order through (possibly with a clamped quantity) or vetoes it.

use crate::domain::{Order, OrderKind, OrderSide, TimeInForce};

/// Snapshot of account state the chain evaluates against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskContext {
    /// Signed current position quantity.
    pub position_qty: f64,
    /// Capital available for sizing.
    pub capital: f64,
    /// Most recent trade price for notional estimates.
    pub last_price: f64,
}

/// One pre-trade check. Returns the (possibly clamped) order, or `None` to
/// veto it.
pub trait RiskRule {
    fn name(&self) -> &str;
    fn apply(&self, order: Order, ctx: &RiskContext) -> Option<Order>;
}

/// Caps total absolute position quantity.
#[derive(Debug, Clone)]
pub struct MaxPositionQty {
    pub max_qty: f64,
}

impl RiskRule for MaxPositionQty {
    fn name(&self) -> &str {
        "max_position_qty"
    }

    fn apply(&self, mut order: Order, ctx: &RiskContext) -> Option<Order> {
        let available = self.max_qty - ctx.position_qty.abs();
        if available <= 0.0 {
            return None;
        }
        let allowed = order.quantity.min(available);
        if allowed <= 0.0 {
            return None;
        }
        order.quantity = allowed;
        Some(order)
    }
}

/// Caps single-order notional at the last trade price.
#[derive(Debug, Clone)]
pub struct MaxNotional {
    pub max_notional: f64,
}

impl RiskRule for MaxNotional {
    fn name(&self) -> &str {
        "max_notional"
    }

    fn apply(&self, mut order: Order, ctx: &RiskContext) -> Option<Order> {
        let price = ctx.last_price.max(1e-12);
        let max_qty = self.max_notional / price;
        let allowed = order.quantity.min(max_qty);
        if allowed <= 0.0 {
            return None;
        }
        order.quantity = allowed;
        Some(order)
    }
}

/// Turns context into a proposed order quantity.
pub trait OrderSizer {
    fn name(&self) -> &str;
    fn size(&self, ctx: &RiskContext) -> f64;
}

/// Always the same quantity.
#[derive(Debug, Clone)]
pub struct FixedSizer {
    pub qty: f64,
}

impl OrderSizer for FixedSizer {
    fn name(&self) -> &str {
        "fixed"
    }

    fn size(&self, _ctx: &RiskContext) -> f64 {
        self.qty
    }
}

/// A fraction of capital, converted to quantity at the last price.
#[derive(Debug, Clone)]
pub struct PercentNotionalSizer {
    /// Fraction of capital per trade, in (0, 1].
    pub percent: f64,
}

impl OrderSizer for PercentNotionalSizer {
    fn name(&self) -> &str {
        "percent_notional"
    }

    fn size(&self, ctx: &RiskContext) -> f64 {
        if ctx.last_price <= 0.0 {
            return 0.0;
        }
        (ctx.capital * self.percent) / ctx.last_price
    }
}

/// Sizer + ordered rules.
#[derive(Default)]
pub struct RiskChain {
    rules: Vec<Box<dyn RiskRule>>,
    sizer: Option<Box<dyn OrderSizer>>,
}

impl RiskChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sizer(mut self, sizer: impl OrderSizer + 'static) -> Self {
        self.sizer = Some(Box::new(sizer));
        self
    }

    pub fn with_rule(mut self, rule: impl RiskRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Size and check a trade intent. `None` when there is no sizer, the
    /// sized quantity is non-positive, or any rule vetoes.
    pub fn propose(
        &self,
        symbol: &str,
        side: OrderSide,
        kind: OrderKind,
        tif: TimeInForce,
        ctx: &RiskContext,
    ) -> Option<Order> {
        let sizer = self.sizer.as_ref()?;
        let qty = sizer.size(ctx);
        if qty <= 0.0 || !qty.is_finite() {
            return None;
        }
        let order = Order::new(symbol, side, qty, kind).with_tif(tif);
        self.process(order, ctx)
    }

    /// Run an already-built order through the rules in order.
    pub fn process(&self, order: Order, ctx: &RiskContext) -> Option<Order> {
        let mut current = order;
        for rule in &self.rules {
            current = rule.apply(current, ctx)?;
        }
        Some(current)
    }
}
