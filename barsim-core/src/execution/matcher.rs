//! Bar matcher — pure order-kind × time-in-force fill rules.
//!
//! `match_order` is a pure function of (order, bar, cost model): no hidden
//! randomness and no dependency on other orders' outcomes. Per kind:
//!
//! - MARKET fills at the bar open, adjusted by directional slippage.
//! - LIMIT fills at exactly the limit price when `low <= limit <= high`;
//!   no price improvement is modeled.
//! - STOP triggers on `high >= stop` (buy) / `low <= stop` (sell) and fills
//!   as a gapped market order at `max(open, stop)` / `min(open, stop)`.
//! - STOP_LIMIT triggers per STOP and fills only if the limit condition also
//!   holds in the same bar, at exactly the limit price.
//! - TRAILING_STOP is never matched here; the book's trailing pass owns it.
//!
//! Unfilled GTC orders stay working; unfilled IOC/FOK/DAY orders cancel
//! (the bar model has no partial fills to distinguish them).

use super::cost_model::CostModel;
use crate::domain::{Bar, Fill, Order, OrderKind, OrderSide};

/// Outcome of evaluating one order against one bar.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// The order filled at the contained price.
    Filled(Fill),
    /// The order did not fill and stays working (GTC).
    Working,
    /// The order did not fill and is cancelled (IOC/FOK/DAY).
    Cancelled,
}

/// Evaluate `order` against `bar`.
pub fn match_order(order: &Order, bar: &Bar, cost: &CostModel) -> MatchOutcome {
    let fill_price = match &order.kind {
        OrderKind::Market => Some(MatchedPrice::market(bar.open)),
        OrderKind::Limit { limit_price } => limit_touch(bar, *limit_price),
        OrderKind::Stop { stop_price } => stop_trigger(order.side, bar, *stop_price),
        OrderKind::StopLimit {
            stop_price,
            limit_price,
        } => {
            if stop_triggered(order.side, bar, *stop_price) {
                limit_touch(bar, *limit_price)
            } else {
                None
            }
        }
        // Trailing stops only fill through the book's trailing pass.
        OrderKind::TrailingStop { .. } => return MatchOutcome::Working,
    };

    match fill_price {
        Some(price) => MatchOutcome::Filled(build_fill(order, price, cost)),
        None if order.tif.cancels_if_unfilled() => MatchOutcome::Cancelled,
        None => MatchOutcome::Working,
    }
}

/// A raw fill price plus whether it takes market-style slippage.
struct MatchedPrice {
    raw: f64,
    slips: bool,
}

impl MatchedPrice {
    fn market(raw: f64) -> Self {
        Self { raw, slips: true }
    }

    fn at_limit(raw: f64) -> Self {
        Self { raw, slips: false }
    }
}

/// Limit condition: the bar range touches the limit; fills exactly there.
fn limit_touch(bar: &Bar, limit: f64) -> Option<MatchedPrice> {
    (bar.low <= limit && limit <= bar.high).then(|| MatchedPrice::at_limit(limit))
}

fn stop_triggered(side: OrderSide, bar: &Bar, stop: f64) -> bool {
    match side {
        OrderSide::Buy => bar.high >= stop,
        OrderSide::Sell => bar.low <= stop,
    }
}

/// Stop trigger and gapped fill price: the worse of open and stop.
fn stop_trigger(side: OrderSide, bar: &Bar, stop: f64) -> Option<MatchedPrice> {
    if !stop_triggered(side, bar, stop) {
        return None;
    }
    let raw = match side {
        OrderSide::Buy => bar.open.max(stop),
        OrderSide::Sell => bar.open.min(stop),
    };
    Some(MatchedPrice::market(raw))
}

fn build_fill(order: &Order, price: MatchedPrice, cost: &CostModel) -> Fill {
    let (fill_price, slippage_bps) = if price.slips {
        (cost.apply_slippage(price.raw, order.side), cost.slippage_bps)
    } else {
        (price.raw, 0.0)
    };
    Fill {
        order_id: order.id,
        quantity: order.side.sign() * order.quantity,
        price: fill_price,
        commission: cost.commission(fill_price, order.quantity),
        slippage_bps,
    }
}
