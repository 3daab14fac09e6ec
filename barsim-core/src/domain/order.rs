//! Order types: sides, time-in-force, the order-kind union, and validation.

use super::ids::{OcoGroupId, OrderId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which way the order trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }

    /// Sign convention for fill quantities: buy +1, sell -1.
    pub fn sign(self) -> f64 {
        match self {
            OrderSide::Buy => 1.0,
            OrderSide::Sell => -1.0,
        }
    }
}

/// Whether an unfilled order persists past the bar that evaluated it.
///
/// The bar model has no partial fills, so IOC, FOK, and DAY collapse to the
/// same behavior: cancel if the bar did not fill the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good-till-cancel: stays working until filled or cancelled.
    Gtc,
    /// Immediate-or-cancel.
    Ioc,
    /// Fill-or-kill.
    Fok,
    /// Day order.
    Day,
}

impl TimeInForce {
    /// True for the TIFs that cancel when a bar leaves the order unfilled.
    pub fn cancels_if_unfilled(self) -> bool {
        !matches!(self, TimeInForce::Gtc)
    }
}

/// Trailing distance: a fixed price amount or a fraction of the anchor.
///
/// Exactly one form exists per trailing order; the "both or neither"
/// misconfiguration is unrepresentable here and surfaces as
/// [`OrderError::TrailingParams`] at construction from raw parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TrailBy {
    /// Absolute price distance from the anchor.
    Amount(f64),
    /// Fraction of the anchor, in (0, 1).
    Percent(f64),
}

impl TrailBy {
    /// Build from the raw optional-parameter form used by bracket construction.
    pub fn from_params(amount: Option<f64>, percent: Option<f64>) -> Result<Self, OrderError> {
        match (amount, percent) {
            (Some(a), None) => {
                if a.is_finite() && a > 0.0 {
                    Ok(TrailBy::Amount(a))
                } else {
                    Err(OrderError::InvalidTrailAmount(a))
                }
            }
            (None, Some(p)) => {
                if p.is_finite() && p > 0.0 && p < 1.0 {
                    Ok(TrailBy::Percent(p))
                } else {
                    Err(OrderError::InvalidTrailPercent(p))
                }
            }
            _ => Err(OrderError::TrailingParams),
        }
    }
}

/// What kind of order and its price parameters.
///
/// The trailing anchor lives inside the order value itself: the peak (for a
/// long exit, i.e. a sell) or trough (for a short exit, i.e. a buy) seen
/// since submission. It is the only mutable part of a working order, and it
/// moves only in the protective direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderKind {
    /// Fill at the evaluation bar's open.
    Market,
    /// Fill at exactly the limit price when the bar range touches it.
    Limit { limit_price: f64 },
    /// Trigger on the stop level, then fill as a gapped market order.
    Stop { stop_price: f64 },
    /// Trigger on the stop level, fill only if the limit also holds that bar.
    StopLimit { stop_price: f64, limit_price: f64 },
    /// Protective exit trailing the best price seen since submission.
    TrailingStop { trail: TrailBy, anchor: Option<f64> },
}

/// Errors from order construction and validation.
///
/// Construction errors are fatal to the submitting call and are never
/// silently coerced.
#[derive(Debug, Error, PartialEq)]
pub enum OrderError {
    #[error("order quantity must be positive and finite, got {0}")]
    InvalidQuantity(f64),

    #[error("order price must be positive and finite, got {0}")]
    InvalidPrice(f64),

    #[error("trail amount must be positive and finite, got {0}")]
    InvalidTrailAmount(f64),

    #[error("trail percent must be in (0, 1), got {0}")]
    InvalidTrailPercent(f64),

    #[error("trailing stop requires exactly one of trail amount or trail percent")]
    TrailingParams,

    #[error("trailing stop orders must be good-till-cancel")]
    TrailingTif,
}

/// A single order.
///
/// Exclusively owned by the paper book while working; removed (not mutated)
/// once filled or cancelled. The trailing anchor inside `kind` is the only
/// field the book mutates in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Assigned by the book at submission; zero until then.
    pub id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub kind: OrderKind,
    pub tif: TimeInForce,
    /// Bracket entry this order protects, if any.
    pub parent_id: Option<OrderId>,
    /// OCO group this order belongs to, if any.
    pub oco_group_id: Option<OcoGroupId>,
    /// Bar sequence at which a staged bracket child became working.
    /// Children activated during bar T are not eligible for fill until T+1.
    pub activated_seq: Option<u64>,
}

impl Order {
    pub fn new(symbol: impl Into<String>, side: OrderSide, quantity: f64, kind: OrderKind) -> Self {
        Self {
            id: OrderId(0),
            symbol: symbol.into(),
            side,
            quantity,
            kind,
            tif: TimeInForce::Gtc,
            parent_id: None,
            oco_group_id: None,
            activated_seq: None,
        }
    }

    pub fn with_tif(mut self, tif: TimeInForce) -> Self {
        self.tif = tif;
        self
    }

    /// Validate construction invariants.
    ///
    /// Price parameters must be finite and positive, quantity positive, and
    /// trailing orders good-till-cancel (a cancel-if-unfilled trailing order
    /// would die on its first bar by construction).
    pub fn validate(&self) -> Result<(), OrderError> {
        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err(OrderError::InvalidQuantity(self.quantity));
        }
        let check_price = |p: f64| {
            if p.is_finite() && p > 0.0 {
                Ok(())
            } else {
                Err(OrderError::InvalidPrice(p))
            }
        };
        match &self.kind {
            OrderKind::Market => Ok(()),
            OrderKind::Limit { limit_price } => check_price(*limit_price),
            OrderKind::Stop { stop_price } => check_price(*stop_price),
            OrderKind::StopLimit {
                stop_price,
                limit_price,
            } => {
                check_price(*stop_price)?;
                check_price(*limit_price)
            }
            OrderKind::TrailingStop { trail, .. } => {
                match *trail {
                    TrailBy::Amount(a) => {
                        if !a.is_finite() || a <= 0.0 {
                            return Err(OrderError::InvalidTrailAmount(a));
                        }
                    }
                    TrailBy::Percent(p) => {
                        if !p.is_finite() || p <= 0.0 || p >= 1.0 {
                            return Err(OrderError::InvalidTrailPercent(p));
                        }
                    }
                }
                if self.tif.cancels_if_unfilled() {
                    return Err(OrderError::TrailingTif);
                }
                Ok(())
            }
        }
    }
}
