//! Domain events and the typed publish/subscribe bus.

pub mod bus;

pub use bus::{shared, EventBus, EventHandler, HandlerError, SharedHandler};

use crate::domain::{Bar, Fill, Order, OrderId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discriminant for [`Event`] — the subscription key of the bus registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Tick,
    OrderRequested,
    OrderAuthorized,
    OrderRejected,
    OrderFilled,
    PortfolioUpdated,
}

/// Portfolio state snapshot, published after fills and at every tick.
///
/// The `PortfolioUpdated` stream is the sole, append-only audit channel of a
/// run for downstream reporting collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub timestamp: DateTime<Utc>,
    pub cash: f64,
    pub position: f64,
    pub equity: f64,
    pub unrealized_pnl: f64,
    pub realized_pnl: f64,
}

/// One variant per domain event. Dispatch is by variant: the bus keeps a
/// registry of kind → ordered subscriber list and invokes it synchronously.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A new bar from the external data feed.
    Tick(Bar),
    /// A strategy wants an order placed.
    OrderRequested { order: Order, strategy_id: String },
    /// The risk guard let the order through.
    OrderAuthorized { order: Order },
    /// The order was refused, at the guard or at submission.
    OrderRejected { order: Order, reason: String },
    /// The book produced a fill.
    OrderFilled { fill: Fill, order_id: OrderId },
    /// Portfolio state after processing.
    PortfolioUpdated(PortfolioSnapshot),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Tick(_) => EventKind::Tick,
            Event::OrderRequested { .. } => EventKind::OrderRequested,
            Event::OrderAuthorized { .. } => EventKind::OrderAuthorized,
            Event::OrderRejected { .. } => EventKind::OrderRejected,
            Event::OrderFilled { .. } => EventKind::OrderFilled,
            Event::PortfolioUpdated(_) => EventKind::PortfolioUpdated,
        }
    }
}
