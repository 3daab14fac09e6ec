//! Risk: volatility-target sizing, drawdown stops, and the pre-trade chain.

pub mod chain;
pub mod engine;

pub use chain::{
    FixedSizer, MaxNotional, MaxPositionQty, OrderSizer, PercentNotionalSizer, RiskChain,
    RiskContext, RiskRule,
};
pub use engine::{RiskEngine, RiskEvent};
