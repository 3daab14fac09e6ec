//! Domain types: bars, identifiers, orders, fills, brackets.

pub mod bar;
pub mod bracket;
pub mod fill;
pub mod ids;
pub mod order;

pub use bar::Bar;
pub use bracket::{build_bracket, BracketOrder};
pub use fill::Fill;
pub use ids::{OcoGroupId, OrderId};
pub use order::{Order, OrderError, OrderKind, OrderSide, TimeInForce, TrailBy};
