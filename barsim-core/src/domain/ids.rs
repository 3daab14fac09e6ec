//! Identifier newtypes for orders and OCO groups.
//!
//! Ids are allocated by the paper book from monotonic counters, so ordering
//! by id is creation order. Replay determinism relies on this: iterating the
//! working-order map in id order visits orders in the order they were created.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order id, unique within one book.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "order-{}", self.0)
    }
}

/// One-cancels-other group id, unique within one book.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct OcoGroupId(pub u64);

impl fmt::Display for OcoGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "oco-{}", self.0)
    }
}
