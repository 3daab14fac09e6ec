//! Execution: cost model, bar matcher, and the paper book.

pub mod book;
pub mod cost_model;
pub mod matcher;

pub use book::{PaperBook, Submitted};
pub use cost_model::CostModel;
pub use matcher::{match_order, MatchOutcome};
