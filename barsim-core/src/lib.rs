//! BarSim Core — deterministic bar-replay paper execution for backtesting.
//!
//! This crate contains the heart of the simulator:
//! - Domain types (bars, orders, fills, brackets, ids)
//! - Typed publish/subscribe event bus with one variant per domain event
//! - Pure bar matcher (market/limit/stop/stop-limit across time-in-force)
//! - Paper execution book with bracket/OCO/trailing-stop lifecycle
//! - Volatility-target risk sizing, drawdown stops, and a pre-trade chain
//! - Bus-wired strategy/guard/execution/portfolio components
//!
//! Given the same (orders, bars, configuration) triple, a fresh simulation
//! produces bit-identical fills. Everything is single-threaded and
//! synchronous; parallel backtests each own an independent bus and book.

pub mod config;
pub mod domain;
pub mod events;
pub mod execution;
pub mod risk;
pub mod sim;
