//! Analysis modules.
//!
//! Aggregation of a single run into per-model views, and monthly
//! aggregates over stored history.

pub mod aggregator;
pub mod monthly;

pub use aggregator::*;
pub use monthly::*;
