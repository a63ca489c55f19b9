//! Analysis history.
//!
//! Previously submitted analyses are kept as JSON documents, one per run,
//! grouped by user, so they can be listed and replayed later.

pub mod store;

pub use store::*;
