//! Analysis modules.
//!
//! Grouping of replicate records and the statistics computed per group.

pub mod aggregator;
pub mod stats;

pub use aggregator::{AggregateSpec, Aggregator};
