//! The per-request aggregation pipeline: concurrent fetch, then spatial deduplication.

mod aggregator;
mod dedup;
mod settle;

pub use aggregator::*;
pub use dedup::*;
pub use settle::*;
