//! Derivations over a deduplicated record set: global statistics and city rankings.

mod ranking;
mod stats;

pub use ranking::*;
pub use stats::*;
