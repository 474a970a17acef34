//! Defines the data structures and models used throughout the application.
//!
//! This includes the canonical observation record, the derived summaries, and the
//! raw payload structures of each upstream provider.

mod observation;
mod summary;

pub mod openaq;
pub mod sensor_community;
pub mod waqi;

pub use observation::*;
pub use summary::*;
