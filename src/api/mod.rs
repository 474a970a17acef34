//! Provider adapters for the upstream air quality APIs.
//!
//! Includes:
//! - `provider`: the `DataProvider` trait, the fail-soft call guard and the provider registry.
//! - `openaq`: OpenAQ v3 (requires `OPENAQ_KEY`).
//! - `waqi`: World Air Quality Index (requires `WAQI_TOKEN`).
//! - `sensor_community`: Sensor.Community dust feed (no key).
//! - `fallback`: deterministic data used when every provider comes back empty.

mod fallback;
mod openaq;
mod provider;
mod sensor_community;
mod waqi;


pub use fallback::*;
pub use openaq::*;
pub use provider::*;
pub use sensor_community::*;
pub use waqi::*;
