//! Structs for the Sensor.Community (formerly luftdaten.info) static JSON feeds.
//!
//! The feed encodes numbers as strings, so conversion happens in the normalizer.

use serde::{Deserialize, Serialize};

/// One sensor reading from `data.dust.min.json`.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SensorReading {
    pub id: i64,
    /// `YYYY-MM-DD HH:MM:SS` in UTC.
    pub timestamp: String,
    pub location: SensorLocation,
    pub sensordatavalues: Vec<SensorDataValue>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SensorLocation {
    pub id: i64,
    pub latitude: String,
    pub longitude: String,
    #[serde(default)]
    pub country: Option<String>,
}

/// `P1` is PM10 and `P2` is PM2.5, both in µg/m³.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SensorDataValue {
    pub value_type: String,
    pub value: String,
}
