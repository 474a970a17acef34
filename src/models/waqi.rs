//! Structs for deserializing World Air Quality Index (aqicn.org) map responses.

use serde::{Deserialize, Serialize};

/// Envelope of `/map/bounds`. `status` is `"ok"` on success; on failure `data`
/// holds an error message string instead of an array.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WaqiBoundsResponse {
    pub status: String,
    pub data: serde_json::Value,
}

/// A station entry of the bounds response.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WaqiStation {
    pub lat: f64,
    pub lon: f64,
    pub uid: i64,
    /// Pre-computed US EPA AQI, as a string; `"-"` when the station has no data.
    pub aqi: String,
    pub station: WaqiStationInfo,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WaqiStationInfo {
    /// Usually `"Station, City, Country"`, but any number of parts occurs.
    pub name: String,
    /// ISO-8601 timestamp with offset, e.g. `2024-03-10T12:00:00+09:00`.
    pub time: String,
}
