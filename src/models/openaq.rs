//! Structs for deserializing OpenAQ API v3 responses.
//!
//! Trimmed to the two endpoints the provider calls; unknown fields are ignored by serde.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generic metadata block of v3 responses.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MetaV3 {
    pub name: String,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    /// Either a number or a string such as ">1000".
    #[serde(default)]
    pub found: Option<serde_json::Value>,
}

/// Represents geographical coordinates as OpenAQ reports them (both may be null).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAqCoordinates {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Date and time with UTC and local variants.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatetimeObject {
    pub utc: DateTime<Utc>,
    pub local: String, // Keep as string as timezone info might vary
}

/// Base representation of a country.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CountryBase {
    pub id: Option<i32>,
    pub code: String,
    pub name: String,
}

/// Base representation of a provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderBase {
    pub id: i32,
    pub name: String,
}

/// Response structure for the `/v3/locations` endpoint.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LocationsResponse {
    pub meta: MetaV3,
    pub results: Vec<Location>,
}

/// A single monitoring location from `/v3/locations`.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: i32,
    pub name: Option<String>,
    pub locality: Option<String>, // Often the city name
    pub country: CountryBase,
    pub provider: Option<ProviderBase>,
    pub coordinates: OpenAqCoordinates,
    #[serde(default)]
    pub is_mobile: bool,
    #[serde(default)]
    pub is_monitor: bool,
    pub datetime_last: Option<DatetimeObject>,
}

/// Response structure for the `/v3/parameters/{id}/latest` endpoint.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LatestResponse {
    pub meta: MetaV3,
    pub results: Vec<Latest>,
}

/// Latest value reported by one sensor for the requested parameter.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Latest {
    pub datetime: DatetimeObject,
    pub value: f64,
    pub coordinates: Option<OpenAqCoordinates>,
    pub sensors_id: i32,
    pub locations_id: i32,
}
