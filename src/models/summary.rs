//! Derived, display-ready structures produced by the statistics and ranking engines.
//!
//! Everything here is recomputed from scratch on each aggregation pass and is
//! serialized as camelCase JSON for downstream consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::DataSource;

/// Confidence tier of a city aggregate, based on station count and parameter coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl DataQuality {
    /// Ordinal used for tie-breaking; higher is better.
    pub fn rank(&self) -> u8 {
        match self {
            DataQuality::Excellent => 3,
            DataQuality::Good => 2,
            DataQuality::Fair => 1,
            DataQuality::Poor => 0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DataQuality::Excellent => "excellent",
            DataQuality::Good => "good",
            DataQuality::Fair => "fair",
            DataQuality::Poor => "poor",
        }
    }
}

/// Per-city aggregate over all stations reporting for that city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityAggregate {
    pub name: String,
    pub country: Option<String>,
    #[serde(rename = "averageAQI")]
    pub average_aqi: f64,
    #[serde(rename = "minAQI")]
    pub min_aqi: u16,
    #[serde(rename = "maxAQI")]
    pub max_aqi: u16,
    pub station_count: usize,
    pub avg_pm25: Option<f64>,
    pub avg_pm10: Option<f64>,
    pub data_quality: DataQuality,
}

/// The station/city that holds the best or worst reading in a pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityHighlight {
    pub name: String,
    pub country: Option<String>,
    pub aqi: u16,
}

/// Global summary across every deduplicated record of a pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub total_stations: usize,
    pub total_cities: usize,
    pub total_countries: usize,
    pub by_source: BTreeMap<DataSource, usize>,
    #[serde(rename = "averageAQI")]
    pub average_aqi: f64,
    pub best_city: Option<CityHighlight>,
    pub worst_city: Option<CityHighlight>,
    pub last_updated: DateTime<Utc>,
}

/// Per-country breakdown shown alongside the global summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryStats {
    pub country: String,
    pub station_count: usize,
    pub city_count: usize,
    #[serde(rename = "averageAQI")]
    pub average_aqi: f64,
    #[serde(rename = "worstAQI")]
    pub worst_aqi: u16,
}
