//! Canonical observation types shared by every provider adapter.
//!
//! Provider payloads are normalized into `ObservationRecord`s before any
//! deduplication, statistics or ranking takes place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound of the AQI scale.
pub const AQI_MAX: u16 = 500;

/// Tag identifying the provider a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataSource {
    OpenAq,
    Waqi,
    SensorCommunity,
    /// Deterministic data substituted when every provider came back empty.
    Fallback,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::OpenAq => "openaq",
            DataSource::Waqi => "waqi",
            DataSource::SensorCommunity => "sensor-community",
            DataSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health category attached to an AQI score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AqiCategory {
    Good,
    Moderate,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    /// Maps a score onto its category.
    ///
    /// The 101–200 span is a single `Unhealthy` tier: the EPA "unhealthy for
    /// sensitive groups" band (101–150) is folded into it.
    pub fn from_aqi(aqi: u16) -> Self {
        match aqi {
            0..=50 => AqiCategory::Good,
            51..=100 => AqiCategory::Moderate,
            101..=200 => AqiCategory::Unhealthy,
            201..=300 => AqiCategory::VeryUnhealthy,
            _ => AqiCategory::Hazardous,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }

    /// Hex colour commonly used to render the category.
    pub fn color(&self) -> &'static str {
        match self {
            AqiCategory::Good => "#00E400",
            AqiCategory::Moderate => "#FFFF00",
            AqiCategory::Unhealthy => "#FF0000",
            AqiCategory::VeryUnhealthy => "#8F3F97",
            AqiCategory::Hazardous => "#7E0023",
        }
    }
}

/// Geographic position of a station, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinates {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.longitude.is_finite() && self.latitude.is_finite()
    }
}

/// Where a station sits: its own name plus optional city and region (country code).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationLocation {
    pub name: String,
    pub coordinates: Option<Coordinates>,
    pub city: Option<String>,
    pub region: Option<String>,
}

/// Pollutant concentrations. PM in µg/m³; gases in ppb (CO in ppm).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pollutants {
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub no2: Option<f64>,
    pub so2: Option<f64>,
    pub o3: Option<f64>,
    pub co: Option<f64>,
}

impl Pollutants {
    pub fn is_empty(&self) -> bool {
        self.pm25.is_none()
            && self.pm10.is_none()
            && self.no2.is_none()
            && self.so2.is_none()
            && self.o3.is_none()
            && self.co.is_none()
    }
}

/// A single normalized station reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationRecord {
    pub id: String,
    pub location: StationLocation,
    pub parameters: Pollutants,
    pub aqi: u16,
    pub aqi_category: AqiCategory,
    pub source: DataSource,
    pub timestamp: DateTime<Utc>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl ObservationRecord {
    /// City name when known, otherwise the station name.
    pub fn display_city(&self) -> &str {
        self.location
            .city
            .as_deref()
            .unwrap_or(&self.location.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_thresholds() {
        assert_eq!(AqiCategory::from_aqi(0), AqiCategory::Good);
        assert_eq!(AqiCategory::from_aqi(50), AqiCategory::Good);
        assert_eq!(AqiCategory::from_aqi(51), AqiCategory::Moderate);
        assert_eq!(AqiCategory::from_aqi(100), AqiCategory::Moderate);
        assert_eq!(AqiCategory::from_aqi(150), AqiCategory::Unhealthy);
        assert_eq!(AqiCategory::from_aqi(200), AqiCategory::Unhealthy);
        assert_eq!(AqiCategory::from_aqi(201), AqiCategory::VeryUnhealthy);
        assert_eq!(AqiCategory::from_aqi(300), AqiCategory::VeryUnhealthy);
        assert_eq!(AqiCategory::from_aqi(301), AqiCategory::Hazardous);
        assert_eq!(AqiCategory::from_aqi(500), AqiCategory::Hazardous);
    }

    #[test]
    fn test_serialized_tags_are_kebab_case() {
        let json = serde_json::to_string(&AqiCategory::VeryUnhealthy).unwrap();
        assert_eq!(json, "\"very-unhealthy\"");
        let json = serde_json::to_string(&DataSource::SensorCommunity).unwrap();
        assert_eq!(json, "\"sensor-community\"");
    }
}
