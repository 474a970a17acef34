//! Maps raw provider payloads onto canonical `ObservationRecord`s.
//!
//! Every function here is pure: entries that cannot be interpreted (missing
//! values, unparseable numbers or timestamps) are skipped with a `debug!` line
//! rather than failing the whole payload.

use crate::aqi::{calculate_aqi, AqiResult};
use crate::models::openaq::{Latest, Location};
use crate::models::sensor_community::SensorReading;
use crate::models::waqi::WaqiStation;
use crate::models::{Coordinates, DataSource, ObservationRecord, Pollutants, StationLocation};
use chrono::{DateTime, NaiveDateTime, Utc};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::debug;

/// Builds a record whose AQI is derived from its pollutant concentrations.
pub fn build_record(
    id: String,
    location: StationLocation,
    parameters: Pollutants,
    source: DataSource,
    timestamp: DateTime<Utc>,
) -> ObservationRecord {
    let AqiResult { aqi, category } =
        calculate_aqi(parameters.pm25, parameters.pm10, parameters.no2, parameters.o3);
    ObservationRecord {
        id,
        location,
        parameters,
        aqi,
        aqi_category: category,
        source,
        timestamp,
        last_updated: None,
    }
}

/// Parses the timestamp formats providers use: RFC 3339, or a naive
/// `YYYY-MM-DD HH:MM:SS` taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// --- OpenAQ ---

#[derive(Default)]
struct LatestValues {
    pm25: Option<(f64, DateTime<Utc>)>,
    pm10: Option<(f64, DateTime<Utc>)>,
    coordinates: Option<Coordinates>,
}

impl LatestValues {
    /// Time of the most recent joined value.
    fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.pm25.iter().chain(self.pm10.iter()).map(|(_, t)| *t).max()
    }
}

fn openaq_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Option<Coordinates> {
    match (longitude, latitude) {
        (Some(lon), Some(lat)) => Some(Coordinates::new(lon, lat)),
        _ => None,
    }
}

/// Joins OpenAQ station metadata with the latest PM2.5 and PM10 values on `locationsId`.
///
/// Stations without any joined value are skipped. When a station has several
/// sensors for the same parameter, the most recent value wins. The record is
/// stamped with the later of the two parameters' observation times.
pub fn normalize_openaq(
    locations: &[Location],
    pm25: &[Latest],
    pm10: &[Latest],
) -> Vec<ObservationRecord> {
    let mut values: HashMap<i32, LatestValues> = HashMap::new();

    for (latest, is_pm25) in pm25
        .iter()
        .map(|l| (l, true))
        .chain(pm10.iter().map(|l| (l, false)))
    {
        if !latest.value.is_finite() || latest.value < 0.0 {
            debug!(
                "Skipping invalid OpenAQ value {} for location {}",
                latest.value, latest.locations_id
            );
            continue;
        }
        let entry = values.entry(latest.locations_id).or_default();
        let observed = latest.datetime.utc;

        let slot = if is_pm25 {
            &mut entry.pm25
        } else {
            &mut entry.pm10
        };
        if slot.map_or(true, |(_, t)| observed >= t) {
            *slot = Some((latest.value, observed));
        }
        if entry.coordinates.is_none() {
            entry.coordinates = latest
                .coordinates
                .as_ref()
                .and_then(|c| openaq_coordinates(c.latitude, c.longitude));
        }
    }

    locations
        .iter()
        .filter_map(|location| {
            let joined = values.remove(&location.id)?;
            let timestamp = joined
                .observed_at()
                .or_else(|| location.datetime_last.as_ref().map(|d| d.utc))?;
            let coordinates = openaq_coordinates(
                location.coordinates.latitude,
                location.coordinates.longitude,
            )
            .or(joined.coordinates);

            let station = StationLocation {
                name: location
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Location {}", location.id)),
                coordinates,
                city: non_empty(location.locality.as_deref()),
                region: non_empty(Some(location.country.code.as_str())),
            };
            let parameters = Pollutants {
                pm25: joined.pm25.map(|(value, _)| value),
                pm10: joined.pm10.map(|(value, _)| value),
                ..Pollutants::default()
            };

            let mut record = build_record(
                format!("{}:{}", DataSource::OpenAq, location.id),
                station,
                parameters,
                DataSource::OpenAq,
                timestamp,
            );
            record.last_updated = location.datetime_last.as_ref().map(|d| d.utc);
            Some(record)
        })
        .collect()
}

// --- WAQI ---

/// Splits a WAQI station label (`"Station, City, Country"`) into
/// `(station, city, region)`.
pub fn split_waqi_name(label: &str) -> (String, Option<String>, Option<String>) {
    let parts: Vec<&str> = label
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    match parts.as_slice() {
        [] => (label.trim().to_string(), None, None),
        [only] => (only.to_string(), None, None),
        [city, region] => (
            city.to_string(),
            Some(city.to_string()),
            Some(region.to_string()),
        ),
        [station, .., city, region] => (
            station.to_string(),
            Some(city.to_string()),
            Some(region.to_string()),
        ),
    }
}

/// Converts WAQI stations. WAQI publishes the index itself, so concentrations stay empty.
pub fn normalize_waqi(stations: &[WaqiStation]) -> Vec<ObservationRecord> {
    stations
        .iter()
        .filter_map(|s| {
            let aqi = match s.aqi.trim().parse::<f64>() {
                Ok(v) if v.is_finite() && v >= 0.0 => v.round() as u16,
                _ => {
                    debug!("Skipping WAQI station {} without AQI ({:?})", s.uid, s.aqi);
                    return None;
                },
            };
            let Some(timestamp) = parse_timestamp(&s.station.time) else {
                debug!(
                    "Skipping WAQI station {} with unparseable time {:?}",
                    s.uid, s.station.time
                );
                return None;
            };
            let (name, city, region) = split_waqi_name(&s.station.name);
            let AqiResult { aqi, category } = AqiResult::from_aqi(aqi);

            Some(ObservationRecord {
                id: format!("{}:{}", DataSource::Waqi, s.uid),
                location: StationLocation {
                    name,
                    coordinates: Some(Coordinates::new(s.lon, s.lat)),
                    city,
                    region,
                },
                parameters: Pollutants::default(),
                aqi,
                aqi_category: category,
                source: DataSource::Waqi,
                timestamp,
                last_updated: None,
            })
        })
        .collect()
}

// --- Sensor.Community ---

fn normalize_sensor_reading(reading: &SensorReading) -> Option<ObservationRecord> {
    let latitude = reading.location.latitude.trim().parse::<f64>().ok()?;
    let longitude = reading.location.longitude.trim().parse::<f64>().ok()?;
    let timestamp = parse_timestamp(&reading.timestamp)?;

    let mut parameters = Pollutants::default();
    for v in &reading.sensordatavalues {
        let value = v
            .value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|x| x.is_finite() && *x >= 0.0);
        match v.value_type.as_str() {
            "P1" => parameters.pm10 = value,
            "P2" => parameters.pm25 = value,
            _ => {},
        }
    }
    if parameters.is_empty() {
        return None;
    }

    let region = non_empty(reading.location.country.as_deref());
    Some(build_record(
        format!("{}:{}", DataSource::SensorCommunity, reading.id),
        StationLocation {
            name: format!("Sensor {}", reading.location.id),
            coordinates: Some(Coordinates::new(longitude, latitude)),
            city: None,
            region,
        },
        parameters,
        DataSource::SensorCommunity,
        timestamp,
    ))
}

/// Converts the Sensor.Community dust feed. The feed is large, so entries are normalized in parallel.
pub fn normalize_sensor_community(readings: &[SensorReading]) -> Vec<ObservationRecord> {
    let records: Vec<ObservationRecord> = readings
        .par_iter()
        .filter_map(normalize_sensor_reading)
        .collect();
    debug!(
        "Normalized {} of {} Sensor.Community readings",
        records.len(),
        readings.len()
    );
    records
}
