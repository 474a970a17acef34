//! Global and per-country statistics over a deduplicated record set.

use crate::models::{CityHighlight, CountryStats, GlobalStats, ObservationRecord};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};

fn highlight(record: &ObservationRecord) -> CityHighlight {
    CityHighlight {
        name: record.display_city().to_string(),
        country: record.location.region.clone(),
        aqi: record.aqi,
    }
}

/// Computes `GlobalStats` in a single pass over `records`.
///
/// The worst city is the highest AQI seen; the best city is the lowest AQI
/// above zero (a zero reading is treated as "no data"). Ties keep the first
/// record seen. An empty input yields zero counts and no best/worst city.
pub fn calculate_stats(records: &[ObservationRecord]) -> GlobalStats {
    let mut by_source = BTreeMap::new();
    let mut cities: HashSet<(&str, Option<&str>)> = HashSet::new();
    let mut countries: HashSet<&str> = HashSet::new();
    let mut aqi_sum: u64 = 0;
    let mut worst: Option<&ObservationRecord> = None;
    let mut best: Option<&ObservationRecord> = None;
    let mut newest: Option<DateTime<Utc>> = None;

    for record in records {
        *by_source.entry(record.source).or_insert(0usize) += 1;

        let region = record.location.region.as_deref();
        if let Some(city) = record.location.city.as_deref() {
            cities.insert((city, region));
        }
        if let Some(region) = region {
            countries.insert(region);
        }

        aqi_sum += u64::from(record.aqi);

        if worst.map_or(true, |w| record.aqi > w.aqi) {
            worst = Some(record);
        }
        if record.aqi > 0 && best.map_or(true, |b| record.aqi < b.aqi) {
            best = Some(record);
        }
        if newest.map_or(true, |t| record.timestamp > t) {
            newest = Some(record.timestamp);
        }
    }

    let average_aqi = if records.is_empty() {
        0.0
    } else {
        aqi_sum as f64 / records.len() as f64
    };

    GlobalStats {
        total_stations: records.len(),
        total_cities: cities.len(),
        total_countries: countries.len(),
        by_source,
        average_aqi,
        best_city: best.map(highlight),
        worst_city: worst.map(highlight),
        last_updated: newest.unwrap_or_else(Utc::now),
    }
}

#[derive(Default)]
struct CountryAccumulator<'a> {
    stations: usize,
    cities: HashSet<&'a str>,
    aqi_sum: u64,
    worst: u16,
}

/// Per-country breakdown, sorted by average AQI (worst first, then by country code).
/// Records without a region are not attributed to any country.
pub fn calculate_country_stats(records: &[ObservationRecord]) -> Vec<CountryStats> {
    let mut by_country: HashMap<&str, CountryAccumulator> = HashMap::new();

    for record in records {
        let Some(country) = record.location.region.as_deref() else {
            continue;
        };
        let acc = by_country.entry(country).or_default();
        acc.stations += 1;
        acc.aqi_sum += u64::from(record.aqi);
        acc.worst = acc.worst.max(record.aqi);
        if let Some(city) = record.location.city.as_deref() {
            acc.cities.insert(city);
        }
    }

    let mut stats: Vec<CountryStats> = by_country
        .into_iter()
        .map(|(country, acc)| CountryStats {
            country: country.to_string(),
            station_count: acc.stations,
            city_count: acc.cities.len(),
            average_aqi: acc.aqi_sum as f64 / acc.stations as f64,
            worst_aqi: acc.worst,
        })
        .collect();

    stats.sort_by(|a, b| {
        b.average_aqi
            .total_cmp(&a.average_aqi)
            .then_with(|| a.country.cmp(&b.country))
    });
    stats
}
