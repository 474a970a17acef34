//! City rankings: per-city aggregates and best/worst ordering.

use crate::models::{CityAggregate, DataQuality, ObservationRecord, AQI_MAX};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Quality tier from station count and whether both PM2.5 and PM10 were reported.
pub fn data_quality(station_count: usize, has_pm25_and_pm10: bool) -> DataQuality {
    if station_count >= 3 && has_pm25_and_pm10 {
        DataQuality::Excellent
    } else if station_count >= 2 || has_pm25_and_pm10 {
        DataQuality::Good
    } else if station_count >= 1 {
        DataQuality::Fair
    } else {
        DataQuality::Poor
    }
}

struct CityAccumulator {
    name: String,
    country: Option<String>,
    stations: usize,
    aqi_sum: u64,
    min_aqi: u16,
    max_aqi: u16,
    pm25: (f64, usize),
    pm10: (f64, usize),
}

impl CityAccumulator {
    fn new(name: &str, country: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            country: country.map(str::to_string),
            stations: 0,
            aqi_sum: 0,
            min_aqi: u16::MAX,
            max_aqi: 0,
            pm25: (0.0, 0),
            pm10: (0.0, 0),
        }
    }

    fn add(&mut self, record: &ObservationRecord) {
        self.stations += 1;
        self.aqi_sum += u64::from(record.aqi);
        self.min_aqi = self.min_aqi.min(record.aqi);
        self.max_aqi = self.max_aqi.max(record.aqi);
        if let Some(v) = record.parameters.pm25.filter(|v| v.is_finite()) {
            self.pm25.0 += v;
            self.pm25.1 += 1;
        }
        if let Some(v) = record.parameters.pm10.filter(|v| v.is_finite()) {
            self.pm10.0 += v;
            self.pm10.1 += 1;
        }
    }

    fn finish(self) -> CityAggregate {
        let mean = |(sum, n): (f64, usize)| (n > 0).then(|| sum / n as f64);
        let avg_pm25 = mean(self.pm25);
        let avg_pm10 = mean(self.pm10);
        CityAggregate {
            name: self.name,
            country: self.country,
            average_aqi: self.aqi_sum as f64 / self.stations as f64,
            min_aqi: self.min_aqi,
            max_aqi: self.max_aqi,
            station_count: self.stations,
            avg_pm25,
            avg_pm10,
            data_quality: data_quality(
                self.stations,
                avg_pm25.is_some() && avg_pm10.is_some(),
            ),
        }
    }
}

/// Groups valid records by city and aggregates each group.
///
/// Only records with a city and `0 < aqi < 500` take part; the rest are
/// silently skipped. Cities are keyed by name and region, and returned in the
/// order they were first seen.
pub fn city_rankings(records: &[ObservationRecord]) -> Vec<CityAggregate> {
    let mut index: HashMap<(&str, Option<&str>), usize> = HashMap::new();
    let mut cities: Vec<CityAccumulator> = Vec::new();

    for record in records {
        if record.aqi == 0 || record.aqi >= AQI_MAX {
            continue;
        }
        let Some(city) = record.location.city.as_deref() else {
            continue;
        };
        let region = record.location.region.as_deref();
        let slot = *index.entry((city, region)).or_insert_with(|| {
            cities.push(CityAccumulator::new(city, region));
            cities.len() - 1
        });
        cities[slot].add(record);
    }

    cities.into_iter().map(CityAccumulator::finish).collect()
}

fn by_quality_desc(a: &CityAggregate, b: &CityAggregate) -> Ordering {
    b.data_quality.rank().cmp(&a.data_quality.rank())
}

/// The `n` most polluted cities: highest average AQI first, better data quality first on ties.
pub fn worst_cities(rankings: &[CityAggregate], n: usize) -> Vec<CityAggregate> {
    let mut sorted = rankings.to_vec();
    sorted.sort_by(|a, b| {
        b.average_aqi
            .total_cmp(&a.average_aqi)
            .then_with(|| by_quality_desc(a, b))
    });
    sorted.truncate(n);
    sorted
}

/// The `n` cleanest cities: lowest average AQI first, better data quality first on ties.
pub fn best_cities(rankings: &[CityAggregate], n: usize) -> Vec<CityAggregate> {
    let mut sorted = rankings.to_vec();
    sorted.sort_by(|a, b| {
        a.average_aqi
            .total_cmp(&b.average_aqi)
            .then_with(|| by_quality_desc(a, b))
    });
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AqiCategory, Coordinates, DataSource, Pollutants, StationLocation};
    use chrono::Utc;
    use rstest::rstest;

    fn record(city: &str, aqi: u16) -> ObservationRecord {
        ObservationRecord {
            id: format!("{}-{}", city, aqi),
            location: StationLocation {
                name: format!("{} station", city),
                coordinates: Some(Coordinates::new(1.0, 1.0)),
                city: Some(city.to_string()),
                region: Some("XX".to_string()),
            },
            parameters: Pollutants::default(),
            aqi,
            aqi_category: AqiCategory::from_aqi(aqi),
            source: DataSource::Waqi,
            timestamp: Utc::now(),
            last_updated: None,
        }
    }

    fn with_pm(mut r: ObservationRecord, pm25: Option<f64>, pm10: Option<f64>) -> ObservationRecord {
        r.parameters.pm25 = pm25;
        r.parameters.pm10 = pm10;
        r
    }

    fn aggregate(name: &str, average_aqi: f64, data_quality: DataQuality) -> CityAggregate {
        CityAggregate {
            name: name.to_string(),
            country: None,
            average_aqi,
            min_aqi: average_aqi as u16,
            max_aqi: average_aqi as u16,
            station_count: 1,
            avg_pm25: None,
            avg_pm10: None,
            data_quality,
        }
    }

    #[test]
    fn test_two_stations_same_city() {
        let rankings = city_rankings(&[record("A", 40), record("A", 60)]);
        assert_eq!(rankings.len(), 1);
        let a = &rankings[0];
        assert_eq!(a.name, "A");
        assert!((a.average_aqi - 50.0).abs() < 1e-9);
        assert_eq!(a.min_aqi, 40);
        assert_eq!(a.max_aqi, 60);
        assert_eq!(a.station_count, 2);
        assert_eq!(a.data_quality, DataQuality::Good);
    }

    #[test]
    fn test_out_of_range_and_cityless_records_are_skipped() {
        let mut cityless = record("B", 30);
        cityless.location.city = None;
        let rankings = city_rankings(&[record("A", 0), record("A", 500), cityless, record("C", 499)]);
        assert_eq!(rankings.len(), 1);
        assert_eq!(rankings[0].name, "C");
    }

    #[test]
    fn test_pm_means_use_only_defined_values() {
        let rankings = city_rankings(&[
            with_pm(record("A", 40), Some(10.0), None),
            with_pm(record("A", 50), Some(20.0), Some(30.0)),
            with_pm(record("A", 60), None, Some(f64::NAN)),
        ]);
        let a = &rankings[0];
        assert_eq!(a.avg_pm25, Some(15.0));
        assert_eq!(a.avg_pm10, Some(30.0));
        assert_eq!(a.data_quality, DataQuality::Excellent);
    }

    #[test]
    fn test_same_name_in_different_regions_stays_separate() {
        let mut texas = record("Paris", 80);
        texas.location.region = Some("US".to_string());
        let rankings = city_rankings(&[record("Paris", 40), texas]);
        assert_eq!(rankings.len(), 2);
    }

    #[rstest]
    #[case(3, true, DataQuality::Excellent)]
    #[case(3, false, DataQuality::Good)]
    #[case(2, false, DataQuality::Good)]
    #[case(1, true, DataQuality::Good)]
    #[case(1, false, DataQuality::Fair)]
    #[case(0, false, DataQuality::Poor)]
    fn test_data_quality_tiers(
        #[case] stations: usize,
        #[case] both: bool,
        #[case] expected: DataQuality,
    ) {
        assert_eq!(data_quality(stations, both), expected);
    }

    #[test]
    fn test_worst_cities_takes_n_sorted_descending() {
        let rankings = city_rankings(&[
            record("A", 20),
            record("B", 150),
            record("C", 90),
            record("D", 300),
            record("E", 45),
        ]);
        let worst = worst_cities(&rankings, 3);
        let names: Vec<&str> = worst.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["D", "B", "C"]);
    }

    #[test]
    fn test_ties_prefer_higher_data_quality() {
        let rankings = vec![
            aggregate("fair", 80.0, DataQuality::Fair),
            aggregate("excellent", 80.0, DataQuality::Excellent),
            aggregate("good", 80.0, DataQuality::Good),
            aggregate("clean", 10.0, DataQuality::Poor),
        ];

        let worst: Vec<String> = worst_cities(&rankings, 3).into_iter().map(|c| c.name).collect();
        assert_eq!(worst, vec!["excellent", "good", "fair"]);

        let best: Vec<String> = best_cities(&rankings, 4).into_iter().map(|c| c.name).collect();
        assert_eq!(best, vec!["clean", "excellent", "good", "fair"]);
    }

    #[test]
    fn test_n_larger_than_input() {
        let rankings = city_rankings(&[record("A", 20), record("B", 30)]);
        assert_eq!(best_cities(&rankings, 10).len(), 2);
        assert!(worst_cities(&rankings, 0).is_empty());
    }
}
