//! Terminal rendering of pipeline outputs as `comfy-table` tables.

use crate::api::FetchStatus;
use crate::models::{AqiCategory, CityAggregate, CountryStats, GlobalStats, ObservationRecord};
use crate::pipeline::FetchReport;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table};

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// Parses `#RRGGBB`.
fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

fn aqi_cell(aqi: u16) -> Cell {
    let category = AqiCategory::from_aqi(aqi);
    let cell = Cell::new(aqi).set_alignment(CellAlignment::Right);
    match hex_to_rgb(category.color()) {
        Some((r, g, b)) => cell.fg(Color::Rgb { r, g, b }),
        None => cell,
    }
}

fn category_cell(category: AqiCategory) -> Cell {
    let cell = Cell::new(category.label());
    match hex_to_rgb(category.color()) {
        Some((r, g, b)) => cell.fg(Color::Rgb { r, g, b }),
        None => cell,
    }
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.1}", v))
}

pub fn stats_table(stats: &GlobalStats) -> Table {
    let mut table = new_table(vec!["Metric", "Value"]);
    table.add_row(vec![
        Cell::new("Stations"),
        Cell::new(stats.total_stations),
    ]);
    table.add_row(vec![Cell::new("Cities"), Cell::new(stats.total_cities)]);
    table.add_row(vec![
        Cell::new("Countries"),
        Cell::new(stats.total_countries),
    ]);
    table.add_row(vec![
        Cell::new("Average AQI"),
        Cell::new(format!("{:.1}", stats.average_aqi)),
    ]);
    for (source, count) in &stats.by_source {
        table.add_row(vec![
            Cell::new(format!("Source: {}", source)),
            Cell::new(count),
        ]);
    }
    for (label, city) in [("Best city", &stats.best_city), ("Worst city", &stats.worst_city)] {
        let value = match city {
            Some(c) => format!(
                "{} ({}) AQI {}",
                c.name,
                c.country.as_deref().unwrap_or("?"),
                c.aqi
            ),
            None => "-".to_string(),
        };
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    table.add_row(vec![
        Cell::new("Last updated"),
        Cell::new(stats.last_updated.format("%Y-%m-%d %H:%M:%S UTC")),
    ]);
    table
}

pub fn countries_table(countries: &[CountryStats]) -> Table {
    let mut table = new_table(vec!["Country", "Stations", "Cities", "Avg AQI", "Worst AQI"]);
    for c in countries {
        table.add_row(vec![
            Cell::new(&c.country),
            Cell::new(c.station_count),
            Cell::new(c.city_count),
            aqi_cell(c.average_aqi.round() as u16),
            aqi_cell(c.worst_aqi),
        ]);
    }
    table
}

pub fn cities_table(cities: &[CityAggregate]) -> Table {
    let mut table = new_table(vec![
        "#", "City", "Country", "Avg AQI", "Min", "Max", "Stations", "PM2.5", "PM10", "Quality",
    ]);
    for (rank, c) in cities.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&c.name),
            Cell::new(c.country.as_deref().unwrap_or("-")),
            aqi_cell(c.average_aqi.round() as u16),
            Cell::new(c.min_aqi),
            Cell::new(c.max_aqi),
            Cell::new(c.station_count),
            Cell::new(optional(c.avg_pm25)),
            Cell::new(optional(c.avg_pm10)),
            Cell::new(c.data_quality.label()),
        ]);
    }
    table
}

pub fn stations_table(records: &[ObservationRecord]) -> Table {
    let mut table = new_table(vec![
        "Station", "City", "Region", "AQI", "Category", "PM2.5", "PM10", "Source", "Observed",
    ]);
    for r in records {
        table.add_row(vec![
            Cell::new(&r.location.name),
            Cell::new(r.location.city.as_deref().unwrap_or("-")),
            Cell::new(r.location.region.as_deref().unwrap_or("-")),
            aqi_cell(r.aqi),
            category_cell(r.aqi_category),
            Cell::new(optional(r.parameters.pm25)),
            Cell::new(optional(r.parameters.pm10)),
            Cell::new(r.source),
            Cell::new(r.timestamp.format("%Y-%m-%d %H:%M")),
        ]);
    }
    table
}

pub fn sources_table(reports: &[FetchReport]) -> Table {
    let mut table = new_table(vec!["Source", "Status", "Records", "Elapsed (ms)"]);
    for report in reports {
        let status = match &report.status {
            FetchStatus::Ok => Cell::new("ok").fg(Color::Green),
            FetchStatus::Skipped => Cell::new("skipped (not configured)").fg(Color::DarkGrey),
            FetchStatus::Failed(reason) => Cell::new(format!("failed: {}", reason)).fg(Color::Red),
            FetchStatus::TimedOut => Cell::new("timed out").fg(Color::Yellow),
        };
        table.add_row(vec![
            Cell::new(report.source),
            status,
            Cell::new(report.record_count),
            Cell::new(report.elapsed_ms),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CityHighlight, DataQuality, DataSource};
    use chrono::Utc;
    use std::collections::BTreeMap;

    #[test]
    fn test_hex_to_rgb() {
        assert_eq!(hex_to_rgb("#8F3F97"), Some((0x8F, 0x3F, 0x97)));
        assert_eq!(hex_to_rgb("8F3F97"), None);
        assert_eq!(hex_to_rgb("#GG0000"), None);
        for category in [
            AqiCategory::Good,
            AqiCategory::Moderate,
            AqiCategory::Unhealthy,
            AqiCategory::VeryUnhealthy,
            AqiCategory::Hazardous,
        ] {
            assert!(hex_to_rgb(category.color()).is_some());
        }
    }

    #[test]
    fn test_stats_table_lists_sources_and_extremes() {
        let stats = GlobalStats {
            total_stations: 3,
            total_cities: 2,
            total_countries: 1,
            by_source: BTreeMap::from([(DataSource::Waqi, 2), (DataSource::OpenAq, 1)]),
            average_aqi: 42.0,
            best_city: Some(CityHighlight {
                name: "Utrecht".to_string(),
                country: Some("NL".to_string()),
                aqi: 20,
            }),
            worst_city: None,
            last_updated: Utc::now(),
        };
        let table = stats_table(&stats);
        // 4 counters, 2 sources, best/worst, last updated.
        assert_eq!(table.row_iter().count(), 9);
        let rendered = table.to_string();
        assert!(rendered.contains("Source: waqi"));
        assert!(rendered.contains("Utrecht (NL) AQI 20"));
    }

    #[test]
    fn test_cities_table_numbers_rows() {
        let city = CityAggregate {
            name: "Delhi".to_string(),
            country: Some("IN".to_string()),
            average_aqi: 180.4,
            min_aqi: 150,
            max_aqi: 210,
            station_count: 4,
            avg_pm25: Some(95.25),
            avg_pm10: None,
            data_quality: DataQuality::Good,
        };
        let table = cities_table(&[city]);
        assert_eq!(table.row_iter().count(), 1);
        let rendered = table.to_string();
        assert!(rendered.contains("Delhi"));
        assert!(rendered.contains("95.2") || rendered.contains("95.3"));
    }

    #[test]
    fn test_sources_table_shows_failure_reason() {
        let reports = vec![
            FetchReport {
                source: DataSource::OpenAq,
                status: FetchStatus::Skipped,
                record_count: 0,
                elapsed_ms: 0,
            },
            FetchReport {
                source: DataSource::Waqi,
                status: FetchStatus::Failed("HTTP 503".to_string()),
                record_count: 0,
                elapsed_ms: 120,
            },
        ];
        let rendered = sources_table(&reports).to_string();
        assert!(rendered.contains("failed: HTTP 503"));
        assert!(rendered.contains("openaq"));
    }
}
