//! Spatial deduplication of station reports.
//!
//! Providers overlap: the same physical station is often published by several
//! of them. Reports are collapsed per cell of a ~111 m grid (coordinates rounded
//! to three decimals).

use crate::models::{Coordinates, ObservationRecord};
use std::collections::HashMap;
use tracing::debug;

/// Decimal places kept when building the key.
const KEY_PRECISION: i32 = 3;

/// Returns `"{lon},{lat}"` rounded to three decimals, or `None` for non-finite coordinates.
pub fn dedup_key(coordinates: &Coordinates) -> Option<String> {
    if !coordinates.is_finite() {
        return None;
    }
    Some(format!(
        "{:.3},{:.3}",
        round_coordinate(coordinates.longitude),
        round_coordinate(coordinates.latitude)
    ))
}

fn round_coordinate(value: f64) -> f64 {
    let scale = 10f64.powi(KEY_PRECISION);
    // `+ 0.0` folds -0.0 into 0.0 so both sides of the meridian/equator share a key.
    (value * scale).round() / scale + 0.0
}

/// Keeps at most one record per grid cell.
///
/// Records without usable coordinates are dropped. On collision the record with
/// the strictly later `timestamp` wins; on a tie the first one seen is kept.
/// Output follows the order in which cells were first seen.
pub fn deduplicate(records: Vec<ObservationRecord>) -> Vec<ObservationRecord> {
    let total = records.len();
    let mut index: HashMap<String, usize> = HashMap::with_capacity(total);
    let mut kept: Vec<ObservationRecord> = Vec::with_capacity(total);
    let mut dropped_invalid = 0usize;

    for record in records {
        let Some(key) = record.location.coordinates.as_ref().and_then(dedup_key) else {
            dropped_invalid += 1;
            continue;
        };
        match index.get(&key) {
            Some(&slot) => {
                if record.timestamp > kept[slot].timestamp {
                    kept[slot] = record;
                }
            },
            None => {
                index.insert(key, kept.len());
                kept.push(record);
            },
        }
    }

    debug!(
        "Deduplicated {} records into {} ({} without valid coordinates)",
        total,
        kept.len(),
        dropped_invalid
    );
    kept
}
