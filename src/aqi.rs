//! US EPA Air Quality Index calculation.
//!
//! Each pollutant concentration is mapped onto a sub-index by linear interpolation
//! over its breakpoint table:
//!
//! ```text
//! I = (I_hi - I_lo) / (C_hi - C_lo) * (C - C_lo) + I_lo
//! ```
//!
//! The overall index is the maximum of the available sub-indices. Ozone uses the
//! 8-hour table up to 200 ppb and the 1-hour table above it.

use crate::models::{AqiCategory, AQI_MAX};
use serde::Serialize;

/// A concentration band `(c_lo, c_hi)` and the index band `(i_lo, i_hi)` it maps to.
type Breakpoint = (f64, f64, u16, u16);

/// PM2.5, 24-hour, µg/m³. Pre-2024 EPA table (Good up to 12.0); the 2024
/// revision lowers that band to 9.0 and is not applied here.
const PM25_BREAKPOINTS: [Breakpoint; 7] = [
    (0.0, 12.0, 0, 50),
    (12.1, 35.4, 51, 100),
    (35.5, 55.4, 101, 150),
    (55.5, 150.4, 151, 200),
    (150.5, 250.4, 201, 300),
    (250.5, 350.4, 301, 400),
    (350.5, 500.4, 401, 500),
];

/// PM10, 24-hour, µg/m³.
const PM10_BREAKPOINTS: [Breakpoint; 7] = [
    (0.0, 54.0, 0, 50),
    (55.0, 154.0, 51, 100),
    (155.0, 254.0, 101, 150),
    (255.0, 354.0, 151, 200),
    (355.0, 424.0, 201, 300),
    (425.0, 504.0, 301, 400),
    (505.0, 604.0, 401, 500),
];

/// NO2, 1-hour, ppb.
const NO2_BREAKPOINTS: [Breakpoint; 7] = [
    (0.0, 53.0, 0, 50),
    (54.0, 100.0, 51, 100),
    (101.0, 360.0, 101, 150),
    (361.0, 649.0, 151, 200),
    (650.0, 1249.0, 201, 300),
    (1250.0, 1649.0, 301, 400),
    (1650.0, 2049.0, 401, 500),
];

/// O3, 8-hour, ppb. Governs readings up to [`O3_8H_MAX_PPB`]; the 8-hour
/// table defines no index above that.
const O3_8H_BREAKPOINTS: [Breakpoint; 5] = [
    (0.0, 54.0, 0, 50),
    (55.0, 70.0, 51, 100),
    (71.0, 85.0, 101, 150),
    (86.0, 105.0, 151, 200),
    (106.0, 200.0, 201, 300),
];

/// O3, 1-hour, ppb, for readings above [`O3_8H_MAX_PPB`]. Only the bands at
/// and above index 201 are used; values between 201 and 204 ppb start the first band.
const O3_1H_BREAKPOINTS: [Breakpoint; 3] = [
    (205.0, 404.0, 201, 300),
    (405.0, 504.0, 301, 400),
    (505.0, 604.0, 401, 500),
];

const O3_8H_MAX_PPB: f64 = 200.0;

/// Overall index and its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AqiResult {
    pub aqi: u16,
    pub category: AqiCategory,
}

impl AqiResult {
    pub fn from_aqi(aqi: u16) -> Self {
        let aqi = aqi.min(AQI_MAX);
        Self {
            aqi,
            category: AqiCategory::from_aqi(aqi),
        }
    }
}

/// Computes the composite AQI from whichever pollutants are present.
///
/// Non-finite values are treated as absent. With no usable pollutant the
/// result is `0` / `Good`.
pub fn calculate_aqi(
    pm25: Option<f64>,
    pm10: Option<f64>,
    no2: Option<f64>,
    o3: Option<f64>,
) -> AqiResult {
    let aqi = [
        pm25.and_then(|c| sub_index(truncate(c, 10.0), &PM25_BREAKPOINTS)),
        pm10.and_then(|c| sub_index(truncate(c, 1.0), &PM10_BREAKPOINTS)),
        no2.and_then(|c| sub_index(truncate(c, 1.0), &NO2_BREAKPOINTS)),
        o3.and_then(|c| o3_sub_index(truncate(c, 1.0))),
    ]
    .into_iter()
    .flatten()
    .max()
    .unwrap_or(0);

    AqiResult::from_aqi(aqi)
}

/// Truncates to the precision the EPA tables are expressed in (`scale` = 10 keeps one decimal).
fn truncate(concentration: f64, scale: f64) -> f64 {
    (concentration * scale).trunc() / scale
}

/// Ozone switches from the 8-hour to the 1-hour table above 200 ppb.
fn o3_sub_index(concentration: f64) -> Option<u16> {
    if concentration <= O3_8H_MAX_PPB {
        sub_index(concentration, &O3_8H_BREAKPOINTS)
    } else {
        sub_index(concentration, &O3_1H_BREAKPOINTS)
    }
}

/// Interpolates a single pollutant. `None` for non-finite input.
fn sub_index(concentration: f64, table: &[Breakpoint]) -> Option<u16> {
    if !concentration.is_finite() {
        return None;
    }
    let c = concentration.max(0.0);

    // First band whose upper bound covers the value; after truncation no value
    // can fall between two bands.
    match table.iter().find(|(_, c_hi, _, _)| c <= *c_hi) {
        Some(&(c_lo, c_hi, i_lo, i_hi)) => {
            let c = c.max(c_lo);
            let index = (f64::from(i_hi - i_lo) / (c_hi - c_lo)) * (c - c_lo) + f64::from(i_lo);
            Some((index.round() as u16).min(AQI_MAX))
        },
        None => Some(AQI_MAX),
    }
}
