//! Provider backed by the Sensor.Community citizen-science network.
//!
//! The static dust feed needs no credentials; the provider can be switched off
//! through configuration instead.

use crate::api::DataProvider;
use crate::error::{AppError, Result};
use crate::models::sensor_community::SensorReading;
use crate::models::{DataSource, ObservationRecord};
use crate::normalize::normalize_sensor_community;
use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

/// Five-minute averages of every particulate sensor.
const DUST_FEED_PATH: &str = "/static/v2/data.dust.min.json";

pub struct SensorCommunityProvider {
    client: Client,
    enabled: bool,
    base_url: String,
}

impl SensorCommunityProvider {
    pub fn new(client: Client, enabled: bool, base_url: &str) -> Self {
        Self {
            client,
            enabled,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn get_readings(&self) -> Result<Vec<SensorReading>> {
        let readings = self
            .client
            .get(format!("{}{}", self.base_url, DUST_FEED_PATH))
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<SensorReading>>()
            .await?;
        Ok(readings)
    }
}

#[async_trait]
impl DataProvider for SensorCommunityProvider {
    fn source(&self) -> DataSource {
        DataSource::SensorCommunity
    }

    fn is_configured(&self) -> bool {
        self.enabled
    }

    async fn fetch(&self) -> Result<Vec<ObservationRecord>> {
        let readings = self.get_readings().await?;
        // Parsing the feed is CPU-bound; keep it off the async workers.
        let records = tokio::task::spawn_blocking(move || normalize_sensor_community(&readings))
            .await
            .map_err(|e| {
                AppError::Provider(format!("Sensor.Community normalization failed: {}", e))
            })?;
        info!("Normalized {} Sensor.Community readings", records.len());
        Ok(records)
    }
}
