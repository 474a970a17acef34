//! Provider backed by the World Air Quality Index project (aqicn.org).

use crate::api::DataProvider;
use crate::error::{AppError, Result};
use crate::models::waqi::{WaqiBoundsResponse, WaqiStation};
use crate::models::{DataSource, ObservationRecord};
use crate::normalize::normalize_waqi;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

pub struct WaqiProvider {
    client: Client,
    token: Option<String>,
    base_url: String,
    bounds: String,
}

impl WaqiProvider {
    pub fn new(client: Client, token: Option<String>, base_url: &str, bounds: &str) -> Self {
        Self {
            client,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
            bounds: bounds.to_string(),
        }
    }

    /// Fetches every station inside the configured bounding box.
    ///
    /// Entries that do not match the station schema are skipped rather than
    /// failing the whole response.
    pub async fn get_stations(&self) -> Result<Vec<WaqiStation>> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| AppError::Provider("WAQI_TOKEN is not set".to_string()))?;

        let body: WaqiBoundsResponse = self
            .client
            .get(format!("{}/map/bounds", self.base_url))
            .query(&[
                ("latlng", self.bounds.as_str()),
                ("networks", "all"),
                ("token", token),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if body.status != "ok" {
            // On error WAQI puts the message in `data`.
            let message = body
                .data
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| body.data.to_string());
            return Err(AppError::Provider(format!(
                "WAQI returned status {:?}: {}",
                body.status, message
            )));
        }

        let entries = match body.data {
            serde_json::Value::Array(entries) => entries,
            other => {
                return Err(AppError::Provider(format!(
                    "WAQI data is not an array: {}",
                    other
                )))
            },
        };
        let total = entries.len();
        let stations: Vec<WaqiStation> = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect();
        debug!("Decoded {} of {} WAQI stations", stations.len(), total);
        Ok(stations)
    }
}

#[async_trait]
impl DataProvider for WaqiProvider {
    fn source(&self) -> DataSource {
        DataSource::Waqi
    }

    fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    async fn fetch(&self) -> Result<Vec<ObservationRecord>> {
        let stations = self.get_stations().await?;
        let records = normalize_waqi(&stations);
        info!("Normalized {} WAQI stations", records.len());
        Ok(records)
    }
}
