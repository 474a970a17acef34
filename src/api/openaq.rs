//! Provider backed by the OpenAQ v3 API.
//!
//! A pass issues three requests concurrently: the monitoring locations, and the
//! latest PM2.5 and PM10 values across all sensors. The normalizer joins them on
//! the location id.

use crate::api::DataProvider;
use crate::error::{AppError, Result};
use crate::models::openaq::{LatestResponse, LocationsResponse};
use crate::models::{DataSource, ObservationRecord};
use crate::normalize::normalize_openaq;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

/// OpenAQ parameter id for PM10 (µg/m³).
pub const PARAMETER_PM10: u32 = 1;
/// OpenAQ parameter id for PM2.5 (µg/m³).
pub const PARAMETER_PM25: u32 = 2;

const PAGE_LIMIT: u32 = 1000;

/// An asynchronous client for fetching data from the OpenAQ API v3.
pub struct OpenAqProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAqProvider {
    /// Creates a provider. Without an API key it stays registered but never makes a request.
    pub fn new(client: Client, api_key: Option<String>, base_url: &str) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Issues an authenticated GET and decodes the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Provider("OPENAQ_KEY is not set".to_string()))?;
        let url = format!("{}{}", self.base_url, path);
        debug!("OpenAQ request: {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .header("X-API-Key", api_key) // API key required by v3
            .query(query)
            .send()
            .await
            .map_err(|e| {
                error!("Error requesting {}: {}", url, e);
                AppError::from(e)
            })?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                let status = e.status();
                error!(
                    "API request to {} failed with status {}",
                    url,
                    status.unwrap_or_default()
                );
                if status == Some(reqwest::StatusCode::UNAUTHORIZED)
                    || status == Some(reqwest::StatusCode::FORBIDDEN)
                {
                    error!("Received 401/403. Check OPENAQ_KEY validity and permissions.");
                }
                return Err(AppError::from(e));
            },
        };

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            error!("Error parsing OpenAQ response from {}: {}", url, e);
            AppError::from(e)
        })
    }

    /// Fixed-site reference monitors (mobile sensors excluded).
    pub async fn get_locations(&self) -> Result<LocationsResponse> {
        self.get_json(
            "/v3/locations",
            &[
                ("monitor", "true".to_string()),
                ("mobile", "false".to_string()),
                ("limit", PAGE_LIMIT.to_string()),
                ("page", "1".to_string()),
            ],
        )
        .await
    }

    /// Latest value of one parameter across all sensors.
    pub async fn get_latest_for_parameter(&self, parameter_id: u32) -> Result<LatestResponse> {
        self.get_json(
            &format!("/v3/parameters/{}/latest", parameter_id),
            &[("limit", PAGE_LIMIT.to_string())],
        )
        .await
    }
}

#[async_trait]
impl DataProvider for OpenAqProvider {
    fn source(&self) -> DataSource {
        DataSource::OpenAq
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch(&self) -> Result<Vec<ObservationRecord>> {
        let (locations, pm25, pm10) = tokio::try_join!(
            self.get_locations(),
            self.get_latest_for_parameter(PARAMETER_PM25),
            self.get_latest_for_parameter(PARAMETER_PM10),
        )?;
        debug!(
            "OpenAQ returned {} locations, {} PM2.5 and {} PM10 values",
            locations.results.len(),
            pm25.results.len(),
            pm10.results.len()
        );
        for meta in [&locations.meta, &pm25.meta, &pm10.meta] {
            debug!(
                "OpenAQ {} page {} (limit {}, found {})",
                meta.name,
                meta.page,
                meta.limit,
                meta.found.as_ref().map_or_else(|| "?".to_string(), |f| f.to_string())
            );
        }

        let records = normalize_openaq(&locations.results, &pm25.results, &pm10.results);
        info!("Normalized {} OpenAQ stations", records.len());
        Ok(records)
    }
}
