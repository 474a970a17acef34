//! Runtime configuration read from the environment (and a `.env` file, if present).

use crate::error::{AppError, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

pub const OPENAQ_BASE_URL: &str = "https://api.openaq.org";
pub const WAQI_BASE_URL: &str = "https://api.waqi.info";
pub const SENSOR_COMMUNITY_BASE_URL: &str = "https://data.sensor.community";

/// `lat1,lng1,lat2,lng2`: the whole globe.
pub const WAQI_WORLD_BOUNDS: &str = "-90,-180,90,180";

const MIN_PROVIDER_TIMEOUT_SECS: u64 = 5;
const MAX_PROVIDER_TIMEOUT_SECS: u64 = 15;
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Application settings. Provider credentials are optional: a provider without
/// its key is registered but never hits the network.
#[derive(Debug, Clone)]
pub struct Config {
    pub openaq_key: Option<String>,
    pub openaq_base_url: String,
    pub waqi_token: Option<String>,
    pub waqi_base_url: String,
    pub waqi_bounds: String,
    pub sensor_community_enabled: bool,
    pub sensor_community_base_url: String,
    pub provider_timeout: Duration,
    pub cache_ttl: Duration,
    pub sweep_interval: Duration,
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openaq_key: None,
            openaq_base_url: OPENAQ_BASE_URL.to_string(),
            waqi_token: None,
            waqi_base_url: WAQI_BASE_URL.to_string(),
            waqi_bounds: WAQI_WORLD_BOUNDS.to_string(),
            sensor_community_enabled: true,
            sensor_community_base_url: SENSOR_COMMUNITY_BASE_URL.to_string(),
            provider_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            log_dir: None,
        }
    }
}

impl Config {
    /// Loads `.env` (if any) and then reads the process environment.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_env()
    }

    /// Reads settings from the process environment only. Empty values count as unset.
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let timeout_secs: u64 = parse_var("PROVIDER_TIMEOUT_SECS")?
            .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS);
        let clamped = timeout_secs.clamp(MIN_PROVIDER_TIMEOUT_SECS, MAX_PROVIDER_TIMEOUT_SECS);
        if clamped != timeout_secs {
            warn!(
                "PROVIDER_TIMEOUT_SECS={} is outside {}..={}, using {}",
                timeout_secs, MIN_PROVIDER_TIMEOUT_SECS, MAX_PROVIDER_TIMEOUT_SECS, clamped
            );
        }

        let config = Self {
            openaq_key: var("OPENAQ_KEY"),
            openaq_base_url: var("OPENAQ_BASE_URL").unwrap_or(defaults.openaq_base_url),
            waqi_token: var("WAQI_TOKEN"),
            waqi_base_url: var("WAQI_BASE_URL").unwrap_or(defaults.waqi_base_url),
            waqi_bounds: var("WAQI_BOUNDS").unwrap_or(defaults.waqi_bounds),
            sensor_community_enabled: parse_bool_var("SENSOR_COMMUNITY_ENABLED")?
                .unwrap_or(defaults.sensor_community_enabled),
            sensor_community_base_url: var("SENSOR_COMMUNITY_BASE_URL")
                .unwrap_or(defaults.sensor_community_base_url),
            provider_timeout: Duration::from_secs(clamped),
            cache_ttl: parse_var("RANKING_CACHE_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            sweep_interval: parse_var("CACHE_SWEEP_INTERVAL_SECS")?
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            log_dir: var("LOG_DIR").map(PathBuf::from),
        };

        debug!(
            "Configuration loaded (openaq: {}, waqi: {}, sensor.community: {})",
            config.openaq_key.is_some(),
            config.waqi_token.is_some(),
            config.sensor_community_enabled
        );
        Ok(config)
    }
}

fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>> {
    var(name)
        .map(|raw| {
            raw.parse::<T>().map_err(|_| {
                AppError::Config(format!("{} has an invalid value: {:?}", name, raw))
            })
        })
        .transpose()
}

fn parse_bool_var(name: &str) -> Result<Option<bool>> {
    var(name)
        .map(|raw| match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(AppError::Config(format!(
                "{} must be a boolean, got {:?}",
                name, raw
            ))),
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 11] = [
        "OPENAQ_KEY",
        "OPENAQ_BASE_URL",
        "WAQI_TOKEN",
        "WAQI_BASE_URL",
        "WAQI_BOUNDS",
        "SENSOR_COMMUNITY_ENABLED",
        "SENSOR_COMMUNITY_BASE_URL",
        "PROVIDER_TIMEOUT_SECS",
        "RANKING_CACHE_TTL_SECS",
        "CACHE_SWEEP_INTERVAL_SECS",
        "LOG_DIR",
    ];

    fn clear_env() {
        for name in VARS {
            env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_environment() {
        clear_env();
        let config = Config::from_env().unwrap();
        assert!(config.openaq_key.is_none());
        assert!(config.waqi_token.is_none());
        assert!(config.sensor_community_enabled);
        assert_eq!(config.provider_timeout, Duration::from_secs(10));
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert_eq!(config.waqi_bounds, WAQI_WORLD_BOUNDS);
    }

    #[test]
    #[serial]
    fn test_reads_keys_and_treats_blank_as_unset() {
        clear_env();
        env::set_var("OPENAQ_KEY", "abc123");
        env::set_var("WAQI_TOKEN", "   ");
        env::set_var("SENSOR_COMMUNITY_ENABLED", "false");
        let config = Config::from_env().unwrap();
        assert_eq!(config.openaq_key.as_deref(), Some("abc123"));
        assert!(config.waqi_token.is_none());
        assert!(!config.sensor_community_enabled);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_provider_timeout_is_clamped() {
        clear_env();
        env::set_var("PROVIDER_TIMEOUT_SECS", "60");
        assert_eq!(
            Config::from_env().unwrap().provider_timeout,
            Duration::from_secs(15)
        );
        env::set_var("PROVIDER_TIMEOUT_SECS", "1");
        assert_eq!(
            Config::from_env().unwrap().provider_timeout,
            Duration::from_secs(5)
        );
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_number_is_a_config_error() {
        clear_env();
        env::set_var("RANKING_CACHE_TTL_SECS", "five minutes");
        match Config::from_env() {
            Err(AppError::Config(msg)) => assert!(msg.contains("RANKING_CACHE_TTL_SECS")),
            other => panic!("Expected Config error, got {:?}", other),
        }
        clear_env();
    }
}
