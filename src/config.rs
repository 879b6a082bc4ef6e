//! Backend endpoints, from the environment with local-dev defaults.

use std::env;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Settings {
    pub aq_base_url: String,
    pub sensor_base_url: String,
    pub geoserver_base_url: String,
}

impl Settings {
    pub fn from_env() -> Self {
        let settings = Self {
            aq_base_url: env_or("AQ_API_BASE_URL", "http://localhost:8080/api"),
            sensor_base_url: env_or("SENSOR_API_BASE_URL", "http://localhost:8081/api"),
            geoserver_base_url: env_or("GEOSERVER_BASE_URL", "http://localhost:8600/geoserver"),
        };
        debug!(
            "Settings: aq={} sensors={} geoserver={}",
            settings.aq_base_url, settings.sensor_base_url, settings.geoserver_base_url
        );
        settings
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
