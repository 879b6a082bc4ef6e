//! Client for the sensor-location backend.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::admin::AdminLevel;
use crate::geodata::de_opt_id;

const SENSOR_LOCATIONS_PATH: &str = "sensors/locations";

/// Typed request for sensor locations: the administrative scope being
/// viewed, narrowed to one parent region when its id is known.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorGeoQuery {
    pub admin_level: AdminLevel,
    pub admin_id: Option<String>,
}

impl SensorGeoQuery {
    pub fn scoped(admin_level: AdminLevel, admin_id: Option<String>) -> Self {
        Self {
            admin_level,
            admin_id,
        }
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("admin_level", self.admin_level.wire_name().to_string())];
        if let Some(id) = &self.admin_id {
            params.push(("admin_id", id.clone()));
        }
        params
    }
}

/// One sensor as reported by the location backend. Coordinates are optional
/// on the wire; rows missing either one never become map features.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SensorRow {
    pub imei_id: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub state_id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub division_id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub district_id: Option<String>,
    #[serde(default)]
    pub updated_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SensorGeoResponse {
    data: Vec<SensorRow>,
}

/// Seam over the sensor-location backend.
#[async_trait]
pub trait SensorGeoApi: Send + Sync {
    async fn sensor_locations(&self, query: &SensorGeoQuery) -> Result<Vec<SensorRow>>;
}

/// HTTP client for the sensor-location backend.
pub struct SensorClient {
    client: Client,
    base_url: String,
}

impl SensorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SensorGeoApi for SensorClient {
    async fn sensor_locations(&self, query: &SensorGeoQuery) -> Result<Vec<SensorRow>> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            SENSOR_LOCATIONS_PATH
        );
        debug!(
            "Fetching sensor locations for {} scope (id: {:?})",
            query.admin_level.wire_name(),
            query.admin_id
        );

        let response = self
            .client
            .get(&url)
            .query(&query.to_params())
            .send()
            .await
            .context("Failed to send request to sensor location API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Sensor location API error {}: {}", status, body);
        }

        let body: SensorGeoResponse = response
            .json()
            .await
            .context("Failed to parse sensor location response")?;
        Ok(body.data)
    }
}
