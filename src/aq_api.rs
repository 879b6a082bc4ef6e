//! Client for the AQ metrics backend.
//!
//! Every query carries the fixed pollutant parameter set; the date-scoped
//! fields are sent only as a complete quadruple (from/to date, sampling
//! period, sampling value). A query whose window yields no rows is retried
//! exactly once with the window stripped, and never again.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::admin::{AdminLevel, POLLUTANT_PARAMS};

const REGION_METRICS_PATH: &str = "aq/metrics";
const SENSOR_METRICS_PATH: &str = "aq/sensor_metrics";

/// Aggregation bucket for the date-scoped queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SamplingPeriod {
    Minutes,
    Hours,
    Days,
}

impl fmt::Display for SamplingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingPeriod::Minutes => write!(f, "minutes"),
            SamplingPeriod::Hours => write!(f, "hours"),
            SamplingPeriod::Days => write!(f, "days"),
        }
    }
}

/// A complete date/sampling filter. Constructed only when all four fields
/// are known; partial date filters are never sent.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingWindow {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub sampling: SamplingPeriod,
    pub sampling_value: u32,
}

/// Typed request for the metrics endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct AqQuery {
    pub admin_level: AdminLevel,
    pub params: &'static [&'static str],
    pub window: Option<SamplingWindow>,
}

impl AqQuery {
    pub fn for_level(admin_level: AdminLevel, window: Option<SamplingWindow>) -> Self {
        Self {
            admin_level,
            params: &POLLUTANT_PARAMS,
            window,
        }
    }

    /// The same query with the date window forced absent.
    pub fn fallback(&self) -> Self {
        Self {
            window: None,
            ..self.clone()
        }
    }

    /// Wire form: absent fields are omitted entirely, never sent as nulls.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("admin_level", self.admin_level.wire_name().to_string()),
            ("params", self.params.join(",")),
        ];
        if let Some(window) = &self.window {
            params.push(("from_date", window.from_date.format("%Y-%m-%d").to_string()));
            params.push(("to_date", window.to_date.format("%Y-%m-%d").to_string()));
            params.push(("sampling", window.sampling.to_string()));
            params.push(("sampling_value", window.sampling_value.to_string()));
        }
        params
    }
}

/// One (region-or-sensor, pollutant, value) tuple from the metrics backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AqMetricRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imei_id: Option<String>,
    pub param_name: String,
    pub param_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_sensors: Option<i64>,
}

impl AqMetricRow {
    /// Region name keying this row at the given level (`imei_id` for the
    /// sensor level).
    pub fn region_name(&self, level: AdminLevel) -> Option<&str> {
        match level {
            AdminLevel::State => self.state_name.as_deref(),
            AdminLevel::Division => self.division_name.as_deref(),
            AdminLevel::District => self.district_name.as_deref(),
            AdminLevel::Sensor => self.imei_id.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AqResponse {
    data: Vec<AqMetricRow>,
}

/// Seam over the metrics backend so the drill controller can run against
/// in-memory fakes in tests.
#[async_trait]
pub trait AqMetricsApi: Send + Sync {
    /// Aggregated metrics per administrative region.
    async fn region_metrics(
        &self,
        primary: &AqQuery,
        fallback: &AqQuery,
    ) -> Result<Vec<AqMetricRow>>;

    /// Aggregated metrics per sensor, keyed by `imei_id`.
    async fn sensor_metrics(
        &self,
        primary: &AqQuery,
        fallback: &AqQuery,
    ) -> Result<Vec<AqMetricRow>>;
}

/// HTTP client for the AQ metrics backend.
pub struct AqClient {
    client: Client,
    base_url: String,
}

impl AqClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn fetch(&self, path: &str, query: &AqQuery) -> Result<Vec<AqMetricRow>> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        debug!(
            "Fetching {} metrics from {}",
            query.admin_level.wire_name(),
            url
        );

        let response = self
            .client
            .get(&url)
            .query(&query.to_params())
            .send()
            .await
            .context("Failed to send request to AQ metrics API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("AQ metrics API error {}: {}", status, body);
        }

        let body: AqResponse = response
            .json()
            .await
            .context("Failed to parse AQ metrics response")?;
        Ok(body.data)
    }

    async fn fetch_with_fallback(
        &self,
        path: &str,
        primary: &AqQuery,
        fallback: &AqQuery,
    ) -> Result<Vec<AqMetricRow>> {
        let rows = self.fetch(path, primary).await?;
        if !should_fall_back(&rows, primary) {
            return Ok(rows);
        }
        warn!(
            "No {} metrics for the requested date window, retrying without date filter",
            primary.admin_level.wire_name()
        );
        self.fetch(path, fallback).await
    }
}

/// The fallback query is used only when the windowed primary produced no
/// rows; an unwindowed primary is already the fallback.
fn should_fall_back(rows: &[AqMetricRow], primary: &AqQuery) -> bool {
    rows.is_empty() && primary.window.is_some()
}

#[async_trait]
impl AqMetricsApi for AqClient {
    async fn region_metrics(
        &self,
        primary: &AqQuery,
        fallback: &AqQuery,
    ) -> Result<Vec<AqMetricRow>> {
        self.fetch_with_fallback(REGION_METRICS_PATH, primary, fallback)
            .await
    }

    async fn sensor_metrics(
        &self,
        primary: &AqQuery,
        fallback: &AqQuery,
    ) -> Result<Vec<AqMetricRow>> {
        self.fetch_with_fallback(SENSOR_METRICS_PATH, primary, fallback)
            .await
    }
}
