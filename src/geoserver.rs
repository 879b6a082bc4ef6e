//! Client for the geoserver WFS endpoint serving administrative polygons.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::geodata::RegionCollection;

/// Seam over the polygon backend.
#[async_trait]
pub trait GeoDataApi: Send + Sync {
    /// Fetch a named layer as GeoJSON, optionally restricted by a CQL
    /// predicate of the form `field='VALUE'`.
    async fn layer_features(
        &self,
        layer: &str,
        cql_filter: Option<&str>,
    ) -> Result<RegionCollection>;
}

/// CQL predicate selecting the divisions of a state. The state layer stores
/// names uppercased, so the predicate uppercases the clicked name.
pub fn state_filter(state_name: &str) -> String {
    format!("state='{}'", state_name.to_uppercase())
}

/// CQL predicate selecting the districts of a division, matched exactly.
pub fn division_filter(division_name: &str) -> String {
    format!("division='{division_name}'")
}

/// HTTP client for the geoserver OWS endpoint.
pub struct GeoServerClient {
    client: Client,
    base_url: String,
}

impl GeoServerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl GeoDataApi for GeoServerClient {
    async fn layer_features(
        &self,
        layer: &str,
        cql_filter: Option<&str>,
    ) -> Result<RegionCollection> {
        let url = format!("{}/ows", self.base_url.trim_end_matches('/'));

        let mut params = vec![
            ("service", "WFS"),
            ("version", "1.0.0"),
            ("request", "GetFeature"),
            ("typeName", layer),
            ("outputFormat", "application/json"),
            ("srsName", "EPSG:4326"),
        ];
        if let Some(filter) = cql_filter {
            params.push(("CQL_FILTER", filter));
        }

        debug!("Fetching layer {} (filter: {:?})", layer, cql_filter);

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .with_context(|| format!("Failed to send WFS request for layer {layer}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Geoserver error {} for layer {}: {}", status, layer, body);
        }

        let collection: RegionCollection = response
            .json()
            .await
            .with_context(|| format!("Failed to parse GeoJSON for layer {layer}"))?;

        debug!(
            "Layer {} returned {} features",
            layer,
            collection.features.len()
        );
        Ok(collection)
    }
}
