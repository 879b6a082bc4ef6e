//! In-memory backends and fixture builders for drill-down tests.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use aqmap::aq_api::{AqMetricRow, AqMetricsApi, AqQuery};
use aqmap::geodata::{Feature, Geometry, RegionCollection, RegionProperties};
use aqmap::geoserver::GeoDataApi;
use aqmap::sensors::{SensorGeoApi, SensorGeoQuery, SensorRow};

pub fn region_feature(
    level_name: &str,
    name: &str,
    id: &str,
    lon: f64,
    lat: f64,
) -> Feature<RegionProperties> {
    let mut properties = RegionProperties {
        id: Some(id.to_string()),
        ..Default::default()
    };
    match level_name {
        "state" => properties.state = Some(name.to_string()),
        "division" => properties.division = Some(name.to_string()),
        "district" => properties.district = Some(name.to_string()),
        other => panic!("unknown level {other}"),
    }
    Feature::new(
        Geometry {
            geometry_type: "Polygon".to_string(),
            coordinates: serde_json::json!([[
                [lon, lat],
                [lon + 1.0, lat],
                [lon + 1.0, lat + 1.0],
                [lon, lat]
            ]]),
        },
        properties,
    )
}

pub fn region_row(level_name: &str, name: &str, param: &str, value: f64) -> AqMetricRow {
    let mut row = AqMetricRow {
        state_name: None,
        division_name: None,
        district_name: None,
        imei_id: None,
        param_name: param.to_string(),
        param_value: value,
        number_of_sensors: Some(2),
    };
    match level_name {
        "state" => row.state_name = Some(name.to_string()),
        "division" => row.division_name = Some(name.to_string()),
        "district" => row.district_name = Some(name.to_string()),
        other => panic!("unknown level {other}"),
    }
    row
}

pub fn sensor_row_aq(imei_id: &str, param: &str, value: f64) -> AqMetricRow {
    AqMetricRow {
        state_name: None,
        division_name: None,
        district_name: None,
        imei_id: Some(imei_id.to_string()),
        param_name: param.to_string(),
        param_value: value,
        number_of_sensors: None,
    }
}

pub fn sensor_row(imei_id: &str, lat: Option<f64>, lon: Option<f64>) -> SensorRow {
    serde_json::from_value(serde_json::json!({
        "imei_id": imei_id,
        "lat": lat,
        "lon": lon,
        "state_id": "17"
    }))
    .expect("sensor row fixture")
}

/// Canned AQ metrics backend recording every query pair it receives.
#[derive(Default)]
pub struct MockAq {
    pub region_rows: Vec<AqMetricRow>,
    pub sensor_rows: Vec<AqMetricRow>,
    pub region_calls: Mutex<Vec<(AqQuery, AqQuery)>>,
    pub sensor_calls: Mutex<Vec<(AqQuery, AqQuery)>>,
}

#[async_trait]
impl AqMetricsApi for MockAq {
    async fn region_metrics(
        &self,
        primary: &AqQuery,
        fallback: &AqQuery,
    ) -> Result<Vec<AqMetricRow>> {
        self.region_calls
            .lock()
            .unwrap()
            .push((primary.clone(), fallback.clone()));
        Ok(self.region_rows.clone())
    }

    async fn sensor_metrics(
        &self,
        primary: &AqQuery,
        fallback: &AqQuery,
    ) -> Result<Vec<AqMetricRow>> {
        self.sensor_calls
            .lock()
            .unwrap()
            .push((primary.clone(), fallback.clone()));
        Ok(self.sensor_rows.clone())
    }
}

/// Gate letting a test hold a filtered layer fetch open while another
/// operation overtakes it.
pub struct GeoGate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl GeoGate {
    pub fn new() -> Self {
        Self {
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }
}

/// Canned geoserver keyed by CQL filter (None = the unfiltered state
/// layer). Unknown filters yield an empty collection.
#[derive(Default)]
pub struct MockGeo {
    pub by_filter: HashMap<Option<String>, RegionCollection>,
    pub calls: Mutex<Vec<(String, Option<String>)>>,
    pub gate: Option<GeoGate>,
}

#[async_trait]
impl GeoDataApi for MockGeo {
    async fn layer_features(
        &self,
        layer: &str,
        cql_filter: Option<&str>,
    ) -> Result<RegionCollection> {
        self.calls
            .lock()
            .unwrap()
            .push((layer.to_string(), cql_filter.map(str::to_string)));

        if cql_filter.is_some()
            && let Some(gate) = &self.gate
        {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        Ok(self
            .by_filter
            .get(&cql_filter.map(str::to_string))
            .cloned()
            .unwrap_or_default())
    }
}

/// Canned sensor-location backend recording the scopes it was asked for.
#[derive(Default)]
pub struct MockSensors {
    pub rows: Vec<SensorRow>,
    pub calls: Mutex<Vec<SensorGeoQuery>>,
}

#[async_trait]
impl SensorGeoApi for MockSensors {
    async fn sensor_locations(&self, query: &SensorGeoQuery) -> Result<Vec<SensorRow>> {
        self.calls.lock().unwrap().push(query.clone());
        Ok(self.rows.clone())
    }
}
