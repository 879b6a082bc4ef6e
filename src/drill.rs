//! Drill-down orchestration.
//!
//! One controller drives every level transition: build the query pair,
//! fetch AQ metrics, sensor locations and sensor metrics in a fixed
//! sequential order, merge, fetch the child polygons, merge again, then
//! commit the results as one store action.
//!
//! Rapid repeated interactions can start overlapping sequences. Each run
//! captures a generation token up front; a run that finds itself
//! superseded at commit time discards its results instead of applying
//! stale data.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::admin::AdminLevel;
use crate::aq_api::{AqMetricsApi, AqQuery};
use crate::geodata::{Feature, RegionProperties};
use crate::geoserver::{GeoDataApi, division_filter, state_filter};
use crate::merge::{merge_aq_and_geo, merge_sensor_aq, sensor_collection};
use crate::sensors::{SensorGeoApi, SensorGeoQuery};
use crate::store::{Action, Filters, Store};

/// What a drill interaction ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrillOutcome {
    /// Initial or filter-change load committed.
    Loaded,
    /// Descended one level into the given child layer.
    Descended(AdminLevel),
    /// The child layer had no regions; the view stayed put and the user
    /// was warned.
    Empty(AdminLevel),
    /// District interaction: viewport re-centered, nothing fetched.
    Recentered,
    /// A newer operation superseded this one; results were discarded.
    Stale,
}

pub struct DrillController {
    aq: Arc<dyn AqMetricsApi>,
    geo: Arc<dyn GeoDataApi>,
    sensors: Arc<dyn SensorGeoApi>,
    store: Arc<Store>,
    generation: AtomicU64,
}

impl DrillController {
    pub fn new(
        aq: Arc<dyn AqMetricsApi>,
        geo: Arc<dyn GeoDataApi>,
        sensors: Arc<dyn SensorGeoApi>,
        store: Arc<Store>,
    ) -> Self {
        Self {
            aq,
            geo,
            sensors,
            store,
            generation: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, token: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == token
    }

    /// Level 0 -> 1: load the all-India state view. Runs at startup and
    /// after every filter change.
    pub async fn initial_load(&self) -> Result<DrillOutcome> {
        let token = self.begin();
        self.store.dispatch(Action::SetLoading(true));

        let result = self.run_initial_load(token).await;
        if result.is_err() && self.is_current(token) {
            self.store.dispatch(Action::SetLoading(false));
        }
        result
    }

    async fn run_initial_load(&self, token: u64) -> Result<DrillOutcome> {
        let filters = self.store.snapshot().filters;
        let primary = AqQuery::for_level(AdminLevel::State, filters.window());
        let fallback = primary.fallback();
        let geo_query = SensorGeoQuery::scoped(AdminLevel::State, None);

        let aq_rows = self.aq.region_metrics(&primary, &fallback).await?;
        let sensor_rows = self.sensors.sensor_locations(&geo_query).await?;
        let sensor_aq = self.aq.sensor_metrics(&primary, &fallback).await?;

        let mut sensors = sensor_collection(&sensor_rows);
        merge_sensor_aq(&sensor_aq, &mut sensors);

        let layer = AdminLevel::State
            .geoserver_layer()
            .context("State level has no geoserver layer")?;
        let mut regions = self.geo.layer_features(layer, None).await?;
        merge_aq_and_geo(&aq_rows, &mut regions, AdminLevel::State);

        if !self.is_current(token) {
            warn!("Discarding stale initial load (generation {})", token);
            return Ok(DrillOutcome::Stale);
        }

        info!(
            "Initial load: {} states, {} sensors",
            regions.len(),
            sensors.len()
        );
        self.store
            .dispatch(Action::InitialLoaded { regions, sensors });
        Ok(DrillOutcome::Loaded)
    }

    /// Handle a double-click on the given feature of the current layer.
    ///
    /// State and Division descend one level through the shared protocol;
    /// District only re-centers the viewport (the fourth, sensor-level
    /// drill is structurally present but never triggered).
    pub async fn drill_down(&self, feature: &Feature<RegionProperties>) -> Result<DrillOutcome> {
        let snapshot = self.store.snapshot();
        match snapshot.current_layer {
            AdminLevel::State => {
                self.descend(feature, AdminLevel::Division, snapshot.filters)
                    .await
            }
            AdminLevel::Division => {
                self.descend(feature, AdminLevel::District, snapshot.filters)
                    .await
            }
            AdminLevel::District | AdminLevel::Sensor => {
                if let Some(bounds) = feature.bounds() {
                    self.store.dispatch(Action::Recenter(bounds));
                }
                Ok(DrillOutcome::Recentered)
            }
        }
    }

    async fn descend(
        &self,
        feature: &Feature<RegionProperties>,
        target: AdminLevel,
        filters: Filters,
    ) -> Result<DrillOutcome> {
        let token = self.begin();
        self.store.dispatch(Action::SetLoading(true));

        let result = self.run_descend(token, feature, target, filters).await;
        if result.is_err() && self.is_current(token) {
            self.store.dispatch(Action::SetLoading(false));
        }
        result
    }

    async fn run_descend(
        &self,
        token: u64,
        feature: &Feature<RegionProperties>,
        target: AdminLevel,
        filters: Filters,
    ) -> Result<DrillOutcome> {
        let parent = target
            .parent()
            .with_context(|| format!("{target} has no parent level"))?;
        let parent_name = feature
            .properties
            .name_at(parent)
            .with_context(|| format!("Clicked feature has no {parent} name"))?
            .to_string();
        let parent_id = feature.properties.id.clone();
        let parent_bounds = feature.bounds();

        let cql_filter = match parent {
            AdminLevel::State => state_filter(&parent_name),
            _ => division_filter(&parent_name),
        };

        debug!(
            "Drilling from {} {:?} into {} (filter: {})",
            parent, parent_name, target, cql_filter
        );

        let primary = AqQuery::for_level(target, filters.window());
        let fallback = primary.fallback();
        let geo_query = SensorGeoQuery::scoped(parent, parent_id);

        // Fixed fetch order: child AQ, sensor locations, sensor AQ, child
        // polygons. Strictly sequential, one attempt each.
        let aq_rows = self.aq.region_metrics(&primary, &fallback).await?;
        let sensor_rows = self.sensors.sensor_locations(&geo_query).await?;
        let sensor_aq = self.aq.sensor_metrics(&primary, &fallback).await?;

        let mut sensors = sensor_collection(&sensor_rows);
        merge_sensor_aq(&sensor_aq, &mut sensors);

        let layer = target
            .geoserver_layer()
            .with_context(|| format!("{target} has no geoserver layer"))?;
        let mut regions = self.geo.layer_features(layer, Some(&cql_filter)).await?;
        merge_aq_and_geo(&aq_rows, &mut regions, target);

        if !self.is_current(token) {
            warn!(
                "Discarding stale drill-down into {} (generation {})",
                target, token
            );
            return Ok(DrillOutcome::Stale);
        }

        let empty = regions.is_empty();
        info!(
            "Drill-down into {}: {} regions, {} sensors",
            target,
            regions.len(),
            sensors.len()
        );
        self.store.dispatch(Action::DrillDown {
            target,
            regions,
            sensors,
            parent_name,
            parent_bounds,
        });

        Ok(if empty {
            DrillOutcome::Empty(target)
        } else {
            DrillOutcome::Descended(target)
        })
    }

    /// Apply a new filter quadruple. The view resets to the State level
    /// and reloads from scratch.
    pub async fn apply_filters(&self, filters: Filters) -> Result<DrillOutcome> {
        self.store.dispatch(Action::SetFilters(filters));
        self.initial_load().await
    }

    /// Return to the next coarser level. No fetches; the coarser layer's
    /// data is still in the store.
    pub fn drill_up(&self) {
        self.store.dispatch(Action::DrillUp);
    }
}
