//! aqmap - data core for an India air-quality map dashboard
//!
//! This library owns everything behind the map surface: typed clients for
//! the AQ metrics, sensor-location and geoserver backends, the merge engine
//! that joins pollutant readings onto GeoJSON features, and the drill-down
//! controller that moves the view between state, division and district
//! granularities while keeping filter state intact.

pub mod admin;
pub mod aq_api;
pub mod config;
pub mod drill;
pub mod geodata;
pub mod geoserver;
pub mod merge;
pub mod sensors;
pub mod store;
pub mod view;

pub use admin::AdminLevel;
pub use aq_api::{AqClient, AqMetricRow, AqMetricsApi, AqQuery, SamplingPeriod, SamplingWindow};
pub use drill::{DrillController, DrillOutcome};
pub use geodata::{Feature, FeatureCollection, LatLngBounds, RegionCollection, SensorCollection};
pub use geoserver::{GeoDataApi, GeoServerClient};
pub use sensors::{SensorClient, SensorGeoApi, SensorGeoQuery, SensorRow};
pub use store::{Action, Filters, Store, ViewState};
