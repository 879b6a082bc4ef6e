//! Merge engine: pure joins of AQ metric rows onto GeoJSON features.
//!
//! All joins are linear scans. Collections are bounded by administrative
//! counts (tens of regions) or sensor counts (low hundreds), so no index
//! is built.

use tracing::debug;

use crate::admin::AdminLevel;
use crate::aq_api::AqMetricRow;
use crate::geodata::{Feature, Geometry, RegionCollection, SensorCollection, SensorProperties};
use crate::sensors::SensorRow;

/// Decorate polygon features with the AQ rows matching their region name at
/// `level`. Matching is case-insensitive exact string equality. Every input
/// feature is preserved; features with no matching row gain no
/// `param_values`. When several rows carry the same pollutant the last one
/// wins, which also makes the merge idempotent.
pub fn merge_aq_and_geo(rows: &[AqMetricRow], regions: &mut RegionCollection, level: AdminLevel) {
    let mut matched = 0usize;
    for feature in &mut regions.features {
        let Some(name) = feature.properties.name_at(level) else {
            continue;
        };
        let name_lower = name.to_lowercase();

        let mut hit = false;
        for row in rows {
            let Some(row_name) = row.region_name(level) else {
                continue;
            };
            if row_name.to_lowercase() != name_lower {
                continue;
            }
            hit = true;
            feature
                .properties
                .param_values_mut()
                .insert(row.param_name.clone(), row.param_value);
            feature.properties.number_of_sensors = row.number_of_sensors;
        }
        if hit {
            matched += 1;
        }
    }
    debug!(
        "Merged AQ rows onto {}/{} {} features",
        matched,
        regions.features.len(),
        level.wire_name()
    );
}

/// Decorate sensor point features with the AQ rows matching their
/// `imei_id` exactly. Same last-write-wins contract as the region merge.
pub fn merge_sensor_aq(rows: &[AqMetricRow], sensors: &mut SensorCollection) {
    for feature in &mut sensors.features {
        for row in rows {
            if row.imei_id.as_deref() != Some(feature.properties.imei_id.as_str()) {
                continue;
            }
            feature
                .properties
                .param_values_mut()
                .insert(row.param_name.clone(), row.param_value);
        }
    }
}

/// Build the sensor point collection from raw location rows. Rows lacking
/// either coordinate are dropped; survivors keep their input order.
pub fn sensor_collection(rows: &[SensorRow]) -> SensorCollection {
    let features = rows
        .iter()
        .filter(|row| row.lat.is_some() && row.lon.is_some())
        .map(|row| {
            Feature::new(
                Geometry::point(row.lon.unwrap_or_default(), row.lat.unwrap_or_default()),
                SensorProperties {
                    imei_id: row.imei_id.clone(),
                    state_id: row.state_id.clone(),
                    division_id: row.division_id.clone(),
                    district_id: row.district_id.clone(),
                    updated_time: row.updated_time.clone(),
                    param_values: None,
                },
            )
        })
        .collect();

    SensorCollection::new(features)
}
