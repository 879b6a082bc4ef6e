//! GeoJSON feature model shared by the geoserver and sensor pipelines.
//!
//! Geometry coordinates are kept as raw JSON: the crate never reprojects or
//! edits geometry, it only decorates feature properties and derives bounds.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::admin::AdminLevel;

/// A GeoJSON geometry with opaque coordinates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub geometry_type: String,
    pub coordinates: Value,
}

impl Geometry {
    /// Point geometry at `[lon, lat]` (GeoJSON axis order).
    pub fn point(lon: f64, lat: f64) -> Self {
        Self {
            geometry_type: "Point".to_string(),
            coordinates: serde_json::json!([lon, lat]),
        }
    }
}

/// A GeoJSON feature with typed properties.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature<P> {
    #[serde(rename = "type", default = "feature_tag")]
    pub feature_type: String,
    pub geometry: Geometry,
    pub properties: P,
}

fn feature_tag() -> String {
    "Feature".to_string()
}

impl<P> Feature<P> {
    pub fn new(geometry: Geometry, properties: P) -> Self {
        Self {
            feature_type: feature_tag(),
            geometry,
            properties,
        }
    }

    /// Geographic bounds of the feature, from a recursive walk over the
    /// coordinate arrays. None if the geometry holds no positions.
    pub fn bounds(&self) -> Option<LatLngBounds> {
        let mut bounds = None;
        extend_from_coordinates(&self.geometry.coordinates, &mut bounds);
        bounds
    }
}

/// A GeoJSON feature collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection<P> {
    #[serde(rename = "type", default = "collection_tag")]
    pub collection_type: String,
    pub features: Vec<Feature<P>>,
}

fn collection_tag() -> String {
    "FeatureCollection".to_string()
}

impl<P> FeatureCollection<P> {
    pub fn new(features: Vec<Feature<P>>) -> Self {
        Self {
            collection_type: collection_tag(),
            features,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }
}

impl<P> Default for FeatureCollection<P> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

pub type RegionCollection = FeatureCollection<RegionProperties>;
pub type SensorCollection = FeatureCollection<SensorProperties>;

/// Properties of an administrative polygon as served by the geoserver,
/// plus the AQ decoration added by the merge engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegionProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(
        default,
        deserialize_with = "de_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// Pollutant code -> aggregated reading, set by the merge engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_values: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_sensors: Option<i64>,
    /// Any other geoserver attributes, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl RegionProperties {
    /// Region name at the given polygon level, if present.
    pub fn name_at(&self, level: AdminLevel) -> Option<&str> {
        match level {
            AdminLevel::State => self.state.as_deref(),
            AdminLevel::Division => self.division.as_deref(),
            AdminLevel::District => self.district.as_deref(),
            AdminLevel::Sensor => None,
        }
    }

    pub fn param_values_mut(&mut self) -> &mut BTreeMap<String, f64> {
        self.param_values.get_or_insert_with(BTreeMap::new)
    }
}

/// Properties of a sensor point feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorProperties {
    pub imei_id: String,
    #[serde(
        default,
        deserialize_with = "de_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub state_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "de_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub division_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "de_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub district_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_values: Option<BTreeMap<String, f64>>,
}

impl SensorProperties {
    pub fn param_values_mut(&mut self) -> &mut BTreeMap<String, f64> {
        self.param_values.get_or_insert_with(BTreeMap::new)
    }
}

/// South-west / north-east viewport bounds in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl LatLngBounds {
    pub fn of_point(lat: f64, lon: f64) -> Self {
        Self {
            south: lat,
            west: lon,
            north: lat,
            east: lon,
        }
    }

    pub fn extend(&mut self, lat: f64, lon: f64) {
        self.south = self.south.min(lat);
        self.west = self.west.min(lon);
        self.north = self.north.max(lat);
        self.east = self.east.max(lon);
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.south + self.north) / 2.0, (self.west + self.east) / 2.0)
    }
}

// A coordinate array is a position when its leading elements are numbers;
// anything else is a nested ring/line/multi structure.
fn extend_from_coordinates(value: &Value, bounds: &mut Option<LatLngBounds>) {
    let Some(items) = value.as_array() else {
        return;
    };
    if items.len() >= 2
        && let (Some(lon), Some(lat)) = (items[0].as_f64(), items[1].as_f64())
    {
        match bounds {
            Some(b) => b.extend(lat, lon),
            None => *bounds = Some(LatLngBounds::of_point(lat, lon)),
        }
        return;
    }
    for item in items {
        extend_from_coordinates(item, bounds);
    }
}

/// Accepts region/sensor scope ids that arrive either as JSON strings or
/// numbers and normalizes them to strings.
pub(crate) fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_geoserver_feature_with_numeric_id() {
        let json = r#"{
            "type": "Feature",
            "geometry": {
                "type": "MultiPolygon",
                "coordinates": [[[[76.0, 10.0], [76.5, 10.0], [76.5, 10.5], [76.0, 10.0]]]]
            },
            "properties": {
                "state": "Kerala",
                "id": 17,
                "area_sqkm": 38863.0
            }
        }"#;
        let feature: Feature<RegionProperties> = serde_json::from_str(json).unwrap();
        assert_eq!(feature.properties.state.as_deref(), Some("Kerala"));
        assert_eq!(feature.properties.id.as_deref(), Some("17"));
        assert!(feature.properties.param_values.is_none());
        assert!(feature.properties.extra.contains_key("area_sqkm"));
        assert_eq!(
            feature.properties.name_at(AdminLevel::State),
            Some("Kerala")
        );
    }

    #[test]
    fn bounds_cover_all_polygon_vertices() {
        let json = r#"{
            "type": "Feature",
            "geometry": {
                "type": "MultiPolygon",
                "coordinates": [[[[76.0, 10.0], [76.5, 9.5], [77.0, 10.5], [76.0, 10.0]]]]
            },
            "properties": {"state": "Kerala"}
        }"#;
        let feature: Feature<RegionProperties> = serde_json::from_str(json).unwrap();
        let bounds = feature.bounds().unwrap();
        assert_eq!(bounds.south, 9.5);
        assert_eq!(bounds.west, 76.0);
        assert_eq!(bounds.north, 10.5);
        assert_eq!(bounds.east, 77.0);
    }

    #[test]
    fn point_feature_bounds_degenerate_to_the_point() {
        let feature = Feature::new(
            Geometry::point(77.2, 28.6),
            SensorProperties {
                imei_id: "A1".to_string(),
                state_id: None,
                division_id: None,
                district_id: None,
                updated_time: None,
                param_values: None,
            },
        );
        let bounds = feature.bounds().unwrap();
        assert_eq!(bounds.center(), (28.6, 77.2));
    }

    #[test]
    fn collection_round_trips_type_tags() {
        let collection: RegionCollection = Default::default();
        let json = serde_json::to_value(&collection).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
    }
}
