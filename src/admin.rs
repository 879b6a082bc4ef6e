//! Administrative levels and the fixed pollutant parameter set.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pollutant codes requested on every metrics query.
pub const POLLUTANT_PARAMS: [&str; 8] = [
    "pm2.5cnc", "pm10cnc", "temp", "humidity", "so2ppb", "no2ppb", "o3ppb", "co",
];

/// Pollutant shown on sensor markers and layer summaries by default.
pub const DEFAULT_POLLUTANT: &str = "pm2.5cnc";

// Polygon layer names as published by the geoserver.
pub const STATE_LAYER: &str = "geonode:India_States_Simplified_V2";
pub const DIVISION_LAYER: &str = "geonode:India_Divisions_Merged_V1";
pub const DISTRICT_LAYER: &str = "geonode:India_Districts_Merged_Simplified_V1";

/// Granularity of the map view, from coarsest to finest.
///
/// `Sensor` is the structural fourth level; the current interaction flow
/// never enters it (a district double-click only re-centers the viewport).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminLevel {
    State,
    Division,
    District,
    Sensor,
}

impl AdminLevel {
    /// Drill depth of this level: State=1, Division=2, District=3, Sensor=4.
    pub fn layer_no(self) -> u8 {
        match self {
            AdminLevel::State => 1,
            AdminLevel::Division => 2,
            AdminLevel::District => 3,
            AdminLevel::Sensor => 4,
        }
    }

    /// Next finer level, if any.
    pub fn child(self) -> Option<AdminLevel> {
        match self {
            AdminLevel::State => Some(AdminLevel::Division),
            AdminLevel::Division => Some(AdminLevel::District),
            AdminLevel::District => Some(AdminLevel::Sensor),
            AdminLevel::Sensor => None,
        }
    }

    /// Next coarser level, if any.
    pub fn parent(self) -> Option<AdminLevel> {
        match self {
            AdminLevel::State => None,
            AdminLevel::Division => Some(AdminLevel::State),
            AdminLevel::District => Some(AdminLevel::Division),
            AdminLevel::Sensor => Some(AdminLevel::District),
        }
    }

    /// Lowercase name used in query parameters (`admin_level=...`) and as
    /// the prefix of AQ row keys (`state_name`, `division_name`, ...).
    pub fn wire_name(self) -> &'static str {
        match self {
            AdminLevel::State => "state",
            AdminLevel::Division => "division",
            AdminLevel::District => "district",
            AdminLevel::Sensor => "sensor",
        }
    }

    /// Plural display form, for user-facing notices.
    pub fn plural(self) -> &'static str {
        match self {
            AdminLevel::State => "states",
            AdminLevel::Division => "divisions",
            AdminLevel::District => "districts",
            AdminLevel::Sensor => "sensors",
        }
    }

    /// Geoserver layer holding this level's polygons. None for `Sensor`,
    /// which has point markers instead of a polygon layer.
    pub fn geoserver_layer(self) -> Option<&'static str> {
        match self {
            AdminLevel::State => Some(STATE_LAYER),
            AdminLevel::Division => Some(DIVISION_LAYER),
            AdminLevel::District => Some(DISTRICT_LAYER),
            AdminLevel::Sensor => None,
        }
    }
}

impl fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminLevel::State => write!(f, "State"),
            AdminLevel::Division => write!(f, "Division"),
            AdminLevel::District => write!(f, "District"),
            AdminLevel::Sensor => write!(f, "Sensor"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_numbers_are_contiguous() {
        assert_eq!(AdminLevel::State.layer_no(), 1);
        assert_eq!(AdminLevel::Division.layer_no(), 2);
        assert_eq!(AdminLevel::District.layer_no(), 3);
        assert_eq!(AdminLevel::Sensor.layer_no(), 4);
    }

    #[test]
    fn child_and_parent_are_inverse() {
        for level in [AdminLevel::State, AdminLevel::Division, AdminLevel::District] {
            let child = level.child().unwrap();
            assert_eq!(child.parent(), Some(level));
            assert_eq!(child.layer_no(), level.layer_no() + 1);
        }
        assert_eq!(AdminLevel::Sensor.child(), None);
        assert_eq!(AdminLevel::State.parent(), None);
    }

    #[test]
    fn polygon_levels_have_geoserver_layers() {
        assert_eq!(AdminLevel::State.geoserver_layer(), Some(STATE_LAYER));
        assert_eq!(AdminLevel::Sensor.geoserver_layer(), None);
    }
}
