//! View-model helpers: the pieces a map surface (or the CLI) reads off the
//! current snapshot.

use std::fmt::Write;

use crate::admin::AdminLevel;
use crate::geodata::{Feature, RegionCollection, RegionProperties, SensorCollection};
use crate::store::ViewState;

/// The one polygon collection rendered for the current layer.
pub fn active_regions(state: &ViewState) -> &RegionCollection {
    state.regions_at(state.current_layer)
}

/// The one sensor collection rendered for the current layer.
pub fn active_sensors(state: &ViewState) -> &SensorCollection {
    state.sensors_at(state.current_layer)
}

/// Round a reading for display, two decimal places. The epsilon nudge
/// keeps values like 2.675 from rounding down through binary
/// representation error.
pub fn round_reading(value: f64) -> f64 {
    ((value + f64::EPSILON) * 100.0).round() / 100.0
}

/// Label shown on a sensor marker: the selected pollutant's reading as a
/// whole number, or "-" when the sensor has no reading for it.
pub fn marker_label<P: MarkerValues>(feature: &Feature<P>, pollutant: &str) -> String {
    match feature.properties.value_of(pollutant) {
        Some(value) => format!("{}", value.round()),
        None => "-".to_string(),
    }
}

/// Anything carrying a `param_values` map a marker can read.
pub trait MarkerValues {
    fn value_of(&self, pollutant: &str) -> Option<f64>;
}

impl MarkerValues for crate::geodata::SensorProperties {
    fn value_of(&self, pollutant: &str) -> Option<f64> {
        self.param_values.as_ref()?.get(pollutant).copied()
    }
}

impl MarkerValues for RegionProperties {
    fn value_of(&self, pollutant: &str) -> Option<f64> {
        self.param_values.as_ref()?.get(pollutant).copied()
    }
}

/// Find a region in the active layer by name, case-insensitively.
pub fn find_region<'a>(
    state: &'a ViewState,
    name: &str,
) -> Option<&'a Feature<RegionProperties>> {
    let level = state.current_layer;
    let name_lower = name.to_lowercase();
    active_regions(state)
        .features
        .iter()
        .find(|f| {
            f.properties
                .name_at(level)
                .is_some_and(|n| n.to_lowercase() == name_lower)
        })
}

/// Textual rendering of the active layer, one region per line with the
/// selected pollutant's reading and sensor count.
pub fn render_layer(state: &ViewState) -> String {
    let mut out = String::new();
    let level = state.current_layer;

    let scope = match level {
        AdminLevel::State => "India".to_string(),
        AdminLevel::Division => state
            .selected_state
            .clone()
            .unwrap_or_else(|| "?".to_string()),
        AdminLevel::District | AdminLevel::Sensor => state
            .selected_division
            .clone()
            .unwrap_or_else(|| "?".to_string()),
    };
    let _ = writeln!(
        out,
        "{} layer ({}) - {} [{}]",
        level,
        scope,
        active_regions(state).len(),
        state.selected_pollutant
    );

    if let Some(notice) = &state.notice {
        let _ = writeln!(out, "! {notice}");
    }

    for feature in &active_regions(state).features {
        let name = feature.properties.name_at(level).unwrap_or("?");
        let reading = match feature.properties.value_of(&state.selected_pollutant) {
            Some(value) => format!("{}", round_reading(value)),
            None => "-".to_string(),
        };
        let sensors = feature
            .properties
            .number_of_sensors
            .map(|n| format!("{n} sensors"))
            .unwrap_or_else(|| "no sensors".to_string());
        let _ = writeln!(out, "  {name:<28} {reading:>8}  {sensors}");
    }

    if state.show_sensor_layer {
        let sensors = active_sensors(state);
        let _ = writeln!(out, "  -- {} sensor markers --", sensors.len());
        for feature in &sensors.features {
            let _ = writeln!(
                out,
                "  [{}] {}",
                marker_label(feature, &state.selected_pollutant),
                feature.properties.imei_id
            );
        }
    }

    out
}
