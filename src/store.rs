//! View state and its reducer.
//!
//! Every handler produces a new `ViewState` snapshot through `reduce`;
//! nothing mutates shared state directly. One long-standing quirk is kept:
//! `layer_no` advances even when a drill-down returns no child regions, so
//! it can run ahead of `current_layer`. `layers_in_sync` makes that
//! invariant checkable.

use chrono::NaiveDate;
use std::sync::RwLock;
use tracing::warn;

use crate::admin::{AdminLevel, DEFAULT_POLLUTANT};
use crate::aq_api::{SamplingPeriod, SamplingWindow};
use crate::geodata::{
    Feature, LatLngBounds, RegionCollection, RegionProperties, SensorCollection, SensorProperties,
};

/// Date-range and sampling filters shared across all levels. Each field is
/// independently optional; they only take effect as a complete quadruple.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub sampling: Option<SamplingPeriod>,
    pub sampling_value: Option<u32>,
}

impl Filters {
    /// The date window to query with: present only when all four fields
    /// are set, so partial date filters are never sent.
    pub fn window(&self) -> Option<SamplingWindow> {
        match (
            self.from_date,
            self.to_date,
            self.sampling,
            self.sampling_value,
        ) {
            (Some(from_date), Some(to_date), Some(sampling), Some(sampling_value)) => {
                Some(SamplingWindow {
                    from_date,
                    to_date,
                    sampling,
                    sampling_value,
                })
            }
            _ => None,
        }
    }
}

/// What the detail panel is showing.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectedFeature {
    Region(Feature<RegionProperties>),
    Sensor(Feature<SensorProperties>),
}

/// The whole map view state, one snapshot at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub current_layer: AdminLevel,
    /// Drill depth counter: State=1 .. Sensor=4. See module docs for the
    /// preserved desync quirk.
    pub layer_no: u8,
    pub selected_state: Option<String>,
    pub selected_division: Option<String>,
    pub selected_district: Option<String>,
    pub states: RegionCollection,
    pub divisions: RegionCollection,
    pub districts: RegionCollection,
    pub state_sensors: SensorCollection,
    pub division_sensors: SensorCollection,
    pub district_sensors: SensorCollection,
    pub bounds: Option<LatLngBounds>,
    pub selected_feature: Option<SelectedFeature>,
    pub selected_feature_name: Option<String>,
    pub selected_pollutant: String,
    pub show_sensor_layer: bool,
    pub is_loading: bool,
    pub has_drilled_down: bool,
    pub filters: Filters,
    /// User-facing warning from the last transition, if any.
    pub notice: Option<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            current_layer: AdminLevel::State,
            layer_no: AdminLevel::State.layer_no(),
            selected_state: None,
            selected_division: None,
            selected_district: None,
            states: RegionCollection::default(),
            divisions: RegionCollection::default(),
            districts: RegionCollection::default(),
            state_sensors: SensorCollection::default(),
            division_sensors: SensorCollection::default(),
            district_sensors: SensorCollection::default(),
            bounds: None,
            selected_feature: None,
            selected_feature_name: None,
            selected_pollutant: DEFAULT_POLLUTANT.to_string(),
            show_sensor_layer: true,
            is_loading: false,
            has_drilled_down: false,
            filters: Filters::default(),
            notice: None,
        }
    }
}

impl ViewState {
    /// True when `layer_no` agrees with `current_layer`. An empty
    /// drill-down leaves this false by design of the source behavior.
    pub fn layers_in_sync(&self) -> bool {
        self.layer_no == self.current_layer.layer_no()
    }

    pub fn regions_at(&self, level: AdminLevel) -> &RegionCollection {
        match level {
            AdminLevel::State => &self.states,
            AdminLevel::Division => &self.divisions,
            AdminLevel::District | AdminLevel::Sensor => &self.districts,
        }
    }

    pub fn sensors_at(&self, level: AdminLevel) -> &SensorCollection {
        match level {
            AdminLevel::State => &self.state_sensors,
            AdminLevel::Division => &self.division_sensors,
            AdminLevel::District | AdminLevel::Sensor => &self.district_sensors,
        }
    }
}

/// Every transition the view can make.
#[derive(Debug, Clone)]
pub enum Action {
    SetLoading(bool),
    /// New filter quadruple; the view always restarts at the State level.
    SetFilters(Filters),
    /// Initial (level 0 -> 1) load results.
    InitialLoaded {
        regions: RegionCollection,
        sensors: SensorCollection,
    },
    /// Drill-down results for the child level `target`.
    DrillDown {
        target: AdminLevel,
        regions: RegionCollection,
        sensors: SensorCollection,
        parent_name: String,
        parent_bounds: Option<LatLngBounds>,
    },
    DrillUp,
    Recenter(LatLngBounds),
    SelectRegion(Feature<RegionProperties>),
    SelectSensor(Feature<SensorProperties>),
    ClearSelection,
    ToggleSensorLayer(bool),
    SetPollutant(String),
}

/// Pure state transition: consumes a snapshot, returns the next one.
pub fn reduce(state: &ViewState, action: Action) -> ViewState {
    let mut next = state.clone();
    match action {
        Action::SetLoading(loading) => {
            next.is_loading = loading;
        }
        Action::SetFilters(filters) => {
            // A filter change reloads from the top; any drill depth is
            // discarded.
            next = ViewState {
                filters,
                selected_pollutant: state.selected_pollutant.clone(),
                show_sensor_layer: state.show_sensor_layer,
                is_loading: state.is_loading,
                ..ViewState::default()
            };
        }
        Action::InitialLoaded { regions, sensors } => {
            next.states = regions;
            next.state_sensors = sensors;
            next.current_layer = AdminLevel::State;
            next.layer_no = AdminLevel::State.layer_no();
            next.has_drilled_down = false;
            next.is_loading = false;
        }
        Action::DrillDown {
            target,
            regions,
            sensors,
            parent_name,
            parent_bounds,
        } => {
            apply_drill_down(&mut next, target, regions, sensors, parent_name, parent_bounds);
        }
        Action::DrillUp => {
            apply_drill_up(&mut next);
        }
        Action::Recenter(bounds) => {
            next.bounds = Some(bounds);
            next.has_drilled_down = true;
        }
        Action::SelectRegion(feature) => {
            next.selected_feature_name = feature
                .properties
                .name_at(state.current_layer)
                .map(str::to_string);
            next.selected_feature = Some(SelectedFeature::Region(feature));
        }
        Action::SelectSensor(feature) => {
            next.selected_feature_name = Some(feature.properties.imei_id.clone());
            next.selected_feature = Some(SelectedFeature::Sensor(feature));
        }
        Action::ClearSelection => {
            next.selected_feature = None;
            next.selected_feature_name = None;
        }
        Action::ToggleSensorLayer(show) => {
            next.show_sensor_layer = show;
        }
        Action::SetPollutant(pollutant) => {
            next.selected_pollutant = pollutant;
        }
    }
    next
}

fn apply_drill_down(
    next: &mut ViewState,
    target: AdminLevel,
    regions: RegionCollection,
    sensors: SensorCollection,
    parent_name: String,
    parent_bounds: Option<LatLngBounds>,
) {
    let empty = regions.is_empty();

    match target {
        AdminLevel::Division => {
            next.divisions = regions;
            next.division_sensors = sensors;
            next.selected_state = Some(parent_name);
        }
        AdminLevel::District => {
            next.districts = regions;
            next.district_sensors = sensors;
            next.selected_division = Some(parent_name);
        }
        AdminLevel::State | AdminLevel::Sensor => {
            warn!("Ignoring drill-down into {} layer", target);
            return;
        }
    }

    if empty {
        next.notice = Some(format!(
            "No {} found for the selected {}",
            target.plural(),
            target.parent().map(|p| p.to_string()).unwrap_or_default()
        ));
        next.selected_feature = None;
        next.selected_feature_name = None;
        next.has_drilled_down = false;
    } else {
        next.current_layer = target;
        next.bounds = parent_bounds;
        next.has_drilled_down = true;
        next.notice = None;
    }

    // The depth counter advances even when the drill-down found nothing,
    // leaving it ahead of current_layer. See the module docs.
    next.layer_no += 1;
    next.is_loading = false;
}

fn apply_drill_up(next: &mut ViewState) {
    let Some(parent) = next.current_layer.parent() else {
        return;
    };

    match next.current_layer {
        AdminLevel::District => {
            next.districts = RegionCollection::default();
            next.district_sensors = SensorCollection::default();
            next.selected_division = None;
        }
        AdminLevel::Division => {
            next.divisions = RegionCollection::default();
            next.division_sensors = SensorCollection::default();
            next.selected_state = None;
        }
        AdminLevel::State | AdminLevel::Sensor => {}
    }

    next.current_layer = parent;
    next.layer_no = parent.layer_no();
    next.bounds = None;
    next.selected_feature = None;
    next.selected_feature_name = None;
    next.has_drilled_down = parent != AdminLevel::State;
    next.notice = None;
}

/// Shared holder of the current snapshot.
pub struct Store {
    state: RwLock<ViewState>,
}

impl Store {
    pub fn new() -> Self {
        Self::with_state(ViewState::default())
    }

    pub fn with_state(state: ViewState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    pub fn dispatch(&self, action: Action) {
        let mut guard = self.state.write().expect("view state lock poisoned");
        let next = reduce(&guard, action);
        *guard = next;
    }

    pub fn snapshot(&self) -> ViewState {
        self.state
            .read()
            .expect("view state lock poisoned")
            .clone()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
