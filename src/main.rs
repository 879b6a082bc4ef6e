//! aqmap CLI: load the India AQ map data, optionally drill into a state
//! and a division, and print the active layer after each transition.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use aqmap::admin::DEFAULT_POLLUTANT;
use aqmap::aq_api::{AqClient, SamplingPeriod};
use aqmap::config::Settings;
use aqmap::drill::{DrillController, DrillOutcome};
use aqmap::geoserver::GeoServerClient;
use aqmap::sensors::SensorClient;
use aqmap::store::{Action, Filters, Store};
use aqmap::view;

#[derive(Debug, Parser)]
#[command(name = "aqmap", about = "India air-quality drill-down dashboard core")]
struct Args {
    /// Start of the date filter (YYYY-MM-DD). The four date/sampling
    /// options only take effect together.
    #[arg(long)]
    from_date: Option<NaiveDate>,

    /// End of the date filter (YYYY-MM-DD).
    #[arg(long)]
    to_date: Option<NaiveDate>,

    /// Aggregation bucket for the date filter.
    #[arg(long, value_enum)]
    sampling: Option<SamplingPeriod>,

    /// Bucket size for the date filter.
    #[arg(long)]
    sampling_value: Option<u32>,

    /// Drill into this state after the initial load.
    #[arg(long)]
    state: Option<String>,

    /// Then drill into this division (requires --state).
    #[arg(long, requires = "state")]
    division: Option<String>,

    /// Pollutant shown in summaries and on sensor markers.
    #[arg(long, default_value = DEFAULT_POLLUTANT)]
    pollutant: String,

    /// Hide the sensor marker layer.
    #[arg(long)]
    hide_sensors: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let settings = Settings::from_env();

    let store = Arc::new(Store::new());
    store.dispatch(Action::SetPollutant(args.pollutant.clone()));
    if args.hide_sensors {
        store.dispatch(Action::ToggleSensorLayer(false));
    }

    let controller = DrillController::new(
        Arc::new(AqClient::new(settings.aq_base_url)),
        Arc::new(GeoServerClient::new(settings.geoserver_base_url)),
        Arc::new(SensorClient::new(settings.sensor_base_url)),
        store.clone(),
    );

    let filters = Filters {
        from_date: args.from_date,
        to_date: args.to_date,
        sampling: args.sampling,
        sampling_value: args.sampling_value,
    };
    controller
        .apply_filters(filters)
        .await
        .context("Initial load failed")?;
    print!("{}", view::render_layer(&store.snapshot()));

    if let Some(state_name) = &args.state {
        drill_into(&controller, &store, state_name).await?;
        print!("{}", view::render_layer(&store.snapshot()));

        if let Some(division_name) = &args.division {
            drill_into(&controller, &store, division_name).await?;
            print!("{}", view::render_layer(&store.snapshot()));
        }
    }

    Ok(())
}

async fn drill_into(controller: &DrillController, store: &Store, name: &str) -> Result<()> {
    let snapshot = store.snapshot();
    let feature = view::find_region(&snapshot, name)
        .with_context(|| {
            format!(
                "No {} named {:?} in the current view",
                snapshot.current_layer, name
            )
        })?
        .clone();

    store.dispatch(Action::SelectRegion(feature.clone()));

    match controller.drill_down(&feature).await? {
        DrillOutcome::Empty(level) => {
            warn!("No {} under {:?}", level.plural(), name);
        }
        DrillOutcome::Stale => {
            warn!("Drill-down into {:?} was superseded", name);
        }
        _ => {}
    }
    Ok(())
}
