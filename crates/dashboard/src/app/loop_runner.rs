use std::process::ExitCode;

use minemap_engine::{
    load_engine_config, load_trajectory, load_zones, resolve_app_paths, run_live_map, run_replay,
    AppError, EngineConfig, MockFeed, ViewMode, Zone, ZoneAlert,
};
use tracing::{debug, error, info, warn};

use super::bootstrap::{AppWiring, Mode};

pub(crate) fn run(app: AppWiring) -> ExitCode {
    if let Err(err) = run_mode(app) {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run_mode(app: AppWiring) -> Result<(), AppError> {
    let paths = resolve_app_paths()?;
    let mut config = load_engine_config(&paths.engine_config_file())?;
    if let Some(seed) = app.seed {
        config.mock_feed.seed = seed;
    }
    info!(root = %paths.root.display(), "config_loaded");

    match app.mode {
        Mode::Live => run_live(&config, app.view, load_zones(&paths.zones_file())?),
        Mode::Replay { trajectory } => {
            let trajectory = load_trajectory(&trajectory)?;
            info!(
                subject = %trajectory.subject_id(),
                points = trajectory.len(),
                "trajectory_loaded"
            );
            run_replay(&config, app.view, trajectory, |replay| {
                replay.on_index_changed(|index, point| {
                    debug!(
                        index,
                        timestamp_ms = point.timestamp.as_millis(),
                        status = ?point.status,
                        "replay_index"
                    );
                });
                replay.on_entity_selected(|id| match id {
                    Some(id) => info!(entity_id = %id, "entity_selected"),
                    None => debug!("selection_cleared"),
                });
            })
        }
    }
}

fn run_live(config: &EngineConfig, view: ViewMode, zones: Vec<Zone>) -> Result<(), AppError> {
    let feed = MockFeed::new(config.mock_feed.clone());
    info!(
        zones = zones.len(),
        entities = feed.entity_count(),
        "live_map_starting"
    );
    run_live_map(config, view, move |map| {
        if let Err(err) = map.set_zones(zones) {
            warn!(error = %err, "zones_rejected");
        }
        map.on_alert(log_alert);
        map.on_entity_selected(|id| match id {
            Some(id) => info!(entity_id = %id, "entity_selected"),
            None => debug!("selection_cleared"),
        });
        map.attach_feed(Box::new(feed));
    })
}

fn log_alert(alert: &ZoneAlert) {
    warn!(
        entity_id = %alert.entity_id,
        zone_id = %alert.zone_id,
        kind = ?alert.kind,
        severity = alert.severity.level(),
        "zone_alert"
    );
}
