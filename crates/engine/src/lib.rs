use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod config;
pub mod feed;
pub mod geofence;
pub mod model;
pub mod playback;
pub mod store;
pub mod style;

pub use app::{
    initial_projection, project_zone_outlines, run_live_map, run_live_map_with_metrics,
    run_replay, run_replay_with_metrics, AlertListener, AppError, BackendCall, Camera2D, Camera3D,
    FrameReport, HeadlessContainer, IndexListener, LiveMap, LoopMetricsSnapshot, MetricsHandle,
    MountError, PickingResolver, PixelsBackend, Projection, ReconcileReport, RecordingBackend,
    RecordingLog, RenderBackend, RenderContainer, RenderError, RenderObjectDesc, SceneCore,
    SceneSynchronizer, Scheduler, TaskKind, TrajectoryReplay, Vec2, ViewMode, Viewport,
    WindowContainer, SLOW_FRAME_ENV_VAR,
};
pub use config::{
    load_engine_config, load_trajectory, load_zones, ConfigError, EngineConfig,
    ENGINE_CONFIG_FILE, FEED_PERIOD_ENV_VAR, ZONES_FILE,
};
pub use feed::{BufferedFeed, FeedSender, MockFeed, TelemetryFeed};
pub use geofence::{AlertKind, GeofenceEvaluator, ZoneAlert, ZoneExit, ZoneOccupancy};
pub use model::{
    EntityId, EntityKind, EntityStatus, EntityValidationError, Polygon, Position, ReferenceFrame,
    Severity, SpatialEntity, Timestamp, Trajectory, TrajectoryError, TrajectoryPoint,
    TrajectorySpec, Vertex, Zone, ZoneId, ZoneRule, ZoneSpec, ZoneValidationError,
};
pub use playback::{PlaybackState, TrajectoryPlayer};
pub use store::{BatchOutcome, EntityStore, StoreChange};
pub use style::{MarkerShape, StyleTable, VisualStyle};

pub const ROOT_ENV_VAR: &str = "MINEMAP_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub config_dir: PathBuf,
}

impl AppPaths {
    pub fn engine_config_file(&self) -> PathBuf {
        self.config_dir.join(ENGINE_CONFIG_FILE)
    }

    pub fn zones_file(&self) -> PathBuf {
        self.config_dir.join(ZONES_FILE)
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "MINEMAP_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either config/ or crates/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either config/ or crates/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/minemap\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    let config_dir = root.join("config");
    Ok(AppPaths { root, config_dir })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let raw = PathBuf::from(value);
            let normalized = normalize_path(&raw);
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            for candidate in exe_dir.ancestors() {
                if is_repo_marker(candidate) {
                    return Ok(normalize_path(candidate));
                }
            }

            Err(StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_config = path.join("config").is_dir();
    let has_crates = path.join("crates").is_dir();

    cargo_toml && (has_config || has_crates)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
