use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::geofence::DEFAULT_STALE_TIMEOUT_SECONDS;
use crate::model::{
    ReferenceFrame, Trajectory, TrajectoryError, TrajectorySpec, Zone, ZoneSpec,
    ZoneValidationError,
};

pub const FEED_PERIOD_ENV_VAR: &str = "MINEMAP_FEED_PERIOD_MS";
pub const ENGINE_CONFIG_FILE: &str = "minemap.json";
pub const ZONES_FILE: &str = "zones.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Minemap".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopTimingConfig {
    pub feed_period_ms: u64,
    pub max_feed_ticks_per_frame: u32,
    pub max_frame_delta_ms: u64,
    pub max_render_fps: Option<u32>,
    pub metrics_log_interval_ms: u64,
    /// Artificial per-frame delay for load testing; `MINEMAP_SLOW_FRAME_MS`
    /// overrides it.
    pub slow_frame_ms: u64,
}

impl Default for LoopTimingConfig {
    fn default() -> Self {
        Self {
            feed_period_ms: 1000,
            max_feed_ticks_per_frame: 3,
            max_frame_delta_ms: 250,
            max_render_fps: Some(60),
            metrics_log_interval_ms: 5000,
            slow_frame_ms: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeofenceConfig {
    pub stale_timeout_seconds: f64,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self {
            stale_timeout_seconds: DEFAULT_STALE_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickingConfig {
    pub radius_px: f64,
    pub world_radius: f64,
}

impl Default for PickingConfig {
    fn default() -> Self {
        Self {
            radius_px: crate::app::DEFAULT_PICK_RADIUS_PX,
            world_radius: crate::app::DEFAULT_PICK_WORLD_RADIUS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Tick period at 1x speed.
    pub base_tick_ms: u64,
    pub initial_speed: f64,
    pub max_ticks_per_frame: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            base_tick_ms: 500,
            initial_speed: 1.0,
            max_ticks_per_frame: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockFeedConfig {
    pub seed: u64,
    pub devices: usize,
    pub persons: usize,
    pub sensors: usize,
    /// Largest per-tick displacement along each axis, in world units.
    pub step: f64,
    pub area_min: [f64; 2],
    pub area_max: [f64; 2],
    /// Entities get a height in `0..=max_height`; zero keeps them planar.
    pub max_height: f64,
    pub status_change_probability: f64,
}

impl Default for MockFeedConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            devices: 6,
            persons: 10,
            sensors: 4,
            step: 1.5,
            area_min: [-40.0, -30.0],
            area_max: [40.0, 30.0],
            max_height: 0.0,
            status_change_probability: 0.05,
        }
    }
}

impl MockFeedConfig {
    /// Rejects values the random walk cannot sample from. The error names the
    /// offending field.
    pub fn validate(&self) -> Result<(), (&'static str, String)> {
        if !(self.step.is_finite() && self.step >= 0.0 && (self.step * 2.0).is_finite()) {
            return Err(("mock_feed.step", format!("{} is not a usable step", self.step)));
        }
        for axis in 0..2 {
            let (min, max) = (self.area_min[axis], self.area_max[axis]);
            if !(min.is_finite() && max.is_finite()) {
                return Err(("mock_feed.area", "area bounds must be finite".to_string()));
            }
            if min > max {
                return Err(("mock_feed.area", format!("area_min {min} exceeds area_max {max}")));
            }
            if !(max - min).is_finite() {
                return Err(("mock_feed.area", "area span overflows".to_string()));
            }
        }
        if !(self.max_height.is_finite() && self.max_height >= 0.0) {
            return Err((
                "mock_feed.max_height",
                format!("{} is not a usable height", self.max_height),
            ));
        }
        if !(0.0..=1.0).contains(&self.status_change_probability) {
            return Err((
                "mock_feed.status_change_probability",
                format!("{} is outside 0..=1", self.status_change_probability),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub center: [f64; 2],
    pub zoom: f64,
    pub pixels_per_unit: f64,
    pub orbit_distance: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            center: [0.0, 0.0],
            zoom: crate::app::CAMERA_ZOOM_DEFAULT,
            pixels_per_unit: crate::app::DEFAULT_PIXELS_PER_UNIT,
            orbit_distance: 120.0,
        }
    }
}

/// World-space rectangle a site-plan image is stretched over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundConfig {
    pub path: PathBuf,
    pub min: [f64; 2],
    pub max: [f64; 2],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub window: WindowConfig,
    pub timing: LoopTimingConfig,
    pub geofence: GeofenceConfig,
    pub picking: PickingConfig,
    pub playback: PlaybackConfig,
    pub mock_feed: MockFeedConfig,
    pub camera: CameraConfig,
    pub reference_frame: ReferenceFrame,
    pub background: Option<BackgroundConfig>,
}

impl EngineConfig {
    pub fn feed_period(&self) -> Duration {
        normalize_non_zero_duration(
            Duration::from_millis(self.timing.feed_period_ms),
            Duration::from_secs(1),
        )
    }

    pub fn max_frame_delta(&self) -> Duration {
        normalize_non_zero_duration(
            Duration::from_millis(self.timing.max_frame_delta_ms),
            Duration::from_millis(250),
        )
    }

    pub fn metrics_log_interval(&self) -> Duration {
        normalize_non_zero_duration(
            Duration::from_millis(self.timing.metrics_log_interval_ms),
            Duration::from_secs(5),
        )
    }

    pub fn playback_base_period(&self) -> Duration {
        normalize_non_zero_duration(
            Duration::from_millis(self.playback.base_tick_ms),
            Duration::from_millis(500),
        )
    }

    /// Applies `MINEMAP_FEED_PERIOD_MS` when present and parseable.
    pub fn apply_env_overrides(&mut self) {
        self.timing.feed_period_ms = resolve_feed_period_ms(self.timing.feed_period_ms);
    }
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn resolve_feed_period_ms(config_period_ms: u64) -> u64 {
    match env::var(FEED_PERIOD_ENV_VAR) {
        Ok(value) => match value.trim().parse::<u64>() {
            Ok(ms) if ms > 0 => ms,
            _ => {
                warn!(
                    env_var = FEED_PERIOD_ENV_VAR,
                    value = value.as_str(),
                    "invalid feed period env var value; falling back to config"
                );
                config_period_ms
            }
        },
        Err(env::VarError::NotPresent) => config_period_ms,
        Err(err) => {
            warn!(
                env_var = FEED_PERIOD_ENV_VAR,
                error = %err,
                "unable to read feed period env var; falling back to config"
            );
            config_period_ms
        }
    }
}

#[derive(Debug, Deserialize)]
struct ZonesFile {
    zones: Vec<ZoneSpec>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path} at {json_path}: {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid zone at {path} zones[{index}]: {source}")]
    InvalidZone {
        path: PathBuf,
        index: usize,
        #[source]
        source: ZoneValidationError,
    },
    #[error("invalid value at {path} {field}: {reason}")]
    Invalid {
        path: PathBuf,
        field: &'static str,
        reason: String,
    },
    #[error("invalid trajectory in {path}: {source}")]
    InvalidTrajectory {
        path: PathBuf,
        #[source]
        source: TrajectoryError,
    },
}

fn parse_json<T: DeserializeOwned>(path: &Path, raw: &str) -> Result<T, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        ConfigError::Parse {
            path: path.to_path_buf(),
            json_path: if json_path.is_empty() {
                ".".to_string()
            } else {
                json_path
            },
            source: error.into_inner(),
        }
    })
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads the engine config, falling back to defaults when the file does not
/// exist. Env overrides are applied last.
pub fn load_engine_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let mut config: EngineConfig = if path.is_file() {
        parse_json(path, &read_file(path)?)?
    } else {
        EngineConfig::default()
    };
    config
        .mock_feed
        .validate()
        .map_err(|(field, reason)| ConfigError::Invalid {
            path: path.to_path_buf(),
            field,
            reason,
        })?;
    config.apply_env_overrides();
    Ok(config)
}

/// Loads and validates every zone of a zones file. A missing file is an
/// empty zone set.
pub fn load_zones(path: &Path) -> Result<Vec<Zone>, ConfigError> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let file: ZonesFile = parse_json(path, &read_file(path)?)?;
    file.zones
        .into_iter()
        .enumerate()
        .map(|(index, spec)| {
            spec.validate().map_err(|source| ConfigError::InvalidZone {
                path: path.to_path_buf(),
                index,
                source,
            })
        })
        .collect()
}

pub fn load_trajectory(path: &Path) -> Result<Trajectory, ConfigError> {
    let spec: TrajectorySpec = parse_json(path, &read_file(path)?)?;
    spec.validate()
        .map_err(|source| ConfigError::InvalidTrajectory {
            path: path.to_path_buf(),
            source,
        })
}
