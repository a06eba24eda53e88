mod input;
mod live;
mod loop_runner;
mod metrics;
mod picking;
mod rendering;
mod replay;
mod scene;
mod scheduler;
mod sync;

pub use input::{Command, InputAction, InputMode, InputSnapshot};
pub use live::{AlertListener, LiveMap};
pub use loop_runner::{
    initial_projection, run_live_map, run_live_map_with_metrics, run_replay,
    run_replay_with_metrics, AppError, ViewMode, PLAYBACK_SPEED_MAX, PLAYBACK_SPEED_MIN,
    SLOW_FRAME_ENV_VAR,
};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use picking::{PickingResolver, DEFAULT_PICK_RADIUS_PX, DEFAULT_PICK_WORLD_RADIUS};
pub use rendering::{
    pick_ray, screen_to_world, world_to_screen, BackendCall, BackgroundError, BackgroundImage,
    Camera2D, Camera3D, FrameView, HandleArena, ObjectHandle, PixelsBackend, Projection,
    RecordingBackend, RecordingLog, RenderBackend, RenderError, RenderObjectDesc, Vec2, Viewport,
    WindowContainer, ZoneOutline, CAMERA_ZOOM_DEFAULT, DEFAULT_PIXELS_PER_UNIT,
};
pub use replay::{IndexListener, TrajectoryReplay};
pub use scene::{
    project_zone_outlines, FrameReport, HeadlessContainer, MountError, RenderContainer, SceneCore,
    SelectionListener,
};
pub use scheduler::{CancellationToken, Scheduler, TaskFire, TaskKind};
pub use sync::{EntityFilter, ReconcileReport, RenderBinding, SceneSynchronizer};
