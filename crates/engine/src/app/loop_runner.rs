use std::env;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::EventLoopError;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use crate::config::{CameraConfig, ConfigError, EngineConfig};
use crate::model::{Timestamp, Trajectory};
use crate::StartupError;

use super::input::{Command, InputAction, InputCollector, InputMode, InputSnapshot};
use super::live::LiveMap;
use super::metrics::{MetricsAccumulator, MetricsHandle};
use super::rendering::{
    BackgroundImage, Camera2D, Camera3D, PixelsBackend, Projection, RenderBackend, Vec2,
    WindowContainer,
};
use super::replay::TrajectoryReplay;
use super::scene::{FrameReport, MountError, SceneCore};

pub const SLOW_FRAME_ENV_VAR: &str = "MINEMAP_SLOW_FRAME_MS";

const PAN_SPEED_PX_PER_SECOND: f64 = 480.0;
const PERSPECTIVE_PAN_DISTANCE_FRACTION_PER_SECOND: f64 = 0.8;
const ORBIT_RADIANS_PER_SECOND: f64 = 1.2;
pub const PLAYBACK_SPEED_MIN: f64 = 0.125;
pub const PLAYBACK_SPEED_MAX: f64 = 32.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    Plan,
    Perspective,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Mount(#[from] MountError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// A mounted engine facade the window loop can drive.
pub(crate) trait Screen {
    type Backend: RenderBackend;

    fn input_mode(&self) -> InputMode;
    fn core_mut(&mut self) -> &mut SceneCore<Self::Backend>;
    fn apply_command(&mut self, command: Command);
    fn frame(&mut self, elapsed: Duration) -> FrameReport;
    fn entity_count(&self) -> usize;
    fn dispose(&mut self) -> bool;
}

impl<B: RenderBackend> Screen for LiveMap<B> {
    type Backend = B;

    fn input_mode(&self) -> InputMode {
        InputMode::Live
    }

    fn core_mut(&mut self) -> &mut SceneCore<B> {
        LiveMap::core_mut(self)
    }

    fn apply_command(&mut self, command: Command) {
        if command != Command::ToggleAlarmFilter {
            return;
        }
        if self.core().has_filter() {
            self.clear_filter();
            info!(alarms_only = false, "alarm_filter_toggled");
        } else {
            self.set_filter(|entity| entity.status.is_alarming());
            info!(alarms_only = true, "alarm_filter_toggled");
        }
    }

    fn frame(&mut self, elapsed: Duration) -> FrameReport {
        LiveMap::frame(self, elapsed, Timestamp::now())
    }

    fn entity_count(&self) -> usize {
        self.store().len()
    }

    fn dispose(&mut self) -> bool {
        LiveMap::dispose(self)
    }
}

impl<B: RenderBackend> Screen for TrajectoryReplay<B> {
    type Backend = B;

    fn input_mode(&self) -> InputMode {
        InputMode::Replay
    }

    fn core_mut(&mut self) -> &mut SceneCore<B> {
        TrajectoryReplay::core_mut(self)
    }

    fn apply_command(&mut self, command: Command) {
        match command {
            Command::TogglePlay => self.toggle_play(),
            Command::StepBackward => self.step(-1),
            Command::StepForward => self.step(1),
            Command::SeekStart => self.seek(0),
            Command::SeekEnd => {
                let last = self.player().trajectory().len().saturating_sub(1);
                self.seek(last);
            }
            Command::SlowDown | Command::SpeedUp => {
                let speed = next_playback_speed(self.player().speed(), command == Command::SpeedUp);
                if let Err(error) = self.set_speed(speed) {
                    warn!(error = %error, "playback_speed_rejected");
                }
            }
            Command::ToggleAlarmFilter | Command::Quit => {}
        }
    }

    fn frame(&mut self, elapsed: Duration) -> FrameReport {
        TrajectoryReplay::frame(self, elapsed)
    }

    fn entity_count(&self) -> usize {
        self.core().store().len()
    }

    fn dispose(&mut self) -> bool {
        TrajectoryReplay::dispose(self)
    }
}

pub fn run_live_map(
    config: &EngineConfig,
    view: ViewMode,
    setup: impl FnOnce(&mut LiveMap<PixelsBackend>),
) -> Result<(), AppError> {
    run_live_map_with_metrics(config, view, setup, MetricsHandle::default())
}

pub fn run_live_map_with_metrics(
    config: &EngineConfig,
    view: ViewMode,
    setup: impl FnOnce(&mut LiveMap<PixelsBackend>),
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    let (event_loop, window) = open_window(config)?;
    let container = window_container(&window, config);
    let mut live = LiveMap::mount(container, config, initial_projection(&config.camera, view))?;
    setup(&mut live);
    run_window_loop(config, event_loop, window, live, metrics_handle)
}

pub fn run_replay(
    config: &EngineConfig,
    view: ViewMode,
    trajectory: Trajectory,
    setup: impl FnOnce(&mut TrajectoryReplay<PixelsBackend>),
) -> Result<(), AppError> {
    run_replay_with_metrics(config, view, trajectory, setup, MetricsHandle::default())
}

pub fn run_replay_with_metrics(
    config: &EngineConfig,
    view: ViewMode,
    trajectory: Trajectory,
    setup: impl FnOnce(&mut TrajectoryReplay<PixelsBackend>),
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    let (event_loop, window) = open_window(config)?;
    let container = window_container(&window, config);
    let mut replay = TrajectoryReplay::mount(
        container,
        trajectory,
        config,
        initial_projection(&config.camera, view),
    )?;
    setup(&mut replay);
    run_window_loop(config, event_loop, window, replay, metrics_handle)
}

pub fn initial_projection(camera: &CameraConfig, view: ViewMode) -> Projection {
    let center = Vec2::new(camera.center[0], camera.center[1]);
    match view {
        ViewMode::Plan => {
            let mut plan = Camera2D {
                position: center,
                pixels_per_unit: camera.pixels_per_unit,
                ..Camera2D::default()
            };
            plan.set_zoom_clamped(camera.zoom);
            Projection::Plan(plan)
        }
        ViewMode::Perspective => {
            let defaults = Camera3D::default();
            let distance = if camera.orbit_distance.is_finite() && camera.orbit_distance > 0.0 {
                camera.orbit_distance
            } else {
                defaults.distance
            };
            Projection::Perspective(Camera3D {
                target: center,
                distance,
                ..defaults
            })
        }
    }
}

fn open_window(config: &EngineConfig) -> Result<(EventLoop<()>, Arc<Window>), MountError> {
    let event_loop = EventLoop::new().map_err(MountError::EventLoop)?;
    let window = WindowBuilder::new()
        .with_title(config.window.title.clone())
        .with_inner_size(LogicalSize::new(
            config.window.width as f64,
            config.window.height as f64,
        ))
        .build(&event_loop)
        .map_err(MountError::Window)?;
    Ok((event_loop, Arc::new(window)))
}

fn window_container(window: &Arc<Window>, config: &EngineConfig) -> WindowContainer {
    let background = config.background.as_ref().and_then(|background| {
        match BackgroundImage::load(&background.path, background.min, background.max) {
            Ok(image) => Some(image),
            Err(error) => {
                warn!(error = %error, "background_load_failed");
                None
            }
        }
    });
    WindowContainer::new(Arc::clone(window)).with_background(background)
}

fn run_window_loop<S>(
    config: &EngineConfig,
    event_loop: EventLoop<()>,
    window: Arc<Window>,
    mut screen: S,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError>
where
    S: Screen + 'static,
{
    event_loop.set_control_flow(ControlFlow::Poll);

    let metrics_log_interval = config.metrics_log_interval();
    let max_frame_delta = config.max_frame_delta();
    let slow_frame_delay = resolve_slow_frame_delay(config.timing.slow_frame_ms);
    let effective_render_cap = normalize_render_fps_cap(config.timing.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);
    let size = window.inner_size();
    let mut input_collector = InputCollector::new(screen.input_mode(), size.width, size.height);

    info!(
        mode = ?screen.input_mode(),
        feed_period_ms = config.feed_period().as_millis() as u64,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        render_fps_cap = %format_render_cap(effective_render_cap),
        "loop_config"
    );

    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    input_collector.mark_quit_requested();
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    input_collector.set_window_size(new_size.width, new_size.height);
                    screen.core_mut().resize(new_size.width, new_size.height);
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    input_collector.set_window_size(size.width, size.height);
                    screen.core_mut().resize(size.width, size.height);
                }
                WindowEvent::CursorMoved { position, .. } => {
                    input_collector.set_cursor_position_px(position.x, position.y);
                }
                WindowEvent::CursorLeft { .. } => {
                    input_collector.clear_cursor_position();
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    input_collector.handle_mouse_input(button, state);
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    input_collector.handle_mouse_wheel(delta);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    input_collector.handle_key(event.physical_key, event.state);
                    if input_collector.quit_requested() {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    if slow_frame_delay > Duration::ZERO {
                        // Debug perturbation only; this is not the FPS cap.
                        thread::sleep(slow_frame_delay);
                    }

                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;
                    let clamped_frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);

                    let snapshot = input_collector.snapshot_for_frame();
                    apply_frame_input(&mut screen, &snapshot, clamped_frame_dt);

                    // Single authoritative FPS cap sleep point for render pacing.
                    let elapsed_since_last_present =
                        Instant::now().saturating_duration_since(last_present_instant);
                    let cap_sleep =
                        compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    let report = screen.frame(raw_frame_dt);
                    last_present_instant = Instant::now();
                    if !report.drawn && screen.core_mut().is_live() {
                        warn!("frame_not_presented");
                    }
                    metrics_accumulator.record_frame(raw_frame_dt, &report);

                    if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
                        metrics_handle.publish(snapshot);
                        info!(
                            fps = snapshot.fps,
                            feed_tps = snapshot.feed_tps,
                            playback_tps = snapshot.playback_tps,
                            reconciles_per_second = snapshot.reconciles_per_second,
                            alerts = snapshot.alerts,
                            frame_time_ms = snapshot.frame_time_ms,
                            entity_count = screen.entity_count(),
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                screen.dispose();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Camera movement, edge commands and pointer input for one frame, applied
/// before the screen's own clocks run.
pub(crate) fn apply_frame_input<S: Screen>(screen: &mut S, input: &InputSnapshot, dt: Duration) {
    for command in input.commands() {
        screen.apply_command(*command);
    }

    let seconds = dt.as_secs_f64();
    let core = screen.core_mut();
    let (pan_x, pan_y) = input.pan_direction();
    if pan_x != 0.0 || pan_y != 0.0 {
        let speed = pan_units_per_second(core.projection()) * seconds;
        core.pan_camera(pan_x * speed, pan_y * speed);
    }
    let orbit = f64::from(
        i8::from(input.is_down(InputAction::OrbitRight))
            - i8::from(input.is_down(InputAction::OrbitLeft)),
    );
    if orbit != 0.0 {
        core.orbit_camera(orbit * ORBIT_RADIANS_PER_SECOND * seconds, 0.0);
    }
    if input.zoom_delta_steps() != 0 {
        core.zoom_camera(input.zoom_delta_steps());
    }

    if input.cursor_moved() {
        core.pointer_moved(input.cursor_position_px());
    }
    if input.left_click_pressed() {
        if let Some(cursor) = input.cursor_position_px() {
            core.pointer_down(cursor);
        }
    }
}

fn pan_units_per_second(projection: &Projection) -> f64 {
    match projection {
        Projection::Plan(camera) => PAN_SPEED_PX_PER_SECOND / camera.scale(),
        Projection::Perspective(camera) => {
            camera.distance * PERSPECTIVE_PAN_DISTANCE_FRACTION_PER_SECOND
        }
    }
}

fn next_playback_speed(current: f64, faster: bool) -> f64 {
    let next = if faster { current * 2.0 } else { current * 0.5 };
    next.clamp(PLAYBACK_SPEED_MIN, PLAYBACK_SPEED_MAX)
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(value) => match value.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = value.as_str(),
                    "invalid slow-frame env var value; falling back to config"
                );
                Duration::from_millis(config_slow_frame_ms)
            }
        },
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_frame_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "unable to read slow-frame env var; falling back to config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use winit::event::{ElementState, MouseButton};
    use winit::keyboard::{KeyCode, PhysicalKey};

    use super::*;
    use crate::app::rendering::{RecordingBackend, Viewport};
    use crate::app::scene::HeadlessContainer;
    use crate::model::{
        EntityId, EntityKind, EntityStatus, Position, SpatialEntity, TrajectoryPoint,
    };
    use crate::playback::PlaybackState;

    const VIEWPORT: Viewport = Viewport {
        width: 800,
        height: 600,
    };

    fn live_map() -> LiveMap<RecordingBackend> {
        let (container, _log) = HeadlessContainer::new(VIEWPORT);
        LiveMap::mount(
            container,
            &EngineConfig::default(),
            initial_projection(&CameraConfig::default(), ViewMode::Plan),
        )
        .expect("mount")
    }

    fn entity(id: &str, x: f64, status: EntityStatus) -> SpatialEntity {
        SpatialEntity::new(
            id,
            EntityKind::Device,
            Position::planar(x, 0.0),
            status,
            Timestamp::from_secs(1),
        )
    }

    fn replay(len: usize) -> TrajectoryReplay<RecordingBackend> {
        let points = (0..len)
            .map(|i| TrajectoryPoint {
                timestamp: Timestamp::from_secs(i as i64),
                position: Position::planar(i as f64, 0.0),
                status: EntityStatus::Normal,
            })
            .collect();
        let trajectory =
            Trajectory::new(EntityId::new("miner-1"), EntityKind::Person, points).expect("path");
        let (container, _log) = HeadlessContainer::new(VIEWPORT);
        TrajectoryReplay::mount(
            container,
            trajectory,
            &EngineConfig::default(),
            initial_projection(&CameraConfig::default(), ViewMode::Plan),
        )
        .expect("mount")
    }

    fn snapshot_after(mode: InputMode, keys: &[KeyCode]) -> InputSnapshot {
        let mut input = InputCollector::new(mode, VIEWPORT.width, VIEWPORT.height);
        for key in keys {
            input.handle_key(PhysicalKey::Code(*key), ElementState::Pressed);
        }
        input.snapshot_for_frame()
    }

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        let raw_frame_dt = Duration::from_millis(600);

        assert_eq!(
            clamp_frame_delta(raw_frame_dt, max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn target_frame_duration_none_when_cap_off() {
        assert_eq!(target_frame_duration(None), None);
    }

    #[test]
    fn target_frame_duration_for_60hz_is_expected() {
        let duration = target_frame_duration(Some(60)).expect("duration");
        assert!((duration.as_secs_f64() - (1.0 / 60.0)).abs() < 1e-9);
    }

    #[test]
    fn compute_cap_sleep_zero_when_over_budget() {
        let sleep = compute_cap_sleep(Duration::from_millis(20), Some(Duration::from_millis(16)));
        assert_eq!(sleep, Duration::ZERO);
    }

    #[test]
    fn compute_cap_sleep_positive_when_under_budget() {
        let sleep = compute_cap_sleep(Duration::from_millis(10), Some(Duration::from_millis(16)));
        assert_eq!(sleep, Duration::from_millis(6));
    }

    #[test]
    fn normalize_render_fps_cap_disables_zero() {
        assert_eq!(normalize_render_fps_cap(Some(0)), None);
        assert_eq!(normalize_render_fps_cap(Some(30)), Some(30));
        assert_eq!(format_render_cap(None), "off");
    }

    #[test]
    fn slow_frame_delay_falls_back_to_timing_config() {
        if env::var_os(SLOW_FRAME_ENV_VAR).is_some() {
            return;
        }
        let mut config = EngineConfig::default();
        config.timing.slow_frame_ms = 12;
        assert_eq!(
            resolve_slow_frame_delay(config.timing.slow_frame_ms),
            Duration::from_millis(12)
        );
    }

    #[test]
    fn initial_projection_follows_camera_config() {
        let camera = CameraConfig {
            center: [12.0, -4.0],
            zoom: 1000.0,
            ..CameraConfig::default()
        };
        let Projection::Plan(plan) = initial_projection(&camera, ViewMode::Plan) else {
            panic!("plan projection expected");
        };
        assert_eq!(plan.position, Vec2::new(12.0, -4.0));
        assert!(plan.zoom < 1000.0);

        let camera = CameraConfig {
            orbit_distance: -1.0,
            ..camera
        };
        let Projection::Perspective(orbit) = initial_projection(&camera, ViewMode::Perspective)
        else {
            panic!("perspective projection expected");
        };
        assert_eq!(orbit.target, Vec2::new(12.0, -4.0));
        assert_eq!(orbit.distance, Camera3D::default().distance);
    }

    #[test]
    fn held_pan_key_moves_camera_by_elapsed_time() {
        let mut live = live_map();
        let snapshot = snapshot_after(InputMode::Live, &[KeyCode::KeyD]);
        apply_frame_input(&mut live, &snapshot, Duration::from_millis(500));

        let Projection::Plan(camera) = live.core().projection() else {
            panic!("plan projection expected");
        };
        let expected = PAN_SPEED_PX_PER_SECOND / camera.scale() * 0.5;
        assert!((camera.position.x - expected).abs() < 1e-9);
        assert_eq!(camera.position.y, 0.0);
    }

    #[test]
    fn alarm_filter_command_toggles_live_filter() {
        let mut live = live_map();
        live.ingest([
            entity("dev-1", 0.0, EntityStatus::Normal),
            entity("dev-2", 5.0, EntityStatus::Alarm),
        ]);
        assert_eq!(live.core().synchronizer().binding_count(), 2);

        let toggle = snapshot_after(InputMode::Live, &[KeyCode::KeyF]);
        apply_frame_input(&mut live, &toggle, Duration::ZERO);
        assert_eq!(live.core().synchronizer().binding_count(), 1);
        assert!(live.core().synchronizer().binding(&EntityId::new("dev-2")).is_some());

        apply_frame_input(&mut live, &toggle, Duration::ZERO);
        assert_eq!(live.core().synchronizer().binding_count(), 2);
    }

    #[test]
    fn click_selects_entity_under_cursor() {
        let mut live = live_map();
        let selections = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&selections);
        live.on_entity_selected(move |id| sink.borrow_mut().push(id.cloned()));
        live.ingest([entity("dev-1", 0.0, EntityStatus::Normal)]);

        let mut input = InputCollector::new(InputMode::Live, VIEWPORT.width, VIEWPORT.height);
        input.set_cursor_position_px(400.0, 300.0);
        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        apply_frame_input(&mut live, &input.snapshot_for_frame(), Duration::ZERO);

        assert_eq!(*selections.borrow(), vec![Some(EntityId::new("dev-1"))]);
        assert_eq!(live.core().hovered(), Some(&EntityId::new("dev-1")));
    }

    #[test]
    fn replay_commands_drive_player() {
        let mut replay = replay(5);
        apply_frame_input(
            &mut replay,
            &snapshot_after(InputMode::Replay, &[KeyCode::End]),
            Duration::ZERO,
        );
        assert_eq!(replay.index(), 4);
        assert_eq!(replay.state(), PlaybackState::Ended);

        apply_frame_input(
            &mut replay,
            &snapshot_after(InputMode::Replay, &[KeyCode::ArrowLeft, KeyCode::BracketRight]),
            Duration::ZERO,
        );
        assert_eq!(replay.index(), 3);
        assert_eq!(replay.player().speed(), 2.0);

        apply_frame_input(
            &mut replay,
            &snapshot_after(InputMode::Replay, &[KeyCode::Home, KeyCode::Space]),
            Duration::ZERO,
        );
        assert_eq!(replay.index(), 0);
        assert_eq!(replay.state(), PlaybackState::Playing);
    }

    #[test]
    fn playback_speed_steps_are_clamped() {
        assert_eq!(next_playback_speed(PLAYBACK_SPEED_MAX, true), PLAYBACK_SPEED_MAX);
        assert_eq!(next_playback_speed(PLAYBACK_SPEED_MIN, false), PLAYBACK_SPEED_MIN);
        assert_eq!(next_playback_speed(1.0, false), 0.5);
    }

    #[test]
    fn perspective_pan_scales_with_orbit_distance() {
        let near = Projection::Perspective(Camera3D {
            distance: 10.0,
            ..Camera3D::default()
        });
        let far = Projection::Perspective(Camera3D {
            distance: 100.0,
            ..Camera3D::default()
        });
        assert!(pan_units_per_second(&far) > pan_units_per_second(&near));
    }
}
