use std::time::Duration;

use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::model::{EntityId, Position, Trajectory, TrajectoryError, TrajectoryPoint};
use crate::playback::{PlaybackState, TrajectoryPlayer};
use crate::style::StyleTable;

use super::picking::PickingResolver;
use super::rendering::{Projection, RenderBackend, Vec2};
use super::scene::{FrameReport, MountError, RenderContainer, SceneCore};
use super::scheduler::{Scheduler, TaskKind};

pub type IndexListener = Box<dyn FnMut(usize, &TrajectoryPoint)>;

/// Replays one recorded path through the same scene pipeline as the live
/// map, with the subject as the only entity in the store.
pub struct TrajectoryReplay<B: RenderBackend> {
    core: SceneCore<B>,
    player: TrajectoryPlayer,
    scheduler: Scheduler,
    base_period: Duration,
    on_index_changed: Option<IndexListener>,
    path: Vec<Position>,
}

impl<B: RenderBackend> TrajectoryReplay<B> {
    pub fn mount<C>(
        container: C,
        trajectory: Trajectory,
        config: &EngineConfig,
        projection: Projection,
    ) -> Result<Self, MountError>
    where
        C: RenderContainer<Backend = B>,
    {
        let backend = container.acquire_context()?;
        let replay = Self::with_backend(backend, trajectory, config, projection);
        info!(
            subject = %replay.player.trajectory().subject_id(),
            points = replay.player.trajectory().len(),
            "trajectory_replay_mounted"
        );
        Ok(replay)
    }

    pub fn with_backend(
        backend: B,
        trajectory: Trajectory,
        config: &EngineConfig,
        projection: Projection,
    ) -> Self {
        let path = trajectory
            .points()
            .iter()
            .map(|point| config.reference_frame.to_ground(&point.position))
            .collect();
        let mut player = TrajectoryPlayer::new(trajectory);
        if let Err(error) = player.set_speed(config.playback.initial_speed) {
            warn!(error = %error, "initial_playback_speed_ignored");
        }
        let base_period = config.playback_base_period();
        let mut scheduler = Scheduler::new(config.max_frame_delta());
        scheduler.schedule(
            TaskKind::Playback,
            player.tick_period(base_period),
            config.playback.max_ticks_per_frame,
        );
        scheduler.set_active(TaskKind::Playback, false);

        let mut replay = Self {
            core: SceneCore::new(
                backend,
                StyleTable::default(),
                PickingResolver::new(config.picking.radius_px, config.picking.world_radius),
                projection,
            )
            .with_reference_frame(config.reference_frame),
            player,
            scheduler,
            base_period,
            on_index_changed: None,
            path,
        };
        replay.push_current_point();
        replay
    }

    pub fn is_live(&self) -> bool {
        self.core.is_live()
    }

    pub fn core(&self) -> &SceneCore<B> {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut SceneCore<B> {
        &mut self.core
    }

    pub fn player(&self) -> &TrajectoryPlayer {
        &self.player
    }

    pub fn index(&self) -> usize {
        self.player.index()
    }

    pub fn state(&self) -> PlaybackState {
        self.player.state()
    }

    pub fn on_index_changed(&mut self, listener: impl FnMut(usize, &TrajectoryPoint) + 'static) {
        if self.is_live() {
            self.on_index_changed = Some(Box::new(listener));
        }
    }

    pub fn on_entity_selected(&mut self, listener: impl FnMut(Option<&EntityId>) + 'static) {
        self.core.set_on_entity_selected(Box::new(listener));
    }

    pub fn play(&mut self) {
        self.control(TrajectoryPlayer::play);
    }

    pub fn pause(&mut self) {
        self.control(TrajectoryPlayer::pause);
    }

    pub fn toggle_play(&mut self) {
        if self.player.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn step(&mut self, delta: i64) {
        self.control(|player| player.step(delta));
    }

    pub fn seek(&mut self, index: usize) {
        self.control(|player| player.seek(index));
    }

    /// Takes effect on the next tick; time already accumulated toward it is
    /// kept.
    pub fn set_speed(&mut self, speed: f64) -> Result<(), TrajectoryError> {
        if !self.is_live() {
            return Ok(());
        }
        self.player.set_speed(speed)?;
        self.scheduler
            .set_period(TaskKind::Playback, self.player.tick_period(self.base_period));
        info!(speed, "playback_speed_changed");
        Ok(())
    }

    fn control(&mut self, action: impl FnOnce(&mut TrajectoryPlayer)) {
        if !self.is_live() {
            return;
        }
        let before = self.player.index();
        action(&mut self.player);
        self.sync_clock();
        if self.player.index() != before {
            self.index_changed();
        }
    }

    fn sync_clock(&mut self) {
        self.scheduler
            .set_active(TaskKind::Playback, self.player.is_playing());
    }

    fn index_changed(&mut self) {
        self.push_current_point();
        let index = self.player.index();
        if let Some(listener) = self.on_index_changed.as_mut() {
            listener(index, self.player.current_point());
        }
    }

    /// The store holds exactly the subject at the cursor.
    fn push_current_point(&mut self) {
        let Some(entity) = self.player.current_entity() else {
            return;
        };
        if let Err(error) = self.core.store_mut().upsert(entity) {
            warn!(error = %error, index = self.player.index(), "trajectory_point_rejected");
        }
        self.core.store_mut().drain_changes();
        self.core.reconcile_if_dirty();
    }

    pub fn pointer_down(&mut self, pointer: Vec2) -> Option<EntityId> {
        self.core.pointer_down(pointer)
    }

    pub fn pointer_moved(&mut self, pointer: Option<Vec2>) {
        self.core.pointer_moved(pointer);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.core.resize(width, height);
    }

    /// One render-clock frame: applies due playback ticks, then draws the
    /// path and the subject.
    pub fn frame(&mut self, elapsed: Duration) -> FrameReport {
        let mut report = FrameReport::default();
        if !self.is_live() {
            return report;
        }
        for fire in self.scheduler.poll(elapsed) {
            if fire.kind != TaskKind::Playback {
                continue;
            }
            for _ in 0..fire.ticks {
                if !self.player.tick() {
                    break;
                }
                report.playback_ticks += 1;
                self.index_changed();
            }
        }
        self.sync_clock();
        report.reconcile = self.core.reconcile_if_dirty();

        match self.core.draw(&[], &self.path) {
            Ok(()) => report.drawn = true,
            Err(error) => warn!(error = %error, "frame_draw_failed"),
        }
        report
    }

    pub fn dispose(&mut self) -> bool {
        if !self.is_live() {
            return false;
        }
        self.scheduler.cancel_all();
        self.on_index_changed = None;
        self.core.dispose()
    }
}

impl<B: RenderBackend> Drop for TrajectoryReplay<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}
