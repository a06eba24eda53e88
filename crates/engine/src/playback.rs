use std::time::Duration;

use tracing::debug;

use crate::model::{SpatialEntity, Trajectory, TrajectoryError, TrajectoryPoint};

pub const DEFAULT_PLAYBACK_SPEED: f64 = 1.0;
pub const MIN_PLAYBACK_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    /// Terminal until `play`, `step` or `seek`; the cursor sits on the last point.
    Ended,
}

/// Cursor over one trajectory. The index is always within
/// `0..=trajectory.last_index()`.
#[derive(Debug, Clone)]
pub struct TrajectoryPlayer {
    trajectory: Trajectory,
    index: usize,
    state: PlaybackState,
    speed: f64,
}

impl TrajectoryPlayer {
    pub fn new(trajectory: Trajectory) -> Self {
        Self {
            trajectory,
            index: 0,
            state: PlaybackState::Stopped,
            speed: DEFAULT_PLAYBACK_SPEED,
        }
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn current_point(&self) -> &TrajectoryPoint {
        &self.trajectory.points()[self.index]
    }

    pub fn current_entity(&self) -> Option<SpatialEntity> {
        self.trajectory.entity_at(self.index)
    }

    /// Fraction of the path already played, 1.0 for single-point paths.
    pub fn progress(&self) -> f64 {
        let last = self.trajectory.last_index();
        if last == 0 {
            1.0
        } else {
            self.index as f64 / last as f64
        }
    }

    pub fn play(&mut self) {
        match self.state {
            PlaybackState::Playing => {}
            PlaybackState::Ended => {
                self.index = 0;
                self.state = self.playing_or_ended();
            }
            PlaybackState::Stopped => {
                self.state = self.playing_or_ended();
            }
        }
        debug!(index = self.index, state = ?self.state, "playback_play");
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Stopped;
        }
    }

    /// Moves the cursor by `delta` points, clamped to the path. Interrupts
    /// playback; landing on the last point ends it.
    pub fn step(&mut self, delta: i64) {
        let target = (self.index as i64).saturating_add(delta).max(0) as usize;
        self.land_at(target);
    }

    pub fn seek(&mut self, index: usize) {
        self.land_at(index);
    }

    /// One playback clock tick. Returns whether the cursor advanced.
    pub fn tick(&mut self) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }
        let last = self.trajectory.last_index();
        if self.index >= last {
            self.state = PlaybackState::Ended;
            return false;
        }
        self.index += 1;
        if self.index == last {
            self.state = PlaybackState::Ended;
            debug!(index = self.index, "playback_ended");
        }
        true
    }

    pub fn set_speed(&mut self, speed: f64) -> Result<(), TrajectoryError> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(TrajectoryError::InvalidSpeed { speed });
        }
        self.speed = speed;
        Ok(())
    }

    /// Tick period at the current speed for a 1x period of `base`.
    pub fn tick_period(&self, base: Duration) -> Duration {
        let seconds = base.as_secs_f64() / self.speed;
        if seconds.is_finite() {
            Duration::from_secs_f64(seconds).max(MIN_PLAYBACK_PERIOD)
        } else {
            base
        }
    }

    fn land_at(&mut self, index: usize) {
        let last = self.trajectory.last_index();
        self.index = index.min(last);
        self.state = if self.index == last {
            PlaybackState::Ended
        } else {
            PlaybackState::Stopped
        };
    }

    fn playing_or_ended(&self) -> PlaybackState {
        if self.index >= self.trajectory.last_index() {
            PlaybackState::Ended
        } else {
            PlaybackState::Playing
        }
    }
}
