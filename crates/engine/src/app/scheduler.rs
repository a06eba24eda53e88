use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    /// Data-ingestion cadence, independent of the render rate.
    Feed,
    /// Trajectory step cadence, derived from the playback speed.
    Playback,
}

/// Shared flag checked before every tick. Cancelling any clone stops the
/// task it was issued for.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Rc<Cell<bool>>,
}

impl CancellationToken {
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskFire {
    pub kind: TaskKind,
    pub ticks: u32,
    pub dropped_backlog: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StepPlan {
    pub(crate) ticks_to_run: u32,
    pub(crate) remaining_accumulator: Duration,
    pub(crate) dropped_backlog: Duration,
}

pub(crate) fn plan_steps(mut accumulator: Duration, period: Duration, max_ticks: u32) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= period && ticks_to_run < max_ticks {
        accumulator = accumulator.saturating_sub(period);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= period {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

#[derive(Debug)]
struct RepeatingTask {
    kind: TaskKind,
    period: Duration,
    max_ticks_per_poll: u32,
    accumulator: Duration,
    active: bool,
    token: CancellationToken,
}

/// Frame-driven timer wheel for the repeating work of a mounted scene. Each
/// task accumulates elapsed frame time and fires whole periods; work for one
/// tick always finishes before the next is planned.
#[derive(Debug)]
pub struct Scheduler {
    tasks: Vec<RepeatingTask>,
    max_frame_delta: Duration,
    live: bool,
}

const MIN_TASK_PERIOD: Duration = Duration::from_millis(1);

impl Scheduler {
    pub fn new(max_frame_delta: Duration) -> Self {
        Self {
            tasks: Vec::new(),
            max_frame_delta: if max_frame_delta.is_zero() {
                Duration::from_millis(250)
            } else {
                max_frame_delta
            },
            live: true,
        }
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Registers a repeating task, replacing and cancelling any earlier task
    /// of the same kind.
    pub fn schedule(
        &mut self,
        kind: TaskKind,
        period: Duration,
        max_ticks_per_poll: u32,
    ) -> CancellationToken {
        self.cancel(kind);
        let token = CancellationToken::default();
        if !self.live {
            token.cancel();
            return token;
        }
        self.tasks.push(RepeatingTask {
            kind,
            period: period.max(MIN_TASK_PERIOD),
            max_ticks_per_poll: max_ticks_per_poll.max(1),
            accumulator: Duration::ZERO,
            active: true,
            token: token.clone(),
        });
        debug!(?kind, period_ms = period.as_millis() as u64, "task_scheduled");
        token
    }

    pub fn is_scheduled(&self, kind: TaskKind) -> bool {
        self.task(kind).is_some()
    }

    pub fn is_active(&self, kind: TaskKind) -> bool {
        self.task(kind).map_or(false, |task| task.active)
    }

    pub fn period(&self, kind: TaskKind) -> Option<Duration> {
        self.task(kind).map(|task| task.period)
    }

    /// Changes the cadence without discarding time already accumulated
    /// toward the next tick.
    pub fn set_period(&mut self, kind: TaskKind, period: Duration) {
        if let Some(task) = self.task_mut(kind) {
            task.period = period.max(MIN_TASK_PERIOD);
        }
    }

    /// Pausing a task drops its partial progress so resuming waits a full
    /// period before the first tick.
    pub fn set_active(&mut self, kind: TaskKind, active: bool) {
        if let Some(task) = self.task_mut(kind) {
            if task.active != active {
                task.accumulator = Duration::ZERO;
            }
            task.active = active;
        }
    }

    pub fn cancel(&mut self, kind: TaskKind) {
        self.tasks.retain(|task| {
            if task.kind == kind {
                task.token.cancel();
                false
            } else {
                true
            }
        });
    }

    /// Cancels every task and refuses new ones.
    pub fn cancel_all(&mut self) {
        for task in self.tasks.drain(..) {
            task.token.cancel();
        }
        self.live = false;
    }

    /// Advances every live task by `elapsed` (clamped to the frame delta cap)
    /// and reports which ones are due, in scheduling order.
    pub fn poll(&mut self, elapsed: Duration) -> Vec<TaskFire> {
        if !self.live {
            return Vec::new();
        }
        self.tasks.retain(|task| !task.token.is_cancelled());

        let elapsed = elapsed.min(self.max_frame_delta);
        let mut fires = Vec::new();
        for task in self.tasks.iter_mut().filter(|task| task.active) {
            let plan = plan_steps(
                task.accumulator.saturating_add(elapsed),
                task.period,
                task.max_ticks_per_poll,
            );
            task.accumulator = plan.remaining_accumulator;
            if plan.dropped_backlog > Duration::ZERO {
                warn!(
                    kind = ?task.kind,
                    dropped_backlog_ms = plan.dropped_backlog.as_millis() as u64,
                    max_ticks = task.max_ticks_per_poll,
                    "task_backlog_dropped"
                );
            }
            if plan.ticks_to_run > 0 {
                fires.push(TaskFire {
                    kind: task.kind,
                    ticks: plan.ticks_to_run,
                    dropped_backlog: plan.dropped_backlog,
                });
            }
        }
        fires
    }

    fn task(&self, kind: TaskKind) -> Option<&RepeatingTask> {
        self.tasks
            .iter()
            .find(|task| task.kind == kind && !task.token.is_cancelled())
    }

    fn task_mut(&mut self, kind: TaskKind) -> Option<&mut RepeatingTask> {
        self.tasks
            .iter_mut()
            .find(|task| task.kind == kind && !task.token.is_cancelled())
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Duration::from_millis(250))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn plan_steps_runs_expected_ticks_without_drop() {
        let plan = plan_steps(ms(48), ms(16), 5);
        assert_eq!(plan.ticks_to_run, 3);
        assert_eq!(plan.remaining_accumulator, Duration::ZERO);
        assert_eq!(plan.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_steps_drops_backlog_when_tick_cap_hit() {
        let plan = plan_steps(ms(120), ms(16), 3);
        assert_eq!(plan.ticks_to_run, 3);
        assert_eq!(plan.remaining_accumulator, Duration::ZERO);
        assert_eq!(plan.dropped_backlog, ms(72));
    }

    #[test]
    fn tasks_fire_on_their_own_cadence() {
        let mut scheduler = Scheduler::new(ms(1000));
        scheduler.schedule(TaskKind::Feed, ms(100), 4);
        scheduler.schedule(TaskKind::Playback, ms(30), 4);

        let fires = scheduler.poll(ms(60));
        assert_eq!(
            fires,
            vec![TaskFire {
                kind: TaskKind::Playback,
                ticks: 2,
                dropped_backlog: Duration::ZERO
            }]
        );

        let fires = scheduler.poll(ms(45));
        let kinds: Vec<(TaskKind, u32)> = fires.iter().map(|fire| (fire.kind, fire.ticks)).collect();
        assert_eq!(kinds, vec![(TaskKind::Feed, 1), (TaskKind::Playback, 1)]);
    }

    #[test]
    fn period_change_keeps_accumulated_progress() {
        let mut scheduler = Scheduler::new(ms(1000));
        scheduler.schedule(TaskKind::Playback, ms(100), 4);
        assert!(scheduler.poll(ms(60)).is_empty());

        scheduler.set_period(TaskKind::Playback, ms(50));
        let fires = scheduler.poll(ms(0));
        assert_eq!(fires.len(), 1);
        assert_eq!(fires[0].ticks, 1);
    }

    #[test]
    fn inactive_task_never_fires_and_resumes_from_zero() {
        let mut scheduler = Scheduler::new(ms(1000));
        scheduler.schedule(TaskKind::Playback, ms(100), 4);
        scheduler.poll(ms(90));
        scheduler.set_active(TaskKind::Playback, false);
        assert!(scheduler.poll(ms(500)).is_empty());

        scheduler.set_active(TaskKind::Playback, true);
        assert!(scheduler.poll(ms(20)).is_empty());
        assert_eq!(scheduler.poll(ms(80)).len(), 1);
    }

    #[test]
    fn cancelled_token_stops_task() {
        let mut scheduler = Scheduler::new(ms(1000));
        let token = scheduler.schedule(TaskKind::Feed, ms(10), 4);
        token.cancel();
        assert!(scheduler.poll(ms(100)).is_empty());
        assert!(!scheduler.is_scheduled(TaskKind::Feed));
    }

    #[test]
    fn rescheduling_cancels_previous_token() {
        let mut scheduler = Scheduler::default();
        let first = scheduler.schedule(TaskKind::Feed, ms(10), 1);
        let second = scheduler.schedule(TaskKind::Feed, ms(20), 1);
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert_eq!(scheduler.period(TaskKind::Feed), Some(ms(20)));
    }

    #[test]
    fn cancel_all_is_terminal() {
        let mut scheduler = Scheduler::default();
        let token = scheduler.schedule(TaskKind::Feed, ms(10), 1);
        scheduler.cancel_all();
        assert!(token.is_cancelled());
        assert!(!scheduler.is_live());

        let late = scheduler.schedule(TaskKind::Playback, ms(10), 1);
        assert!(late.is_cancelled());
        assert!(scheduler.poll(ms(100)).is_empty());
    }

    #[test]
    fn frame_delta_is_clamped_before_accumulating() {
        let mut scheduler = Scheduler::new(ms(250));
        scheduler.schedule(TaskKind::Feed, ms(100), 10);
        let fires = scheduler.poll(Duration::from_secs(5));
        assert_eq!(fires[0].ticks, 2);
        assert_eq!(fires[0].dropped_backlog, Duration::ZERO);
    }
}
