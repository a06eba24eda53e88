use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::feed::TelemetryFeed;
use crate::geofence::{GeofenceEvaluator, ZoneAlert};
use crate::model::{
    EntityId, EntityValidationError, SpatialEntity, Timestamp, Zone, ZoneId, ZoneValidationError,
};
use crate::store::{BatchOutcome, EntityStore, StoreChange};
use crate::style::StyleTable;

use super::picking::PickingResolver;
use super::rendering::{Projection, RenderBackend, Vec2};
use super::scene::{project_zone_outlines, FrameReport, MountError, RenderContainer, SceneCore};
use super::scheduler::{Scheduler, TaskKind};
use super::sync::ReconcileReport;

pub type AlertListener = Box<dyn FnMut(&ZoneAlert)>;

/// Live site map: telemetry flows into the store, zones are evaluated on
/// every accepted sample, and the scene mirrors the (filtered) store.
pub struct LiveMap<B: RenderBackend> {
    core: SceneCore<B>,
    geofence: GeofenceEvaluator,
    scheduler: Scheduler,
    feed: Option<Box<dyn TelemetryFeed>>,
    on_alert: Option<AlertListener>,
    feed_period: Duration,
    max_feed_ticks_per_frame: u32,
}

impl<B: RenderBackend> LiveMap<B> {
    pub fn mount<C>(
        container: C,
        config: &EngineConfig,
        projection: Projection,
    ) -> Result<Self, MountError>
    where
        C: RenderContainer<Backend = B>,
    {
        let backend = container.acquire_context()?;
        let map = Self::with_backend(backend, config, projection);
        info!(viewport = ?map.core.viewport(), "live_map_mounted");
        Ok(map)
    }

    pub fn with_backend(backend: B, config: &EngineConfig, projection: Projection) -> Self {
        Self {
            core: SceneCore::new(
                backend,
                StyleTable::default(),
                PickingResolver::new(config.picking.radius_px, config.picking.world_radius),
                projection,
            )
            .with_reference_frame(config.reference_frame),
            geofence: GeofenceEvaluator::new(config.geofence.stale_timeout_seconds),
            scheduler: Scheduler::new(config.max_frame_delta()),
            feed: None,
            on_alert: None,
            feed_period: config.feed_period(),
            max_feed_ticks_per_frame: config.timing.max_feed_ticks_per_frame.max(1),
        }
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

    pub fn store(&self) -> &EntityStore {
        self.core.store()
    }

    pub fn geofence(&self) -> &GeofenceEvaluator {
        &self.geofence
    }

    pub fn on_entity_selected(&mut self, listener: impl FnMut(Option<&EntityId>) + 'static) {
        self.core.set_on_entity_selected(Box::new(listener));
    }

    pub fn on_alert(&mut self, listener: impl FnMut(&ZoneAlert) + 'static) {
        if self.is_live() {
            self.on_alert = Some(Box::new(listener));
        }
    }

    /// Starts polling `feed` on the feed clock, replacing any earlier feed.
    pub fn attach_feed(&mut self, feed: Box<dyn TelemetryFeed>) {
        if !self.is_live() {
            return;
        }
        self.feed = Some(feed);
        self.scheduler
            .schedule(TaskKind::Feed, self.feed_period, self.max_feed_ticks_per_frame);
        info!(period_ms = self.feed_period.as_millis() as u64, "feed_attached");
    }

    pub fn detach_feed(&mut self) -> Option<Box<dyn TelemetryFeed>> {
        self.scheduler.cancel(TaskKind::Feed);
        self.feed.take()
    }

    pub fn set_feed_period(&mut self, period: Duration) {
        self.feed_period = period;
        self.scheduler.set_period(TaskKind::Feed, period);
    }

    /// Applies one batch of snapshots. Rejected records are reported and
    /// leave their previous state in place; the rest of the batch applies.
    pub fn ingest(&mut self, batch: impl IntoIterator<Item = SpatialEntity>) -> BatchOutcome {
        if !self.is_live() {
            return BatchOutcome::default();
        }
        let outcome = self.core.store_mut().upsert_batch(batch);
        self.process_store_changes();
        self.core.reconcile_if_dirty();
        outcome
    }

    pub fn upsert(&mut self, entity: SpatialEntity) -> Result<(), EntityValidationError> {
        if !self.is_live() {
            return Ok(());
        }
        self.core.store_mut().upsert(entity)?;
        self.process_store_changes();
        self.core.reconcile_if_dirty();
        Ok(())
    }

    pub fn remove_entity(&mut self, id: &EntityId) -> Option<SpatialEntity> {
        if !self.is_live() {
            return None;
        }
        let removed = self.core.store_mut().remove(id);
        self.process_store_changes();
        self.core.reconcile_if_dirty();
        removed
    }

    fn process_store_changes(&mut self) {
        let changes = self.core.store_mut().drain_changes();
        let mut alerts = Vec::new();
        for change in changes {
            match change {
                StoreChange::Upserted(id) => {
                    if let Some(entity) = self.core.store().get(&id) {
                        alerts.extend(self.geofence.observe(entity));
                    }
                }
                StoreChange::Removed(id) => self.geofence.forget_entity(&id),
            }
        }
        self.dispatch_alerts(&alerts);
    }

    fn dispatch_alerts(&mut self, alerts: &[ZoneAlert]) {
        if let Some(listener) = self.on_alert.as_mut() {
            for alert in alerts {
                listener(alert);
            }
        }
    }

    /// Replaces the zone set. An invalid set leaves the previous zones and
    /// their occupancy untouched.
    pub fn set_zones(&mut self, zones: Vec<Zone>) -> Result<(), ZoneValidationError> {
        if !self.is_live() {
            return Ok(());
        }
        self.geofence.set_zones(zones)?;
        self.reevaluate_all();
        Ok(())
    }

    pub fn upsert_zone(&mut self, zone: Zone) {
        if !self.is_live() {
            return;
        }
        self.geofence.upsert_zone(zone);
        self.reevaluate_all();
    }

    pub fn remove_zone(&mut self, zone_id: &ZoneId) -> Option<Zone> {
        if !self.is_live() {
            return None;
        }
        self.geofence.remove_zone(zone_id)
    }

    /// New or reshaped zones apply to entities already on the map.
    fn reevaluate_all(&mut self) {
        let mut alerts = Vec::new();
        for entity in self.core.store().snapshot() {
            alerts.extend(self.geofence.observe(entity));
        }
        self.dispatch_alerts(&alerts);
    }

    pub fn set_filter(
        &mut self,
        predicate: impl Fn(&SpatialEntity) -> bool + 'static,
    ) -> Option<ReconcileReport> {
        self.core.set_filter(Box::new(predicate))
    }

    pub fn clear_filter(&mut self) -> Option<ReconcileReport> {
        self.core.clear_filter()
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

    /// One render-clock frame: runs due feed ticks, advances the geofence
    /// clock, reconciles if the store changed, then draws.
    pub fn frame(&mut self, elapsed: Duration, now: Timestamp) -> FrameReport {
        let mut report = FrameReport::default();
        if !self.is_live() {
            return report;
        }

        for fire in self.scheduler.poll(elapsed) {
            if fire.kind != TaskKind::Feed {
                continue;
            }
            for _ in 0..fire.ticks {
                let Some(feed) = self.feed.as_mut() else {
                    break;
                };
                let batch = feed.poll_batch(now);
                let outcome = self.core.store_mut().upsert_batch(batch);
                if !outcome.rejected.is_empty() {
                    warn!(
                        accepted = outcome.accepted,
                        rejected = outcome.rejected.len(),
                        "feed_batch_partially_rejected"
                    );
                }
                report.feed_ticks += 1;
            }
        }
        let changed = self.core.store().has_pending_changes();
        if changed {
            self.process_store_changes();
        }

        let (alerts, exits) = self.geofence.tick(now);
        for exit in &exits {
            debug!(entity_id = %exit.entity_id, zone_id = %exit.zone_id, "zone_exit_by_staleness");
        }
        report.alerts = alerts.len();
        self.dispatch_alerts(&alerts);

        report.reconcile = self.core.reconcile_if_dirty();

        let outlines = project_zone_outlines(
            &self.geofence,
            self.core.reference_frame(),
            self.core.projection(),
            self.core.viewport(),
        );
        match self.core.draw(&outlines, &[]) {
            Ok(()) => report.drawn = true,
            Err(error) => warn!(error = %error, "frame_draw_failed"),
        }
        report
    }

    /// Cancels the feed clock, then releases the scene. No listener fires
    /// afterwards. Idempotent.
    pub fn dispose(&mut self) -> bool {
        if !self.is_live() {
            return false;
        }
        self.scheduler.cancel_all();
        self.feed = None;
        self.on_alert = None;
        self.geofence.clear();
        self.core.dispose()
    }
}

impl<B: RenderBackend> Drop for LiveMap<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}
