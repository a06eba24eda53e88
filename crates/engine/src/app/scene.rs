use thiserror::Error;
use tracing::{debug, info, warn};

use crate::geofence::GeofenceEvaluator;
use crate::model::{EntityId, Position, ReferenceFrame};
use crate::store::EntityStore;
use crate::style::StyleTable;

use super::picking::PickingResolver;
use super::rendering::{
    world_to_screen, FrameView, Projection, RecordingBackend, RecordingLog, RenderBackend,
    RenderError, Vec2, Viewport, ZoneOutline,
};
use super::sync::{EntityFilter, ReconcileReport, SceneSynchronizer};

pub type SelectionListener = Box<dyn FnMut(Option<&EntityId>)>;

/// Failure to acquire a rendering context. Fatal for the instance being
/// mounted; the caller decides whether to mount again.
#[derive(Debug, Error)]
pub enum MountError {
    #[error("render container is not available: {0}")]
    ContainerMissing(String),
    #[error("failed to create event loop: {0}")]
    EventLoop(#[source] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[source] winit::error::OsError),
    #[error("failed to acquire rendering context: {0}")]
    RenderContext(#[source] pixels::Error),
}

/// Something a scene can be mounted into. Acquiring the context consumes the
/// container.
pub trait RenderContainer {
    type Backend: RenderBackend;

    fn acquire_context(self) -> Result<Self::Backend, MountError>;
}

/// Container without a surface, backed by a [`RecordingBackend`].
#[derive(Debug)]
pub struct HeadlessContainer {
    backend: Option<RecordingBackend>,
}

impl HeadlessContainer {
    pub fn new(viewport: Viewport) -> (Self, RecordingLog) {
        let (backend, log) = RecordingBackend::new(viewport);
        (
            Self {
                backend: Some(backend),
            },
            log,
        )
    }

    /// A container whose surface is gone, for exercising mount failures.
    pub fn missing() -> Self {
        Self { backend: None }
    }
}

impl RenderContainer for HeadlessContainer {
    type Backend = RecordingBackend;

    fn acquire_context(self) -> Result<RecordingBackend, MountError> {
        let backend = self.backend.ok_or_else(|| {
            MountError::ContainerMissing("headless surface was dropped".to_string())
        })?;
        if backend.viewport().is_empty() {
            return Err(MountError::ContainerMissing(
                "headless surface has zero size".to_string(),
            ));
        }
        Ok(backend)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub feed_ticks: u32,
    pub playback_ticks: u32,
    pub alerts: usize,
    pub reconcile: Option<ReconcileReport>,
    pub drawn: bool,
}

/// State shared by the live map and the trajectory replay: the store the
/// scene renders from, its synchronizer, picking, camera and selection.
pub struct SceneCore<B: RenderBackend> {
    store: EntityStore,
    sync: SceneSynchronizer<B>,
    picker: PickingResolver,
    projection: Projection,
    selected: Option<EntityId>,
    hovered: Option<EntityId>,
    on_entity_selected: Option<SelectionListener>,
    reconciled_revision: Option<u64>,
    needs_reconcile: bool,
    live: bool,
}

impl<B: RenderBackend> SceneCore<B> {
    pub fn new(
        backend: B,
        styles: StyleTable,
        picker: PickingResolver,
        projection: Projection,
    ) -> Self {
        Self {
            store: EntityStore::new(),
            sync: SceneSynchronizer::new(backend, styles),
            picker,
            projection,
            selected: None,
            hovered: None,
            on_entity_selected: None,
            reconciled_revision: None,
            needs_reconcile: true,
            live: true,
        }
    }

    /// Declares the frame entity positions arrive in.
    pub fn with_reference_frame(mut self, frame: ReferenceFrame) -> Self {
        self.sync.set_reference_frame(frame);
        self.needs_reconcile = true;
        self
    }

    pub fn reference_frame(&self) -> ReferenceFrame {
        self.sync.reference_frame()
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    pub fn synchronizer(&self) -> &SceneSynchronizer<B> {
        &self.sync
    }

    pub fn backend(&self) -> &B {
        self.sync.backend()
    }

    pub fn viewport(&self) -> Viewport {
        self.sync.backend().viewport()
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
    }

    pub fn selected(&self) -> Option<&EntityId> {
        self.selected.as_ref()
    }

    pub fn hovered(&self) -> Option<&EntityId> {
        self.hovered.as_ref()
    }

    pub fn set_on_entity_selected(&mut self, listener: SelectionListener) {
        if self.live {
            self.on_entity_selected = Some(listener);
        }
    }

    pub fn set_filter(&mut self, filter: EntityFilter) -> Option<ReconcileReport> {
        if !self.live {
            return None;
        }
        self.sync.set_filter(filter);
        self.needs_reconcile = true;
        self.reconcile_if_dirty()
    }

    pub fn clear_filter(&mut self) -> Option<ReconcileReport> {
        if !self.live || !self.sync.has_filter() {
            return None;
        }
        self.sync.clear_filter();
        self.needs_reconcile = true;
        self.reconcile_if_dirty()
    }

    pub fn has_filter(&self) -> bool {
        self.sync.has_filter()
    }

    /// Runs a reconciliation pass only if the store or the filter changed
    /// since the previous one.
    pub fn reconcile_if_dirty(&mut self) -> Option<ReconcileReport> {
        if !self.live {
            return None;
        }
        let revision = self.store.revision();
        if !self.needs_reconcile && self.reconciled_revision == Some(revision) {
            return None;
        }
        let report = self.sync.reconcile(self.store.snapshot());
        self.reconciled_revision = Some(revision);
        // A failed create is retried on the next frame.
        self.needs_reconcile = report.failed > 0;

        if let Some(selected) = self.selected.clone() {
            if self.sync.binding(&selected).is_none() {
                debug!(entity_id = %selected, "selection_dropped");
                self.apply_selection(None);
            }
        }
        if let Some(hovered) = &self.hovered {
            if self.sync.binding(hovered).is_none() {
                self.hovered = None;
            }
        }
        Some(report)
    }

    /// Resolves a click and reports the outcome, including the "nothing
    /// here" deselect. Never touches the store.
    pub fn pointer_down(&mut self, pointer: Vec2) -> Option<EntityId> {
        if !self.live {
            return None;
        }
        let hit = self.pick(pointer);
        self.apply_selection(hit.clone());
        hit
    }

    /// Hover highlight only; listeners are not notified.
    pub fn pointer_moved(&mut self, pointer: Option<Vec2>) -> Option<&EntityId> {
        if !self.live {
            return None;
        }
        self.hovered = pointer.and_then(|pointer| self.pick(pointer));
        self.hovered.as_ref()
    }

    pub fn pick(&self, pointer: Vec2) -> Option<EntityId> {
        self.picker
            .resolve(pointer, &self.projection, self.viewport(), self.sync.bindings())
    }

    fn apply_selection(&mut self, selected: Option<EntityId>) {
        self.selected = selected.clone();
        self.sync.set_selected(selected);
        if let Some(listener) = self.on_entity_selected.as_mut() {
            listener(self.selected.as_ref());
        }
    }

    pub fn pan_camera(&mut self, dx: f64, dy: f64) {
        match &mut self.projection {
            Projection::Plan(camera) => {
                camera.position.x += dx;
                camera.position.y += dy;
            }
            Projection::Perspective(camera) => {
                camera.target.x += dx;
                camera.target.y += dy;
            }
        }
    }

    pub fn zoom_camera(&mut self, steps: i32) {
        match &mut self.projection {
            Projection::Plan(camera) => camera.apply_zoom_steps(steps),
            Projection::Perspective(camera) => camera.apply_zoom_steps(steps),
        }
    }

    pub fn orbit_camera(&mut self, yaw_delta: f64, pitch_delta: f64) {
        if let Projection::Perspective(camera) = &mut self.projection {
            camera.orbit(yaw_delta, pitch_delta);
        }
    }

    /// Draws the last reconciled object set plus the given overlays.
    pub fn draw(&mut self, zones: &[ZoneOutline], path: &[Position]) -> Result<(), RenderError> {
        if !self.live {
            return Ok(());
        }
        let hovered = self
            .hovered
            .as_ref()
            .and_then(|id| self.sync.binding(id))
            .map(|binding| binding.handle);
        let projection = self.projection;
        self.sync.draw(&FrameView {
            projection: &projection,
            zones,
            path,
            hovered,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if !self.live {
            return;
        }
        if let Err(error) = self.sync.resize(width, height) {
            warn!(width, height, error = %error, "render_resize_failed");
        }
    }

    /// Releases every binding and the context. Idempotent.
    pub fn dispose(&mut self) -> bool {
        if !self.live {
            return false;
        }
        self.live = false;
        self.on_entity_selected = None;
        self.selected = None;
        self.hovered = None;
        let bound = self.sync.binding_count();
        self.sync.dispose();
        self.store.clear();
        self.store.drain_changes();
        info!(bindings_released = bound, "scene_disposed");
        true
    }
}

/// Screen-space outlines for every zone, flagged when occupied. Zones with a
/// vertex behind the camera are skipped.
pub fn project_zone_outlines(
    geofence: &GeofenceEvaluator,
    frame: ReferenceFrame,
    projection: &Projection,
    viewport: Viewport,
) -> Vec<ZoneOutline> {
    geofence
        .zones()
        .filter_map(|zone| {
            let vertices = zone
                .boundary
                .vertices()
                .iter()
                .map(|vertex| {
                    let ground = frame.to_ground(&Position::planar(vertex.x, vertex.y));
                    world_to_screen(&ground, projection, viewport)
                })
                .collect::<Option<Vec<Vec2>>>()?;
            Some(ZoneOutline {
                zone_id: zone.id.clone(),
                severity_level: zone.severity.level(),
                vertices,
                occupied: !geofence.occupants(&zone.id).is_empty(),
            })
        })
        .collect()
}
