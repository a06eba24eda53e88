use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::model::{EntityId, ReferenceFrame, SpatialEntity};
use crate::style::StyleTable;

use super::rendering::{FrameView, ObjectHandle, RenderBackend, RenderError, RenderObjectDesc};

pub type EntityFilter = Box<dyn Fn(&SpatialEntity) -> bool>;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderBinding {
    pub handle: ObjectHandle,
    pub desc: RenderObjectDesc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub destroyed: usize,
    pub failed: usize,
}

impl ReconcileReport {
    pub fn churn(&self) -> usize {
        self.created + self.updated + self.destroyed
    }
}

/// Owns the render context and the id -> handle bindings, and keeps the
/// backend's object set equal to the (filtered) entity snapshot.
pub struct SceneSynchronizer<B: RenderBackend> {
    backend: B,
    bindings: BTreeMap<EntityId, RenderBinding>,
    styles: StyleTable,
    frame: ReferenceFrame,
    filter: Option<EntityFilter>,
    selected: Option<EntityId>,
    disposed: bool,
}

impl<B: RenderBackend> SceneSynchronizer<B> {
    pub fn new(backend: B, styles: StyleTable) -> Self {
        Self {
            backend,
            bindings: BTreeMap::new(),
            styles,
            frame: ReferenceFrame::default(),
            filter: None,
            selected: None,
            disposed: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn styles(&self) -> &StyleTable {
        &self.styles
    }

    pub fn reference_frame(&self) -> ReferenceFrame {
        self.frame
    }

    /// Frame entity positions are declared in. Takes effect on the next
    /// reconcile, which moves every binding onto the ground plane.
    pub fn set_reference_frame(&mut self, frame: ReferenceFrame) {
        self.frame = frame;
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&EntityId, &RenderBinding)> + '_ {
        self.bindings.iter()
    }

    pub fn binding(&self, id: &EntityId) -> Option<&RenderBinding> {
        self.bindings.get(id)
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn set_filter(&mut self, filter: EntityFilter) {
        self.filter = Some(filter);
    }

    pub fn clear_filter(&mut self) {
        self.filter = None;
    }

    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    pub fn selected(&self) -> Option<&EntityId> {
        self.selected.as_ref()
    }

    fn describe(&self, entity: &SpatialEntity) -> RenderObjectDesc {
        RenderObjectDesc {
            entity_id: entity.id.clone(),
            kind: entity.kind,
            position: self.frame.to_ground(&entity.position),
            style: self.styles.style_for(entity.kind, entity.status),
            selected: self.selected.as_ref() == Some(&entity.id),
        }
    }

    /// One diff pass: destroy bindings whose id vanished, update surviving
    /// bindings in place, create bindings for new ids. Handles of surviving
    /// bindings never change.
    pub fn reconcile<'a>(
        &mut self,
        entities: impl IntoIterator<Item = &'a SpatialEntity>,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        if self.disposed {
            return report;
        }

        let desired: BTreeMap<EntityId, RenderObjectDesc> = entities
            .into_iter()
            .filter(|entity| self.filter.as_ref().map_or(true, |keep| keep(entity)))
            .map(|entity| (entity.id.clone(), self.describe(entity)))
            .collect();

        let vanished: Vec<EntityId> = self
            .bindings
            .keys()
            .filter(|id| !desired.contains_key(*id))
            .cloned()
            .collect();
        for id in vanished {
            if let Some(binding) = self.bindings.remove(&id) {
                if let Err(error) = self.backend.destroy_object(binding.handle) {
                    warn!(entity_id = %id, error = %error, "render_object_destroy_failed");
                    report.failed += 1;
                } else {
                    report.destroyed += 1;
                }
            }
        }

        for (id, desc) in desired {
            match self.bindings.get_mut(&id) {
                Some(binding) if binding.desc == desc => report.unchanged += 1,
                Some(binding) => match self.backend.update_object(binding.handle, &desc) {
                    Ok(()) => {
                        binding.desc = desc;
                        report.updated += 1;
                    }
                    Err(RenderError::StaleHandle(handle)) => {
                        warn!(entity_id = %id, ?handle, "render_binding_stale");
                        self.bindings.remove(&id);
                        Self::create_binding(
                            &mut self.backend,
                            &mut self.bindings,
                            id,
                            desc,
                            &mut report,
                        );
                    }
                    Err(error) => {
                        warn!(entity_id = %id, error = %error, "render_object_update_failed");
                        report.failed += 1;
                    }
                },
                None => {
                    Self::create_binding(
                        &mut self.backend,
                        &mut self.bindings,
                        id,
                        desc,
                        &mut report,
                    );
                }
            }
        }

        if report.churn() > 0 || report.failed > 0 {
            debug!(
                created = report.created,
                updated = report.updated,
                destroyed = report.destroyed,
                failed = report.failed,
                bound = self.bindings.len(),
                "reconcile_pass"
            );
        }
        report
    }

    fn create_binding(
        backend: &mut B,
        bindings: &mut BTreeMap<EntityId, RenderBinding>,
        id: EntityId,
        desc: RenderObjectDesc,
        report: &mut ReconcileReport,
    ) {
        match backend.create_object(&desc) {
            Ok(handle) => {
                bindings.insert(id, RenderBinding { handle, desc });
                report.created += 1;
            }
            Err(error) => {
                warn!(entity_id = %id, error = %error, "render_object_create_failed");
                report.failed += 1;
            }
        }
    }

    /// Moves the selection highlight between bindings without a full pass.
    pub fn set_selected(&mut self, selected: Option<EntityId>) {
        if self.disposed || self.selected == selected {
            return;
        }
        let previous = std::mem::replace(&mut self.selected, selected);
        for (id, flag) in [(previous, false), (self.selected.clone(), true)] {
            let Some(id) = id else {
                continue;
            };
            let Some(binding) = self.bindings.get_mut(&id) else {
                continue;
            };
            let mut desc = binding.desc.clone();
            desc.selected = flag;
            match self.backend.update_object(binding.handle, &desc) {
                Ok(()) => binding.desc = desc,
                Err(error) => {
                    warn!(entity_id = %id, error = %error, "selection_highlight_failed");
                }
            }
        }
    }

    pub fn draw(&mut self, view: &FrameView<'_>) -> Result<(), RenderError> {
        if self.disposed {
            return Ok(());
        }
        self.backend.draw(view)
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if self.disposed {
            return Ok(());
        }
        self.backend.resize(width, height)
    }

    /// Destroys every binding and releases the context. Returns `false` when
    /// the synchronizer was already disposed.
    pub fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        let bindings = std::mem::take(&mut self.bindings);
        let count = bindings.len();
        for (id, binding) in bindings {
            if let Err(error) = self.backend.destroy_object(binding.handle) {
                warn!(entity_id = %id, error = %error, "render_object_destroy_failed");
            }
        }
        self.backend.release();
        self.selected = None;
        self.filter = None;
        self.disposed = true;
        info!(destroyed = count, "render_context_released");
        true
    }
}

impl<B: RenderBackend> Drop for SceneSynchronizer<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}
