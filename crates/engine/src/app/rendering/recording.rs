use std::cell::RefCell;
use std::rc::Rc;

use crate::model::EntityId;

use super::backend::{
    FrameView, HandleArena, ObjectHandle, RenderBackend, RenderError, RenderObjectDesc,
};
use super::transform::Viewport;

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Create {
        entity_id: EntityId,
        handle: ObjectHandle,
    },
    Update {
        entity_id: EntityId,
        handle: ObjectHandle,
    },
    Destroy {
        entity_id: EntityId,
        handle: ObjectHandle,
    },
    Draw {
        object_count: usize,
    },
    Resize {
        width: u32,
        height: u32,
    },
    Release,
}

/// Shared view of everything a [`RecordingBackend`] was asked to do. Stays
/// readable after the backend itself has been moved into a scene.
#[derive(Debug, Clone, Default)]
pub struct RecordingLog {
    calls: Rc<RefCell<Vec<BackendCall>>>,
}

impl RecordingLog {
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|call| predicate(call)).count()
    }

    pub fn creates(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::Create { .. }))
    }

    pub fn updates(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::Update { .. }))
    }

    pub fn destroys(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::Destroy { .. }))
    }

    pub fn draws(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::Draw { .. }))
    }

    pub fn releases(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::Release))
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    fn push(&self, call: BackendCall) {
        self.calls.borrow_mut().push(call);
    }
}

/// Headless backend: keeps objects in an arena and logs every call.
#[derive(Debug)]
pub struct RecordingBackend {
    objects: HandleArena<RenderObjectDesc>,
    viewport: Viewport,
    log: RecordingLog,
    released: bool,
    fail_creates: bool,
}

impl RecordingBackend {
    pub fn new(viewport: Viewport) -> (Self, RecordingLog) {
        let log = RecordingLog::default();
        let backend = Self {
            objects: HandleArena::default(),
            viewport,
            log: log.clone(),
            released: false,
            fail_creates: false,
        };
        (backend, log)
    }

    pub fn object(&self, handle: ObjectHandle) -> Option<&RenderObjectDesc> {
        self.objects.get(handle)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Makes every following `create_object` fail with a lost context.
    pub fn set_fail_creates(&mut self, fail: bool) {
        self.fail_creates = fail;
    }

    fn ensure_live(&self) -> Result<(), RenderError> {
        if self.released {
            Err(RenderError::ContextReleased)
        } else {
            Ok(())
        }
    }
}

impl RenderBackend for RecordingBackend {
    fn create_object(&mut self, desc: &RenderObjectDesc) -> Result<ObjectHandle, RenderError> {
        self.ensure_live()?;
        if self.fail_creates {
            return Err(RenderError::ContextLost("simulated create failure".to_string()));
        }
        let handle = self.objects.insert(desc.clone());
        self.log.push(BackendCall::Create {
            entity_id: desc.entity_id.clone(),
            handle,
        });
        Ok(handle)
    }

    fn update_object(
        &mut self,
        handle: ObjectHandle,
        desc: &RenderObjectDesc,
    ) -> Result<(), RenderError> {
        self.ensure_live()?;
        let object = self
            .objects
            .get_mut(handle)
            .ok_or(RenderError::StaleHandle(handle))?;
        *object = desc.clone();
        self.log.push(BackendCall::Update {
            entity_id: desc.entity_id.clone(),
            handle,
        });
        Ok(())
    }

    fn destroy_object(&mut self, handle: ObjectHandle) -> Result<(), RenderError> {
        self.ensure_live()?;
        let removed = self
            .objects
            .remove(handle)
            .ok_or(RenderError::StaleHandle(handle))?;
        self.log.push(BackendCall::Destroy {
            entity_id: removed.entity_id,
            handle,
        });
        Ok(())
    }

    fn draw(&mut self, _view: &FrameView<'_>) -> Result<(), RenderError> {
        self.ensure_live()?;
        self.log.push(BackendCall::Draw {
            object_count: self.objects.len(),
        });
        Ok(())
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.ensure_live()?;
        self.viewport = Viewport { width, height };
        self.log.push(BackendCall::Resize { width, height });
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.objects.clear();
        self.released = true;
        self.log.push(BackendCall::Release);
    }
}
