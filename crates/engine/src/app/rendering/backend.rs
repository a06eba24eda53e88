use thiserror::Error;

use crate::model::{EntityId, EntityKind, Position, ZoneId};
use crate::style::VisualStyle;

use super::transform::{Projection, Vec2, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle {
    index: u32,
    generation: u32,
}

impl ObjectHandle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Generational arena backing renderer objects. A handle stops resolving the
/// moment its object is removed, even if the slot is later reused.
#[derive(Debug)]
pub struct HandleArena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for HandleArena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }
}

impl<T> HandleArena<T> {
    pub fn insert(&mut self, value: T) -> ObjectHandle {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return ObjectHandle {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        ObjectHandle {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, handle: ObjectHandle) -> Option<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: ObjectHandle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    pub fn remove(&mut self, handle: ObjectHandle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectHandle, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    ObjectHandle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }

    pub fn clear(&mut self) {
        let handles: Vec<ObjectHandle> = self.iter().map(|(handle, _)| handle).collect();
        for handle in handles {
            self.remove(handle);
        }
    }
}

/// Everything a backend needs to draw one entity marker.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderObjectDesc {
    pub entity_id: EntityId,
    pub kind: EntityKind,
    pub position: Position,
    pub style: VisualStyle,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneOutline {
    pub zone_id: ZoneId,
    pub severity_level: u8,
    pub vertices: Vec<Vec2>,
    pub occupied: bool,
}

/// Per-frame inputs that are not owned render objects.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub projection: &'a Projection,
    pub zones: &'a [ZoneOutline],
    pub path: &'a [Position],
    pub hovered: Option<ObjectHandle>,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render object handle {0:?} is stale or was never issued")]
    StaleHandle(ObjectHandle),
    #[error("rendering context was released")]
    ContextReleased,
    #[error("rendering context lost: {0}")]
    ContextLost(String),
    #[error("failed to present frame: {0}")]
    Present(#[source] pixels::Error),
    #[error("failed to resize render surface: {0}")]
    Resize(#[source] pixels::TextureError),
}

/// The imperative, handle-based renderer the scene synchronizer drives.
pub trait RenderBackend {
    fn create_object(&mut self, desc: &RenderObjectDesc) -> Result<ObjectHandle, RenderError>;
    fn update_object(
        &mut self,
        handle: ObjectHandle,
        desc: &RenderObjectDesc,
    ) -> Result<(), RenderError>;
    fn destroy_object(&mut self, handle: ObjectHandle) -> Result<(), RenderError>;
    fn draw(&mut self, view: &FrameView<'_>) -> Result<(), RenderError>;
    fn viewport(&self) -> Viewport;
    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError>;
    /// Frees the context itself (surface, camera state, listeners). Called
    /// exactly once, after every object has been destroyed.
    fn release(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_handle_stays_stale_after_slot_reuse() {
        let mut arena = HandleArena::default();
        let first = arena.insert("a");
        assert_eq!(arena.remove(first), Some("a"));

        let second = arena.insert("b");
        assert_eq!(second.index(), first.index());
        assert_ne!(second.generation(), first.generation());
        assert!(arena.get(first).is_none());
        assert_eq!(arena.get(second), Some(&"b"));
        assert!(arena.remove(first).is_none());
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn iter_and_clear_cover_live_slots_only() {
        let mut arena = HandleArena::default();
        let a = arena.insert(1);
        let b = arena.insert(2);
        let _c = arena.insert(3);
        arena.remove(b);

        let values: Vec<i32> = arena.iter().map(|(_, value)| *value).collect();
        assert_eq!(values, vec![1, 3]);
        *arena.get_mut(a).expect("live") = 10;
        assert_eq!(arena.get(a), Some(&10));

        arena.clear();
        assert!(arena.is_empty());
        assert_eq!(arena.iter().count(), 0);
    }
}
