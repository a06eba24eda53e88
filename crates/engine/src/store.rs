use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::model::{EntityId, EntityValidationError, SpatialEntity};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    Upserted(EntityId),
    Removed(EntityId),
}

impl StoreChange {
    pub fn entity_id(&self) -> &EntityId {
        match self {
            StoreChange::Upserted(id) | StoreChange::Removed(id) => id,
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub accepted: usize,
    pub rejected: Vec<EntityValidationError>,
}

/// Canonical id -> snapshot map. Iteration is ordered by id so every
/// consumer sees the same sequence for the same contents.
#[derive(Debug, Default)]
pub struct EntityStore {
    entities: BTreeMap<EntityId, SpatialEntity>,
    pending_changes: Vec<StoreChange>,
    revision: u64,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the full record for `entity.id`. A rejected record leaves the
    /// previous one untouched.
    pub fn upsert(&mut self, entity: SpatialEntity) -> Result<(), EntityValidationError> {
        if let Err(error) = entity.validate() {
            warn!(entity_id = %entity.id, error = %error, "entity_rejected");
            return Err(error);
        }
        let id = entity.id.clone();
        self.entities.insert(id.clone(), entity);
        self.pending_changes.push(StoreChange::Upserted(id));
        self.revision = self.revision.saturating_add(1);
        Ok(())
    }

    pub fn upsert_batch(
        &mut self,
        entities: impl IntoIterator<Item = SpatialEntity>,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for entity in entities {
            match self.upsert(entity) {
                Ok(()) => outcome.accepted += 1,
                Err(error) => outcome.rejected.push(error),
            }
        }
        outcome
    }

    pub fn remove(&mut self, id: &EntityId) -> Option<SpatialEntity> {
        let removed = self.entities.remove(id)?;
        self.pending_changes.push(StoreChange::Removed(id.clone()));
        self.revision = self.revision.saturating_add(1);
        debug!(entity_id = %id, "entity_removed");
        Some(removed)
    }

    pub fn clear(&mut self) {
        let ids: Vec<EntityId> = self.entities.keys().cloned().collect();
        for id in ids {
            self.remove(&id);
        }
    }

    pub fn get(&self, id: &EntityId) -> Option<&SpatialEntity> {
        self.entities.get(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn snapshot(&self) -> impl Iterator<Item = &SpatialEntity> + '_ {
        self.entities.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> + '_ {
        self.entities.keys()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.pending_changes.is_empty()
    }

    pub fn drain_changes(&mut self) -> Vec<StoreChange> {
        std::mem::take(&mut self.pending_changes)
    }
}
