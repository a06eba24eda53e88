use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info};

use crate::model::{
    EntityId, Severity, SpatialEntity, Timestamp, Zone, ZoneId, ZoneRule, ZoneSpec,
    ZoneValidationError,
};

pub const DEFAULT_STALE_TIMEOUT_SECONDS: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AlertKind {
    Enter,
    Dwell,
}

/// Identity of one alert. A given key is emitted at most once, so repeated
/// evaluation of the same occupancy never duplicates an alert.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub entity_id: EntityId,
    pub zone_id: ZoneId,
    pub kind: AlertKind,
    pub entered_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneAlert {
    pub entity_id: EntityId,
    pub zone_id: ZoneId,
    pub kind: AlertKind,
    pub severity: Severity,
    pub rule: ZoneRule,
    pub entered_at: Timestamp,
    pub timestamp: Timestamp,
}

impl ZoneAlert {
    pub fn key(&self) -> AlertKey {
        AlertKey {
            entity_id: self.entity_id.clone(),
            zone_id: self.zone_id.clone(),
            kind: self.kind,
            entered_at: self.entered_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneOccupancy {
    pub entered_at: Timestamp,
    pub last_seen_inside: Timestamp,
    enter_alerted: bool,
    dwell_alerted: bool,
}

impl ZoneOccupancy {
    pub fn is_dwelling(&self) -> bool {
        self.dwell_alerted
    }

    pub fn dwell_seconds(&self, now: Timestamp) -> f64 {
        now.seconds_since(self.entered_at).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneExit {
    pub entity_id: EntityId,
    pub zone_id: ZoneId,
    pub entered_at: Timestamp,
}

type OccupancyKey = (EntityId, ZoneId);

#[derive(Debug)]
pub struct GeofenceEvaluator {
    zones: BTreeMap<ZoneId, Zone>,
    occupancy: BTreeMap<OccupancyKey, ZoneOccupancy>,
    emitted: HashSet<AlertKey>,
    last_observed: HashMap<EntityId, Timestamp>,
    stale_timeout_seconds: f64,
}

impl Default for GeofenceEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_TIMEOUT_SECONDS)
    }
}

impl GeofenceEvaluator {
    pub fn new(stale_timeout_seconds: f64) -> Self {
        let valid = stale_timeout_seconds.is_finite() && stale_timeout_seconds > 0.0;
        let stale_timeout_seconds = if valid {
            stale_timeout_seconds
        } else {
            DEFAULT_STALE_TIMEOUT_SECONDS
        };
        Self {
            zones: BTreeMap::new(),
            occupancy: BTreeMap::new(),
            emitted: HashSet::new(),
            last_observed: HashMap::new(),
            stale_timeout_seconds,
        }
    }

    pub fn stale_timeout_seconds(&self) -> f64 {
        self.stale_timeout_seconds
    }

    /// Replaces the whole zone set. Nothing changes when any zone is invalid.
    pub fn set_zone_specs(&mut self, specs: Vec<ZoneSpec>) -> Result<(), ZoneValidationError> {
        let zones = specs
            .into_iter()
            .map(ZoneSpec::validate)
            .collect::<Result<Vec<_>, _>>()?;
        self.set_zones(zones)
    }

    pub fn set_zones(&mut self, zones: Vec<Zone>) -> Result<(), ZoneValidationError> {
        let mut next = BTreeMap::new();
        for zone in zones {
            if next.contains_key(&zone.id) {
                return Err(ZoneValidationError::DuplicateId { id: zone.id });
            }
            next.insert(zone.id.clone(), zone);
        }

        let stale_zone_ids: Vec<ZoneId> = self
            .zones
            .iter()
            .filter(|(id, zone)| {
                next.get(*id)
                    .map_or(true, |replacement| replacement.boundary != zone.boundary)
            })
            .map(|(id, _)| id.clone())
            .collect();
        for zone_id in &stale_zone_ids {
            self.drop_zone_occupancy(zone_id);
        }

        self.zones = next;
        info!(zone_count = self.zones.len(), "zones_replaced");
        Ok(())
    }

    pub fn upsert_zone(&mut self, zone: Zone) {
        let boundary_changed = self
            .zones
            .get(&zone.id)
            .is_some_and(|existing| existing.boundary != zone.boundary);
        if boundary_changed {
            self.drop_zone_occupancy(&zone.id);
        }
        debug!(zone_id = %zone.id, "zone_upserted");
        self.zones.insert(zone.id.clone(), zone);
    }

    pub fn remove_zone(&mut self, zone_id: &ZoneId) -> Option<Zone> {
        let removed = self.zones.remove(zone_id)?;
        self.drop_zone_occupancy(zone_id);
        debug!(zone_id = %zone_id, "zone_removed");
        Some(removed)
    }

    pub fn zones(&self) -> impl Iterator<Item = &Zone> + '_ {
        self.zones.values()
    }

    pub fn zone(&self, zone_id: &ZoneId) -> Option<&Zone> {
        self.zones.get(zone_id)
    }

    pub fn occupancy(&self, entity_id: &EntityId, zone_id: &ZoneId) -> Option<&ZoneOccupancy> {
        self.occupancy.get(&(entity_id.clone(), zone_id.clone()))
    }

    pub fn occupants(&self, zone_id: &ZoneId) -> Vec<&EntityId> {
        self.occupancy
            .keys()
            .filter(|(_, zone)| zone == zone_id)
            .map(|(entity, _)| entity)
            .collect()
    }

    pub fn occupancy_count(&self) -> usize {
        self.occupancy.len()
    }

    /// Re-tests the entity against every zone at its own `last_update` time.
    /// Samples older than the last one seen for the entity are ignored.
    pub fn observe(&mut self, entity: &SpatialEntity) -> Vec<ZoneAlert> {
        let now = entity.last_update;
        if let Some(previous) = self.last_observed.get(&entity.id) {
            if now < *previous {
                debug!(entity_id = %entity.id, "out_of_order_sample_ignored");
                return Vec::new();
            }
        }
        self.last_observed.insert(entity.id.clone(), now);

        let mut alerts = Vec::new();
        for zone in self.zones.values() {
            let key = (entity.id.clone(), zone.id.clone());
            if zone.contains(entity.position.x, entity.position.y) {
                let occupancy = self.occupancy.entry(key).or_insert_with(|| {
                    debug!(entity_id = %entity.id, zone_id = %zone.id, "zone_entered");
                    ZoneOccupancy {
                        entered_at: now,
                        last_seen_inside: now,
                        enter_alerted: false,
                        dwell_alerted: false,
                    }
                });
                occupancy.last_seen_inside = occupancy.last_seen_inside.max(now);
                if zone.rule.alert_on_enter && !occupancy.enter_alerted {
                    occupancy.enter_alerted = true;
                    emit(
                        &mut self.emitted,
                        &mut alerts,
                        &entity.id,
                        zone,
                        AlertKind::Enter,
                        occupancy.entered_at,
                        now,
                    );
                }
                check_dwell(
                    &mut self.emitted,
                    &mut alerts,
                    &entity.id,
                    zone,
                    occupancy,
                    now,
                );
            } else if let Some(occupancy) = self.occupancy.remove(&key) {
                debug!(entity_id = %entity.id, zone_id = %zone.id, "zone_exited");
                prune_emitted(&mut self.emitted, &entity.id, &zone.id, occupancy.entered_at);
            }
        }
        alerts
    }

    /// Advances the evaluator clock without a position sample: expires stale
    /// occupancy, then fires any dwell threshold reached by `now`.
    pub fn tick(&mut self, now: Timestamp) -> (Vec<ZoneAlert>, Vec<ZoneExit>) {
        let exits = self.sweep_stale(now);
        let mut alerts = Vec::new();
        for ((entity_id, zone_id), occupancy) in self.occupancy.iter_mut() {
            let Some(zone) = self.zones.get(zone_id) else {
                continue;
            };
            check_dwell(
                &mut self.emitted,
                &mut alerts,
                entity_id,
                zone,
                occupancy,
                now,
            );
        }
        (alerts, exits)
    }

    pub fn sweep_stale(&mut self, now: Timestamp) -> Vec<ZoneExit> {
        let timeout = self.stale_timeout_seconds;
        let stale: Vec<OccupancyKey> = self
            .occupancy
            .iter()
            .filter(|(_, occupancy)| now.seconds_since(occupancy.last_seen_inside) > timeout)
            .map(|(key, _)| key.clone())
            .collect();

        let mut exits = Vec::with_capacity(stale.len());
        for key in stale {
            if let Some(occupancy) = self.occupancy.remove(&key) {
                let (entity_id, zone_id) = key;
                info!(
                    entity_id = %entity_id,
                    zone_id = %zone_id,
                    last_seen_ms = occupancy.last_seen_inside.as_millis(),
                    "stale_occupancy_expired"
                );
                prune_emitted(&mut self.emitted, &entity_id, &zone_id, occupancy.entered_at);
                exits.push(ZoneExit {
                    entity_id,
                    zone_id,
                    entered_at: occupancy.entered_at,
                });
            }
        }
        exits
    }

    pub fn forget_entity(&mut self, entity_id: &EntityId) {
        let keys: Vec<OccupancyKey> = self
            .occupancy
            .keys()
            .filter(|(entity, _)| entity == entity_id)
            .cloned()
            .collect();
        for key in keys {
            if let Some(occupancy) = self.occupancy.remove(&key) {
                prune_emitted(&mut self.emitted, &key.0, &key.1, occupancy.entered_at);
            }
        }
        self.last_observed.remove(entity_id);
    }

    pub fn clear(&mut self) {
        self.occupancy.clear();
        self.emitted.clear();
        self.last_observed.clear();
    }

    fn drop_zone_occupancy(&mut self, zone_id: &ZoneId) {
        let keys: Vec<OccupancyKey> = self
            .occupancy
            .keys()
            .filter(|(_, zone)| zone == zone_id)
            .cloned()
            .collect();
        for key in keys {
            if let Some(occupancy) = self.occupancy.remove(&key) {
                prune_emitted(&mut self.emitted, &key.0, &key.1, occupancy.entered_at);
            }
        }
    }
}

fn check_dwell(
    emitted: &mut HashSet<AlertKey>,
    alerts: &mut Vec<ZoneAlert>,
    entity_id: &EntityId,
    zone: &Zone,
    occupancy: &mut ZoneOccupancy,
    now: Timestamp,
) {
    let Some(threshold) = zone.rule.dwell_threshold_seconds else {
        return;
    };
    if occupancy.dwell_alerted || now.seconds_since(occupancy.entered_at) < threshold {
        return;
    }
    occupancy.dwell_alerted = true;
    emit(
        emitted,
        alerts,
        entity_id,
        zone,
        AlertKind::Dwell,
        occupancy.entered_at,
        now,
    );
}

fn emit(
    emitted: &mut HashSet<AlertKey>,
    alerts: &mut Vec<ZoneAlert>,
    entity_id: &EntityId,
    zone: &Zone,
    kind: AlertKind,
    entered_at: Timestamp,
    now: Timestamp,
) {
    let alert = ZoneAlert {
        entity_id: entity_id.clone(),
        zone_id: zone.id.clone(),
        kind,
        severity: zone.severity,
        rule: zone.rule,
        entered_at,
        timestamp: now,
    };
    if emitted.insert(alert.key()) {
        info!(
            entity_id = %alert.entity_id,
            zone_id = %alert.zone_id,
            kind = ?alert.kind,
            severity = alert.severity.level(),
            timestamp_ms = alert.timestamp.as_millis(),
            "zone_alert"
        );
        alerts.push(alert);
    }
}

fn prune_emitted(
    emitted: &mut HashSet<AlertKey>,
    entity_id: &EntityId,
    zone_id: &ZoneId,
    entered_at: Timestamp,
) {
    emitted.retain(|key| {
        !(key.entity_id == *entity_id && key.zone_id == *zone_id && key.entered_at == entered_at)
    });
}
