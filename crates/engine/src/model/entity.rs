use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Milliseconds since the unix epoch. Every clock comparison in the engine
/// (dwell, staleness, trajectory ordering) goes through this type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or(0);
        Self(millis)
    }

    pub fn as_millis(self) -> i64 {
        self.0
    }

    pub fn seconds_since(self, earlier: Timestamp) -> f64 {
        self.0.saturating_sub(earlier.0) as f64 / 1000.0
    }

    pub fn plus_secs_f64(self, secs: f64) -> Self {
        Self(self.0.saturating_add((secs * 1000.0).round() as i64))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Device,
    Person,
    Sensor,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Device, EntityKind::Person, EntityKind::Sensor];

    pub fn allowed_statuses(self) -> &'static [EntityStatus] {
        const DEVICE: &[EntityStatus] = &[
            EntityStatus::Normal,
            EntityStatus::Warning,
            EntityStatus::Alarm,
            EntityStatus::Offline,
        ];
        const PERSON: &[EntityStatus] = &[
            EntityStatus::Normal,
            EntityStatus::Warning,
            EntityStatus::Alarm,
            EntityStatus::Offline,
            EntityStatus::Sos,
        ];
        const SENSOR: &[EntityStatus] = DEVICE;
        match self {
            EntityKind::Device => DEVICE,
            EntityKind::Person => PERSON,
            EntityKind::Sensor => SENSOR,
        }
    }

    /// `Unknown` is accepted for every kind and renders with the fallback style.
    pub fn allows(self, status: EntityStatus) -> bool {
        status == EntityStatus::Unknown || self.allowed_statuses().contains(&status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    Normal,
    Warning,
    Alarm,
    Offline,
    Sos,
    #[serde(other)]
    Unknown,
}

impl EntityStatus {
    pub fn is_alarming(self) -> bool {
        matches!(self, EntityStatus::Alarm | EntityStatus::Sos)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl Position {
    pub fn planar(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    pub fn spatial(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.map_or(true, f64::is_finite)
    }

    pub fn z_or_ground(&self) -> f64 {
        self.z.unwrap_or(0.0)
    }
}

/// Mean earth radius used for the local tangent-plane approximation.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Frame that entity and zone coordinates are declared in. Rendering and
/// picking always work on the ground plane in metres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceFrame {
    /// `x` is longitude and `y` latitude in degrees, projected
    /// equirectangularly around the origin.
    Geographic { origin_lon: f64, origin_lat: f64 },
    #[default]
    LocalGround,
}

impl ReferenceFrame {
    /// Ground-plane metres for a position declared in this frame. Height
    /// passes through unchanged.
    pub fn to_ground(&self, position: &Position) -> Position {
        match *self {
            ReferenceFrame::LocalGround => *position,
            ReferenceFrame::Geographic {
                origin_lon,
                origin_lat,
            } => {
                let meters_per_degree = EARTH_RADIUS_M.to_radians();
                Position {
                    x: (position.x - origin_lon)
                        * meters_per_degree
                        * origin_lat.to_radians().cos(),
                    y: (position.y - origin_lat) * meters_per_degree,
                    z: position.z,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Position,
    pub status: EntityStatus,
    pub last_update: Timestamp,
    #[serde(default)]
    pub metadata: Vec<(String, serde_json::Value)>,
}

impl SpatialEntity {
    pub fn new(
        id: impl Into<String>,
        kind: EntityKind,
        position: Position,
        status: EntityStatus,
        last_update: Timestamp,
    ) -> Self {
        Self {
            id: EntityId(id.into()),
            kind,
            position,
            status,
            last_update,
            metadata: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        let key = key.into();
        match self.metadata.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.metadata.push((key, value)),
        }
        self
    }

    pub fn metadata_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn validate(&self) -> Result<(), EntityValidationError> {
        if self.id.0.trim().is_empty() {
            return Err(EntityValidationError::EmptyId);
        }
        if !self.position.is_finite() {
            return Err(EntityValidationError::NonFinitePosition {
                id: self.id.clone(),
                position: self.position,
            });
        }
        if !self.kind.allows(self.status) {
            return Err(EntityValidationError::StatusNotAllowed {
                id: self.id.clone(),
                kind: self.kind,
                status: self.status,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntityValidationError {
    #[error("entity id must not be empty")]
    EmptyId,
    #[error("entity {id} has a non-finite position component: {position:?}")]
    NonFinitePosition { id: EntityId, position: Position },
    #[error("entity {id} of kind {kind:?} cannot carry status {status:?}")]
    StatusNotAllowed {
        id: EntityId,
        kind: EntityKind,
        status: EntityStatus,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn local_ground_positions_pass_through() {
        let position = Position::spatial(12.5, -3.0, 4.0);
        assert_eq!(ReferenceFrame::LocalGround.to_ground(&position), position);
    }

    #[test]
    fn geographic_positions_become_metres_around_origin() {
        let frame = ReferenceFrame::Geographic {
            origin_lon: 10.0,
            origin_lat: 60.0,
        };
        assert_eq!(frame.to_ground(&Position::planar(10.0, 60.0)), Position::planar(0.0, 0.0));

        let north = frame.to_ground(&Position::planar(10.0, 60.001));
        assert!((north.y - 111.195).abs() < 0.01);
        assert!(north.x.abs() < 1e-9);

        // A degree of longitude at 60 degrees north is half a degree of latitude.
        let east = frame.to_ground(&Position::planar(10.001, 60.0));
        assert!((east.x - north.y * 0.5).abs() < 1e-6);
    }

    #[test]
    fn reference_frame_decodes_tagged_json() {
        let frame: ReferenceFrame = serde_json::from_value(json!({
            "kind": "geographic",
            "origin_lon": 115.86,
            "origin_lat": -31.95
        }))
        .expect("frame");
        assert!(matches!(frame, ReferenceFrame::Geographic { .. }));
        let local: ReferenceFrame =
            serde_json::from_value(json!({ "kind": "local_ground" })).expect("local");
        assert_eq!(local, ReferenceFrame::LocalGround);
    }

    fn person(status: EntityStatus) -> SpatialEntity {
        SpatialEntity::new(
            "p-1",
            EntityKind::Person,
            Position::planar(1.0, 2.0),
            status,
            Timestamp::ZERO,
        )
    }

    #[test]
    fn sos_is_closed_to_persons() {
        assert!(person(EntityStatus::Sos).validate().is_ok());

        let mut device = person(EntityStatus::Sos);
        device.kind = EntityKind::Device;
        assert!(matches!(
            device.validate(),
            Err(EntityValidationError::StatusNotAllowed { .. })
        ));
    }

    #[test]
    fn nan_and_infinite_components_are_rejected() {
        let mut entity = person(EntityStatus::Normal);
        entity.position = Position::planar(f64::NAN, 0.0);
        assert!(entity.validate().is_err());

        entity.position = Position::spatial(0.0, 0.0, f64::INFINITY);
        assert!(entity.validate().is_err());
    }

    #[test]
    fn blank_id_is_rejected() {
        let mut entity = person(EntityStatus::Normal);
        entity.id = EntityId::new("  ");
        assert_eq!(entity.validate(), Err(EntityValidationError::EmptyId));
    }

    #[test]
    fn unrecognized_status_decodes_to_unknown() {
        let raw = json!({
            "id": "d-7",
            "kind": "device",
            "position": { "x": 3.0, "y": 4.0 },
            "status": "maintenance",
            "last_update": 1500
        });
        let entity: SpatialEntity = serde_json::from_value(raw).expect("decode");
        assert_eq!(entity.status, EntityStatus::Unknown);
        assert!(entity.validate().is_ok());
        assert_eq!(entity.last_update, Timestamp::from_millis(1500));
    }

    #[test]
    fn metadata_keeps_insertion_order_and_replaces_in_place() {
        let entity = person(EntityStatus::Normal)
            .with_metadata("tag_id", json!("T-100"))
            .with_metadata("battery", json!(87))
            .with_metadata("tag_id", json!("T-101"));

        let keys: Vec<&str> = entity.metadata.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["tag_id", "battery"]);
        assert_eq!(entity.metadata_value("tag_id"), Some(&json!("T-101")));
    }

    #[test]
    fn timestamp_seconds_since_is_signed() {
        let a = Timestamp::from_secs(10);
        let b = Timestamp::from_millis(12_500);
        assert!((b.seconds_since(a) - 2.5).abs() < 1e-9);
        assert!((a.seconds_since(b) + 2.5).abs() < 1e-9);
    }
}
