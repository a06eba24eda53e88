use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entity::{EntityId, EntityKind, EntityStatus, Position, SpatialEntity, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub timestamp: Timestamp,
    pub position: Position,
    #[serde(default = "default_point_status")]
    pub status: EntityStatus,
}

fn default_point_status() -> EntityStatus {
    EntityStatus::Normal
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySpec {
    #[serde(alias = "subjectId")]
    pub subject_id: EntityId,
    #[serde(default = "default_subject_kind", alias = "subjectKind")]
    pub subject_kind: EntityKind,
    pub points: Vec<TrajectoryPoint>,
}

fn default_subject_kind() -> EntityKind {
    EntityKind::Person
}

/// A recorded path: at least one point, timestamps non-decreasing.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    subject_id: EntityId,
    subject_kind: EntityKind,
    points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn new(
        subject_id: EntityId,
        subject_kind: EntityKind,
        points: Vec<TrajectoryPoint>,
    ) -> Result<Self, TrajectoryError> {
        TrajectorySpec {
            subject_id,
            subject_kind,
            points,
        }
        .validate()
    }

    pub fn subject_id(&self) -> &EntityId {
        &self.subject_id
    }

    pub fn subject_kind(&self) -> EntityKind {
        self.subject_kind
    }

    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a validated trajectory; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.points.len() - 1
    }

    pub fn point(&self, index: usize) -> Option<&TrajectoryPoint> {
        self.points.get(index)
    }

    pub fn duration_seconds(&self) -> f64 {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => last.timestamp.seconds_since(first.timestamp),
            _ => 0.0,
        }
    }

    /// The subject rendered as a one-entity snapshot at `index`.
    pub fn entity_at(&self, index: usize) -> Option<SpatialEntity> {
        let point = self.points.get(index)?;
        let status = if self.subject_kind.allows(point.status) {
            point.status
        } else {
            EntityStatus::Unknown
        };
        Some(
            SpatialEntity::new(
                self.subject_id.0.clone(),
                self.subject_kind,
                point.position,
                status,
                point.timestamp,
            )
            .with_metadata("trajectory_index", serde_json::json!(index)),
        )
    }
}

impl TrajectorySpec {
    pub fn validate(self) -> Result<Trajectory, TrajectoryError> {
        if self.subject_id.0.trim().is_empty() {
            return Err(TrajectoryError::EmptySubject);
        }
        if self.points.is_empty() {
            return Err(TrajectoryError::Empty);
        }
        for (index, point) in self.points.iter().enumerate() {
            if !point.position.is_finite() {
                return Err(TrajectoryError::NonFinitePoint { index });
            }
        }
        for (index, pair) in self.points.windows(2).enumerate() {
            if pair[1].timestamp < pair[0].timestamp {
                return Err(TrajectoryError::OutOfOrder {
                    index: index + 1,
                    previous: pair[0].timestamp,
                    current: pair[1].timestamp,
                });
            }
        }
        Ok(Trajectory {
            subject_id: self.subject_id,
            subject_kind: self.subject_kind,
            points: self.points,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrajectoryError {
    #[error("trajectory subject id must not be empty")]
    EmptySubject,
    #[error("trajectory must contain at least one point")]
    Empty,
    #[error("trajectory point {index} has a non-finite position")]
    NonFinitePoint { index: usize },
    #[error(
        "trajectory point {index} is earlier ({current:?}) than its predecessor ({previous:?})"
    )]
    OutOfOrder {
        index: usize,
        previous: Timestamp,
        current: Timestamp,
    },
    #[error("playback speed must be a positive finite multiplier, got {speed}")]
    InvalidSpeed { speed: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(secs: i64, x: f64) -> TrajectoryPoint {
        TrajectoryPoint {
            timestamp: Timestamp::from_secs(secs),
            position: Position::planar(x, 0.0),
            status: EntityStatus::Normal,
        }
    }

    #[test]
    fn empty_trajectory_is_rejected() {
        let result = Trajectory::new(EntityId::new("p"), EntityKind::Person, Vec::new());
        assert_eq!(result, Err(TrajectoryError::Empty));
    }

    #[test]
    fn equal_timestamps_are_allowed_but_decreasing_are_not() {
        assert!(Trajectory::new(
            EntityId::new("p"),
            EntityKind::Person,
            vec![point(0, 0.0), point(0, 1.0), point(5, 2.0)],
        )
        .is_ok());

        let result = Trajectory::new(
            EntityId::new("p"),
            EntityKind::Person,
            vec![point(0, 0.0), point(5, 1.0), point(4, 2.0)],
        );
        assert!(matches!(
            result,
            Err(TrajectoryError::OutOfOrder { index: 2, .. })
        ));
    }

    #[test]
    fn entity_at_projects_point_onto_subject() {
        let trajectory = Trajectory::new(
            EntityId::new("miner-4"),
            EntityKind::Person,
            vec![point(0, 0.0), point(10, 3.0)],
        )
        .expect("trajectory");

        let entity = trajectory.entity_at(1).expect("entity");
        assert_eq!(entity.id, EntityId::new("miner-4"));
        assert_eq!(entity.position, Position::planar(3.0, 0.0));
        assert_eq!(entity.last_update, Timestamp::from_secs(10));
        assert!(trajectory.entity_at(2).is_none());
        assert!((trajectory.duration_seconds() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn spec_decodes_with_defaults() {
        let raw = r#"{
            "subject_id": "truck-2",
            "points": [{ "timestamp": 0, "position": { "x": 1.0, "y": 2.0 } }]
        }"#;
        let spec: TrajectorySpec = serde_json::from_str(raw).expect("decode");
        let trajectory = spec.validate().expect("valid");
        assert_eq!(trajectory.subject_kind(), EntityKind::Person);
        assert_eq!(trajectory.points()[0].status, EntityStatus::Normal);
    }
}
