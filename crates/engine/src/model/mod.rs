mod entity;
mod trajectory;
mod zone;

pub use entity::{
    EntityId, EntityKind, EntityStatus, EntityValidationError, Position, ReferenceFrame,
    SpatialEntity, Timestamp,
};
pub use trajectory::{Trajectory, TrajectoryError, TrajectoryPoint, TrajectorySpec};
pub use zone::{
    Polygon, Severity, Vertex, Zone, ZoneId, ZoneRule, ZoneSpec, ZoneValidationError,
};
