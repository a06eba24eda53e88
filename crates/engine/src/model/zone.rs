use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const BOUNDARY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub String);

impl ZoneId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
}

impl Vertex {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Severity(u8);

impl Severity {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 3;

    pub fn new(level: u8) -> Result<Self, ZoneValidationError> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(ZoneValidationError::SeverityOutOfRange { level })
        }
    }

    pub fn level(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Severity {
    type Error = ZoneValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Severity::new(value)
    }
}

impl From<Severity> for u8 {
    fn from(value: Severity) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneRule {
    #[serde(default, alias = "alertOnEnter")]
    pub alert_on_enter: bool,
    #[serde(
        default,
        alias = "dwellThresholdSeconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub dwell_threshold_seconds: Option<f64>,
}

/// A validated simple polygon. The ring is implicitly closed and never
/// stores a repeated consecutive vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Vertex>,
}

impl Polygon {
    pub fn new(mut vertices: Vec<Vertex>) -> Result<Self, ZoneValidationError> {
        if let Some(index) = vertices
            .iter()
            .position(|vertex| !vertex.x.is_finite() || !vertex.y.is_finite())
        {
            return Err(ZoneValidationError::NonFiniteVertex { index });
        }
        if vertices.len() > 3 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        if vertices.len() < 3 {
            return Err(ZoneValidationError::TooFewVertices {
                count: vertices.len(),
            });
        }
        for index in 0..vertices.len() {
            let next = (index + 1) % vertices.len();
            if vertices[index] == vertices[next] {
                return Err(ZoneValidationError::RepeatedVertex { index: next });
            }
        }
        if let Some((first, second)) = find_self_intersection(&vertices) {
            return Err(ZoneValidationError::SelfIntersecting {
                first_edge: first,
                second_edge: second,
            });
        }
        Ok(Self { vertices })
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> impl Iterator<Item = (Vertex, Vertex)> + '_ {
        let count = self.vertices.len();
        (0..count).map(move |index| (self.vertices[index], self.vertices[(index + 1) % count]))
    }

    /// Even-odd ray casting; points on an edge or vertex count as inside.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let point = Vertex::new(x, y);
        if self
            .edges()
            .any(|(a, b)| point_on_segment(point, a, b, BOUNDARY_EPSILON))
        {
            return true;
        }

        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > y) != (b.y > y) {
                let crossing_x = a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y);
                if x < crossing_x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    pub fn bounds(&self) -> (Vertex, Vertex) {
        let mut min = self.vertices[0];
        let mut max = self.vertices[0];
        for vertex in &self.vertices[1..] {
            min.x = min.x.min(vertex.x);
            min.y = min.y.min(vertex.y);
            max.x = max.x.max(vertex.x);
            max.y = max.y.max(vertex.y);
        }
        (min, max)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub boundary: Polygon,
    pub severity: Severity,
    pub rule: ZoneRule,
}

impl Zone {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        boundary: Vec<Vertex>,
        severity_level: u8,
        rule: ZoneRule,
    ) -> Result<Self, ZoneValidationError> {
        ZoneSpec {
            id: ZoneId(id.into()),
            name: name.into(),
            boundary,
            severity_level,
            rule,
        }
        .validate()
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.boundary.contains(x, y)
    }
}

/// Unvalidated zone record as supplied by the zone configuration store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSpec {
    pub id: ZoneId,
    #[serde(default)]
    pub name: String,
    pub boundary: Vec<Vertex>,
    #[serde(alias = "severityLevel")]
    pub severity_level: u8,
    #[serde(default)]
    pub rule: ZoneRule,
}

impl ZoneSpec {
    pub fn validate(self) -> Result<Zone, ZoneValidationError> {
        if self.id.0.trim().is_empty() {
            return Err(ZoneValidationError::EmptyId);
        }
        let severity = Severity::new(self.severity_level)?;
        if let Some(threshold) = self.rule.dwell_threshold_seconds {
            if !threshold.is_finite() || threshold <= 0.0 {
                return Err(ZoneValidationError::InvalidDwellThreshold { threshold });
            }
        }
        let boundary = Polygon::new(self.boundary)?;
        Ok(Zone {
            id: self.id,
            name: self.name,
            boundary,
            severity,
            rule: self.rule,
        })
    }
}

impl From<&Zone> for ZoneSpec {
    fn from(zone: &Zone) -> Self {
        Self {
            id: zone.id.clone(),
            name: zone.name.clone(),
            boundary: zone.boundary.vertices().to_vec(),
            severity_level: zone.severity.level(),
            rule: zone.rule,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ZoneValidationError {
    #[error("zone id must not be empty")]
    EmptyId,
    #[error("zone boundary needs at least 3 distinct vertices, got {count}")]
    TooFewVertices { count: usize },
    #[error("zone boundary repeats the vertex before index {index}")]
    RepeatedVertex { index: usize },
    #[error("zone boundary vertex {index} is not finite")]
    NonFiniteVertex { index: usize },
    #[error("zone boundary edges {first_edge} and {second_edge} intersect")]
    SelfIntersecting {
        first_edge: usize,
        second_edge: usize,
    },
    #[error("zone severity level {level} is outside 1..=3")]
    SeverityOutOfRange { level: u8 },
    #[error("dwell threshold must be a positive number of seconds, got {threshold}")]
    InvalidDwellThreshold { threshold: f64 },
    #[error("zone {id} is registered twice")]
    DuplicateId { id: ZoneId },
}

fn cross(o: Vertex, a: Vertex, b: Vertex) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn point_on_segment(p: Vertex, a: Vertex, b: Vertex, epsilon: f64) -> bool {
    let length = ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
    if cross(a, b, p).abs() > epsilon * length.max(1.0) {
        return false;
    }
    p.x >= a.x.min(b.x) - epsilon
        && p.x <= a.x.max(b.x) + epsilon
        && p.y >= a.y.min(b.y) - epsilon
        && p.y <= a.y.max(b.y) + epsilon
}

fn segments_intersect(a1: Vertex, a2: Vertex, b1: Vertex, b2: Vertex) -> bool {
    let d1 = cross(b1, b2, a1);
    let d2 = cross(b1, b2, a2);
    let d3 = cross(a1, a2, b1);
    let d4 = cross(a1, a2, b2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && point_on_segment(a1, b1, b2, 0.0))
        || (d2 == 0.0 && point_on_segment(a2, b1, b2, 0.0))
        || (d3 == 0.0 && point_on_segment(b1, a1, a2, 0.0))
        || (d4 == 0.0 && point_on_segment(b2, a1, a2, 0.0))
}

fn find_self_intersection(vertices: &[Vertex]) -> Option<(usize, usize)> {
    let count = vertices.len();
    for i in 0..count {
        let a1 = vertices[i];
        let a2 = vertices[(i + 1) % count];
        for j in (i + 1)..count {
            let adjacent = j == i + 1 || (i == 0 && j == count - 1);
            let b1 = vertices[j];
            let b2 = vertices[(j + 1) % count];
            if adjacent {
                // Neighbouring edges share one vertex; they only conflict when
                // they fold back over each other.
                let shared = if j == i + 1 { a2 } else { a1 };
                let (far_a, far_b) = if j == i + 1 { (a1, b2) } else { (a2, b1) };
                if cross(shared, far_a, far_b) == 0.0
                    && (point_on_segment(far_a, shared, far_b, 0.0)
                        || point_on_segment(far_b, shared, far_a, 0.0))
                {
                    return Some((i, j));
                }
                continue;
            }
            if segments_intersect(a1, a2, b1, b2) {
                return Some((i, j));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Polygon {
        Polygon::new(vec![
            Vertex::new(0.0, 0.0),
            Vertex::new(10.0, 0.0),
            Vertex::new(10.0, 10.0),
            Vertex::new(0.0, 10.0),
        ])
        .expect("square")
    }

    #[test]
    fn interior_and_exterior_points() {
        let polygon = square();
        assert!(polygon.contains(5.0, 5.0));
        assert!(!polygon.contains(20.0, 20.0));
        assert!(!polygon.contains(-0.5, 5.0));
    }

    #[test]
    fn boundary_points_count_as_inside() {
        let polygon = square();
        assert!(polygon.contains(0.0, 5.0));
        assert!(polygon.contains(10.0, 10.0));
        assert!(polygon.contains(5.0, 0.0));
        assert!(polygon.contains(10.0, 3.0));
    }

    #[test]
    fn concave_polygon_notch_is_outside() {
        let polygon = Polygon::new(vec![
            Vertex::new(0.0, 0.0),
            Vertex::new(10.0, 0.0),
            Vertex::new(10.0, 10.0),
            Vertex::new(5.0, 4.0),
            Vertex::new(0.0, 10.0),
        ])
        .expect("concave");
        assert!(polygon.contains(5.0, 2.0));
        assert!(!polygon.contains(5.0, 8.0));
    }

    #[test]
    fn degenerate_boundaries_are_rejected() {
        assert_eq!(
            Polygon::new(vec![Vertex::new(0.0, 0.0), Vertex::new(1.0, 0.0)]),
            Err(ZoneValidationError::TooFewVertices { count: 2 })
        );
        assert!(matches!(
            Polygon::new(vec![
                Vertex::new(0.0, 0.0),
                Vertex::new(0.0, 0.0),
                Vertex::new(1.0, 0.0),
                Vertex::new(1.0, 1.0),
            ]),
            Err(ZoneValidationError::RepeatedVertex { .. })
        ));
        assert!(matches!(
            Polygon::new(vec![
                Vertex::new(0.0, f64::NAN),
                Vertex::new(1.0, 0.0),
                Vertex::new(1.0, 1.0),
            ]),
            Err(ZoneValidationError::NonFiniteVertex { index: 0 })
        ));
    }

    #[test]
    fn bow_tie_is_rejected_as_self_intersecting() {
        let result = Polygon::new(vec![
            Vertex::new(0.0, 0.0),
            Vertex::new(10.0, 10.0),
            Vertex::new(10.0, 0.0),
            Vertex::new(0.0, 10.0),
        ]);
        assert!(matches!(
            result,
            Err(ZoneValidationError::SelfIntersecting { .. })
        ));
    }

    #[test]
    fn explicitly_closed_ring_drops_the_closing_vertex() {
        let polygon = Polygon::new(vec![
            Vertex::new(0.0, 0.0),
            Vertex::new(4.0, 0.0),
            Vertex::new(4.0, 4.0),
            Vertex::new(0.0, 0.0),
        ])
        .expect("closed ring");
        assert_eq!(polygon.vertices().len(), 3);

        // Closing a two-point ring leaves a degenerate edge, not a triangle.
        assert!(matches!(
            Polygon::new(vec![
                Vertex::new(0.0, 0.0),
                Vertex::new(4.0, 0.0),
                Vertex::new(0.0, 0.0),
            ]),
            Err(ZoneValidationError::RepeatedVertex { index: 0 })
        ));
    }

    #[test]
    fn zone_spec_validation_checks_severity_and_dwell() {
        let boundary = square().vertices().to_vec();
        assert!(matches!(
            Zone::new("z", "Z", boundary.clone(), 4, ZoneRule::default()),
            Err(ZoneValidationError::SeverityOutOfRange { level: 4 })
        ));
        assert!(matches!(
            Zone::new(
                "z",
                "Z",
                boundary.clone(),
                2,
                ZoneRule {
                    alert_on_enter: true,
                    dwell_threshold_seconds: Some(0.0),
                }
            ),
            Err(ZoneValidationError::InvalidDwellThreshold { .. })
        ));
        let zone = Zone::new("z", "Z", boundary, 3, ZoneRule::default()).expect("zone");
        assert_eq!(zone.severity.level(), 3);
    }

    #[test]
    fn severity_decodes_with_range_check() {
        let ok: Severity = serde_json::from_str("2").expect("severity");
        assert_eq!(ok.level(), 2);
        assert!(serde_json::from_str::<Severity>("0").is_err());
    }
}
