use std::cmp::Ordering;

use crate::model::EntityId;

use super::rendering::{pick_ray, position_to_point, world_to_screen, Projection, Vec2, Viewport};
use super::sync::RenderBinding;

pub const DEFAULT_PICK_RADIUS_PX: f64 = 10.0;
pub const DEFAULT_PICK_WORLD_RADIUS: f64 = 1.5;

/// Maps a pointer position to at most one bound entity. Pure: the result
/// depends only on the pointer, the camera and the current bindings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickingResolver {
    radius_px: f64,
    world_radius: f64,
}

impl Default for PickingResolver {
    fn default() -> Self {
        Self::new(DEFAULT_PICK_RADIUS_PX, DEFAULT_PICK_WORLD_RADIUS)
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    id: &'a EntityId,
    metric: f64,
}

impl<'a> Candidate<'a> {
    fn beats(&self, other: &Candidate<'_>) -> bool {
        match self.metric.partial_cmp(&other.metric) {
            Some(Ordering::Less) => true,
            Some(Ordering::Greater) => false,
            _ => self.id > other.id,
        }
    }
}

impl PickingResolver {
    pub fn new(radius_px: f64, world_radius: f64) -> Self {
        Self {
            radius_px: radius_px.max(0.0),
            world_radius: world_radius.max(0.0),
        }
    }

    pub fn radius_px(&self) -> f64 {
        self.radius_px
    }

    pub fn world_radius(&self) -> f64 {
        self.world_radius
    }

    /// Plan views pick the nearest marker within the hit radius in screen
    /// space; perspective views pick the nearest sphere along the cursor ray.
    /// Equal distances resolve to the largest id, which is the marker painted
    /// last, independent of iteration order.
    pub fn resolve<'a>(
        &self,
        pointer: Vec2,
        projection: &Projection,
        viewport: Viewport,
        bindings: impl IntoIterator<Item = (&'a EntityId, &'a RenderBinding)>,
    ) -> Option<EntityId> {
        if viewport.is_empty() || !pointer.x.is_finite() || !pointer.y.is_finite() {
            return None;
        }
        let ray = match projection {
            Projection::Plan(_) => None,
            Projection::Perspective(_) => Some(pick_ray(pointer, projection, viewport)?),
        };

        let mut best: Option<Candidate<'a>> = None;
        for (id, binding) in bindings {
            let metric = match &ray {
                None => {
                    let Some(screen) = world_to_screen(&binding.desc.position, projection, viewport)
                    else {
                        continue;
                    };
                    let distance = screen.distance(pointer);
                    let radius = self.radius_px.max(f64::from(binding.desc.style.half_size_px));
                    if distance > radius {
                        continue;
                    }
                    distance
                }
                Some(ray) => {
                    let center = position_to_point(&binding.desc.position);
                    let Some(t) = ray.intersect_sphere(center, self.world_radius) else {
                        continue;
                    };
                    t
                }
            };
            let candidate = Candidate { id, metric };
            if best.as_ref().map_or(true, |current| candidate.beats(current)) {
                best = Some(candidate);
            }
        }
        best.map(|candidate| candidate.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::rendering::{Camera2D, Camera3D, ObjectHandle, RenderObjectDesc};
    use crate::app::rendering::HandleArena;
    use crate::model::{EntityKind, Position};
    use crate::style::FALLBACK_STYLE;

    const VIEWPORT: Viewport = Viewport {
        width: 800,
        height: 600,
    };

    fn bindings(entries: &[(&str, Position)]) -> Vec<(EntityId, RenderBinding)> {
        let mut arena: HandleArena<()> = HandleArena::default();
        entries
            .iter()
            .map(|(id, position)| {
                let handle: ObjectHandle = arena.insert(());
                (
                    EntityId::new(*id),
                    RenderBinding {
                        handle,
                        desc: RenderObjectDesc {
                            entity_id: EntityId::new(*id),
                            kind: EntityKind::Device,
                            position: *position,
                            style: FALLBACK_STYLE,
                            selected: false,
                        },
                    },
                )
            })
            .collect()
    }

    fn plan() -> Projection {
        Projection::Plan(Camera2D {
            position: Vec2::default(),
            zoom: 1.0,
            pixels_per_unit: 10.0,
        })
    }

    fn pick(
        resolver: &PickingResolver,
        pointer: Vec2,
        entries: &[(EntityId, RenderBinding)],
    ) -> Option<EntityId> {
        resolver.resolve(
            pointer,
            &plan(),
            VIEWPORT,
            entries.iter().map(|(id, binding)| (id, binding)),
        )
    }

    #[test]
    fn picks_nearest_marker_within_radius() {
        let entries = bindings(&[
            ("far", Position::planar(0.0, 0.0)),
            ("near", Position::planar(1.0, 0.0)),
        ]);
        let resolver = PickingResolver::new(10.0, 1.0);
        // (1, 0) lands on pixel (410, 300).
        let hit = pick(&resolver, Vec2::new(408.0, 300.0), &entries);
        assert_eq!(hit, Some(EntityId::new("near")));
    }

    #[test]
    fn empty_space_picks_nothing() {
        let entries = bindings(&[("a", Position::planar(0.0, 0.0))]);
        let resolver = PickingResolver::new(6.0, 1.0);
        assert_eq!(pick(&resolver, Vec2::new(450.0, 350.0), &entries), None);
    }

    #[test]
    fn marker_half_size_widens_hit_radius() {
        let entries = bindings(&[("a", Position::planar(0.0, 0.0))]);
        let resolver = PickingResolver::new(0.0, 1.0);
        let edge = 400.0 + f64::from(FALLBACK_STYLE.half_size_px);
        assert!(pick(&resolver, Vec2::new(edge, 300.0), &entries).is_some());
        assert!(pick(&resolver, Vec2::new(edge + 1.0, 300.0), &entries).is_none());
    }

    #[test]
    fn ties_resolve_to_largest_id_in_any_order() {
        let forward = bindings(&[
            ("zeta", Position::planar(1.0, 0.0)),
            ("alpha", Position::planar(-1.0, 0.0)),
        ]);
        let mut reversed = forward.clone();
        reversed.reverse();
        let resolver = PickingResolver::new(20.0, 1.0);
        let pointer = Vec2::new(400.0, 300.0);

        assert_eq!(pick(&resolver, pointer, &forward), Some(EntityId::new("zeta")));
        assert_eq!(pick(&resolver, pointer, &reversed), Some(EntityId::new("zeta")));
    }

    #[test]
    fn perspective_pick_prefers_nearest_along_ray() {
        let camera = Camera3D::default();
        let projection = Projection::Perspective(camera);
        let eye = camera.eye();
        // Two markers on the line from the eye to the target; the one closer
        // to the eye wins.
        let near = Position::spatial(eye.x * 0.5, eye.y * 0.5, eye.z * 0.5);
        let entries = bindings(&[("a-target", Position::spatial(0.0, 0.0, 0.0)), ("b-near", near)]);
        let resolver = PickingResolver::new(10.0, 1.0);

        let hit = resolver.resolve(
            Vec2::new(400.0, 300.0),
            &projection,
            VIEWPORT,
            entries.iter().map(|(id, binding)| (id, binding)),
        );
        assert_eq!(hit, Some(EntityId::new("b-near")));
    }

    #[test]
    fn empty_viewport_never_picks() {
        let entries = bindings(&[("a", Position::planar(0.0, 0.0))]);
        let resolver = PickingResolver::default();
        let hit = resolver.resolve(
            Vec2::new(0.0, 0.0),
            &plan(),
            Viewport {
                width: 0,
                height: 0,
            },
            entries.iter().map(|(id, binding)| (id, binding)),
        );
        assert_eq!(hit, None);
    }
}
