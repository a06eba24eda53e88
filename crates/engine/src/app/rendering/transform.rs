use nalgebra::{Isometry3, Perspective3, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::model::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn aspect(&self) -> f64 {
        self.width.max(1) as f64 / self.height.max(1) as f64
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vec2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

pub const CAMERA_ZOOM_DEFAULT: f64 = 1.0;
pub const CAMERA_ZOOM_MIN: f64 = 0.05;
pub const CAMERA_ZOOM_MAX: f64 = 40.0;
pub const CAMERA_ZOOM_STEP_FACTOR: f64 = 1.15;
pub const DEFAULT_PIXELS_PER_UNIT: f64 = 8.0;

/// Top-down chart camera. World +y points up on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera2D {
    pub position: Vec2,
    pub zoom: f64,
    pub pixels_per_unit: f64,
}

impl Default for Camera2D {
    fn default() -> Self {
        Self {
            position: Vec2::default(),
            zoom: CAMERA_ZOOM_DEFAULT,
            pixels_per_unit: DEFAULT_PIXELS_PER_UNIT,
        }
    }
}

impl Camera2D {
    pub fn effective_zoom(&self) -> f64 {
        clamp_camera_zoom(self.zoom)
    }

    pub fn set_zoom_clamped(&mut self, zoom: f64) {
        self.zoom = clamp_camera_zoom(zoom);
    }

    pub fn apply_zoom_steps(&mut self, steps: i32) {
        if steps == 0 {
            return;
        }
        let target_zoom = self.effective_zoom() * CAMERA_ZOOM_STEP_FACTOR.powi(steps);
        self.set_zoom_clamped(target_zoom);
    }

    pub fn scale(&self) -> f64 {
        self.pixels_per_unit * self.effective_zoom()
    }
}

fn clamp_camera_zoom(zoom: f64) -> f64 {
    if !zoom.is_finite() {
        return CAMERA_ZOOM_DEFAULT;
    }
    zoom.clamp(CAMERA_ZOOM_MIN, CAMERA_ZOOM_MAX)
}

const PITCH_LIMIT_RADIANS: f64 = 1.5;
const MIN_ORBIT_DISTANCE: f64 = 1.0;

/// Orbit camera looking at `target` from `distance` away; world +z is up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera3D {
    pub target: Vec2,
    pub target_z: f64,
    pub yaw_radians: f64,
    pub pitch_radians: f64,
    pub distance: f64,
    pub fov_y_radians: f64,
    pub near: f64,
    pub far: f64,
}

impl Default for Camera3D {
    fn default() -> Self {
        Self {
            target: Vec2::default(),
            target_z: 0.0,
            yaw_radians: -std::f64::consts::FRAC_PI_2,
            pitch_radians: 0.9,
            distance: 120.0,
            fov_y_radians: std::f64::consts::FRAC_PI_4,
            near: 0.1,
            far: 5000.0,
        }
    }
}

impl Camera3D {
    pub fn eye(&self) -> Point3<f64> {
        let pitch = self.pitch_radians.clamp(-PITCH_LIMIT_RADIANS, PITCH_LIMIT_RADIANS);
        let distance = self.distance.max(MIN_ORBIT_DISTANCE);
        Point3::new(
            self.target.x + distance * pitch.cos() * self.yaw_radians.cos(),
            self.target.y + distance * pitch.cos() * self.yaw_radians.sin(),
            self.target_z + distance * pitch.sin(),
        )
    }

    fn view(&self) -> Isometry3<f64> {
        let target = Point3::new(self.target.x, self.target.y, self.target_z);
        Isometry3::look_at_rh(&self.eye(), &target, &Vector3::z())
    }

    fn perspective(&self, viewport: Viewport) -> Perspective3<f64> {
        Perspective3::new(viewport.aspect(), self.fov_y_radians, self.near, self.far)
    }

    pub fn orbit(&mut self, yaw_delta: f64, pitch_delta: f64) {
        self.yaw_radians += yaw_delta;
        self.pitch_radians =
            (self.pitch_radians + pitch_delta).clamp(-PITCH_LIMIT_RADIANS, PITCH_LIMIT_RADIANS);
    }

    pub fn apply_zoom_steps(&mut self, steps: i32) {
        if steps == 0 {
            return;
        }
        let scaled = self.distance / CAMERA_ZOOM_STEP_FACTOR.powi(steps);
        self.distance = if scaled.is_finite() {
            scaled.clamp(MIN_ORBIT_DISTANCE, self.far * 0.5)
        } else {
            Camera3D::default().distance
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Plan(Camera2D),
    Perspective(Camera3D),
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Plan(Camera2D::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f64>,
    pub direction: Vector3<f64>,
}

impl Ray {
    /// Smallest non-negative ray parameter hitting the sphere, if any.
    pub fn intersect_sphere(&self, center: Point3<f64>, radius: f64) -> Option<f64> {
        let oc = self.origin - center;
        let b = oc.dot(&self.direction);
        let c = oc.dot(&oc) - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();
        let near = -b - root;
        if near >= 0.0 {
            return Some(near);
        }
        let far = -b + root;
        (far >= 0.0).then_some(far)
    }
}

pub fn position_to_point(position: &Position) -> Point3<f64> {
    Point3::new(position.x, position.y, position.z_or_ground())
}

/// Screen pixel coordinates of a world position, or `None` when it projects
/// behind the camera.
pub fn world_to_screen(
    position: &Position,
    projection: &Projection,
    viewport: Viewport,
) -> Option<Vec2> {
    match projection {
        Projection::Plan(camera) => {
            let scale = camera.scale();
            Some(Vec2 {
                x: (position.x - camera.position.x) * scale + viewport.width as f64 * 0.5,
                y: viewport.height as f64 * 0.5 - (position.y - camera.position.y) * scale,
            })
        }
        Projection::Perspective(camera) => {
            let view_point = camera.view().transform_point(&position_to_point(position));
            if view_point.z >= -camera.near {
                return None;
            }
            let ndc = camera.perspective(viewport).project_point(&view_point);
            Some(ndc_to_screen(Vec2::new(ndc.x, ndc.y), viewport))
        }
    }
}

/// Inverse of the plan projection. Perspective views intersect the cursor
/// ray with the ground plane (z = 0).
pub fn screen_to_world(screen: Vec2, projection: &Projection, viewport: Viewport) -> Option<Vec2> {
    match projection {
        Projection::Plan(camera) => {
            let scale = camera.scale();
            Some(Vec2 {
                x: (screen.x - viewport.width as f64 * 0.5) / scale + camera.position.x,
                y: (viewport.height as f64 * 0.5 - screen.y) / scale + camera.position.y,
            })
        }
        Projection::Perspective(_) => {
            let ray = pick_ray(screen, projection, viewport)?;
            if ray.direction.z.abs() < f64::EPSILON {
                return None;
            }
            let t = -ray.origin.z / ray.direction.z;
            (t >= 0.0).then(|| {
                let hit = ray.origin + ray.direction * t;
                Vec2::new(hit.x, hit.y)
            })
        }
    }
}

fn screen_to_ndc(screen: Vec2, viewport: Viewport) -> Vec2 {
    let width = viewport.width.max(1) as f64;
    let height = viewport.height.max(1) as f64;
    Vec2 {
        x: 2.0 * screen.x / width - 1.0,
        y: 1.0 - 2.0 * screen.y / height,
    }
}

fn ndc_to_screen(ndc: Vec2, viewport: Viewport) -> Vec2 {
    Vec2 {
        x: (ndc.x + 1.0) * 0.5 * viewport.width as f64,
        y: (1.0 - ndc.y) * 0.5 * viewport.height as f64,
    }
}

/// World-space ray under a screen pixel for the perspective projection.
pub fn pick_ray(screen: Vec2, projection: &Projection, viewport: Viewport) -> Option<Ray> {
    let Projection::Perspective(camera) = projection else {
        return None;
    };
    let ndc = screen_to_ndc(screen, viewport);
    let perspective = camera.perspective(viewport);
    let view = camera.view();
    let near = view
        .inverse_transform_point(&perspective.unproject_point(&Point3::new(ndc.x, ndc.y, -1.0)));
    let far = view
        .inverse_transform_point(&perspective.unproject_point(&Point3::new(ndc.x, ndc.y, 1.0)));
    let direction = far - near;
    let length = direction.norm();
    if !length.is_finite() || length <= f64::EPSILON {
        return None;
    }
    Some(Ray {
        origin: near,
        direction: direction / length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Viewport = Viewport {
        width: 800,
        height: 600,
    };

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn origin_maps_to_viewport_center() {
        let projection = Projection::Plan(Camera2D::default());
        let screen = world_to_screen(&Position::planar(0.0, 0.0), &projection, VIEWPORT)
            .expect("plan projection");
        assert!(approx(screen.x, 400.0));
        assert!(approx(screen.y, 300.0));
    }

    #[test]
    fn camera_offset_shifts_screen_position() {
        let projection = Projection::Plan(Camera2D {
            position: Vec2::new(10.0, -5.0),
            zoom: 1.0,
            pixels_per_unit: 10.0,
        });
        let screen = world_to_screen(&Position::planar(12.0, -4.0), &projection, VIEWPORT)
            .expect("plan projection");
        assert!(approx(screen.x, 420.0));
        assert!(approx(screen.y, 290.0));
    }

    #[test]
    fn plan_screen_to_world_inverts_projection() {
        let projection = Projection::Plan(Camera2D {
            position: Vec2::new(3.0, 7.0),
            zoom: 2.5,
            pixels_per_unit: 8.0,
        });
        let world = Position::planar(-14.25, 31.5);
        let screen = world_to_screen(&world, &projection, VIEWPORT).expect("screen");
        let back = screen_to_world(screen, &projection, VIEWPORT).expect("world");
        assert!(approx(back.x, world.x));
        assert!(approx(back.y, world.y));
    }

    #[test]
    fn zoom_is_clamped_and_non_finite_resets() {
        let mut camera = Camera2D::default();
        camera.apply_zoom_steps(500);
        assert!(approx(camera.zoom, CAMERA_ZOOM_MAX));
        camera.set_zoom_clamped(f64::NAN);
        assert!(approx(camera.zoom, CAMERA_ZOOM_DEFAULT));
    }

    #[test]
    fn perspective_center_ray_hits_target() {
        let camera = Camera3D {
            target: Vec2::new(5.0, 5.0),
            ..Camera3D::default()
        };
        let projection = Projection::Perspective(camera);
        let ray = pick_ray(Vec2::new(400.0, 300.0), &projection, VIEWPORT).expect("ray");
        let hit = ray.intersect_sphere(Point3::new(5.0, 5.0, 0.0), 0.5);
        assert!(hit.is_some());

        let ground = screen_to_world(Vec2::new(400.0, 300.0), &projection, VIEWPORT)
            .expect("ground hit");
        assert!((ground.x - 5.0).abs() < 1e-3);
        assert!((ground.y - 5.0).abs() < 1e-3);
    }

    #[test]
    fn perspective_projection_round_trips_through_ray() {
        let projection = Projection::Perspective(Camera3D::default());
        let target = Position::spatial(12.0, -6.0, 3.0);
        let screen = world_to_screen(&target, &projection, VIEWPORT).expect("in front");
        let ray = pick_ray(screen, &projection, VIEWPORT).expect("ray");
        assert!(ray
            .intersect_sphere(position_to_point(&target), 0.05)
            .is_some());
    }

    #[test]
    fn point_behind_camera_does_not_project() {
        let camera = Camera3D::default();
        let eye = camera.eye();
        let behind = Position::spatial(
            eye.x + (eye.x - camera.target.x),
            eye.y + (eye.y - camera.target.y),
            eye.z + (eye.z - camera.target_z),
        );
        assert!(world_to_screen(&behind, &Projection::Perspective(camera), VIEWPORT).is_none());
    }

    #[test]
    fn ray_sphere_prefers_near_root_and_rejects_behind() {
        let ray = Ray {
            origin: Point3::new(0.0, 0.0, 0.0),
            direction: Vector3::new(1.0, 0.0, 0.0),
        };
        let t = ray
            .intersect_sphere(Point3::new(10.0, 0.0, 0.0), 1.0)
            .expect("hit");
        assert!(approx(t, 9.0));
        assert!(ray
            .intersect_sphere(Point3::new(-10.0, 0.0, 0.0), 1.0)
            .is_none());
        let inside = ray
            .intersect_sphere(Point3::new(0.5, 0.0, 0.0), 1.0)
            .expect("origin inside sphere");
        assert!(approx(inside, 1.5));
    }
}
