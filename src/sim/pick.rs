//! Pointer picking and the rendering port
//!
//! The tricky part here is turning a 2D pointer position into "which target
//! did the player whack": unproject the pointer through the camera into a
//! world ray, then intersect it against each target's upright body. Nearest
//! intersection wins.

use glam::{Mat4, Vec2, Vec3};

use super::targets::{TargetId, TargetPhase};
use crate::consts::{TARGET_HEIGHT, TARGET_RADIUS};
use crate::tuning::TargetKind;

/// Animated placement of a target, pushed to the renderer every tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetPose {
    /// Height of the body center
    pub height: f32,
    /// Vertical scale (1.0 = full, shrinks while squashed)
    pub squash: f32,
}

/// Hittable volume of a target: an upright capped cylinder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetBody {
    pub center: Vec3,
    pub radius: f32,
    pub half_height: f32,
}

impl TargetBody {
    /// Body of a target standing at `slot` with the given pose
    pub fn at(slot: Vec3, pose: TargetPose) -> Self {
        Self {
            center: Vec3::new(slot.x, pose.height, slot.z),
            radius: TARGET_RADIUS,
            half_height: TARGET_HEIGHT * 0.5 * pose.squash,
        }
    }
}

/// A world-space ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction
    pub dir: Vec3,
}

/// Hit-testing primitive supplied by the host geometry
pub trait HitTest {
    /// Distance along the pick ray to `body`, if the pointer at `point`
    /// (normalized device coordinates, -1..1) intersects it
    fn intersect(&self, point: Vec2, body: &TargetBody) -> Option<f32>;
}

/// Perspective camera looking down at the desk
#[derive(Debug, Clone)]
pub struct PickCamera {
    pub eye: Vec3,
    pub look_at: Vec3,
    /// Vertical field of view (radians)
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for PickCamera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 5.0, 4.0),
            look_at: Vec3::ZERO,
            fov_y: 60f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl PickCamera {
    pub fn set_aspect(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.aspect = width / height;
        }
    }

    pub fn view_proj(&self) -> Mat4 {
        let proj = Mat4::perspective_rh_gl(self.fov_y, self.aspect, self.near, self.far);
        let view = Mat4::look_at_rh(self.eye, self.look_at, Vec3::Y);
        proj * view
    }

    /// World ray through a point in normalized device coordinates
    pub fn ray(&self, ndc: Vec2) -> Ray {
        let inv = self.view_proj().inverse();
        let near = inv.project_point3(ndc.extend(-1.0));
        let far = inv.project_point3(ndc.extend(1.0));
        Ray {
            origin: near,
            dir: (far - near).normalize_or_zero(),
        }
    }

    /// Project a world point to normalized device coordinates
    pub fn project(&self, world: Vec3) -> Vec2 {
        self.view_proj().project_point3(world).truncate()
    }
}

impl HitTest for PickCamera {
    fn intersect(&self, point: Vec2, body: &TargetBody) -> Option<f32> {
        ray_cylinder(&self.ray(point), body)
    }
}

/// Nearest non-negative intersection of a ray with an upright capped cylinder
pub fn ray_cylinder(ray: &Ray, body: &TargetBody) -> Option<f32> {
    const EPS: f32 = 1e-6;

    let o = ray.origin - body.center;
    let d = ray.dir;
    let r2 = body.radius * body.radius;
    let mut best: Option<f32> = None;
    let mut consider = |t: f32| {
        if t >= 0.0 && best.is_none_or(|b| t < b) {
            best = Some(t);
        }
    };

    // Side wall (infinite cylinder clipped to the body height)
    let a = d.x * d.x + d.z * d.z;
    if a > EPS {
        let b = 2.0 * (o.x * d.x + o.z * d.z);
        let c = o.x * o.x + o.z * o.z - r2;
        let disc = b * b - 4.0 * a * c;
        if disc >= 0.0 {
            let sq = disc.sqrt();
            for t in [(-b - sq) / (2.0 * a), (-b + sq) / (2.0 * a)] {
                if (o.y + t * d.y).abs() <= body.half_height {
                    consider(t);
                }
            }
        }
    }

    // Caps
    if d.y.abs() > EPS {
        for cap in [body.half_height, -body.half_height] {
            let t = (cap - o.y) / d.y;
            let x = o.x + t * d.x;
            let z = o.z + t * d.z;
            if x * x + z * z <= r2 {
                consider(t);
            }
        }
    }

    best
}

/// Rendering port: the host draws targets, the simulation only tells it what changed
pub trait TargetView {
    /// A target appeared in `slot`
    fn show(&mut self, id: TargetId, slot: Vec3, kind: &TargetKind, is_problem: bool);
    /// New pose for this frame
    fn pose(&mut self, id: TargetId, phase: TargetPhase, pose: TargetPose);
    /// The target was whacked (flash good/bad)
    fn hit(&mut self, _id: TargetId, _is_problem: bool) {}
    fn remove(&mut self, id: TargetId);
}

/// Renderer that draws nothing (headless runs, tests)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullView;

impl TargetView for NullView {
    fn show(&mut self, _id: TargetId, _slot: Vec3, _kind: &TargetKind, _is_problem: bool) {}
    fn pose(&mut self, _id: TargetId, _phase: TargetPhase, _pose: TargetPose) {}
    fn remove(&mut self, _id: TargetId) {}
}
