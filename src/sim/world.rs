//! In-memory reference physics world
//!
//! A small, deterministic rigid body integrator implementing
//! [`PhysicsWorld`]. It covers what the course needs: dynamic balls
//! rolling over fixed and kinematic cuboids, with restitution and rolling
//! friction, plus slab ray casting. Bodies live in a `BTreeMap` so iteration
//! order (and therefore every step) is stable.

use std::collections::BTreeMap;
use std::f32::consts::PI;

use glam::{Quat, Vec3};

use super::physics::{BodyDesc, BodyHandle, BodyKind, PhysicsWorld, Ray, RayHit, Shape};
use crate::consts::GRAVITY;
use crate::error::{Error, Result};

/// Approach speed below which contacts do not bounce (prevents resting jitter)
const BOUNCE_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone)]
struct Body {
    desc: BodyDesc,
    translation: Vec3,
    rotation: Quat,
    linvel: Vec3,
    angvel: Vec3,
    next_translation: Option<Vec3>,
    next_rotation: Option<Quat>,
    inv_mass: f32,
    inv_inertia: f32,
}

impl Body {
    fn new(desc: BodyDesc) -> Self {
        let (mass, inertia) = match desc.shape {
            Shape::Ball { radius } => {
                let m = 4.0 / 3.0 * PI * radius.powi(3);
                (m, 0.4 * m * radius * radius)
            }
            Shape::Cuboid { half_extents: h } => {
                let m = 8.0 * h.x * h.y * h.z;
                (m, 2.0 / 9.0 * m * h.length_squared())
            }
        };
        let (inv_mass, inv_inertia) = if desc.kind == BodyKind::Dynamic && mass > 0.0 {
            (1.0 / mass, 1.0 / inertia)
        } else {
            (0.0, 0.0)
        };
        Self {
            translation: desc.translation,
            rotation: desc.rotation,
            linvel: Vec3::ZERO,
            angvel: Vec3::ZERO,
            next_translation: None,
            next_rotation: None,
            inv_mass,
            inv_inertia,
            desc,
        }
    }
}

/// Snapshot of a non-dynamic collider taken before contact resolution
#[derive(Debug, Clone, Copy)]
struct Obstruction {
    translation: Vec3,
    rotation: Quat,
    half_extents: Vec3,
    linvel: Vec3,
    angvel: Vec3,
    restitution: f32,
    friction: f32,
}

/// Reference physics world
#[derive(Debug, Clone)]
pub struct SimWorld {
    pub gravity: Vec3,
    bodies: BTreeMap<BodyHandle, Body>,
    next_id: u32,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld {
    pub fn new() -> Self {
        Self {
            gravity: GRAVITY,
            bodies: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn contains(&self, body: BodyHandle) -> bool {
        self.bodies.contains_key(&body)
    }

    fn body(&self, handle: BodyHandle) -> Result<&Body> {
        self.bodies.get(&handle).ok_or(Error::MissingBody(handle))
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut Body> {
        self.bodies.get_mut(&handle).ok_or(Error::MissingBody(handle))
    }

    fn resolve_kinematic(body: &mut Body, dt: f32) {
        let target_t = body.next_translation.take().unwrap_or(body.translation);
        let target_r = body.next_rotation.take().unwrap_or(body.rotation);

        body.linvel = (target_t - body.translation) / dt;
        let mut delta = target_r * body.rotation.inverse();
        // Shortest arc
        if delta.w < 0.0 {
            delta = -delta;
        }
        body.angvel = delta.to_scaled_axis() / dt;

        body.translation = target_t;
        body.rotation = target_r.normalize();
    }

    fn integrate_dynamic(body: &mut Body, gravity: Vec3, dt: f32) {
        body.linvel += gravity * dt;
        body.linvel *= 1.0 / (1.0 + dt * body.desc.linear_damping);
        body.angvel *= 1.0 / (1.0 + dt * body.desc.angular_damping);

        body.translation += body.linvel * dt;
        body.rotation = (Quat::from_scaled_axis(body.angvel * dt) * body.rotation).normalize();
    }

    /// Push a ball out of a cuboid and apply restitution and rolling friction
    fn resolve_ball_contact(ball: &mut Body, radius: f32, other: &Obstruction) {
        let inv_rot = other.rotation.inverse();
        let local = inv_rot * (ball.translation - other.translation);
        let h = other.half_extents;
        let clamped = local.clamp(-h, h);

        let (normal_local, penetration) = if local != clamped {
            let d = local - clamped;
            let dist = d.length();
            if dist >= radius {
                return;
            }
            let n = if dist > f32::EPSILON { d / dist } else { Vec3::Y };
            (n, radius - dist)
        } else {
            // Center inside the box: leave through the nearest face
            let gap = h - local.abs();
            let (axis, depth) = if gap.x <= gap.y && gap.x <= gap.z {
                (Vec3::X * local.x.signum(), gap.x)
            } else if gap.y <= gap.z {
                (Vec3::Y * local.y.signum(), gap.y)
            } else {
                (Vec3::Z * local.z.signum(), gap.z)
            };
            (axis, depth + radius)
        };

        let normal = other.rotation * normal_local;
        ball.translation += normal * penetration;

        let contact = ball.translation - normal * radius;
        let surface_vel = other.linvel + other.angvel.cross(contact - other.translation);

        let rel = ball.linvel - surface_vel;
        let vn = rel.dot(normal);
        let mut normal_impulse = 0.0;
        if vn < 0.0 {
            let e = if -vn > BOUNCE_THRESHOLD {
                ball.desc.restitution.max(other.restitution)
            } else {
                0.0
            };
            normal_impulse = -(1.0 + e) * vn;
            ball.linvel += normal * normal_impulse;
        }

        let mu = 0.5 * (ball.desc.friction + other.friction);
        if mu <= 0.0 || normal_impulse <= 0.0 {
            return;
        }

        // Coulomb-capped impulse toward rolling without slipping (solid sphere)
        let lever = -normal * radius;
        let slip = (ball.linvel - surface_vel) + ball.angvel.cross(lever);
        let slip_t = slip - normal * slip.dot(normal);
        let slip_speed = slip_t.length();
        if slip_speed <= f32::EPSILON {
            return;
        }
        let magnitude = (2.0 / 7.0 * slip_speed).min(mu * normal_impulse);
        let jt = slip_t / slip_speed * magnitude;
        ball.linvel -= jt;
        ball.angvel -= lever.cross(jt) * (2.5 / (radius * radius));
    }
}

fn ray_cuboid(ray: &Ray, translation: Vec3, rotation: Quat, h: Vec3, solid: bool) -> Option<f32> {
    let inv_rot = rotation.inverse();
    let o = inv_rot * (ray.origin - translation);
    let d = inv_rot * ray.dir;

    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;
    for axis in 0..3 {
        let (oa, da, ha) = (o[axis], d[axis], h[axis]);
        if da.abs() < f32::EPSILON {
            if oa.abs() > ha {
                return None;
            }
            continue;
        }
        let t1 = (-ha - oa) / da;
        let t2 = (ha - oa) / da;
        t_min = t_min.max(t1.min(t2));
        t_max = t_max.min(t1.max(t2));
    }

    if t_max < t_min || t_max < 0.0 {
        return None;
    }
    if t_min < 0.0 {
        // Origin inside
        return Some(if solid { 0.0 } else { t_max });
    }
    Some(t_min)
}

fn ray_ball(ray: &Ray, center: Vec3, radius: f32, solid: bool) -> Option<f32> {
    let oc = ray.origin - center;
    let a = ray.dir.length_squared();
    if a <= f32::EPSILON {
        return None;
    }
    let b = oc.dot(ray.dir);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - a * c;
    if c <= 0.0 {
        return Some(if solid { 0.0 } else { (-b + disc.max(0.0).sqrt()) / a });
    }
    if disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()) / a;
    (t >= 0.0).then_some(t)
}

impl PhysicsWorld for SimWorld {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.next_id);
        self.next_id += 1;
        log::debug!("Body {:?} created: {:?} {:?}", handle, desc.kind, desc.shape);
        self.bodies.insert(handle, Body::new(desc));
        handle
    }

    fn remove_body(&mut self, body: BodyHandle) -> Result<()> {
        self.bodies.remove(&body).ok_or(Error::MissingBody(body))?;
        log::debug!("Body {:?} removed", body);
        Ok(())
    }

    fn set_next_kinematic_translation(&mut self, body: BodyHandle, translation: Vec3) -> Result<()> {
        let b = self.body_mut(body)?;
        if b.desc.kind == BodyKind::Kinematic {
            b.next_translation = Some(translation);
        }
        Ok(())
    }

    fn set_next_kinematic_rotation(&mut self, body: BodyHandle, rotation: Quat) -> Result<()> {
        let b = self.body_mut(body)?;
        if b.desc.kind == BodyKind::Kinematic {
            b.next_rotation = Some(rotation);
        }
        Ok(())
    }

    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec3) -> Result<()> {
        let b = self.body_mut(body)?;
        b.linvel += impulse * b.inv_mass;
        Ok(())
    }

    fn apply_torque_impulse(&mut self, body: BodyHandle, torque: Vec3) -> Result<()> {
        let b = self.body_mut(body)?;
        b.angvel += torque * b.inv_inertia;
        Ok(())
    }

    fn translation(&self, body: BodyHandle) -> Result<Vec3> {
        Ok(self.body(body)?.translation)
    }

    fn rotation(&self, body: BodyHandle) -> Result<Quat> {
        Ok(self.body(body)?.rotation)
    }

    fn linear_velocity(&self, body: BodyHandle) -> Result<Vec3> {
        Ok(self.body(body)?.linvel)
    }

    fn angular_velocity(&self, body: BodyHandle) -> Result<Vec3> {
        Ok(self.body(body)?.angvel)
    }

    fn set_translation(&mut self, body: BodyHandle, translation: Vec3) -> Result<()> {
        self.body_mut(body)?.translation = translation;
        Ok(())
    }

    fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec3) -> Result<()> {
        self.body_mut(body)?.linvel = velocity;
        Ok(())
    }

    fn set_angular_velocity(&mut self, body: BodyHandle, velocity: Vec3) -> Result<()> {
        self.body_mut(body)?.angvel = velocity;
        Ok(())
    }

    fn cast_ray(&self, ray: Ray, max_toi: f32, solid: bool) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for (&handle, body) in &self.bodies {
            let toi = match body.desc.shape {
                Shape::Cuboid { half_extents } => {
                    ray_cuboid(&ray, body.translation, body.rotation, half_extents, solid)
                }
                Shape::Ball { radius } => ray_ball(&ray, body.translation, radius, solid),
            };
            let Some(toi) = toi else { continue };
            if toi > max_toi {
                continue;
            }
            if best.is_none_or(|b| toi < b.time_of_impact) {
                best = Some(RayHit {
                    body: handle,
                    time_of_impact: toi,
                });
            }
        }
        best
    }

    fn step(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }

        // Kinematic targets first so contacts see this step's obstacle pose
        for body in self.bodies.values_mut() {
            match body.desc.kind {
                BodyKind::Kinematic => Self::resolve_kinematic(body, dt),
                BodyKind::Dynamic => Self::integrate_dynamic(body, self.gravity, dt),
                BodyKind::Fixed => {}
            }
        }

        let obstructions: Vec<Obstruction> = self
            .bodies
            .values()
            .filter(|b| b.desc.kind != BodyKind::Dynamic)
            .filter_map(|b| match b.desc.shape {
                Shape::Cuboid { half_extents } => Some(Obstruction {
                    translation: b.translation,
                    rotation: b.rotation,
                    half_extents,
                    linvel: b.linvel,
                    angvel: b.angvel,
                    restitution: b.desc.restitution,
                    friction: b.desc.friction,
                }),
                Shape::Ball { .. } => None,
            })
            .collect();

        for body in self.bodies.values_mut() {
            if body.desc.kind != BodyKind::Dynamic {
                continue;
            }
            let Shape::Ball { radius } = body.desc.shape else {
                continue;
            };
            for other in &obstructions {
                Self::resolve_ball_contact(body, radius, other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor() -> BodyDesc {
        BodyDesc::new(
            BodyKind::Fixed,
            Shape::Cuboid {
                half_extents: Vec3::new(2.0, 0.1, 2.0),
            },
            Vec3::new(0.0, -0.1, 0.0),
        )
        .with_friction(1.0)
    }

    fn ball(at: Vec3) -> BodyDesc {
        BodyDesc::new(BodyKind::Dynamic, Shape::Ball { radius: 0.3 }, at)
            .with_restitution(0.2)
            .with_friction(1.0)
    }

    #[test]
    fn test_ray_hits_floor_top() {
        let mut world = SimWorld::new();
        let f = world.create_body(floor());
        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Y);
        let hit = world.cast_ray(ray, 10.0, true).expect("floor below");
        assert_eq!(hit.body, f);
        assert!((hit.time_of_impact - 1.0).abs() < 1e-5);
        assert!(ray.point_at(hit.time_of_impact).abs_diff_eq(Vec3::ZERO, 1e-5));
    }

    #[test]
    fn test_ray_inside_solid_is_zero() {
        let mut world = SimWorld::new();
        world.create_body(floor());
        let origin = Vec3::new(0.0, -0.05, 0.0);
        let solid = world.cast_ray(Ray::new(origin, Vec3::NEG_Y), 10.0, true).unwrap();
        assert_eq!(solid.time_of_impact, 0.0);
        let hollow = world.cast_ray(Ray::new(origin, Vec3::NEG_Y), 10.0, false).unwrap();
        assert!((hollow.time_of_impact - 0.15).abs() < 1e-5);
    }

    #[test]
    fn test_ray_beyond_max_toi_misses() {
        let mut world = SimWorld::new();
        world.create_body(floor());
        let ray = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y);
        assert!(world.cast_ray(ray, 2.0, true).is_none());
        let sideways = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::X);
        assert!(world.cast_ray(sideways, 100.0, true).is_none());
    }

    #[test]
    fn test_ray_hits_ball() {
        let mut world = SimWorld::new();
        let b = world.create_body(ball(Vec3::new(0.0, 0.0, -3.0)));
        let hit = world
            .cast_ray(Ray::new(Vec3::ZERO, Vec3::NEG_Z), 10.0, true)
            .unwrap();
        assert_eq!(hit.body, b);
        assert!((hit.time_of_impact - 2.7).abs() < 1e-4);
    }

    #[test]
    fn test_kinematic_pose_is_deferred_to_step() {
        let mut world = SimWorld::new();
        let bar = world.create_body(BodyDesc::new(
            BodyKind::Kinematic,
            Shape::Cuboid {
                half_extents: Vec3::splat(0.5),
            },
            Vec3::ZERO,
        ));
        let target = Vec3::new(0.0, 1.0, 0.0);
        world.set_next_kinematic_translation(bar, target).unwrap();
        assert_eq!(world.translation(bar).unwrap(), Vec3::ZERO);

        world.step(0.5);
        assert_eq!(world.translation(bar).unwrap(), target);
        let v = world.linear_velocity(bar).unwrap();
        assert!((v - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-5);

        // No new target: stays put and stops
        world.step(0.5);
        assert_eq!(world.translation(bar).unwrap(), target);
        assert_eq!(world.linear_velocity(bar).unwrap(), Vec3::ZERO);
    }

    #[test]
    fn test_kinematic_rotation_velocity() {
        let mut world = SimWorld::new();
        let bar = world.create_body(BodyDesc::new(
            BodyKind::Kinematic,
            Shape::Cuboid {
                half_extents: Vec3::new(1.75, 0.15, 0.15),
            },
            Vec3::ZERO,
        ));
        world
            .set_next_kinematic_rotation(bar, Quat::from_rotation_y(0.1))
            .unwrap();
        world.step(0.1);
        let w = world.angular_velocity(bar).unwrap();
        assert!((w - Vec3::Y).length() < 1e-3);
    }

    #[test]
    fn test_ball_settles_on_floor() {
        let mut world = SimWorld::new();
        world.create_body(floor());
        let b = world.create_body(ball(Vec3::new(0.0, 1.0, 0.0)));
        for _ in 0..480 {
            world.step(1.0 / 120.0);
        }
        let p = world.translation(b).unwrap();
        assert!((p.y - 0.3).abs() < 0.05, "resting height {}", p.y);
        assert!(world.linear_velocity(b).unwrap().length() < 0.2);
    }

    #[test]
    fn test_non_finite_step_is_skipped() {
        let mut world = SimWorld::new();
        world.create_body(floor());
        let b = world.create_body(ball(Vec3::new(0.0, 1.0, 0.0)));
        world.apply_impulse(b, Vec3::X * 0.1).unwrap();
        let v = world.linear_velocity(b).unwrap();
        for dt in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY, -0.1, 0.0] {
            world.step(dt);
        }
        assert_eq!(world.translation(b).unwrap(), Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(world.linear_velocity(b).unwrap(), v);

        world.step(1.0 / 120.0);
        assert!(world.translation(b).unwrap().is_finite());
    }

    #[test]
    fn test_impulse_is_additive() {
        let mut world = SimWorld::new();
        let b = world.create_body(ball(Vec3::ZERO));
        world.apply_impulse(b, Vec3::X * 0.1).unwrap();
        let v1 = world.linear_velocity(b).unwrap();
        world.apply_impulse(b, Vec3::X * 0.1).unwrap();
        let v2 = world.linear_velocity(b).unwrap();
        assert!((v2 - v1 * 2.0).length() < 1e-5);
    }

    #[test]
    fn test_fixed_bodies_ignore_impulses() {
        let mut world = SimWorld::new();
        let f = world.create_body(floor());
        world.apply_impulse(f, Vec3::Y * 100.0).unwrap();
        world.step(0.1);
        assert_eq!(world.translation(f).unwrap(), Vec3::new(0.0, -0.1, 0.0));
    }

    #[test]
    fn test_missing_body() {
        let mut world = SimWorld::new();
        let b = world.create_body(ball(Vec3::ZERO));
        world.remove_body(b).unwrap();
        assert!(matches!(world.translation(b), Err(Error::MissingBody(h)) if h == b));
        assert!(world.remove_body(b).is_err());
    }
}
