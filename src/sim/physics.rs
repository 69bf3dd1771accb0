//! Physics collaborator contract
//!
//! The simulation core never integrates bodies itself. It talks to a
//! physics engine through [`PhysicsWorld`]: bodies are created from a
//! [`BodyDesc`], kinematic bodies receive a *next* pose that the engine
//! resolves during its following `step`, and dynamic bodies receive
//! additive impulses.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Opaque handle to a body owned by a physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// How a body's pose is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// Integrated from forces and impulses
    Dynamic,
    /// Pose scripted through next-pose targets, still collides
    Kinematic,
    /// Never moves
    Fixed,
}

/// Collision shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Ball { radius: f32 },
    Cuboid { half_extents: Vec3 },
}

/// Everything needed to create a body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub shape: Shape,
    pub translation: Vec3,
    pub rotation: Quat,
    pub restitution: f32,
    pub friction: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
}

impl BodyDesc {
    pub fn new(kind: BodyKind, shape: Shape, translation: Vec3) -> Self {
        Self {
            kind,
            shape,
            translation,
            rotation: Quat::IDENTITY,
            restitution: 0.0,
            friction: 0.5,
            linear_damping: 0.0,
            angular_damping: 0.0,
        }
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }
}

/// A half-line query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Not required to be normalized; time of impact is in multiples of it
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    #[inline]
    pub fn point_at(&self, toi: f32) -> Vec3 {
        self.origin + self.dir * toi
    }
}

/// Nearest ray hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub body: BodyHandle,
    pub time_of_impact: f32,
}

/// Capability interface of the physics engine
///
/// Every call that names a body fails with [`crate::Error::MissingBody`]
/// when the handle is unknown. Callers treat that as fatal.
pub trait PhysicsWorld {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle;
    fn remove_body(&mut self, body: BodyHandle) -> Result<()>;

    /// Kinematic target translation for the next step
    fn set_next_kinematic_translation(&mut self, body: BodyHandle, translation: Vec3) -> Result<()>;
    /// Kinematic target rotation for the next step
    fn set_next_kinematic_rotation(&mut self, body: BodyHandle, rotation: Quat) -> Result<()>;

    /// Additive linear impulse
    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec3) -> Result<()>;
    /// Additive angular impulse
    fn apply_torque_impulse(&mut self, body: BodyHandle, torque: Vec3) -> Result<()>;

    fn translation(&self, body: BodyHandle) -> Result<Vec3>;
    fn rotation(&self, body: BodyHandle) -> Result<Quat>;
    fn linear_velocity(&self, body: BodyHandle) -> Result<Vec3>;
    fn angular_velocity(&self, body: BodyHandle) -> Result<Vec3>;

    /// Teleport, bypassing integration
    fn set_translation(&mut self, body: BodyHandle, translation: Vec3) -> Result<()>;
    fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec3) -> Result<()>;
    fn set_angular_velocity(&mut self, body: BodyHandle, velocity: Vec3) -> Result<()>;

    /// Nearest hit within `max_toi`. With `solid`, a ray starting inside a
    /// shape hits it at time 0.
    fn cast_ray(&self, ray: Ray, max_toi: f32, solid: bool) -> Option<RayHit>;

    /// Advance the simulation, resolving pending kinematic poses
    fn step(&mut self, dt: f32);
}
