//! Moving obstacle kinematics
//!
//! Every obstacle pose is a closed-form function of elapsed time and the
//! parameters stored on its segment. The controller writes the pose as the
//! body's *next* kinematic target; the physics step moves the body.

use glam::{Quat, Vec3};

use super::level::{ObstacleKind, ObstacleState};
use super::physics::{BodyDesc, BodyHandle, BodyKind, PhysicsWorld, Shape};
use crate::consts::*;
use crate::error::Result;

/// Kinematic pose target
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pose {
    /// Spinner: rotation about +y, translation untouched
    Rotation(Quat),
    /// Limbo and Axe: translation, rotation untouched
    Translation(Vec3),
}

/// Drives one obstacle body
#[derive(Debug, Clone)]
pub struct ObstacleController {
    pub kind: ObstacleKind,
    pub body: BodyHandle,
    /// Segment origin the motion is relative to
    pub base: Vec3,
    pub state: ObstacleState,
}

impl ObstacleController {
    /// Create the kinematic body for an obstacle on the segment at `base`
    pub fn spawn<W: PhysicsWorld + ?Sized>(
        world: &mut W,
        kind: ObstacleKind,
        base: Vec3,
        state: ObstacleState,
    ) -> Self {
        let half_extents = match kind {
            ObstacleKind::Spinner | ObstacleKind::Limbo => BAR_HALF_EXTENTS,
            ObstacleKind::Axe => AXE_HALF_EXTENTS,
        };
        let desc = BodyDesc::new(
            BodyKind::Kinematic,
            Shape::Cuboid { half_extents },
            base + OBSTACLE_REST_OFFSET,
        )
        .with_restitution(OBSTACLE_RESTITUTION)
        .with_friction(OBSTACLE_FRICTION);

        Self {
            kind,
            body: world.create_body(desc),
            base,
            state,
        }
    }

    /// Pose at `elapsed` seconds. Total over every finite time.
    pub fn next_pose(&self, elapsed: f32) -> Pose {
        let ObstacleState {
            phase_offset,
            speed,
        } = self.state;
        match self.kind {
            ObstacleKind::Spinner => Pose::Rotation(Quat::from_rotation_y(elapsed * speed)),
            ObstacleKind::Limbo => {
                let y = self.base.y + (elapsed + phase_offset).sin() + LIMBO_VERTICAL_OFFSET;
                Pose::Translation(Vec3::new(self.base.x, y, self.base.z))
            }
            ObstacleKind::Axe => {
                let x = self.base.x + (elapsed + phase_offset).sin() * AXE_AMPLITUDE;
                Pose::Translation(Vec3::new(x, self.base.y + AXE_HEIGHT, self.base.z))
            }
        }
    }

    /// Compute the pose and hand it to the physics world for its next step
    pub fn drive<W: PhysicsWorld + ?Sized>(&self, world: &mut W, elapsed: f32) -> Result<Pose> {
        let pose = self.next_pose(elapsed);
        match pose {
            Pose::Rotation(rotation) => world.set_next_kinematic_rotation(self.body, rotation)?,
            Pose::Translation(translation) => {
                world.set_next_kinematic_translation(self.body, translation)?
            }
        }
        Ok(pose)
    }
}
