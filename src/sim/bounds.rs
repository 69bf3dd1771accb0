//! Boundary colliders for a level
//!
//! Two side walls, a back wall behind the End platform and one long floor
//! collider, all sized from the level length.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::physics::{BodyDesc, BodyKind, Shape};
use crate::consts::*;
use crate::error::{Error, Result};

/// Axis-aligned box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cuboid {
    pub center: Vec3,
    pub half_extents: Vec3,
}

impl Cuboid {
    pub fn new(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            center,
            half_extents,
        }
    }

    /// Fixed body description for this box
    pub fn fixed_body(&self, restitution: f32, friction: f32) -> BodyDesc {
        BodyDesc::new(
            BodyKind::Fixed,
            Shape::Cuboid {
                half_extents: self.half_extents,
            },
            self.center,
        )
        .with_restitution(restitution)
        .with_friction(friction)
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.half_extents
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.half_extents
    }
}

/// Static level bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryGeometry {
    pub left_wall: Cuboid,
    pub right_wall: Cuboid,
    pub back_wall: Cuboid,
    pub floor: Cuboid,
}

impl BoundaryGeometry {
    pub fn colliders(&self) -> [Cuboid; 4] {
        [self.left_wall, self.right_wall, self.back_wall, self.floor]
    }
}

/// Bounds for a level `length` segments long (Start and End included)
pub fn build(length: u32) -> Result<BoundaryGeometry> {
    if length < 1 {
        return Err(Error::invalid("bounds need a level length of at least 1"));
    }

    let len = length as f32;
    let run = SEGMENT_SPACING * len;
    // Start platform's front edge sits at z = +spacing/2
    let mid_z = -run / 2.0 + SEGMENT_SPACING / 2.0;
    let wall_y = WALL_HEIGHT / 2.0;
    let wall_x = SEGMENT_WIDTH / 2.0 + WALL_THICKNESS / 2.0;

    let side = Vec3::new(WALL_THICKNESS / 2.0, WALL_HEIGHT / 2.0, run / 2.0);

    Ok(BoundaryGeometry {
        left_wall: Cuboid::new(Vec3::new(-wall_x, wall_y, mid_z), side),
        right_wall: Cuboid::new(Vec3::new(wall_x, wall_y, mid_z), side),
        back_wall: Cuboid::new(
            Vec3::new(0.0, wall_y, -run + SEGMENT_SPACING / 2.0),
            Vec3::new(SEGMENT_WIDTH / 2.0, WALL_HEIGHT / 2.0, WALL_THICKNESS / 2.0),
        ),
        floor: Cuboid::new(
            Vec3::new(0.0, -FLOOR_HALF_THICKNESS, mid_z),
            Vec3::new(SEGMENT_WIDTH / 2.0, FLOOR_HALF_THICKNESS, run / 2.0),
        ),
    })
}
