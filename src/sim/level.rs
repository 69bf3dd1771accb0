//! Procedural level layout
//!
//! A level is a straight run of segments along -z: one Start platform, a
//! seeded random sequence of obstacle platforms, and one End platform.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::{MAX_OBSTACLE_COUNT, SEGMENT_SPACING, SPINNER_MIN_SPEED};
use crate::error::{Error, Result};
use crate::segment_position;

/// Obstacle flavours a level can be assembled from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Bar rotating about the vertical axis
    Spinner,
    /// Bar bobbing up and down
    Limbo,
    /// Blade sweeping side to side
    Axe,
}

impl ObstacleKind {
    pub const ALL: [ObstacleKind; 3] = [ObstacleKind::Spinner, ObstacleKind::Axe, ObstacleKind::Limbo];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObstacleKind::Spinner => "spinner",
            ObstacleKind::Limbo => "limbo",
            ObstacleKind::Axe => "axe",
        }
    }
}

/// What occupies a segment slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    Start,
    End,
    Obstacle(ObstacleKind),
}

/// Per-obstacle motion parameters, drawn once at generation time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleState {
    /// Phase added to elapsed time, in [0, 2π)
    pub phase_offset: f32,
    /// Signed angular speed (rad/s). Only spinners use it.
    pub speed: f32,
}

/// One slot of the course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    /// Slot index (0 = Start)
    pub index: u32,
    pub position: Vec3,
    /// Present exactly when `kind` is an obstacle
    pub obstacle: Option<ObstacleState>,
}

/// An ordered, generated level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelLayout {
    /// Traversal order, which is also spatial order along -z
    pub segments: Vec<Segment>,
    /// Seed the layout was generated from
    pub seed: u64,
    count: u32,
}

impl LevelLayout {
    /// Number of obstacle segments
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Segment slots including Start and End
    #[inline]
    pub fn length(&self) -> u32 {
        self.count + 2
    }

    /// The player finishes when its z drops below this
    pub fn finish_line_z(&self) -> f32 {
        -(self.count as f32 * SEGMENT_SPACING + SEGMENT_SPACING / 2.0)
    }

    pub fn kinds(&self) -> Vec<SegmentKind> {
        self.segments.iter().map(|s| s.kind).collect()
    }

    pub fn obstacles(&self) -> impl Iterator<Item = (&Segment, ObstacleKind, ObstacleState)> {
        self.segments.iter().filter_map(|s| match (s.kind, s.obstacle) {
            (SegmentKind::Obstacle(kind), Some(state)) => Some((s, kind, state)),
            _ => None,
        })
    }
}

/// Draw motion parameters for one obstacle
fn roll_obstacle(kind: ObstacleKind, rng: &mut Pcg32) -> ObstacleState {
    match kind {
        ObstacleKind::Spinner => {
            let magnitude = rng.random::<f32>() + SPINNER_MIN_SPEED;
            let sign = if rng.random_bool(0.5) { -1.0 } else { 1.0 };
            ObstacleState {
                phase_offset: 0.0,
                speed: magnitude * sign,
            }
        }
        ObstacleKind::Limbo | ObstacleKind::Axe => ObstacleState {
            // Rounding can land exactly on TAU
            phase_offset: (rng.random::<f32>() * TAU) % TAU,
            speed: 0.0,
        },
    }
}

/// Build a level of `count` obstacle segments drawn from `kinds`
///
/// Same `(count, kinds, seed)` always yields the same layout. Kinds are
/// drawn before any motion parameters, so the kind sequence does not
/// depend on which obstacles were picked.
pub fn generate(count: u32, kinds: &[ObstacleKind], seed: u64) -> Result<LevelLayout> {
    if kinds.is_empty() {
        return Err(Error::invalid("level needs at least one obstacle kind"));
    }
    if count > MAX_OBSTACLE_COUNT {
        return Err(Error::invalid(format!(
            "level count {} exceeds {}",
            count, MAX_OBSTACLE_COUNT
        )));
    }

    let mut rng = Pcg32::seed_from_u64(seed);

    let picks: Vec<ObstacleKind> = (0..count)
        .map(|_| kinds[rng.random_range(0..kinds.len())])
        .collect();

    let mut segments = Vec::with_capacity(count as usize + 2);
    segments.push(Segment {
        kind: SegmentKind::Start,
        index: 0,
        position: segment_position(0),
        obstacle: None,
    });
    for (i, kind) in picks.into_iter().enumerate() {
        let index = i as u32 + 1;
        segments.push(Segment {
            kind: SegmentKind::Obstacle(kind),
            index,
            position: segment_position(index),
            obstacle: Some(roll_obstacle(kind, &mut rng)),
        });
    }
    segments.push(Segment {
        kind: SegmentKind::End,
        index: count + 1,
        position: segment_position(count + 1),
        obstacle: None,
    });

    log::info!(
        "Generated level: {} obstacles from [{}], seed {}",
        count,
        kinds.iter().map(ObstacleKind::as_str).collect::<Vec<_>>().join(", "),
        seed
    );

    Ok(LevelLayout {
        segments,
        seed,
        count,
    })
}
