//! Marble Course - A rolling-marble obstacle course
//!
//! Core modules:
//! - `sim`: Simulation core (level generation, obstacles, phases, player)
//! - `settings`: Data-driven level and player tuning
//! - `error`: Crate error type

pub mod error;
pub mod settings;
pub mod sim;

pub use error::{Error, Result};
pub use settings::{LevelConfig, PlayerTuning, Settings};

use glam::Vec3;

/// Game configuration constants
pub mod consts {
    use glam::Vec3;

    /// Fixed simulation timestep for the native driver (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Largest frame delta the game loop will integrate at once
    pub const MAX_FRAME_DELTA: f32 = 0.1;

    /// Upper bound on obstacle segments per level
    pub const MAX_OBSTACLE_COUNT: u32 = 1024;

    /// Distance between segment centers along the travel axis (-z)
    pub const SEGMENT_SPACING: f32 = 4.0;
    /// Platform width (x extent) of every segment
    pub const SEGMENT_WIDTH: f32 = 4.0;

    /// Obstacle body rest offset above its segment origin
    pub const OBSTACLE_REST_OFFSET: Vec3 = Vec3::new(0.0, 0.3, 0.0);
    /// Spinner and limbo bar half extents
    pub const BAR_HALF_EXTENTS: Vec3 = Vec3::new(1.75, 0.15, 0.15);
    /// Axe blade half extents
    pub const AXE_HALF_EXTENTS: Vec3 = Vec3::new(0.75, 0.75, 0.15);
    /// Limbo bar height above base, added to the sine bob
    pub const LIMBO_VERTICAL_OFFSET: f32 = 1.15;
    /// Axe lateral sweep amplitude
    pub const AXE_AMPLITUDE: f32 = 1.25;
    /// Axe height above base
    pub const AXE_HEIGHT: f32 = 0.75;
    /// Spinner minimum angular speed (rad/s)
    pub const SPINNER_MIN_SPEED: f32 = 0.2;
    /// Obstacle surface response
    pub const OBSTACLE_RESTITUTION: f32 = 0.2;
    pub const OBSTACLE_FRICTION: f32 = 0.0;

    /// Wall geometry
    pub const WALL_THICKNESS: f32 = 0.3;
    pub const WALL_HEIGHT: f32 = 1.5;
    pub const WALL_RESTITUTION: f32 = 0.2;
    pub const WALL_FRICTION: f32 = 1.0;
    /// Floor collider half thickness (top face at y = 0)
    pub const FLOOR_HALF_THICKNESS: f32 = 0.1;

    /// Finish marker on the End segment
    pub const FINISH_MARKER_OFFSET: Vec3 = Vec3::new(0.0, 0.25, 0.0);
    pub const FINISH_MARKER_HALF_EXTENTS: Vec3 = Vec3::new(0.3, 0.25, 0.3);

    /// Player ball defaults
    pub const PLAYER_RADIUS: f32 = 0.3;
    pub const PLAYER_SPAWN: Vec3 = Vec3::new(0.0, 1.0, 0.0);
    pub const PLAYER_RESTITUTION: f32 = 0.2;
    pub const PLAYER_FRICTION: f32 = 1.0;
    pub const PLAYER_LINEAR_DAMPING: f32 = 0.5;
    pub const PLAYER_ANGULAR_DAMPING: f32 = 0.5;
    /// Impulse per second of held movement key
    pub const IMPULSE_STRENGTH: f32 = 1.0;
    /// Torque impulse per second of held movement key
    pub const TORQUE_STRENGTH: f32 = 1.0;
    /// Upward impulse applied by a grounded jump
    pub const JUMP_IMPULSE: f32 = 0.5;
    /// Gap between the ball's bottom and the ground probe origin
    pub const GROUND_PROBE_CLEARANCE: f32 = 0.01;
    /// Ground contact threshold as a fraction of the radius (0.15 for r = 0.3)
    pub const GROUND_CONTACT_FRACTION: f32 = 0.5;
    /// Ground probe reach
    pub const GROUND_PROBE_MAX_TOI: f32 = 10.0;
    /// Falling below this height restarts the run
    pub const FALL_THRESHOLD: f32 = -4.0;

    /// Camera rig
    pub const CAMERA_OFFSET: Vec3 = Vec3::new(0.0, 0.65, 2.25);
    pub const CAMERA_TARGET_OFFSET: Vec3 = Vec3::new(0.0, 0.25, 0.0);
    pub const CAMERA_START: Vec3 = Vec3::new(10.0, 10.0, 10.0);
    pub const CAMERA_SMOOTHING: f32 = 5.0;

    /// World gravity
    pub const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);
}

/// Position of the segment at `index` along the travel axis
#[inline]
pub fn segment_position(index: u32) -> Vec3 {
    Vec3::new(0.0, 0.0, -(index as f32) * consts::SEGMENT_SPACING)
}

/// Frame-rate independent exponential smoothing factor
#[inline]
pub fn smoothing_factor(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate * dt).exp()
}
