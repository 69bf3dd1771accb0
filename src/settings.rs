//! Level and player tuning
//!
//! Loaded from an optional JSON file; every field falls back to the
//! defaults below.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{Error, Result};
use crate::sim::level::ObstacleKind;

/// Course composition: the only gameplay parameters a host may tune
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Obstacle segments between Start and End, in `0..=MAX_OBSTACLE_COUNT`
    ///
    /// Signed so a negative value in a settings file is reported as a
    /// configuration error rather than a parse error.
    pub count: i64,
    /// Kinds drawn from, uniformly
    pub kinds: Vec<ObstacleKind>,
    /// Base seed; each restart adds one
    pub seed: u64,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            count: 5,
            kinds: ObstacleKind::ALL.to_vec(),
            seed: 0,
        }
    }
}

impl LevelConfig {
    /// Seed for the level generated after `restarts` restarts
    pub fn seed_for(&self, restarts: u64) -> u64 {
        self.seed.wrapping_add(restarts)
    }

    /// `count` checked against the generator's range
    pub fn obstacle_count(&self) -> Result<u32> {
        u32::try_from(self.count)
            .ok()
            .filter(|&n| n <= MAX_OBSTACLE_COUNT)
            .ok_or_else(|| {
                Error::invalid(format!(
                    "level.count must be in 0..={}, got {}",
                    MAX_OBSTACLE_COUNT, self.count
                ))
            })
    }
}

/// Player ball feel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub radius: f32,
    pub spawn: Vec3,
    /// Impulse per second with a movement key held
    pub impulse_strength: f32,
    /// Torque impulse per second with a movement key held
    pub torque_strength: f32,
    pub jump_impulse: f32,
    /// Camera smoothing rate (1/s)
    pub camera_smoothing: f32,
    pub fall_threshold: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            radius: PLAYER_RADIUS,
            spawn: PLAYER_SPAWN,
            impulse_strength: IMPULSE_STRENGTH,
            torque_strength: TORQUE_STRENGTH,
            jump_impulse: JUMP_IMPULSE,
            camera_smoothing: CAMERA_SMOOTHING,
            fall_threshold: FALL_THRESHOLD,
        }
    }
}

/// Game settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub level: LevelConfig,
    pub player: PlayerTuning,
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read and validate a settings file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Reject values no level or player can be built from
    pub fn validate(&self) -> Result<()> {
        self.level.obstacle_count()?;
        if self.level.kinds.is_empty() {
            return Err(Error::invalid("level.kinds must not be empty"));
        }
        let p = &self.player;
        if !(p.radius > 0.0) {
            return Err(Error::invalid("player.radius must be positive"));
        }
        if p.impulse_strength < 0.0 || p.torque_strength < 0.0 || p.jump_impulse < 0.0 {
            return Err(Error::invalid("player impulse strengths must not be negative"));
        }
        if !(p.camera_smoothing > 0.0) {
            return Err(Error::invalid("player.camera_smoothing must be positive"));
        }
        if p.fall_threshold >= p.spawn.y {
            return Err(Error::invalid("player.fall_threshold must be below the spawn height"));
        }
        Ok(())
    }
}
