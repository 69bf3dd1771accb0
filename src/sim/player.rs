//! Player ball controller
//!
//! Turns sampled key intents into impulses on the player body, gates jumps
//! on a downward ground probe, follows the ball with a smoothed camera and
//! drives run phase transitions from the ball's position.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::phase::{GamePhase, PhaseStore, Subscription};
use super::physics::{BodyDesc, BodyHandle, BodyKind, PhysicsWorld, Ray, Shape};
use crate::consts::*;
use crate::error::Result;
use crate::settings::PlayerTuning;
use crate::smoothing_factor;

/// Keys held this tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyIntents {
    pub forward: bool,
    pub backward: bool,
    pub leftward: bool,
    pub rightward: bool,
    pub jump: bool,
}

impl KeyIntents {
    pub fn any(&self) -> bool {
        self.forward || self.backward || self.leftward || self.rightward || self.jump
    }
}

/// Result of the jump ground check
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroundProbe {
    Grounded { time_of_impact: f32 },
    /// No hit, or a hit too far below
    Airborne,
}

/// Smoothed chase camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraRig {
    pub position: Vec3,
    pub target: Vec3,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            position: CAMERA_START,
            target: Vec3::ZERO,
        }
    }
}

impl CameraRig {
    /// Ease toward the chase pose for a ball at `body`
    pub fn follow(&mut self, body: Vec3, delta: f32, rate: f32) {
        let t = smoothing_factor(rate, delta);
        self.position = self.position.lerp(body + CAMERA_OFFSET, t);
        self.target = self.target.lerp(body + CAMERA_TARGET_OFFSET, t);
    }
}

/// Linear and angular impulse for one tick of movement keys
///
/// Axes add independently, so diagonals are not normalized. Each push is
/// paired with the torque that rolls the ball the same way.
pub fn movement_impulses(keys: &KeyIntents, delta: f32, tuning: &PlayerTuning) -> (Vec3, Vec3) {
    let push = tuning.impulse_strength * delta;
    let twist = tuning.torque_strength * delta;
    let mut impulse = Vec3::ZERO;
    let mut torque = Vec3::ZERO;

    if keys.forward {
        impulse.z -= push;
        torque.x -= twist;
    }
    if keys.rightward {
        impulse.x += push;
        torque.z -= twist;
    }
    if keys.backward {
        impulse.z += push;
        torque.x += twist;
    }
    if keys.leftward {
        impulse.x -= push;
        torque.z += twist;
    }
    (impulse, torque)
}

/// Cast down from just under the ball
///
/// Contact requires a time of impact strictly below half the radius.
pub fn probe_ground<W: PhysicsWorld + ?Sized>(
    world: &W,
    body: BodyHandle,
    radius: f32,
) -> Result<GroundProbe> {
    let center = world.translation(body)?;
    let origin = center - Vec3::Y * (radius + GROUND_PROBE_CLEARANCE);
    let ray = Ray::new(origin, Vec3::NEG_Y);
    let threshold = radius * GROUND_CONTACT_FRACTION;

    Ok(match world.cast_ray(ray, GROUND_PROBE_MAX_TOI, true) {
        Some(hit) if hit.time_of_impact < threshold => GroundProbe::Grounded {
            time_of_impact: hit.time_of_impact,
        },
        _ => GroundProbe::Airborne,
    })
}

/// Put the ball back on the spawn point at rest
pub fn reset_body<W: PhysicsWorld + ?Sized>(world: &mut W, body: BodyHandle, spawn: Vec3) -> Result<()> {
    world.set_translation(body, spawn)?;
    world.set_linear_velocity(body, Vec3::ZERO)?;
    world.set_angular_velocity(body, Vec3::ZERO)?;
    log::debug!("Player reset to {:?}", spawn);
    Ok(())
}

/// What one player tick observed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerTick {
    /// Body position after impulses were applied
    pub position: Vec3,
    pub jumped: bool,
}

/// Owns the player body and its per-tick logic
pub struct PlayerController<W: PhysicsWorld> {
    world: Rc<RefCell<W>>,
    store: PhaseStore,
    body: BodyHandle,
    tuning: PlayerTuning,
    camera: CameraRig,
    jump_held: bool,
    _reset: Subscription,
}

impl<W: PhysicsWorld + 'static> PlayerController<W> {
    /// Create the player body and reset it on every return to idle
    pub fn new(world: Rc<RefCell<W>>, store: &PhaseStore, tuning: PlayerTuning) -> Self {
        let desc = BodyDesc::new(
            BodyKind::Dynamic,
            Shape::Ball {
                radius: tuning.radius,
            },
            tuning.spawn,
        )
        .with_restitution(PLAYER_RESTITUTION)
        .with_friction(PLAYER_FRICTION)
        .with_damping(PLAYER_LINEAR_DAMPING, PLAYER_ANGULAR_DAMPING);
        let body = world.borrow_mut().create_body(desc);

        let reset_world = Rc::clone(&world);
        let spawn = tuning.spawn;
        let reset = store.subscribe(move |event| {
            if event.to == GamePhase::Idle {
                reset_body(&mut *reset_world.borrow_mut(), body, spawn)?;
            }
            Ok(())
        });

        Self {
            world,
            store: store.clone(),
            body,
            tuning,
            camera: CameraRig::default(),
            jump_held: false,
            _reset: reset,
        }
    }
}

impl<W: PhysicsWorld> PlayerController<W> {
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    /// One tick after physics integration
    ///
    /// `finish_z` is the level's finish line on the travel axis.
    pub fn update(&mut self, delta: f32, keys: &KeyIntents, finish_z: f32) -> Result<PlayerTick> {
        let jump_pressed = keys.jump && !self.jump_held;
        self.jump_held = keys.jump;

        // World borrow must end before any transition: listeners borrow it too
        let tick = {
            let mut world = self.world.borrow_mut();
            let (impulse, torque) = movement_impulses(keys, delta, &self.tuning);
            world.apply_impulse(self.body, impulse)?;
            world.apply_torque_impulse(self.body, torque)?;

            let mut jumped = false;
            if jump_pressed {
                if let GroundProbe::Grounded { time_of_impact } =
                    probe_ground(&*world, self.body, self.tuning.radius)?
                {
                    world.apply_impulse(self.body, Vec3::Y * self.tuning.jump_impulse)?;
                    jumped = true;
                    log::debug!("Jump (toi {:.3})", time_of_impact);
                }
            }

            PlayerTick {
                position: world.translation(self.body)?,
                jumped,
            }
        };

        self.camera
            .follow(tick.position, delta, self.tuning.camera_smoothing);

        if keys.any() {
            self.store.start()?;
        }
        if tick.position.z < finish_z {
            self.store.end()?;
        }
        if tick.position.y < self.tuning.fall_threshold {
            self.store.restart()?;
        }

        Ok(tick)
    }
}
