//! Per-frame game loop
//!
//! Frame order: obstacle targets, physics step, player tick. The course
//! subscribes to the phase store before the player does, so on every
//! return to idle the new level exists before the player body is reset
//! and before the player's next tick.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;

use super::course::Course;
use super::phase::{GamePhase, PhaseStore, Subscription};
use super::physics::PhysicsWorld;
use super::player::{KeyIntents, PlayerController, PlayerTick};
use crate::consts::MAX_FRAME_DELTA;
use crate::error::Result;
use crate::settings::Settings;

/// Everything one running game owns
pub struct Game<W: PhysicsWorld> {
    world: Rc<RefCell<W>>,
    store: PhaseStore,
    course: Rc<RefCell<Course>>,
    player: PlayerController<W>,
    _regenerate: Subscription,
}

impl<W: PhysicsWorld + 'static> Game<W> {
    /// Build the first level (restart counter 0) and spawn the player
    pub fn new(world: W, settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let world = Rc::new(RefCell::new(world));
        let store = PhaseStore::new();

        let level = settings.level.clone();
        let first_seed = level.seed_for(store.restarts());
        let course = Course::build(&mut *world.borrow_mut(), level, first_seed)?;
        let course = Rc::new(RefCell::new(course));

        let regenerate = {
            let world = Rc::clone(&world);
            let course = Rc::clone(&course);
            store.subscribe(move |event| {
                if event.to == GamePhase::Idle {
                    let mut course = course.borrow_mut();
                    let seed = course.config().seed_for(event.restarts);
                    course.rebuild(&mut *world.borrow_mut(), seed)?;
                }
                Ok(())
            })
        };

        let player = PlayerController::new(Rc::clone(&world), &store, settings.player.clone());

        Ok(Self {
            world,
            store,
            course,
            player,
            _regenerate: regenerate,
        })
    }
}

impl<W: PhysicsWorld> Game<W> {
    /// Advance one frame
    ///
    /// `elapsed` is absolute seconds since the game began, `delta` seconds
    /// since the previous frame.
    pub fn frame(&mut self, elapsed: f64, delta: f32, keys: &KeyIntents) -> Result<PlayerTick> {
        // NaN survives clamp; a poisoned delta would never let the ball fall out
        let delta = if delta.is_finite() {
            delta.clamp(0.0, MAX_FRAME_DELTA)
        } else {
            0.0
        };
        self.store.set_clock(elapsed);

        let finish_z = {
            let course = self.course.borrow();
            let mut world = self.world.borrow_mut();
            course.animate(&mut *world, elapsed as f32)?;
            world.step(delta);
            course.finish_line_z()
        };

        self.player.update(delta, keys, finish_z)
    }

    /// External restart request
    pub fn restart(&mut self) -> Result<()> {
        self.store.restart()
    }

    pub fn phase(&self) -> GamePhase {
        self.store.phase()
    }

    pub fn store(&self) -> &PhaseStore {
        &self.store
    }

    pub fn player(&self) -> &PlayerController<W> {
        &self.player
    }

    pub fn player_position(&self) -> Result<Vec3> {
        self.world.borrow().translation(self.player.body())
    }

    /// Borrow the live course
    pub fn course(&self) -> std::cell::Ref<'_, Course> {
        self.course.borrow()
    }

    /// Borrow the physics world
    pub fn world(&self) -> std::cell::Ref<'_, W> {
        self.world.borrow()
    }

    pub fn world_mut(&self) -> std::cell::RefMut<'_, W> {
        self.world.borrow_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::PLAYER_SPAWN;
    use crate::sim::level::{self, ObstacleKind};
    use crate::sim::world::SimWorld;

    const DT: f32 = 1.0 / 60.0;

    fn game() -> Game<SimWorld> {
        Game::new(SimWorld::new(), &Settings::default()).unwrap()
    }

    fn forward() -> KeyIntents {
        KeyIntents {
            forward: true,
            ..Default::default()
        }
    }

    /// Teleport the ball, keeping it still
    fn place(game: &Game<SimWorld>, at: Vec3) {
        let body = game.player().body();
        let mut world = game.world_mut();
        world.set_translation(body, at).unwrap();
        world.set_linear_velocity(body, Vec3::ZERO).unwrap();
    }

    fn count_events(game: &Game<SimWorld>, to: GamePhase) -> (Rc<RefCell<u32>>, Subscription) {
        let hits = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&hits);
        let sub = game.store().subscribe(move |e| {
            if e.to == to {
                *sink.borrow_mut() += 1;
            }
            Ok(())
        });
        (hits, sub)
    }

    #[test]
    fn test_first_level_uses_base_seed() {
        let game = game();
        let expected = level::generate(5, &ObstacleKind::ALL, 0).unwrap();
        assert_eq!(*game.course().layout(), expected);
        assert_eq!(game.phase(), GamePhase::Idle);
    }

    #[test]
    fn test_idle_until_key_pressed() {
        let mut game = game();
        let mut t = 0.0;
        for _ in 0..30 {
            t += DT as f64;
            game.frame(t, DT, &KeyIntents::default()).unwrap();
        }
        assert_eq!(game.phase(), GamePhase::Idle);
        game.frame(t + DT as f64, DT, &forward()).unwrap();
        assert_eq!(game.phase(), GamePhase::Running);
    }

    #[test]
    fn test_ball_rests_on_start_platform() {
        let mut game = game();
        let mut t = 0.0;
        for _ in 0..240 {
            t += DT as f64;
            game.frame(t, DT, &KeyIntents::default()).unwrap();
        }
        let p = game.world().translation(game.player().body()).unwrap();
        assert!((p.y - 0.3).abs() < 0.05, "ball height {}", p.y);
        assert!(p.z.abs() < 0.1);
    }

    #[test]
    fn test_forward_rolls_toward_course() {
        let mut game = game();
        let mut t = 0.0;
        for _ in 0..60 {
            t += DT as f64;
            game.frame(t, DT, &KeyIntents::default()).unwrap();
        }
        for _ in 0..20 {
            t += DT as f64;
            game.frame(t, DT, &forward()).unwrap();
        }
        let p = game.world().translation(game.player().body()).unwrap();
        assert!(p.z < -0.1, "ball z {}", p.z);
    }

    #[test]
    fn test_grounded_jump_lifts_ball() {
        let mut game = game();
        let mut t = 0.0;
        for _ in 0..240 {
            t += DT as f64;
            game.frame(t, DT, &KeyIntents::default()).unwrap();
        }
        let jump = KeyIntents {
            jump: true,
            ..Default::default()
        };
        t += DT as f64;
        assert!(game.frame(t, DT, &jump).unwrap().jumped);
        let vy = game
            .world()
            .linear_velocity(game.player().body())
            .unwrap()
            .y;
        assert!(vy > 1.0);

        // Mid-air press does nothing
        t += DT as f64;
        game.frame(t, DT, &KeyIntents::default()).unwrap();
        for _ in 0..3 {
            t += DT as f64;
            game.frame(t, DT, &KeyIntents::default()).unwrap();
        }
        t += DT as f64;
        assert!(!game.frame(t, DT, &jump).unwrap().jumped);
    }

    #[test]
    fn test_finish_ends_run_once() {
        let mut game = game();
        let (ended, _sub) = count_events(&game, GamePhase::Ended);
        game.frame(0.0, DT, &forward()).unwrap();
        assert_eq!(game.phase(), GamePhase::Running);

        // count = 5: finish line at z = -(5 * 4 + 2)
        assert_eq!(game.course().finish_line_z(), -22.0);
        let mut t = 0.0;
        for _ in 0..20 {
            place(&game, Vec3::new(0.0, 0.3, -23.0));
            t += DT as f64;
            game.frame(t, DT, &forward()).unwrap();
        }
        assert_eq!(game.phase(), GamePhase::Ended);
        assert_eq!(*ended.borrow(), 1);
        assert!(game.store().duration().unwrap() > 0.0);
    }

    #[test]
    fn test_fall_restarts_with_next_seed() {
        let mut game = game();
        game.frame(0.0, DT, &forward()).unwrap();
        let before_seed = game.course().layout().seed;

        place(&game, Vec3::new(0.5, -5.0, -6.0));
        game.world_mut()
            .set_angular_velocity(game.player().body(), Vec3::new(2.0, 0.0, 0.0))
            .unwrap();
        game.frame(DT as f64, DT, &KeyIntents::default()).unwrap();

        assert_eq!(game.phase(), GamePhase::Idle);
        assert_eq!(game.store().restarts(), 1);
        let body = game.player().body();
        let world = game.world();
        assert_eq!(world.translation(body).unwrap(), PLAYER_SPAWN);
        assert_eq!(world.linear_velocity(body).unwrap(), Vec3::ZERO);
        assert_eq!(world.angular_velocity(body).unwrap(), Vec3::ZERO);
        drop(world);

        let course = game.course();
        assert_eq!(course.layout().seed, before_seed + 1);
        let expected = level::generate(5, &ObstacleKind::ALL, before_seed + 1).unwrap();
        assert_eq!(*course.layout(), expected);
    }

    #[test]
    fn test_restart_keeps_body_count_stable() {
        let mut game = game();
        let bodies = game.world().body_count();
        for _ in 0..5 {
            game.restart().unwrap();
        }
        assert_eq!(game.world().body_count(), bodies);
        assert_eq!(game.course().layout().seed, 5);
    }

    #[test]
    fn test_restart_after_finish() {
        let mut game = game();
        game.frame(0.0, DT, &forward()).unwrap();
        place(&game, Vec3::new(0.0, 0.3, -23.0));
        game.frame(DT as f64, DT, &KeyIntents::default()).unwrap();
        assert_eq!(game.phase(), GamePhase::Ended);

        game.restart().unwrap();
        assert_eq!(game.phase(), GamePhase::Idle);
        assert_eq!(game.store().duration(), None);
        let p = game.world().translation(game.player().body()).unwrap();
        assert_eq!(p, PLAYER_SPAWN);
    }

    #[test]
    fn test_non_finite_delta_is_ignored() {
        let mut game = game();
        let jump = KeyIntents {
            forward: true,
            jump: true,
            ..Default::default()
        };
        game.frame(0.016, DT, &forward()).unwrap();
        game.frame(0.032, f32::NAN, &jump).unwrap();
        game.frame(0.048, f32::INFINITY, &forward()).unwrap();
        let mut t = 0.048;
        for _ in 0..10 {
            t += DT as f64;
            game.frame(t, DT, &forward()).unwrap();
        }
        let body = game.player().body();
        assert!(game.world().translation(body).unwrap().is_finite());
        assert!(game.world().linear_velocity(body).unwrap().is_finite());
        assert!(game.player().camera().position.is_finite());
        assert!(game.player().camera().target.is_finite());

        // Falling out still recovers the run
        place(&game, Vec3::new(0.0, -5.0, -2.0));
        t += DT as f64;
        game.frame(t, DT, &KeyIntents::default()).unwrap();
        assert_eq!(game.phase(), GamePhase::Idle);
        assert_eq!(game.store().restarts(), 1);
        assert_eq!(game.world().translation(body).unwrap(), PLAYER_SPAWN);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = Settings::default();
        settings.level.kinds.clear();
        assert!(Game::new(SimWorld::new(), &settings).is_err());
    }
}
