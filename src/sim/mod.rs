//! Simulation core
//!
//! Level layout, obstacle kinematics, run phases and the player controller.
//! Nothing here renders. Physics goes through the `PhysicsWorld` trait;
//! `SimWorld` is the in-memory implementation used by the headless driver
//! and the tests.
//! - Seeded RNG only (level generation)
//! - Stable iteration order (segments by index, bodies by handle)

pub mod bounds;
pub mod course;
pub mod level;
pub mod obstacle;
pub mod phase;
pub mod physics;
pub mod player;
pub mod tick;
pub mod world;

pub use bounds::{BoundaryGeometry, Cuboid};
pub use course::Course;
pub use level::{LevelLayout, ObstacleKind, ObstacleState, Segment, SegmentKind, generate};
pub use obstacle::{ObstacleController, Pose};
pub use phase::{GamePhase, PhaseEvent, PhaseState, PhaseStore, Subscription};
pub use physics::{BodyDesc, BodyHandle, BodyKind, PhysicsWorld, Ray, RayHit, Shape};
pub use player::{CameraRig, GroundProbe, KeyIntents, PlayerController, PlayerTick};
pub use tick::Game;
pub use world::SimWorld;
