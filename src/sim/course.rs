//! Live level: the generated layout plus every body it put in the world

use super::bounds::{self, BoundaryGeometry};
use super::level::{self, LevelLayout, SegmentKind};
use super::obstacle::ObstacleController;
use super::physics::{BodyDesc, BodyHandle, BodyKind, PhysicsWorld, Shape};
use crate::consts::*;
use crate::error::Result;
use crate::settings::LevelConfig;

#[derive(Debug)]
pub struct Course {
    config: LevelConfig,
    layout: LevelLayout,
    bounds: BoundaryGeometry,
    obstacles: Vec<ObstacleController>,
    /// Walls, floor and finish marker
    fixed: Vec<BodyHandle>,
}

impl Course {
    /// Generate a layout from `seed` and create its bodies
    pub fn build<W: PhysicsWorld + ?Sized>(world: &mut W, config: LevelConfig, seed: u64) -> Result<Self> {
        let layout = level::generate(config.obstacle_count()?, &config.kinds, seed)?;
        let bounds = bounds::build(layout.length())?;

        let mut fixed: Vec<BodyHandle> = bounds
            .colliders()
            .iter()
            .map(|c| world.create_body(c.fixed_body(WALL_RESTITUTION, WALL_FRICTION)))
            .collect();

        if let Some(end) = layout.segments.iter().find(|s| s.kind == SegmentKind::End) {
            let marker = BodyDesc::new(
                BodyKind::Fixed,
                Shape::Cuboid {
                    half_extents: FINISH_MARKER_HALF_EXTENTS,
                },
                end.position + FINISH_MARKER_OFFSET,
            )
            .with_restitution(WALL_RESTITUTION)
            .with_friction(OBSTACLE_FRICTION);
            fixed.push(world.create_body(marker));
        }

        let obstacles = layout
            .obstacles()
            .map(|(segment, kind, state)| ObstacleController::spawn(world, kind, segment.position, state))
            .collect();

        Ok(Self {
            config,
            layout,
            bounds,
            obstacles,
            fixed,
        })
    }

    /// Replace everything with a freshly generated level
    pub fn rebuild<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W, seed: u64) -> Result<()> {
        self.clear(world)?;
        *self = Self::build(world, self.config.clone(), seed)?;
        Ok(())
    }

    /// Remove every body this course created
    pub fn clear<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) -> Result<()> {
        for body in self
            .fixed
            .drain(..)
            .chain(self.obstacles.drain(..).map(|o| o.body))
        {
            world.remove_body(body)?;
        }
        Ok(())
    }

    /// Write this frame's kinematic targets
    pub fn animate<W: PhysicsWorld + ?Sized>(&self, world: &mut W, elapsed: f32) -> Result<()> {
        for obstacle in &self.obstacles {
            obstacle.drive(world, elapsed)?;
        }
        Ok(())
    }

    pub fn layout(&self) -> &LevelLayout {
        &self.layout
    }

    pub fn bounds(&self) -> &BoundaryGeometry {
        &self.bounds
    }

    pub fn obstacles(&self) -> &[ObstacleController] {
        &self.obstacles
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    pub fn finish_line_z(&self) -> f32 {
        self.layout.finish_line_z()
    }

    /// Bodies owned by this course
    pub fn body_count(&self) -> usize {
        self.fixed.len() + self.obstacles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::level::ObstacleKind;
    use crate::sim::world::SimWorld;

    #[test]
    fn test_build_creates_bodies() {
        let mut world = SimWorld::new();
        let course = Course::build(&mut world, LevelConfig::default(), 0).unwrap();
        assert_eq!(course.obstacles().len(), 5);
        // 4 bounds + finish marker + 5 obstacles
        assert_eq!(course.body_count(), 10);
        assert_eq!(world.body_count(), 10);
    }

    #[test]
    fn test_bounds_span_layout() {
        let mut world = SimWorld::new();
        let course = Course::build(&mut world, LevelConfig::default(), 0).unwrap();
        // 7 segments of 4 units, starting 2 units behind the start platform
        let floor = &course.bounds().floor;
        assert!((floor.max().z - 2.0).abs() < 1e-5);
        assert!((floor.min().z + 26.0).abs() < 1e-5);
        assert!(course.bounds().back_wall.center.z < course.finish_line_z());
    }

    #[test]
    fn test_rebuild_replaces_bodies() {
        let mut world = SimWorld::new();
        let mut course = Course::build(&mut world, LevelConfig::default(), 0).unwrap();
        let old: Vec<_> = course.obstacles().iter().map(|o| o.body).collect();
        course.rebuild(&mut world, 1).unwrap();
        assert_eq!(course.layout().seed, 1);
        assert_eq!(world.body_count(), 10);
        assert!(old.iter().all(|b| !world.contains(*b)));
    }

    #[test]
    fn test_invalid_config_aborts_build() {
        let mut world = SimWorld::new();
        let config = LevelConfig {
            kinds: Vec::new(),
            ..Default::default()
        };
        assert!(Course::build(&mut world, config, 0).is_err());
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn test_animate_moves_obstacles_on_step() {
        let mut world = SimWorld::new();
        let config = LevelConfig {
            count: 3,
            kinds: vec![ObstacleKind::Axe],
            seed: 0,
        };
        let course = Course::build(&mut world, config, 4).unwrap();
        course.animate(&mut world, 0.7).unwrap();
        world.step(1.0 / 60.0);
        for obstacle in course.obstacles() {
            let p = world.translation(obstacle.body).unwrap();
            let expected = 1.25 * (0.7 + obstacle.state.phase_offset).sin();
            assert!((p.x - expected).abs() < 1e-5);
            assert!((p.y - 0.75).abs() < 1e-6);
        }
    }
}
