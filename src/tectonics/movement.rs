//! Rigid-body motion of a plate: direction, speed, impulses, friction.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::mass::Mass;
use crate::geometry::WorldDimension;

/// Speed every plate starts with, in cells per tick.
const INITIAL_SPEED: f32 = 1.0;

/// How strongly crust deformation bleeds kinetic energy in
/// [`Movement::apply_friction`].
const DEFORMATION_WEIGHT: f32 = 2.0;

/// A plate's trajectory state.
///
/// Direction is kept as a unit vector with speed stored separately, so
/// collisions can bank an impulse that the next [`Movement::step`] folds
/// back into the heading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    direction: Vec2,
    velocity: f32,
    rot_dir: f32,
    impulse: Vec2,
    world: WorldDimension,
}

impl Movement {
    /// Draws an initial heading and rotation sense from the plate's RNG
    /// stream.
    pub fn new(rng: &mut ChaCha8Rng, world: WorldDimension) -> Self {
        let angle = TAU * rng.random::<f64>() as f32;
        let rot_dir = if rng.random::<u32>() % 2 == 1 { 1.0 } else { -1.0 };
        Self {
            direction: Vec2::new(angle.cos(), angle.sin()),
            velocity: INITIAL_SPEED,
            rot_dir,
            impulse: Vec2::ZERO,
            world,
        }
    }

    /// Current speed in cells per tick.
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Unit heading of the plate.
    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    pub fn velocity_on_x(&self) -> f32 {
        self.direction.x * self.velocity
    }

    pub fn velocity_on_y(&self) -> f32 {
        self.direction.y * self.velocity
    }

    pub fn velocity_vector(&self) -> Vec2 {
        self.direction * self.velocity
    }

    /// Projection of an external vector onto this plate's heading.
    pub fn dot(&self, dx: f32, dy: f32) -> f32 {
        self.direction.dot(Vec2::new(dx, dy))
    }

    /// Advances the trajectory one tick.
    ///
    /// Banked impulses deflect the heading; the length change of the
    /// combined vector transfers into speed (clamped at zero). A slight
    /// circular drift proportional to speed and world size keeps plates
    /// from tracking straight lines forever.
    pub fn step(&mut self) {
        let combined = self.direction + self.impulse;
        self.impulse = Vec2::ZERO;

        let len = combined.length();
        if len > 0.0 {
            self.direction = combined / len;
            self.velocity = (self.velocity + (len - 1.0)).max(0.0);
        } else {
            self.velocity = 0.0;
        }

        let world_avg_side = (self.world.width() + self.world.height()) as f32 * 0.5;
        let alpha = self.rot_dir * self.velocity / (world_avg_side * 0.33);
        let (sin, cos) = (alpha * self.velocity).sin_cos();
        self.direction = Vec2::new(
            self.direction.x * cos - self.direction.y * sin,
            self.direction.y * cos + self.direction.x * sin,
        );
    }

    /// Bleeds speed for the kinetic energy that crust deformation consumed:
    /// F - dF = ma - dF => a = dF/m.
    pub fn apply_friction(&mut self, deformed_mass: f32, mass: f32) {
        if mass <= 0.0 {
            self.velocity = 0.0;
            return;
        }
        let slowdown = DEFORMATION_WEIGHT * deformed_mass / mass;
        self.velocity -= slowdown.min(self.velocity);
    }

    /// Momentum-exchange response for a collision at a shared world cell.
    ///
    /// `this_point`/`other_point` are the collision cell in each plate's
    /// local coordinates. The impulse acts along the normal between the two
    /// plates' collision-point offsets from their mass centers, with the
    /// colliding crust mass standing in for the donating side. Restitution
    /// is zero: plates stick rather than bounce. Degenerate geometry, a
    /// separating pair, or a massless participant produce no response.
    pub fn collide(
        &mut self,
        this_mass: Mass,
        this_point: Vec2,
        other: &mut Movement,
        other_mass: Mass,
        other_point: Vec2,
        coll_mass: f32,
    ) {
        if this_mass.is_null() || other_mass.is_null() || coll_mass <= 0.0 {
            return;
        }

        let normal = (this_point - this_mass.center()) - (other_point - other_mass.center());
        if normal.length_squared() <= 0.0 {
            return;
        }
        let normal = normal.normalize();

        // Torque is not modeled, so relative velocity at the contact point
        // reduces to the difference of the plate velocities.
        let relative = self.velocity_vector() - other.velocity_vector();
        let approach = relative.dot(normal);
        if approach <= 0.0 {
            return;
        }

        let denom = 1.0 / other_mass.amount() + 1.0 / coll_mass;
        let impulse = -approach / denom;

        self.impulse += normal * (impulse / this_mass.amount());
        other.impulse -= normal * (impulse / (coll_mass + other_mass.amount()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn world() -> WorldDimension {
        WorldDimension::new(100, 100)
    }

    fn movement(direction: Vec2, velocity: f32) -> Movement {
        Movement {
            direction,
            velocity,
            rot_dir: 1.0,
            impulse: Vec2::ZERO,
            world: world(),
        }
    }

    fn mass_at(amount: f32, center: Vec2) -> Mass {
        let mut builder = crate::tectonics::mass::MassBuilder::new();
        builder.add_point(center.x as u32, center.y as u32, amount);
        builder.build()
    }

    #[test]
    fn seeded_movement_is_reproducible() {
        let mut a = ChaCha8Rng::seed_from_u64(77);
        let mut b = ChaCha8Rng::seed_from_u64(77);
        assert_eq!(Movement::new(&mut a, world()), Movement::new(&mut b, world()));
    }

    #[test]
    fn initial_heading_is_unit_speed_one() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let m = Movement::new(&mut rng, world());
        assert!((m.direction().length() - 1.0).abs() < 1e-5);
        assert!((m.velocity() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn step_keeps_direction_unit() {
        let mut m = movement(Vec2::X, 1.0);
        for _ in 0..10 {
            m.step();
            assert!((m.direction().length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn friction_slows_and_clamps() {
        let mut m = movement(Vec2::X, 1.0);
        m.apply_friction(0.25, 1.0);
        assert!((m.velocity() - 0.5).abs() < 1e-6);
        m.apply_friction(10.0, 1.0);
        assert_eq!(m.velocity(), 0.0);
    }

    #[test]
    fn friction_with_zero_mass_stops_plate() {
        let mut m = movement(Vec2::Y, 1.0);
        m.apply_friction(0.0, 0.0);
        assert_eq!(m.velocity(), 0.0);
    }

    #[test]
    fn head_on_collision_pushes_plates_apart() {
        let mut a = movement(Vec2::X, 1.0);
        let mut b = movement(-Vec2::X, 1.0);
        let a_mass = mass_at(4.0, Vec2::new(0.0, 0.0));
        let b_mass = mass_at(4.0, Vec2::new(4.0, 0.0));

        a.collide(a_mass, Vec2::new(2.0, 0.0), &mut b, b_mass, Vec2::new(2.0, 0.0), 1.0);

        // A travels +x, B travels -x; both impulses must oppose the motion.
        assert!(a.impulse.x < 0.0);
        assert!(b.impulse.x > 0.0);

        a.step();
        b.step();
        assert!(a.velocity() < 1.0);
        assert!(b.velocity() < 1.0);
    }

    #[test]
    fn separating_plates_ignore_collision() {
        let mut a = movement(-Vec2::X, 1.0);
        let mut b = movement(Vec2::X, 1.0);
        let a_mass = mass_at(4.0, Vec2::new(0.0, 0.0));
        let b_mass = mass_at(4.0, Vec2::new(4.0, 0.0));

        a.collide(a_mass, Vec2::new(2.0, 0.0), &mut b, b_mass, Vec2::new(2.0, 0.0), 1.0);
        assert_eq!(a.impulse, Vec2::ZERO);
        assert_eq!(b.impulse, Vec2::ZERO);
    }
}
