//! Kinematic primitives and the integration formulas shared by every moving entity

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Friction applied to acceleration and velocity every tick
pub const FRICTION: f64 = 0.97;
/// Divisor turning a speed level into a velocity cap
pub const RATIO: f64 = 1.5;

/// A position on the field
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Field dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub width: f64,
    pub height: f64,
}

impl Field {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Clamp a point into `[0, width] x [0, height]`
    pub fn clamp(&self, point: Point) -> Point {
        Point {
            x: point.x.clamp(0.0, self.width),
            y: point.y.clamp(0.0, self.height),
        }
    }

    /// True when the point sits on (or past) any edge
    pub fn touches_edge(&self, point: Point) -> bool {
        point.x <= 0.0 || point.x >= self.width || point.y <= 0.0 || point.y >= self.height
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
}

/// Acceleration kept as four directional magnitudes rather than a signed vector.
/// Friction decays each component on its own, so opposite inputs do not cancel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Acceleration {
    pub up: f64,
    pub down: f64,
    pub left: f64,
    pub right: f64,
}

impl Acceleration {
    /// Component-wise sum
    pub fn combined(&self, other: &Acceleration) -> Acceleration {
        Acceleration {
            up: self.up + other.up,
            down: self.down + other.down,
            left: self.left + other.left,
            right: self.right + other.right,
        }
    }

    pub fn is_horizontal(&self) -> bool {
        self.left > 0.0 || self.right > 0.0
    }

    /// Bounce off a fixed obstacle: invert the horizontal pair when moving
    /// sideways, otherwise the vertical pair
    pub fn reflected(&self) -> Acceleration {
        if self.is_horizontal() {
            Acceleration {
                left: -self.left,
                right: -self.right,
                ..*self
            }
        } else {
            Acceleration {
                up: -self.up,
                down: -self.down,
                ..*self
            }
        }
    }
}

/// Held movement keys of an avatar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveIntent {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl MoveIntent {
    pub fn set(&mut self, direction: Direction, held: bool) {
        match direction {
            Direction::Up => self.up = held,
            Direction::Down => self.down = held,
            Direction::Left => self.left = held,
            Direction::Right => self.right = held,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Kinematic state shared by avatars, bullets, collectibles and traps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub id: Uuid,
    pub position: Point,
    pub mass: f64,
    pub radius: f64,
    pub velocity: Velocity,
    pub acceleration: Acceleration,
}

impl Body {
    /// A body at rest
    pub fn at_rest(position: Point, mass: f64, radius: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            mass,
            radius,
            velocity: Velocity::default(),
            acceleration: Acceleration::default(),
        }
    }

    /// Circles overlap (touching counts)
    pub fn overlaps(&self, other: &Body) -> bool {
        PhysicsSystem::check_circle_collision(
            self.position,
            self.radius,
            other.position,
            other.radius,
        )
    }

    /// One tick of self-propelled motion driven by held keys
    pub fn integrate_driven(&mut self, intent: MoveIntent, move_speed: f64, framerate: f64, field: &Field) {
        self.acceleration =
            PhysicsSystem::update_acceleration(self.acceleration, intent, move_speed, framerate);
        self.velocity = PhysicsSystem::update_velocity(
            self.velocity,
            &self.acceleration,
            Some(PhysicsSystem::velocity_cap(move_speed)),
        );
        self.position = PhysicsSystem::advance(self.position, self.velocity, framerate, field);
    }

    /// One tick of passive motion: residual acceleration decays, nothing drives it
    pub fn integrate_drifting(&mut self, framerate: f64, field: &Field) {
        self.acceleration = PhysicsSystem::update_acceleration(
            self.acceleration,
            MoveIntent::default(),
            0.0,
            framerate,
        );
        self.velocity = PhysicsSystem::update_velocity(self.velocity, &self.acceleration, None);
        self.position = PhysicsSystem::advance(self.position, self.velocity, framerate, field);
    }

    /// One tick of ballistic motion at constant velocity
    pub fn integrate_ballistic(&mut self, framerate: f64, field: &Field) {
        self.position = PhysicsSystem::advance(self.position, self.velocity, framerate, field);
    }
}

/// Integration formulas
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Update one acceleration component. A held key ramps toward `move_speed`,
    /// a released one decays under friction.
    pub fn steer_component(current: f64, held: bool, move_speed: f64, framerate: f64) -> f64 {
        if held {
            (current + move_speed * FRICTION / framerate).min(move_speed)
        } else {
            (current * FRICTION).max(0.0) / framerate
        }
    }

    pub fn update_acceleration(
        acceleration: Acceleration,
        intent: MoveIntent,
        move_speed: f64,
        framerate: f64,
    ) -> Acceleration {
        Acceleration {
            up: Self::steer_component(acceleration.up, intent.up, move_speed, framerate),
            down: Self::steer_component(acceleration.down, intent.down, move_speed, framerate),
            left: Self::steer_component(acceleration.left, intent.left, move_speed, framerate),
            right: Self::steer_component(acceleration.right, intent.right, move_speed, framerate),
        }
    }

    /// Maximum absolute velocity per axis for a move speed
    pub fn velocity_cap(move_speed: f64) -> f64 {
        (move_speed + 10.0) / RATIO
    }

    /// Net the directional acceleration into velocity, clamp if capped, then damp
    pub fn update_velocity(velocity: Velocity, acceleration: &Acceleration, cap: Option<f64>) -> Velocity {
        let mut x = velocity.x - acceleration.left + acceleration.right;
        let mut y = velocity.y - acceleration.up + acceleration.down;
        if let Some(cap) = cap {
            x = x.clamp(-cap, cap);
            y = y.clamp(-cap, cap);
        }
        Velocity {
            x: x * FRICTION,
            y: y * FRICTION,
        }
    }

    /// Move by one tick of velocity and clamp into the field
    pub fn advance(position: Point, velocity: Velocity, framerate: f64, field: &Field) -> Point {
        field.clamp(Point {
            x: position.x + velocity.x / framerate,
            y: position.y + velocity.y / framerate,
        })
    }

    /// Check collision between two circles
    pub fn check_circle_collision(a: Point, radius_a: f64, b: Point, radius_b: f64) -> bool {
        a.distance(&b) <= radius_a + radius_b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAMERATE: f64 = 50.0;

    #[test]
    fn test_held_key_ramps_and_caps_at_move_speed() {
        let mut value = 0.0;
        for _ in 0..500 {
            value = PhysicsSystem::steer_component(value, true, 3.0, FRAMERATE);
        }
        assert_eq!(value, 3.0);

        let first = PhysicsSystem::steer_component(0.0, true, 3.0, FRAMERATE);
        assert!((first - 3.0 * FRICTION / FRAMERATE).abs() < 1e-12);
    }

    #[test]
    fn test_released_key_decays_and_never_goes_negative() {
        let decayed = PhysicsSystem::steer_component(2.0, false, 1.0, FRAMERATE);
        assert!((decayed - 2.0 * FRICTION / FRAMERATE).abs() < 1e-12);
        assert_eq!(PhysicsSystem::steer_component(-4.0, false, 1.0, FRAMERATE), 0.0);
    }

    #[test]
    fn test_velocity_is_clamped_then_damped() {
        let acceleration = Acceleration {
            right: 100.0,
            up: 100.0,
            ..Acceleration::default()
        };
        let cap = PhysicsSystem::velocity_cap(1.0);
        let v = PhysicsSystem::update_velocity(Velocity::default(), &acceleration, Some(cap));
        assert!((v.x - cap * FRICTION).abs() < 1e-12);
        assert!((v.y + cap * FRICTION).abs() < 1e-12);
    }

    #[test]
    fn test_advance_clamps_to_field() {
        let field = Field::new(100.0, 50.0);
        let p = PhysicsSystem::advance(
            Point::new(99.0, 1.0),
            Velocity { x: 500.0, y: -500.0 },
            FRAMERATE,
            &field,
        );
        assert_eq!(p, Point::new(100.0, 0.0));
    }

    #[test]
    fn test_driven_body_stays_inside_field() {
        let field = Field::new(20.0, 20.0);
        let mut body = Body::at_rest(Point::new(19.9, 0.1), 1.0, 5.0);
        let intent = MoveIntent {
            right: true,
            up: true,
            ..MoveIntent::default()
        };
        for _ in 0..2000 {
            body.integrate_driven(intent, 8.0, FRAMERATE, &field);
            assert!((0.0..=field.width).contains(&body.position.x));
            assert!((0.0..=field.height).contains(&body.position.y));
        }
        assert_eq!(body.position, Point::new(20.0, 0.0));
    }

    #[test]
    fn test_reflection_prefers_horizontal_axis() {
        let sideways = Acceleration {
            left: 0.0,
            right: 2.0,
            up: 1.0,
            down: 0.0,
        };
        let bounced = sideways.reflected();
        assert_eq!(bounced.right, -2.0);
        assert_eq!(bounced.up, 1.0);

        let vertical = Acceleration {
            down: 3.0,
            ..Acceleration::default()
        };
        assert_eq!(vertical.reflected().down, -3.0);
    }

    #[test]
    fn test_touching_circles_collide() {
        assert!(PhysicsSystem::check_circle_collision(
            Point::new(0.0, 0.0),
            3.0,
            Point::new(3.0, 4.0),
            2.0
        ));
        assert!(!PhysicsSystem::check_circle_collision(
            Point::new(0.0, 0.0),
            3.0,
            Point::new(3.0, 4.0),
            1.9
        ));
    }
}
