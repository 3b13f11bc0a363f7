//! Entity contracts consumed by the path finder and the movement controller.
//!
//! Games implement these traits on their own entity types; [`Mover`] is a
//! ready-made implementation for simple cases and tests.

use serde::{Deserialize, Serialize};

use crate::math::{Rect, Vec2};

/// Anything that occupies a collision box in the world.
pub trait CollisionEntity {
    /// Top-left position of the entity.
    fn location(&self) -> Vec2;

    fn set_location(&mut self, location: Vec2);

    fn collision_box(&self) -> Rect;

    fn collision_box_center(&self) -> Vec2 {
        self.collision_box().center()
    }
}

/// An entity that moves under its own velocity.
///
/// Acceleration and deceleration are expressed as the time in milliseconds it
/// takes to reach full speed or to come to a halt.
pub trait MobileEntity: CollisionEntity {
    /// Velocity in world units per second.
    fn velocity(&self) -> f64;

    fn updates_per_second(&self) -> u32;

    /// Maximum distance the entity can travel within one tick.
    fn tick_velocity(&self) -> f64 {
        self.velocity() / f64::from(self.updates_per_second().max(1))
    }

    fn acceleration(&self) -> f64;

    fn deceleration(&self) -> f64;

    /// Velocity gained during a tick of `delta_time` milliseconds.
    fn acceleration_per_tick(&self, delta_time: f64) -> f64 {
        let max_per_tick = self.tick_velocity();
        let acceleration = self.acceleration();
        if acceleration == 0.0 {
            max_per_tick
        } else {
            delta_time / acceleration * max_per_tick
        }
    }

    /// Velocity lost during a tick of `delta_time` milliseconds.
    fn deceleration_per_tick(&self, delta_time: f64, velocity: f64) -> f64 {
        let max_per_tick = self.tick_velocity();
        let deceleration = self.deceleration();
        if deceleration == 0.0 {
            velocity
        } else {
            delta_time / deceleration * max_per_tick
        }
    }

    /// Whether moving the entity also turns it toward the movement direction.
    fn turn_on_move(&self) -> bool;

    fn set_turn_on_move(&mut self, turn_on_move: bool);

    /// Facing angle in radians.
    fn angle(&self) -> f64;

    fn set_angle(&mut self, angle: f64);
}

/// Plain mobile entity with a collision box offset from its location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mover {
    pub location: Vec2,
    pub box_offset: Vec2,
    pub box_size: Vec2,
    pub velocity: f64,
    pub acceleration: f64,
    pub deceleration: f64,
    pub updates_per_second: u32,
    pub turn_on_move: bool,
    pub angle: f64,
}

impl Mover {
    pub fn new(location: Vec2, box_size: Vec2) -> Self {
        Self {
            location,
            box_offset: Vec2::ZERO,
            box_size,
            velocity: 100.0,
            acceleration: 0.0,
            deceleration: 0.0,
            updates_per_second: 50,
            turn_on_move: true,
            angle: 0.0,
        }
    }

    pub fn with_box_offset(mut self, offset: Vec2) -> Self {
        self.box_offset = offset;
        self
    }

    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_acceleration(mut self, acceleration: f64) -> Self {
        self.acceleration = acceleration;
        self
    }

    pub fn with_deceleration(mut self, deceleration: f64) -> Self {
        self.deceleration = deceleration;
        self
    }

    pub fn with_updates_per_second(mut self, updates: u32) -> Self {
        self.updates_per_second = updates;
        self
    }

    pub fn with_turn_on_move(mut self, turn_on_move: bool) -> Self {
        self.turn_on_move = turn_on_move;
        self
    }

    /// Place the entity so its collision box is centered on `center`.
    pub fn centered_at(mut self, center: Vec2) -> Self {
        self.location = Vec2::new(
            center.x - self.box_offset.x - self.box_size.x * 0.5,
            center.y - self.box_offset.y - self.box_size.y * 0.5,
        );
        self
    }
}

impl CollisionEntity for Mover {
    fn location(&self) -> Vec2 {
        self.location
    }

    fn set_location(&mut self, location: Vec2) {
        self.location = location;
    }

    fn collision_box(&self) -> Rect {
        Rect::new(
            self.location.x + self.box_offset.x,
            self.location.y + self.box_offset.y,
            self.box_size.x,
            self.box_size.y,
        )
    }
}

impl MobileEntity for Mover {
    fn velocity(&self) -> f64 {
        self.velocity
    }

    fn updates_per_second(&self) -> u32 {
        self.updates_per_second
    }

    fn acceleration(&self) -> f64 {
        self.acceleration
    }

    fn deceleration(&self) -> f64 {
        self.deceleration
    }

    fn turn_on_move(&self) -> bool {
        self.turn_on_move
    }

    fn set_turn_on_move(&mut self, turn_on_move: bool) {
        self.turn_on_move = turn_on_move;
    }

    fn angle(&self) -> f64 {
        self.angle
    }

    fn set_angle(&mut self, angle: f64) {
        self.angle = angle;
    }
}
