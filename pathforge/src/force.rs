use std::fmt;

use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

use crate::entities::CollisionEntity;
use crate::math::Vec2;

/// A transient pull toward a location, applied to an entity by its
/// movement controller until it ends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Force {
    location: Vec2,
    /// World units per second.
    strength: f64,
    /// Diameter of the area around `location` that counts as reached.
    size: f64,
    cancel_on_collision: bool,
    cancel_on_reached: bool,
    ended: bool,
    identifier: Option<String>,
}

impl Force {
    /// A force that ends on collision and once reached.
    pub fn new(location: Vec2, strength: f64, size: f64) -> Self {
        Self {
            location,
            strength,
            size,
            cancel_on_collision: true,
            cancel_on_reached: true,
            ended: false,
            identifier: None,
        }
    }

    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    #[must_use]
    pub fn with_cancel_on_collision(mut self, cancel: bool) -> Self {
        self.cancel_on_collision = cancel;
        self
    }

    #[must_use]
    pub fn with_cancel_on_reached(mut self, cancel: bool) -> Self {
        self.cancel_on_reached = cancel;
        self
    }

    pub fn location(&self) -> Vec2 {
        self.location
    }

    pub fn set_location(&mut self, location: Vec2) {
        self.location = location;
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    pub fn set_strength(&mut self, strength: f64) {
        self.strength = strength;
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn cancel_on_collision(&self) -> bool {
        self.cancel_on_collision
    }

    pub fn set_cancel_on_collision(&mut self, cancel: bool) {
        self.cancel_on_collision = cancel;
    }

    pub fn cancel_on_reached(&self) -> bool {
        self.cancel_on_reached
    }

    pub fn set_cancel_on_reached(&mut self, cancel: bool) {
        self.cancel_on_reached = cancel;
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn set_identifier(&mut self, identifier: Option<String>) {
        self.identifier = identifier;
    }

    /// Mark the force as ended. The controller drops it on its next pass.
    pub fn end(&mut self) {
        self.ended = true;
    }

    pub fn has_ended(&self) -> bool {
        self.ended
    }

    /// True if the entity's collision box overlaps the circle of diameter
    /// `size` around the force's location.
    pub fn has_reached(&self, entity: &dyn CollisionEntity) -> bool {
        entity
            .collision_box()
            .intersects_circle(self.location, self.size * 0.5)
    }
}

impl fmt::Display for Force {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.identifier() {
            Some(id) if !id.is_empty() => id,
            _ => "Force",
        };
        write!(
            f,
            "{}: {}px/sec; ({}, {})",
            name, self.strength, self.location.x, self.location.y
        )
    }
}

/// Cloneable handle for applying forces from other threads.
///
/// Queued forces are picked up at the start of the controller's next update.
#[derive(Clone, Debug)]
pub struct ForceSender {
    sender: Sender<Force>,
}

impl ForceSender {
    pub(crate) fn new(sender: Sender<Force>) -> Self {
        Self { sender }
    }

    /// Queue a force. Returns `false` if the controller no longer exists.
    pub fn send(&self, force: Force) -> bool {
        self.sender.send(force).is_ok()
    }
}

/// Both ends of the force queue owned by a controller.
pub(crate) fn force_channel() -> (ForceSender, Receiver<Force>) {
    let (sender, receiver) = crossbeam_channel::unbounded();
    (ForceSender::new(sender), receiver)
}
