// pathforge/src/physics.rs
use serde::{Deserialize, Serialize};

use crate::entities::MobileEntity;
use crate::math::{Rect, Vec2};

/// Which collision geometry a query considers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollisionType {
    /// Level geometry that never moves.
    Static,
    /// Props and other entities.
    Dynamic,
    Any,
}

impl CollisionType {
    fn includes(self, other: CollisionType) -> bool {
        self == CollisionType::Any || self == other
    }
}

/// Read-only collision queries.
pub trait CollisionLayer {
    fn collision_boxes(&self, collision: CollisionType) -> Vec<Rect>;

    fn collides_rect(&self, rect: &Rect, collision: CollisionType) -> bool {
        self.collision_boxes(collision)
            .iter()
            .any(|b| b.intersects(rect))
    }

    fn collides_point(&self, point: Vec2, collision: CollisionType) -> bool {
        self.collision_boxes(collision)
            .iter()
            .any(|b| b.contains(point))
    }

    fn collides_line(&self, a: Vec2, b: Vec2, collision: CollisionType) -> bool {
        self.collision_boxes(collision)
            .iter()
            .any(|r| r.intersects_segment(a, b))
    }
}

/// Collision layer that can also resolve entity movement.
pub trait PhysicsLayer: CollisionLayer {
    /// Try to move `entity` so that its location becomes `target`.
    /// Returns `false` if the move was blocked.
    fn move_entity(&mut self, entity: &mut dyn MobileEntity, target: Vec2) -> bool;
}

/// In-memory collision world made of axis-aligned boxes.
///
/// Anything outside the optional environment bounds counts as colliding.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StaticCollisionWorld {
    static_boxes: Vec<Rect>,
    dynamic_boxes: Vec<Rect>,
    bounds: Option<Rect>,
}

impl StaticCollisionWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bounds(bounds: Rect) -> Self {
        Self {
            bounds: Some(bounds),
            ..Self::default()
        }
    }

    pub fn add_static(&mut self, rect: Rect) {
        self.static_boxes.push(rect);
    }

    pub fn add_dynamic(&mut self, rect: Rect) {
        self.dynamic_boxes.push(rect);
    }

    /// Remove every static box equal to `rect`. Returns whether one existed.
    pub fn remove_static(&mut self, rect: &Rect) -> bool {
        let before = self.static_boxes.len();
        self.static_boxes.retain(|r| r != rect);
        before != self.static_boxes.len()
    }

    pub fn clear(&mut self) {
        self.static_boxes.clear();
        self.dynamic_boxes.clear();
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: Option<Rect>) {
        self.bounds = bounds;
    }

    pub fn static_boxes(&self) -> &[Rect] {
        &self.static_boxes
    }

    pub fn dynamic_boxes(&self) -> &[Rect] {
        &self.dynamic_boxes
    }
}

impl CollisionLayer for StaticCollisionWorld {
    fn collision_boxes(&self, collision: CollisionType) -> Vec<Rect> {
        let mut boxes = Vec::new();
        if collision.includes(CollisionType::Static) {
            boxes.extend_from_slice(&self.static_boxes);
        }
        if collision.includes(CollisionType::Dynamic) {
            boxes.extend_from_slice(&self.dynamic_boxes);
        }
        boxes
    }

    fn collides_rect(&self, rect: &Rect, collision: CollisionType) -> bool {
        if let Some(bounds) = self.bounds {
            if !bounds.intersects(rect) {
                return true;
            }
        }
        self.collision_boxes(collision)
            .iter()
            .any(|b| b.intersects(rect))
    }

    fn collides_point(&self, point: Vec2, collision: CollisionType) -> bool {
        if let Some(bounds) = self.bounds {
            if !bounds.contains(point) {
                return true;
            }
        }
        self.collision_boxes(collision)
            .iter()
            .any(|b| b.contains(point))
    }
}

impl PhysicsLayer for StaticCollisionWorld {
    fn move_entity(&mut self, entity: &mut dyn MobileEntity, target: Vec2) -> bool {
        if !target.is_finite() {
            return false;
        }

        let delta = target - entity.location();
        let current = entity.collision_box();
        let moved = Rect::new(
            current.x + delta.x,
            current.y + delta.y,
            current.width,
            current.height,
        );

        // The entity's own box may be registered as dynamic geometry.
        let blocked = match self.bounds {
            Some(bounds) if !bounds.intersects(&moved) => true,
            _ => self
                .collision_boxes(CollisionType::Any)
                .iter()
                .filter(|b| **b != current)
                .any(|b| b.intersects(&moved)),
        };
        if blocked {
            log::trace!("move to ({:.2}, {:.2}) blocked", target.x, target.y);
            return false;
        }

        if entity.turn_on_move() && delta.length() > 0.0 {
            entity.set_angle(delta.angle());
        }
        entity.set_location(target);
        true
    }
}
