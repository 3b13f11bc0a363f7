//! Waypoint following for a single entity.

use crate::config::NavConfig;
use crate::entities::MobileEntity;
use crate::error::NavResult;
use crate::math::Vec2;
use crate::pathfinding::{Path, PathFinder};
use crate::physics::PhysicsLayer;

/// Notifications sent to navigation listeners.
#[derive(Clone, Debug, PartialEq)]
pub enum NavigationEvent {
    /// The last waypoint was reached.
    Arrived { target: Vec2 },
    /// Navigation ended, for whatever reason.
    Stopped,
}

type CancelCondition = Box<dyn Fn(&dyn MobileEntity) -> bool + Send>;
type NavigationListener = Box<dyn FnMut(&NavigationEvent) + Send>;

/// Moves an entity along a [`Path`], one waypoint at a time.
pub struct EntityNavigator {
    path: Option<Path>,
    /// Index of the waypoint currently being approached.
    waypoint: usize,
    acceptable_error: f64,
    cancel_conditions: Vec<CancelCondition>,
    listeners: Vec<NavigationListener>,
}

impl Default for EntityNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityNavigator {
    pub fn new() -> Self {
        Self {
            path: None,
            waypoint: 1,
            acceptable_error: NavConfig::default().acceptable_error,
            cancel_conditions: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn with_config(config: &NavConfig) -> Self {
        let mut navigator = Self::new();
        navigator.acceptable_error = config.acceptable_error;
        navigator
    }

    pub fn acceptable_error(&self) -> f64 {
        self.acceptable_error
    }

    pub fn set_acceptable_error(&mut self, acceptable_error: f64) {
        self.acceptable_error = acceptable_error;
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_ref()
    }

    pub fn is_navigating(&self) -> bool {
        self.path.is_some()
    }

    /// The waypoint the entity is currently heading for.
    pub fn current_waypoint(&self) -> Option<Vec2> {
        self.path
            .as_ref()
            .and_then(|p| p.points().get(self.waypoint).copied())
    }

    pub fn add_navigation_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&NavigationEvent) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Stop navigating as soon as `condition` holds for the entity.
    pub fn cancel_navigation<F>(&mut self, condition: F)
    where
        F: Fn(&dyn MobileEntity) -> bool + Send + 'static,
    {
        self.cancel_conditions.push(Box::new(condition));
    }

    /// Follow an existing path from its first waypoint.
    pub fn navigate_path(&mut self, path: Path) {
        self.path = Some(path);
        self.waypoint = 1;
    }

    /// Request a path to `target` and start following it.
    pub fn navigate(
        &mut self,
        target: Vec2,
        path_finder: &dyn PathFinder,
        entity: &dyn MobileEntity,
    ) -> NavResult<&Path> {
        let path = path_finder.find_path(entity, target)?;
        log::debug!(
            "navigating to ({:.1}, {:.1}) via {} waypoints ({:?})",
            target.x,
            target.y,
            path.len(),
            path.kind()
        );
        self.waypoint = 1;
        Ok(self.path.insert(path))
    }

    pub fn stop(&mut self) {
        self.waypoint = 1;
        if self.path.take().is_some() {
            self.notify(&NavigationEvent::Stopped);
        }
    }

    fn notify(&mut self, event: &NavigationEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }

    /// Turn the entity to face `target`.
    pub fn rotate_towards(entity: &mut dyn MobileEntity, target: Vec2) {
        let delta = target - entity.collision_box_center();
        if delta != Vec2::ZERO {
            entity.set_angle(delta.angle());
        }
    }

    /// Advance one tick. Returns whether the navigator is still navigating.
    pub fn update<P>(&mut self, entity: &mut dyn MobileEntity, physics: &mut P) -> bool
    where
        P: PhysicsLayer + ?Sized,
    {
        if self.path.is_none() {
            return false;
        }

        if self.cancel_conditions.iter().any(|c| c(&*entity)) {
            self.stop();
            return false;
        }

        let Some(waypoint) = self.current_waypoint() else {
            let target = self.path.as_ref().map(Path::target).unwrap_or_default();
            self.notify(&NavigationEvent::Arrived { target });
            self.stop();
            return false;
        };

        let center = entity.collision_box_center();
        let distance = center.distance(waypoint);
        if distance < self.acceptable_error {
            self.waypoint += 1;
            return true;
        }

        Self::rotate_towards(entity, waypoint);
        let step = distance.min(entity.tick_velocity());
        let direction = (waypoint - center).normalized();
        let target = entity.location() + direction * step;
        if !physics.move_entity(entity, target) {
            log::trace!("navigation step toward ({:.1}, {:.1}) blocked", waypoint.x, waypoint.y);
        }
        true
    }
}
