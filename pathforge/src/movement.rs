//! Per-entity movement integration.
//!
//! A [`MovementController`] owns its entity and, once per tick, combines the
//! entity's own velocity with all active [`Force`]s into a single move that is
//! resolved by the physics layer.

use crossbeam_channel::Receiver;

use crate::entities::MobileEntity;
use crate::force::{force_channel, Force, ForceSender};
use crate::math::Vec2;
use crate::physics::PhysicsLayer;

/// Timing of a single game tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickContext {
    /// Milliseconds since the previous tick.
    pub delta_time_ms: f64,
    pub time_scale: f64,
}

impl TickContext {
    pub fn new(delta_time_ms: f64, time_scale: f64) -> Self {
        Self {
            delta_time_ms,
            time_scale,
        }
    }

    /// A tick of the nominal length for the given update rate.
    pub fn from_update_rate(updates_per_second: u32) -> Self {
        Self::new(1000.0 / f64::from(updates_per_second.max(1)), 1.0)
    }

    /// Scaled delta time in milliseconds.
    pub fn scaled_delta(&self) -> f64 {
        self.delta_time_ms * self.time_scale
    }
}

/// Observable movement state after an update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MovementState {
    #[default]
    Idle,
    /// Moving under the entity's own velocity only.
    Moving,
    /// One or more forces contributed to this tick's move.
    ForceDriven,
}

/// What happened during one [`MovementController::update`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub state: MovementState,
    /// `None` when no move was attempted, otherwise the physics result.
    pub moved: Option<bool>,
    /// Forces that ended and were removed during this tick.
    pub ended: Vec<Force>,
}

type MovementPredicate<E> = Box<dyn Fn(&E) -> bool + Send>;

pub struct MovementController<E: MobileEntity> {
    entity: E,
    active_forces: Vec<Force>,
    sender: ForceSender,
    incoming: Receiver<Force>,
    movement_predicates: Vec<MovementPredicate<E>>,
    dx: f64,
    dy: f64,
    velocity: f64,
    move_angle: f64,
    state: MovementState,
}

impl<E: MobileEntity> MovementController<E> {
    pub fn new(entity: E) -> Self {
        let (sender, incoming) = force_channel();
        Self {
            entity,
            active_forces: Vec::new(),
            sender,
            incoming,
            movement_predicates: Vec::new(),
            dx: 0.0,
            dy: 0.0,
            velocity: 0.0,
            move_angle: 0.0,
            state: MovementState::Idle,
        }
    }

    pub fn entity(&self) -> &E {
        &self.entity
    }

    pub fn entity_mut(&mut self) -> &mut E {
        &mut self.entity
    }

    pub fn into_entity(self) -> E {
        self.entity
    }

    /// Add a force. Forces are never merged, even with the same origin.
    pub fn apply(&mut self, force: Force) {
        log::trace!("applying {}", force);
        self.active_forces.push(force);
    }

    /// Handle for adding forces from another thread.
    pub fn force_sender(&self) -> ForceSender {
        self.sender.clone()
    }

    pub fn active_forces(&self) -> &[Force] {
        &self.active_forces
    }

    /// First active force with the given identifier.
    pub fn force(&self, identifier: &str) -> Option<&Force> {
        if identifier.is_empty() {
            return None;
        }
        self.active_forces
            .iter()
            .find(|f| f.identifier() == Some(identifier))
    }

    pub fn force_mut(&mut self, identifier: &str) -> Option<&mut Force> {
        if identifier.is_empty() {
            return None;
        }
        self.active_forces
            .iter_mut()
            .find(|f| f.identifier() == Some(identifier))
    }

    /// Register a check that must pass for the entity to move on its own.
    pub fn on_movement_check<F>(&mut self, predicate: F)
    where
        F: Fn(&E) -> bool + Send + 'static,
    {
        self.movement_predicates.push(Box::new(predicate));
    }

    pub fn dx(&self) -> f64 {
        self.dx
    }

    pub fn set_dx(&mut self, dx: f64) {
        self.dx = dx;
    }

    pub fn dy(&self) -> f64 {
        self.dy
    }

    pub fn set_dy(&mut self, dy: f64) {
        self.dy = dy;
    }

    /// Movement direction of the last tick in radians.
    pub fn move_angle(&self) -> f64 {
        self.move_angle
    }

    /// Current velocity in world units per tick.
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Set the velocity, clamped to the entity's tick velocity.
    pub fn set_velocity(&mut self, velocity: f64) {
        let max = self.entity.tick_velocity().abs();
        self.velocity = velocity.clamp(-max, max);
    }

    pub fn state(&self) -> MovementState {
        self.state
    }

    fn is_movement_allowed(&self) -> bool {
        self.movement_predicates.iter().all(|p| p(&self.entity))
    }

    /// Advance one tick.
    pub fn update<P>(&mut self, physics: &mut P, tick: TickContext) -> TickReport
    where
        P: PhysicsLayer + ?Sized,
    {
        self.active_forces.extend(self.incoming.try_iter());

        let mut report = TickReport::default();
        self.remove_ended_forces(&mut report.ended);

        let own = self.own_displacement(tick);
        let (forces, force_driven) = self.combine_active_forces(tick);
        let combined = own + forces;

        if own == Vec2::ZERO && !force_driven {
            self.remove_ended_forces(&mut report.ended);
            self.state = MovementState::Idle;
            report.state = self.state;
            return report;
        }

        let target = self.entity.location() + combined;
        let moved = if force_driven {
            self.move_with_forces(physics, target)
        } else {
            physics.move_entity(&mut self.entity, target)
        };

        if moved && own != Vec2::ZERO && self.entity.turn_on_move() {
            self.entity.set_angle(self.move_angle);
        }

        for force in &mut self.active_forces {
            if !moved && force.cancel_on_collision() {
                force.end();
            }
            if force.cancel_on_reached() && force.has_reached(&self.entity) {
                force.end();
            }
        }
        self.remove_ended_forces(&mut report.ended);

        self.state = if force_driven {
            MovementState::ForceDriven
        } else {
            MovementState::Moving
        };
        report.state = self.state;
        report.moved = Some(moved);
        report
    }

    /// Resolve a move without letting the forces turn the entity.
    fn move_with_forces<P>(&mut self, physics: &mut P, target: Vec2) -> bool
    where
        P: PhysicsLayer + ?Sized,
    {
        let turn_on_move = self.entity.turn_on_move();
        if turn_on_move {
            self.entity.set_turn_on_move(false);
        }
        let moved = physics.move_entity(&mut self.entity, target);
        if turn_on_move {
            self.entity.set_turn_on_move(true);
        }
        moved
    }

    /// Displacement from the entity's own velocity for this tick.
    fn own_displacement(&mut self, tick: TickContext) -> Vec2 {
        if !self.is_movement_allowed() {
            self.velocity = 0.0;
            self.dx = 0.0;
            self.dy = 0.0;
            return Vec2::ZERO;
        }

        let delta_time = tick.scaled_delta();
        let acceleration = self.entity.acceleration_per_tick(delta_time);
        let deceleration = self.entity.deceleration_per_tick(delta_time, self.velocity);

        let input = Vec2::new(self.dx, self.dy);
        self.dx = 0.0;
        self.dy = 0.0;

        let delta_velocity = input.length().min(acceleration);
        if delta_velocity < 0.0 {
            // negative acceleration slows the entity down but never reverses it
            self.set_velocity((self.velocity + delta_velocity).max(0.0));
        } else if delta_velocity > 0.0 {
            self.set_velocity(self.velocity + delta_velocity);
            if input != Vec2::ZERO {
                self.move_angle = input.angle();
            }
        } else {
            // no input: keep heading while slowing down, never below zero
            self.set_velocity((self.velocity - deceleration).max(0.0));
        }

        if self.velocity == 0.0 {
            self.move_angle = 0.0;
            return Vec2::ZERO;
        }

        Vec2::from_angle(self.move_angle) * self.velocity
    }

    /// Sum of all force contributions. Forces already reached are ended
    /// instead of contributing.
    fn combine_active_forces(&mut self, tick: TickContext) -> (Vec2, bool) {
        let center = self.entity.collision_box_center();
        let scale = tick.delta_time_ms * 0.001 * tick.time_scale;

        let mut combined = Vec2::ZERO;
        let mut contributing = false;
        for force in &mut self.active_forces {
            if force.has_ended() {
                continue;
            }
            if force.cancel_on_reached() && force.has_reached(&self.entity) {
                force.end();
                continue;
            }

            let direction = (force.location() - center).normalized();
            combined += direction * (force.strength() * scale);
            contributing = true;
        }
        (combined, contributing)
    }

    fn remove_ended_forces(&mut self, ended: &mut Vec<Force>) {
        if !self.active_forces.iter().any(Force::has_ended) {
            return;
        }
        let (done, active): (Vec<Force>, Vec<Force>) = self
            .active_forces
            .drain(..)
            .partition(Force::has_ended);
        self.active_forces = active;
        for force in &done {
            log::debug!("force ended: {}", force);
        }
        ended.extend(done);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{CollisionEntity, Mover};
    use crate::math::Rect;
    use crate::physics::{CollisionLayer, CollisionType};

    /// Physics double that records requested targets and returns a fixed result.
    struct ScriptedPhysics {
        result: bool,
        targets: Vec<Vec2>,
    }

    impl ScriptedPhysics {
        fn new(result: bool) -> Self {
            Self {
                result,
                targets: Vec::new(),
            }
        }
    }

    impl CollisionLayer for ScriptedPhysics {
        fn collision_boxes(&self, _collision: CollisionType) -> Vec<Rect> {
            Vec::new()
        }
    }

    impl PhysicsLayer for ScriptedPhysics {
        fn move_entity(&mut self, entity: &mut dyn MobileEntity, target: Vec2) -> bool {
            self.targets.push(target);
            if self.result {
                if entity.turn_on_move() {
                    entity.set_angle((target - entity.location()).angle());
                }
                entity.set_location(target);
            }
            self.result
        }
    }

    /// Mover that records every `set_turn_on_move` call.
    struct RecordingMover {
        inner: Mover,
        turn_calls: Vec<bool>,
    }

    impl CollisionEntity for RecordingMover {
        fn location(&self) -> Vec2 {
            self.inner.location()
        }
        fn set_location(&mut self, location: Vec2) {
            self.inner.set_location(location);
        }
        fn collision_box(&self) -> Rect {
            self.inner.collision_box()
        }
    }

    impl MobileEntity for RecordingMover {
        fn velocity(&self) -> f64 {
            self.inner.velocity
        }
        fn updates_per_second(&self) -> u32 {
            self.inner.updates_per_second
        }
        fn acceleration(&self) -> f64 {
            self.inner.acceleration
        }
        fn deceleration(&self) -> f64 {
            self.inner.deceleration
        }
        fn turn_on_move(&self) -> bool {
            self.inner.turn_on_move
        }
        fn set_turn_on_move(&mut self, turn_on_move: bool) {
            self.turn_calls.push(turn_on_move);
            self.inner.turn_on_move = turn_on_move;
        }
        fn angle(&self) -> f64 {
            self.inner.angle
        }
        fn set_angle(&mut self, angle: f64) {
            self.inner.angle = angle;
        }
    }

    fn creature() -> Mover {
        Mover::new(Vec2::new(100.0, 100.0), Vec2::new(8.0, 8.0))
            .with_velocity(39.0)
            .with_acceleration(42.0)
            .with_deceleration(20.0)
    }

    fn tick() -> TickContext {
        TickContext::new(20.0, 1.0)
    }

    #[test]
    fn update_consumes_input() {
        let mut controller = MovementController::new(creature());
        controller.set_dx(1.0);
        controller.set_dy(-1.0);
        controller.update(&mut ScriptedPhysics::new(true), tick());
        assert_eq!(controller.dx(), 0.0);
        assert_eq!(controller.dy(), 0.0);
    }

    #[test]
    fn movement_not_allowed_zeroes_velocity() {
        let mut controller = MovementController::new(creature());
        controller.set_velocity(0.5);
        controller.on_movement_check(|_| false);
        let report = controller.update(&mut ScriptedPhysics::new(true), tick());
        assert_eq!(controller.velocity(), 0.0);
        assert_eq!(report.state, MovementState::Idle);
        assert_eq!(report.moved, None);
    }

    #[test]
    fn negative_acceleration_decays_velocity() {
        let mut controller = MovementController::new(creature().with_acceleration(-1000.0));
        controller.set_velocity(300.0);
        assert!((controller.velocity() - 0.78).abs() < 1e-12);

        controller.update(&mut ScriptedPhysics::new(true), TickContext::new(10.0, 2.0));

        assert!((controller.velocity() - 0.7644).abs() < 1e-9);
        assert!(controller.velocity() >= 0.0);
    }

    #[test]
    fn negative_acceleration_stops_at_zero() {
        let mut physics = ScriptedPhysics::new(true);
        let mut controller = MovementController::new(creature().with_acceleration(-1000.0));
        controller.set_velocity(300.0);

        let mut last_x = controller.entity().location().x;
        for _ in 0..80 {
            controller.update(&mut physics, TickContext::new(10.0, 2.0));
            assert!(controller.velocity() >= 0.0, "velocity {}", controller.velocity());
            let x = controller.entity().location().x;
            assert!(x >= last_x, "moved backwards from {} to {}", last_x, x);
            last_x = x;
        }

        assert_eq!(controller.velocity(), 0.0);
        assert_eq!(controller.state(), MovementState::Idle);
        assert!(physics.targets.iter().all(|t| t.x >= 100.0));
    }

    #[test]
    fn deceleration_clamps_at_zero() {
        let mut controller = MovementController::new(creature().with_deceleration(1.0));
        controller.set_velocity(0.1);
        controller.update(&mut ScriptedPhysics::new(true), tick());
        assert_eq!(controller.velocity(), 0.0);
        assert_eq!(controller.state(), MovementState::Idle);
    }

    #[test]
    fn input_accelerates_toward_direction() {
        let mut physics = ScriptedPhysics::new(true);
        let mut controller = MovementController::new(creature());
        controller.set_dx(0.0);
        controller.set_dy(1.0);
        let report = controller.update(&mut physics, tick());

        assert_eq!(report.state, MovementState::Moving);
        assert_eq!(report.moved, Some(true));
        assert!(controller.velocity() > 0.0);
        let moved_to = physics.targets[0];
        assert!((moved_to.x - 100.0).abs() < 1e-9);
        assert!(moved_to.y > 100.0);
        assert!((controller.entity().angle - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn forces_move_entity_to_combined_target() {
        let mut physics = ScriptedPhysics::new(true);
        let mut entity = creature().with_velocity(0.0);
        entity.location = Vec2::new(1.0, 2.0);
        let center = entity.collision_box_center();
        let mut controller = MovementController::new(entity);

        // 250 units/sec for 20ms along (0.8, 0.6)
        let force = Force::new(center + Vec2::new(80.0, 60.0), 250.0, 1.0);
        controller.apply(force);
        assert_eq!(controller.active_forces().len(), 1);

        let report = controller.update(&mut physics, tick());

        assert_eq!(physics.targets.len(), 1);
        assert!((physics.targets[0].x - 5.0).abs() < 1e-9);
        assert!((physics.targets[0].y - 5.0).abs() < 1e-9);
        assert!(report.ended.is_empty());
        assert_eq!(report.state, MovementState::ForceDriven);
        assert_eq!(controller.active_forces().len(), 1);
    }

    #[test]
    fn collision_ends_only_cancelling_forces() {
        let mut physics = ScriptedPhysics::new(false);
        let mut controller = MovementController::new(creature());

        let penetrating = Force::new(Vec2::ZERO, 3.0, 1.0)
            .with_cancel_on_collision(false)
            .with_identifier("penetrating");
        let cancelling = Force::new(Vec2::ZERO, 1.0, 1.0).with_identifier("cancelling");
        controller.apply(penetrating);
        controller.apply(cancelling);
        assert_eq!(controller.active_forces().len(), 2);

        let report = controller.update(&mut physics, tick());

        assert_eq!(report.moved, Some(false));
        assert_eq!(report.ended.len(), 1);
        assert_eq!(report.ended[0].identifier(), Some("cancelling"));
        assert!(report.ended[0].has_ended());
        assert!(controller.force("cancelling").is_none());
        assert!(controller.force("penetrating").is_some());

        let next = controller.update(&mut physics, tick());
        assert!(next.ended.is_empty());
        assert_eq!(controller.active_forces().len(), 1);
    }

    #[test]
    fn forces_suspend_turn_on_move() {
        let entity = RecordingMover {
            inner: creature().with_turn_on_move(true),
            turn_calls: Vec::new(),
        };
        let mut controller = MovementController::new(entity);
        controller.apply(Force::new(Vec2::ZERO, 1.0, 1.0));
        let angle_before = controller.entity().angle();

        controller.update(&mut ScriptedPhysics::new(true), tick());

        assert_eq!(controller.entity().turn_calls, vec![false, true]);
        assert!(controller.entity().turn_on_move());
        assert_eq!(controller.entity().angle(), angle_before);
    }

    #[test]
    fn reached_force_is_removed() {
        let mut physics = ScriptedPhysics::new(true);
        let entity = creature();
        let center = entity.collision_box_center();
        let mut controller = MovementController::new(entity);
        controller.apply(Force::new(center, 100.0, 2.0).with_identifier("here"));

        let report = controller.update(&mut physics, tick());

        assert_eq!(report.ended.len(), 1);
        assert!(controller.active_forces().is_empty());
        assert_eq!(report.state, MovementState::Idle);
        assert!(physics.targets.is_empty());
    }

    #[test]
    fn forces_with_same_origin_stay_independent() {
        let mut controller = MovementController::new(creature());
        controller.apply(Force::new(Vec2::ZERO, 1.0, 1.0));
        controller.apply(Force::new(Vec2::ZERO, 1.0, 1.0));
        assert_eq!(controller.active_forces().len(), 2);
    }

    #[test]
    fn externally_ended_force_is_dropped_next_tick() {
        let mut controller = MovementController::new(creature());
        controller.apply(Force::new(Vec2::ZERO, 1.0, 1.0).with_identifier("pull"));
        controller.force_mut("pull").unwrap().end();

        let report = controller.update(&mut ScriptedPhysics::new(true), tick());
        assert_eq!(report.ended.len(), 1);
        assert!(controller.force("pull").is_none());
        assert!(controller.force("").is_none());
    }

    #[test]
    fn forces_from_other_threads_are_picked_up() {
        let mut controller = MovementController::new(creature());
        let sender = controller.force_sender();
        std::thread::spawn(move || {
            assert!(sender.send(Force::new(Vec2::ZERO, 10.0, 1.0).with_identifier("remote")));
        })
        .join()
        .unwrap();

        let report = controller.update(&mut ScriptedPhysics::new(true), tick());
        assert_eq!(report.state, MovementState::ForceDriven);
        assert!(controller.force("remote").is_some());
    }
}
