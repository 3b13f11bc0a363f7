//! Pathforge - grid pathfinding and force-driven movement for 2D games.
//!
//! A [`NavGrid`] discretizes the world, an [`AStarPathFinder`] turns a target
//! point into a [`Path`], an [`EntityNavigator`] walks an entity along it and a
//! [`MovementController`] integrates velocity and [`Force`]s every tick.
//! Collision resolution is delegated to a [`PhysicsLayer`].

pub mod behavior;
pub mod config;
pub mod entities;
pub mod error;
pub mod force;
pub mod grid;
pub mod math;
pub mod movement;
pub mod navigator;
pub mod pathfinding;
pub mod physics;

pub use crate::behavior::{BehaviorMachine, StateChange};
pub use crate::config::NavConfig;
pub use crate::entities::{CollisionEntity, MobileEntity, Mover};
pub use crate::error::{NavError, NavResult};
pub use crate::force::{Force, ForceSender};
pub use crate::grid::{GridCoord, NavGrid, Node};
pub use crate::math::{Rect, Vec2};
pub use crate::movement::{MovementController, MovementState, TickContext, TickReport};
pub use crate::navigator::{EntityNavigator, NavigationEvent};
pub use crate::pathfinding::{AStarPathFinder, Path, PathFinder, PathKind};
pub use crate::physics::{CollisionLayer, CollisionType, PhysicsLayer, StaticCollisionWorld};
