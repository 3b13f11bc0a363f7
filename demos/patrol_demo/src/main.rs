use std::path::PathBuf;

use anyhow::{Context, Result};
use pathforge::{
    AStarPathFinder, BehaviorMachine, CollisionEntity, EntityNavigator, Force, MovementController,
    Mover, NavConfig, NavGrid, NavigationEvent, Rect, StaticCollisionWorld, TickContext, Vec2,
};
use serde::Deserialize;

const DEFAULT_SCENARIO: &str = include_str!("../scenarios/courtyard.json");

#[derive(Debug, Deserialize)]
struct Scenario {
    world_width: f64,
    world_height: f64,
    #[serde(default)]
    config: NavConfig,
    #[serde(default)]
    obstacles: Vec<Rect>,
    start: Vec2,
    mover_size: Vec2,
    velocity: f64,
    patrol: Vec<Vec2>,
    ticks: u32,
    knockback: Option<Knockback>,
}

#[derive(Debug, Deserialize)]
struct Knockback {
    tick: u32,
    /// Force location relative to the mover's center at `tick`.
    offset: Vec2,
    strength: f64,
    size: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Patrol {
    Idle,
    Seeking,
    Knockback,
}

struct Senses {
    navigating: bool,
    knocked_back: bool,
}

fn load_scenario() -> Result<Scenario> {
    match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read scenario {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("failed to parse scenario {}", path.display()))
        }
        None => serde_json::from_str(DEFAULT_SCENARIO).context("failed to parse built-in scenario"),
    }
}

fn behavior() -> BehaviorMachine<Patrol, Senses> {
    let mut machine = BehaviorMachine::new(Patrol::Idle);
    machine
        .add_transition(Patrol::Idle, Patrol::Seeking, 0, |s: &Senses| !s.knocked_back)
        .add_transition(Patrol::Seeking, Patrol::Knockback, 10, |s: &Senses| s.knocked_back)
        .add_transition(Patrol::Seeking, Patrol::Idle, 0, |s: &Senses| !s.navigating)
        .add_transition(Patrol::Knockback, Patrol::Idle, 0, |s: &Senses| !s.knocked_back);
    machine
}

fn main() -> Result<()> {
    env_logger::init();

    let scenario = load_scenario()?;
    anyhow::ensure!(!scenario.patrol.is_empty(), "scenario has no patrol points");
    scenario.config.validate()?;

    let mut world = StaticCollisionWorld::with_bounds(Rect::new(
        0.0,
        0.0,
        scenario.world_width,
        scenario.world_height,
    ));
    for obstacle in &scenario.obstacles {
        world.add_static(*obstacle);
    }

    let grid = NavGrid::from_collision(
        scenario.world_width,
        scenario.world_height,
        &scenario.config,
        &world,
    )?;
    log::info!(
        "grid {}x{} ({} obstacles)",
        grid.width(),
        grid.height(),
        scenario.obstacles.len()
    );

    // The level layout is fixed, so the path finder plans against a snapshot
    // while the live world resolves movement.
    let layout = world.clone();
    let finder = AStarPathFinder::with_config(&grid, &layout, &scenario.config);

    let mover = Mover::new(Vec2::ZERO, scenario.mover_size)
        .with_velocity(scenario.velocity)
        .with_updates_per_second(scenario.config.updates_per_second)
        .centered_at(scenario.start);
    let mut controller = MovementController::new(mover);

    let mut navigator = EntityNavigator::with_config(&scenario.config);
    navigator.add_navigation_listener(|event| {
        if let NavigationEvent::Arrived { target } = event {
            log::info!("arrived at ({:.1}, {:.1})", target.x, target.y);
        }
    });

    let mut machine = behavior();
    let tick = TickContext::from_update_rate(scenario.config.updates_per_second);
    let mut next_point = 0usize;
    let mut arrivals = 0usize;

    for frame in 0..scenario.ticks {
        if let Some(knockback) = &scenario.knockback {
            if frame == knockback.tick {
                let center = controller.entity().collision_box_center();
                let force = Force::new(center + knockback.offset, knockback.strength, knockback.size)
                    .with_identifier("knockback");
                log::info!("tick {}: {}", frame, force);
                controller.apply(force);
            }
        }

        let senses = Senses {
            navigating: navigator.is_navigating(),
            knocked_back: controller.force("knockback").is_some(),
        };
        if let Some(change) = machine.update(&senses) {
            log::info!("tick {}: {:?} -> {:?}", frame, change.from, change.to);
            match change.to {
                Patrol::Seeking => {
                    let target = scenario.patrol[next_point];
                    let path = navigator.navigate(target, &finder, controller.entity())?;
                    log::info!(
                        "tick {}: {:?} path to ({:.1}, {:.1}) with {} points, {:.1} long",
                        frame,
                        path.kind(),
                        target.x,
                        target.y,
                        path.len(),
                        path.length()
                    );
                }
                Patrol::Knockback => navigator.stop(),
                Patrol::Idle => {
                    if change.from == Patrol::Seeking {
                        arrivals += 1;
                        next_point = (next_point + 1) % scenario.patrol.len();
                    }
                }
            }
        }

        if machine.current() == Patrol::Seeking {
            navigator.update(controller.entity_mut(), &mut world);
        }

        let report = controller.update(&mut world, tick);
        for force in &report.ended {
            log::info!("tick {}: force ended: {}", frame, force);
        }
        log::trace!(
            "tick {}: {:?} at {:?}",
            frame,
            report.state,
            controller.entity().collision_box_center()
        );
    }

    let center = controller.entity().collision_box_center();
    log::info!(
        "finished {} ticks with {} arrivals, mover at ({:.1}, {:.1})",
        scenario.ticks,
        arrivals,
        center.x,
        center.y
    );
    Ok(())
}
