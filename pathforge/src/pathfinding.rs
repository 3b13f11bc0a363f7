//! A* pathfinding over a [`NavGrid`].

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::config::NavConfig;
use crate::entities::CollisionEntity;
use crate::error::{NavError, NavResult};
use crate::grid::{GridCoord, NavGrid};
use crate::math::{Rect, Vec2};
use crate::physics::{CollisionLayer, CollisionType};

/// How a [`Path`] was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathKind {
    /// Nothing blocks the straight line between start and target.
    Direct,
    /// Route found by grid search.
    Search,
    /// No route exists; the path is the straight line as a pass-through.
    Fallback,
}

/// Ordered waypoints from a start to a target. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    start: Vec2,
    target: Vec2,
    points: Vec<Vec2>,
    kind: PathKind,
}

impl Path {
    pub fn new(start: Vec2, target: Vec2, points: Vec<Vec2>, kind: PathKind) -> Self {
        Self {
            start,
            target,
            points,
            kind,
        }
    }

    /// Two-point path straight from `start` to `target`.
    pub fn direct(start: Vec2, target: Vec2) -> Self {
        Self::new(start, target, vec![start, target], PathKind::Direct)
    }

    fn fallback(start: Vec2, target: Vec2) -> Self {
        Self::new(start, target, vec![start, target], PathKind::Fallback)
    }

    pub fn start(&self) -> Vec2 {
        self.start
    }

    /// The requested target. The last waypoint may differ when the target
    /// cell itself was not walkable.
    pub fn target(&self) -> Vec2 {
        self.target
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn kind(&self) -> PathKind {
        self.kind
    }

    /// True if no route was found and this path is only a pass-through.
    pub fn is_fallback(&self) -> bool {
        self.kind == PathKind::Fallback
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total length of all segments.
    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| w[0].distance(w[1]))
            .sum()
    }
}

/// Computes routes for entities.
pub trait PathFinder {
    /// Find a route from the mover's collision box center to `target`.
    ///
    /// Unreachable targets are not an error; a non-finite target is.
    fn find_path(&self, mover: &dyn CollisionEntity, target: Vec2) -> NavResult<Path>;
}

/// Grid-based A* path finder with a straight-line shortcut.
pub struct AStarPathFinder<'a> {
    grid: &'a NavGrid,
    collision: &'a dyn CollisionLayer,
    path_margin: f64,
}

#[derive(Clone, Copy)]
struct NodeWithCost {
    index: usize,
    g_cost: f64,
    h_cost: f64,
    seq: u64, // insertion order, breaks remaining ties
}

impl NodeWithCost {
    fn f_cost(&self) -> f64 {
        self.g_cost + self.h_cost
    }
}

impl PartialEq for NodeWithCost {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NodeWithCost {}

impl Ord for NodeWithCost {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap: lowest f, then lowest h, then oldest entry
        other
            .f_cost()
            .total_cmp(&self.f_cost())
            .then_with(|| other.h_cost.total_cmp(&self.h_cost))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for NodeWithCost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'a> AStarPathFinder<'a> {
    pub fn new(grid: &'a NavGrid, collision: &'a dyn CollisionLayer) -> Self {
        Self {
            grid,
            collision,
            path_margin: NavConfig::default().path_margin,
        }
    }

    pub fn with_config(
        grid: &'a NavGrid,
        collision: &'a dyn CollisionLayer,
        config: &NavConfig,
    ) -> Self {
        Self {
            grid,
            collision,
            path_margin: config.path_margin,
        }
    }

    #[must_use]
    pub fn with_path_margin(mut self, margin: f64) -> Self {
        self.path_margin = margin;
        self
    }

    pub fn grid(&self) -> &NavGrid {
        self.grid
    }

    /// Inflate `rect` so a line that clears it also clears the mover's box.
    fn apply_path_margin(&self, mover_box: &Rect, rect: &Rect) -> Rect {
        rect.expanded(
            mover_box.width * 0.5 + self.path_margin,
            mover_box.height * 0.5 + self.path_margin,
        )
    }

    /// True if the segment from `start` to `target` touches static geometry,
    /// or comes within the path margin of any box other than the mover's own.
    fn intersects_any_collision_box(
        &self,
        mover: &dyn CollisionEntity,
        start: Vec2,
        target: Vec2,
    ) -> bool {
        // static geometry may be more than boxes; let the layer answer for it
        if self.collision.collides_line(start, target, CollisionType::Static) {
            return true;
        }

        let mover_box = mover.collision_box();
        self.collision
            .collision_boxes(CollisionType::Any)
            .iter()
            .filter(|b| **b != mover_box)
            .any(|collision_box| {
                let with_margin = self.apply_path_margin(&mover_box, collision_box);
                // a start inside the margin would always hit it
                let checked = if with_margin.contains(start) {
                    collision_box
                } else {
                    &with_margin
                };
                checked.intersects_segment(start, target)
            })
    }

    fn is_direct_path_clear(&self, mover: &dyn CollisionEntity, start: Vec2, target: Vec2) -> bool {
        !self.intersects_any_collision_box(mover, start, target)
            && self.grid.is_line_walkable(start, target)
    }

    /// Plain A* between two walkable grid coordinates.
    ///
    /// Returns the chain of coordinates from `start` to `goal`, both included.
    pub fn search(&self, start: GridCoord, goal: GridCoord) -> Option<Vec<GridCoord>> {
        let grid = self.grid;
        let start_index = grid.node_index(&start)?;
        let goal_index = grid.node_index(&goal)?;
        let goal_node = grid.node_by_index(goal_index);

        let count = grid.node_count();
        let mut g_score = vec![f64::INFINITY; count];
        let mut came_from: Vec<Option<usize>> = vec![None; count];
        let mut closed = vec![false; count];
        let mut open_set = BinaryHeap::new();
        let mut seq = 0u64;

        g_score[start_index] = 0.0;
        open_set.push(NodeWithCost {
            index: start_index,
            g_cost: 0.0,
            h_cost: grid.node_by_index(start_index).costs(goal_node),
            seq,
        });

        let mut expanded = 0usize;
        while let Some(current) = open_set.pop() {
            if closed[current.index] || current.g_cost > g_score[current.index] {
                continue; // stale entry
            }

            if current.index == goal_index {
                let mut chain = vec![goal];
                let mut index = goal_index;
                while let Some(prev) = came_from[index] {
                    chain.push(grid.node_by_index(prev).coord());
                    index = prev;
                }
                chain.reverse();
                log::trace!(
                    "A* reached {:?} after expanding {} nodes ({} steps)",
                    goal,
                    expanded,
                    chain.len()
                );
                return Some(chain);
            }

            closed[current.index] = true;
            expanded += 1;

            let current_node = grid.node_by_index(current.index);
            let current_coord = current_node.coord();
            for neighbor in grid.neighbor_coords(&current_coord, grid.is_diagonal_movement_allowed()) {
                if !grid.can_traverse(&current_coord, &neighbor) {
                    continue;
                }
                let Some(neighbor_index) = grid.node_index(&neighbor) else {
                    continue;
                };
                if closed[neighbor_index] {
                    continue;
                }

                let neighbor_node = grid.node_by_index(neighbor_index);
                let tentative_g =
                    current.g_cost + current_node.costs(neighbor_node) + neighbor_node.penalty();

                if tentative_g < g_score[neighbor_index] {
                    came_from[neighbor_index] = Some(current.index);
                    g_score[neighbor_index] = tentative_g;
                    seq += 1;
                    open_set.push(NodeWithCost {
                        index: neighbor_index,
                        g_cost: tentative_g,
                        h_cost: neighbor_node.costs(goal_node),
                        seq,
                    });
                }
            }
        }

        log::trace!("A* exhausted {} nodes without reaching {:?}", expanded, goal);
        None
    }
}

impl PathFinder for AStarPathFinder<'_> {
    fn find_path(&self, mover: &dyn CollisionEntity, target: Vec2) -> NavResult<Path> {
        if !target.is_finite() {
            return Err(NavError::InvalidTarget {
                x: target.x,
                y: target.y,
            });
        }

        let start = mover.collision_box_center();
        if start == target || self.is_direct_path_clear(mover, start, target) {
            return Ok(Path::direct(start, target));
        }

        let (Some(start_node), Some(target_node)) =
            (self.grid.node_at(start), self.grid.node_at(target))
        else {
            log::debug!("path endpoint outside the grid, falling back to a direct path");
            return Ok(Path::fallback(start, target));
        };

        // simple fallback if the target node is not walkable
        let mut goal = target_node.coord();
        let redirected = !target_node.is_walkable();
        if redirected {
            match self
                .grid
                .neighbors(target_node)
                .into_iter()
                .find(|n| n.is_walkable())
            {
                Some(neighbor) => goal = neighbor.coord(),
                None => return Ok(Path::fallback(start, target)),
            }
        }

        if start_node.coord() == goal {
            return Ok(Path::fallback(start, target));
        }

        let Some(chain) = self.search(start_node.coord(), goal) else {
            log::debug!(
                "no route from ({:.1}, {:.1}) to ({:.1}, {:.1})",
                start.x,
                start.y,
                target.x,
                target.y
            );
            return Ok(Path::fallback(start, target));
        };

        let last = if redirected {
            self.grid
                .node_by_coord(goal)
                .map(|n| n.center())
                .unwrap_or(target)
        } else {
            target
        };

        let mut points = Vec::with_capacity(chain.len());
        points.push(start);
        points.extend(
            chain[1..chain.len() - 1]
                .iter()
                .filter_map(|c| self.grid.node_by_coord(*c))
                .map(|n| n.center()),
        );
        points.push(last);

        Ok(Path::new(start, target, points, PathKind::Search))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Mover;
    use crate::physics::StaticCollisionWorld;

    fn mover_at(center: Vec2) -> Mover {
        Mover::new(Vec2::ZERO, Vec2::new(4.0, 4.0)).centered_at(center)
    }

    /// 100x100 world with a wall at x 40..50 from y 0 to 70.
    fn walled() -> (NavGrid, StaticCollisionWorld) {
        let mut world = StaticCollisionWorld::new();
        world.add_static(Rect::new(40.0, 0.0, 10.0, 70.0));
        let config = NavConfig::new().with_cell_size(10.0);
        let grid = NavGrid::from_collision(100.0, 100.0, &config, &world).unwrap();
        (grid, world)
    }

    #[test]
    fn same_point_returns_direct_path() {
        let (grid, world) = walled();
        let finder = AStarPathFinder::new(&grid, &world);
        let p = Vec2::new(15.0, 15.0);
        let path = finder.find_path(&mover_at(p), p).unwrap();
        assert_eq!(path.start(), p);
        assert_eq!(path.target(), p);
    }

    #[test]
    fn unobstructed_path_is_direct() {
        let (grid, world) = walled();
        let finder = AStarPathFinder::new(&grid, &world);
        let start = Vec2::new(15.0, 85.0);
        let target = Vec2::new(85.0, 85.0);
        let path = finder.find_path(&mover_at(start), target).unwrap();
        assert_eq!(path.kind(), PathKind::Direct);
        assert_eq!(path.points(), &[start, target]);
    }

    #[test]
    fn routes_around_wall() {
        let (grid, world) = walled();
        let finder = AStarPathFinder::new(&grid, &world);
        let start = Vec2::new(15.0, 15.0);
        let target = Vec2::new(85.0, 15.0);
        let path = finder.find_path(&mover_at(start), target).unwrap();

        assert_eq!(path.kind(), PathKind::Search);
        assert_eq!(path.points().first(), Some(&start));
        assert_eq!(path.points().last(), Some(&target));
        assert!(path.len() > 2);
        // every intermediate waypoint is a walkable cell center
        for p in &path.points()[1..path.len() - 1] {
            let node = grid.node_at(*p).unwrap();
            assert!(node.is_walkable());
            assert_eq!(node.center(), *p);
        }
        // the route has to pass below the wall
        assert!(path.points().iter().any(|p| p.y >= 70.0));
    }

    #[test]
    fn unreachable_target_falls_back() {
        let mut world = StaticCollisionWorld::new();
        // box the target in completely
        world.add_static(Rect::new(60.0, 60.0, 30.0, 10.0));
        world.add_static(Rect::new(60.0, 90.0, 30.0, 10.0));
        world.add_static(Rect::new(60.0, 70.0, 10.0, 20.0));
        world.add_static(Rect::new(80.0, 70.0, 10.0, 20.0));
        let config = NavConfig::new().with_cell_size(10.0);
        let grid = NavGrid::from_collision(100.0, 100.0, &config, &world).unwrap();

        let finder = AStarPathFinder::new(&grid, &world);
        let start = Vec2::new(15.0, 15.0);
        let target = Vec2::new(75.0, 75.0);
        let path = finder.find_path(&mover_at(start), target).unwrap();
        assert!(path.is_fallback());
        assert_eq!(path.points(), &[start, target]);
    }

    #[test]
    fn non_finite_target_is_rejected() {
        let (grid, world) = walled();
        let finder = AStarPathFinder::new(&grid, &world);
        let mover = mover_at(Vec2::new(15.0, 15.0));
        assert!(matches!(
            finder.find_path(&mover, Vec2::new(f64::NAN, 1.0)),
            Err(NavError::InvalidTarget { .. })
        ));
        assert!(finder
            .find_path(&mover, Vec2::new(1.0, f64::INFINITY))
            .is_err());
    }

    #[test]
    fn unwalkable_target_redirects_to_neighbor() {
        let (grid, world) = walled();
        let finder = AStarPathFinder::new(&grid, &world);
        let target = Vec2::new(45.0, 25.0); // inside the wall
        let path = finder
            .find_path(&mover_at(Vec2::new(15.0, 25.0)), target)
            .unwrap();

        assert_eq!(path.kind(), PathKind::Search);
        assert_eq!(path.target(), target);
        let last = *path.points().last().unwrap();
        assert!(grid.node_at(last).unwrap().is_walkable());
    }

    #[test]
    fn search_prefers_diagonals_without_corner_cutting() {
        let mut grid = NavGrid::new(50.0, 50.0, 10.0).unwrap();
        let world = StaticCollisionWorld::new();
        grid.set_walkable(GridCoord::new(1, 0), false);
        let finder = AStarPathFinder::new(&grid, &world);

        let chain = finder
            .search(GridCoord::new(0, 0), GridCoord::new(2, 2))
            .unwrap();
        assert_eq!(chain.first(), Some(&GridCoord::new(0, 0)));
        assert_eq!(chain.last(), Some(&GridCoord::new(2, 2)));
        // (0,0) -> (1,1) would cut the blocked corner
        assert_eq!(chain[1], GridCoord::new(0, 1));
        assert_eq!(chain.len(), 4);
    }

    #[test]
    fn search_is_deterministic() {
        let grid = NavGrid::new(100.0, 100.0, 10.0).unwrap();
        let world = StaticCollisionWorld::new();
        let finder = AStarPathFinder::new(&grid, &world);
        let a = finder.search(GridCoord::new(0, 0), GridCoord::new(9, 4));
        let b = finder.search(GridCoord::new(0, 0), GridCoord::new(9, 4));
        assert_eq!(a, b);
        assert_eq!(a.unwrap().len(), 10);
    }

    #[test]
    fn path_length_sums_segments() {
        let path = Path::new(
            Vec2::ZERO,
            Vec2::new(3.0, 4.0),
            vec![Vec2::ZERO, Vec2::new(3.0, 0.0), Vec2::new(3.0, 4.0)],
            PathKind::Search,
        );
        assert_eq!(path.length(), 7.0);
    }

    /// Layer whose only geometry is a vertical line at x = 50, not a box.
    struct Fence;

    impl CollisionLayer for Fence {
        fn collision_boxes(&self, _collision: CollisionType) -> Vec<Rect> {
            Vec::new()
        }

        fn collides_line(&self, a: Vec2, b: Vec2, collision: CollisionType) -> bool {
            collision != CollisionType::Dynamic && (a.x - 50.0) * (b.x - 50.0) <= 0.0
        }
    }

    #[test]
    fn direct_check_asks_the_layer_about_lines() {
        let grid = NavGrid::new(100.0, 100.0, 10.0).unwrap();
        let finder = AStarPathFinder::new(&grid, &Fence);

        let across = finder
            .find_path(&mover_at(Vec2::new(15.0, 15.0)), Vec2::new(85.0, 15.0))
            .unwrap();
        assert_ne!(across.kind(), PathKind::Direct);

        let same_side = finder
            .find_path(&mover_at(Vec2::new(15.0, 15.0)), Vec2::new(35.0, 85.0))
            .unwrap();
        assert_eq!(same_side.kind(), PathKind::Direct);
    }

    fn entry(index: usize, g_cost: f64, h_cost: f64, seq: u64) -> NodeWithCost {
        NodeWithCost {
            index,
            g_cost,
            h_cost,
            seq,
        }
    }

    #[test]
    fn open_set_breaks_ties_by_heuristic_then_insertion() {
        let mut open_set = BinaryHeap::new();
        // all four have f = 10
        open_set.push(entry(0, 4.0, 6.0, 0));
        open_set.push(entry(1, 8.0, 2.0, 1));
        open_set.push(entry(2, 7.0, 3.0, 3));
        open_set.push(entry(3, 7.0, 3.0, 2));
        // lower f always wins
        open_set.push(entry(4, 1.0, 8.0, 4));
        open_set.push(entry(5, 9.0, 4.0, 5));

        let order: Vec<usize> = std::iter::from_fn(|| open_set.pop().map(|e| e.index)).collect();
        assert_eq!(order, vec![4, 1, 3, 2, 0, 5]);
    }
}
