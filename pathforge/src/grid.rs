//! Navigation grid for tile-based pathfinding.
//!
//! Discretizes a rectangular world area into square cells, tracks which cells
//! are walkable and answers point, rectangle and neighbor queries. Queries
//! outside the grid return `None` or an empty list; they never panic.

use crate::config::NavConfig;
use crate::error::{NavError, NavResult};
use crate::math::{Rect, Vec2};
use crate::physics::{CollisionLayer, CollisionType};

/// A node in the grid (grid coordinates).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another coordinate.
    pub fn manhattan_distance(&self, other: &GridCoord) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Euclidean distance to another coordinate.
    pub fn distance(&self, other: &GridCoord) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        dx.hypot(dy)
    }
}

/// A single cell of the grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    coord: GridCoord,
    bounds: Rect,
    walkable: bool,
    penalty: f64,
}

impl Node {
    fn new(coord: GridCoord, bounds: Rect) -> Self {
        Self {
            coord,
            bounds,
            walkable: true,
            penalty: 0.0,
        }
    }

    pub fn coord(&self) -> GridCoord {
        self.coord
    }

    pub fn grid_x(&self) -> i32 {
        self.coord.x
    }

    pub fn grid_y(&self) -> i32 {
        self.coord.y
    }

    /// World-space rectangle covered by this node.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn center(&self) -> Vec2 {
        self.bounds.center()
    }

    pub fn is_walkable(&self) -> bool {
        self.walkable
    }

    /// Extra cost paid for entering this node during a search.
    pub fn penalty(&self) -> f64 {
        self.penalty
    }

    /// Traversal cost between two nodes: the Euclidean distance in grid units.
    ///
    /// Orthogonal neighbors cost 1, diagonal neighbors cost √2. Symmetric.
    pub fn costs(&self, other: &Node) -> f64 {
        self.coord.distance(&other.coord)
    }
}

/// Walkability grid covering a world area of `world_width` x `world_height`.
#[derive(Clone, Debug)]
pub struct NavGrid {
    width: usize,
    height: usize,
    cell_size: f64,
    world_size: Vec2,
    nodes: Vec<Node>, // Row-major: [y * width + x]
    allow_diagonal_movement: bool,
    allow_cutting_corners: bool,
}

impl NavGrid {
    /// Create a grid with every node walkable.
    ///
    /// The grid has `ceil(world_width / cell_size)` columns and
    /// `ceil(world_height / cell_size)` rows.
    pub fn new(world_width: f64, world_height: f64, cell_size: f64) -> NavResult<Self> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(NavError::InvalidCellSize(cell_size));
        }
        if !(world_width.is_finite() && world_height.is_finite())
            || world_width <= 0.0
            || world_height <= 0.0
        {
            return Err(NavError::InvalidWorldSize {
                width: world_width,
                height: world_height,
            });
        }

        let width = (world_width / cell_size).ceil() as usize;
        let height = (world_height / cell_size).ceil() as usize;
        // coordinates are i32, and the node array must be addressable
        let max_side = i32::MAX as usize;
        let count = width.checked_mul(height).filter(|_| width <= max_side && height <= max_side);
        let Some(count) = count else {
            return Err(NavError::InvalidWorldSize {
                width: world_width,
                height: world_height,
            });
        };

        let mut nodes = Vec::new();
        if nodes.try_reserve_exact(count).is_err() {
            return Err(NavError::InvalidWorldSize {
                width: world_width,
                height: world_height,
            });
        }
        for y in 0..height {
            for x in 0..width {
                let bounds = Rect::new(
                    x as f64 * cell_size,
                    y as f64 * cell_size,
                    cell_size,
                    cell_size,
                );
                nodes.push(Node::new(GridCoord::new(x as i32, y as i32), bounds));
            }
        }

        log::debug!(
            "created {}x{} nav grid ({} nodes, cell size {})",
            width,
            height,
            nodes.len(),
            cell_size
        );

        Ok(Self {
            width,
            height,
            cell_size,
            world_size: Vec2::new(world_width, world_height),
            nodes,
            allow_diagonal_movement: true,
            allow_cutting_corners: false,
        })
    }

    /// Create a grid using the cell size and movement policy from `config`.
    pub fn with_config(world_width: f64, world_height: f64, config: &NavConfig) -> NavResult<Self> {
        config.validate()?;
        let mut grid = Self::new(world_width, world_height, config.cell_size)?;
        grid.allow_diagonal_movement = config.allow_diagonal_movement;
        grid.allow_cutting_corners = config.allow_cutting_corners;
        Ok(grid)
    }

    /// Create a grid whose walkability and penalties come from `collision`.
    pub fn from_collision(
        world_width: f64,
        world_height: f64,
        config: &NavConfig,
        collision: &dyn CollisionLayer,
    ) -> NavResult<Self> {
        let mut grid = Self::with_config(world_width, world_height, config)?;
        for node in &mut grid.nodes {
            node.walkable = !collision.collides_rect(&node.bounds, CollisionType::Static);
        }
        grid.assign_penalties(config, collision);
        Ok(grid)
    }

    /// Get the width of the grid in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get the height of the grid in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Get the size of each cell in world units.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// World area the grid was built for.
    pub fn world_size(&self) -> Vec2 {
        self.world_size
    }

    pub fn is_diagonal_movement_allowed(&self) -> bool {
        self.allow_diagonal_movement
    }

    pub fn set_allow_diagonal_movement(&mut self, allow: bool) {
        self.allow_diagonal_movement = allow;
    }

    pub fn is_cutting_corners_allowed(&self) -> bool {
        self.allow_cutting_corners
    }

    pub fn set_allow_cutting_corners(&mut self, allow: bool) {
        self.allow_cutting_corners = allow;
    }

    /// Check if a grid coordinate is valid (within bounds).
    pub fn is_valid(&self, coord: &GridCoord) -> bool {
        coord.x >= 0
            && (coord.x as usize) < self.width
            && coord.y >= 0
            && (coord.y as usize) < self.height
    }

    fn index(&self, coord: &GridCoord) -> Option<usize> {
        self.is_valid(coord)
            .then(|| (coord.y as usize) * self.width + (coord.x as usize))
    }

    /// Convert world position to grid coordinates, if it lies on the grid.
    pub fn world_to_grid(&self, point: Vec2) -> Option<GridCoord> {
        if !point.is_finite() || point.x < 0.0 || point.y < 0.0 {
            return None;
        }
        let x = (point.x / self.cell_size).floor();
        let y = (point.y / self.cell_size).floor();
        if x >= self.width as f64 || y >= self.height as f64 {
            return None;
        }
        Some(GridCoord::new(x as i32, y as i32))
    }

    /// Node covering a world position.
    pub fn node_at(&self, point: Vec2) -> Option<&Node> {
        self.world_to_grid(point).and_then(|c| self.node(c.x, c.y))
    }

    /// Node at grid indices; `None` when out of range.
    pub fn node(&self, x: i32, y: i32) -> Option<&Node> {
        self.index(&GridCoord::new(x, y)).map(|i| &self.nodes[i])
    }

    pub fn node_by_coord(&self, coord: GridCoord) -> Option<&Node> {
        self.node(coord.x, coord.y)
    }

    /// Set a node as walkable or not. Returns `false` if the coordinate is out of bounds.
    pub fn set_walkable(&mut self, coord: GridCoord, walkable: bool) -> bool {
        match self.index(&coord) {
            Some(i) => {
                self.nodes[i].walkable = walkable;
                true
            }
            None => false,
        }
    }

    pub fn is_walkable(&self, coord: &GridCoord) -> bool {
        self.index(coord)
            .map(|i| self.nodes[i].walkable)
            .unwrap_or(false)
    }

    /// Clamped coordinate range covered by `rect`, edges inclusive.
    fn covered_range(&self, rect: &Rect) -> Option<(GridCoord, GridCoord)> {
        let min = rect.min();
        let max = rect.max();
        if !min.is_finite() || !max.is_finite() || self.nodes.is_empty() {
            return None;
        }

        let last_x = self.width as f64 - 1.0;
        let last_y = self.height as f64 - 1.0;
        let start_x = (min.x / self.cell_size).floor();
        let start_y = (min.y / self.cell_size).floor();
        let end_x = (max.x / self.cell_size).floor();
        let end_y = (max.y / self.cell_size).floor();
        if end_x < 0.0 || end_y < 0.0 || start_x > last_x || start_y > last_y {
            return None;
        }

        Some((
            GridCoord::new(start_x.max(0.0) as i32, start_y.max(0.0) as i32),
            GridCoord::new(end_x.min(last_x) as i32, end_y.min(last_y) as i32),
        ))
    }

    /// All nodes whose cells contain any point of `rect`, edges inclusive, in row-major order.
    pub fn intersected_nodes(&self, rect: &Rect) -> Vec<&Node> {
        let Some((start, end)) = self.covered_range(rect) else {
            return Vec::new();
        };

        let mut nodes = Vec::new();
        for y in start.y..=end.y {
            for x in start.x..=end.x {
                if let Some(node) = self.node(x, y) {
                    nodes.push(node);
                }
            }
        }
        nodes
    }

    /// In-bounds neighbors of `coord`: up, down, right, left, then the diagonals.
    ///
    /// Walkability is not filtered here; that is up to the search.
    pub fn neighbor_coords(&self, coord: &GridCoord, allow_diagonal: bool) -> Vec<GridCoord> {
        const DIRECTIONS: [(i32, i32); 8] = [
            (0, -1), (0, 1), (1, 0), (-1, 0),
            (-1, -1), (1, -1), (-1, 1), (1, 1),
        ];
        let count = if allow_diagonal { 8 } else { 4 };

        let mut neighbors = Vec::with_capacity(count);
        for (dx, dy) in DIRECTIONS.iter().take(count) {
            let neighbor = GridCoord::new(coord.x + dx, coord.y + dy);
            if self.is_valid(&neighbor) {
                neighbors.push(neighbor);
            }
        }
        neighbors
    }

    /// Neighbors of `node` using an explicit diagonal policy.
    pub fn neighbors_with(&self, node: &Node, allow_diagonal: bool) -> Vec<&Node> {
        self.neighbor_coords(&node.coord, allow_diagonal)
            .into_iter()
            .filter_map(|c| self.node_by_coord(c))
            .collect()
    }

    /// Neighbors of `node` using the grid's diagonal movement policy.
    pub fn neighbors(&self, node: &Node) -> Vec<&Node> {
        self.neighbors_with(node, self.allow_diagonal_movement)
    }

    /// Whether a single step from `from` to the adjacent `to` is allowed.
    ///
    /// A diagonal step needs both flanking orthogonal nodes walkable unless
    /// corner cutting is enabled.
    pub fn can_traverse(&self, from: &GridCoord, to: &GridCoord) -> bool {
        if !self.is_walkable(to) {
            return false;
        }
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        if dx.abs() > 1 || dy.abs() > 1 {
            return false;
        }
        if dx == 0 || dy == 0 || self.allow_cutting_corners {
            return true;
        }
        self.is_walkable(&GridCoord::new(from.x + dx, from.y))
            && self.is_walkable(&GridCoord::new(from.x, from.y + dy))
    }

    /// Mark every node overlapping `obstacle` as not walkable.
    ///
    /// Penalties are left as they are. Use [`apply_obstacles`](Self::apply_obstacles)
    /// or call [`assign_penalties`](Self::assign_penalties) afterwards when
    /// neighbor penalties should follow the new layout.
    pub fn update_walkable(&mut self, obstacle: &Rect) {
        let Some((start, end)) = self.covered_range(obstacle) else {
            return;
        };
        let mut blocked = 0;
        for y in start.y..=end.y {
            for x in start.x..=end.x {
                if let Some(i) = self.index(&GridCoord::new(x, y)) {
                    if self.nodes[i].bounds.intersects(obstacle) {
                        self.nodes[i].walkable = false;
                        blocked += 1;
                    }
                }
            }
        }
        log::trace!("obstacle {:?} blocked {} nodes", obstacle, blocked);
    }

    /// Block every obstacle, then recompute penalties once.
    pub fn apply_obstacles(
        &mut self,
        obstacles: &[Rect],
        config: &NavConfig,
        collision: &dyn CollisionLayer,
    ) {
        for obstacle in obstacles {
            self.update_walkable(obstacle);
        }
        self.assign_penalties(config, collision);
    }

    /// Recompute walkability of the nodes covered by `area` from static collisions.
    pub fn refresh_walkable(&mut self, area: &Rect, collision: &dyn CollisionLayer) {
        let Some((start, end)) = self.covered_range(area) else {
            return;
        };
        for y in start.y..=end.y {
            for x in start.x..=end.x {
                if let Some(i) = self.index(&GridCoord::new(x, y)) {
                    let bounds = self.nodes[i].bounds;
                    self.nodes[i].walkable = !collision.collides_rect(&bounds, CollisionType::Static);
                }
            }
        }
    }

    /// Recompute per-node penalties.
    ///
    /// Only nodes whose center touches dynamic geometry are penalized: once per
    /// dynamic box overlapping the node and once per non-walkable neighbor.
    pub fn assign_penalties(&mut self, config: &NavConfig, collision: &dyn CollisionLayer) {
        let dynamic = collision.collision_boxes(CollisionType::Dynamic);
        let mut penalties = vec![0.0; self.nodes.len()];

        for (i, node) in self.nodes.iter().enumerate() {
            if !collision.collides_point(node.center(), CollisionType::Dynamic) {
                continue;
            }

            let props = dynamic.iter().filter(|b| b.intersects(&node.bounds)).count();
            let blocked_neighbors = self
                .neighbors(node)
                .iter()
                .filter(|n| !n.walkable)
                .count();

            penalties[i] = props as f64 * config.penalty_static_prop
                + blocked_neighbors as f64 * config.penalty_not_walkable_neighbor;
        }

        for (node, penalty) in self.nodes.iter_mut().zip(penalties) {
            node.penalty = penalty;
        }
    }

    /// True if no non-walkable node touches the segment from `a` to `b`.
    /// Parts of the segment outside the grid are ignored.
    pub fn is_line_walkable(&self, a: Vec2, b: Vec2) -> bool {
        let bbox = Rect::new(
            a.x.min(b.x),
            a.y.min(b.y),
            (a.x - b.x).abs(),
            (a.y - b.y).abs(),
        );
        self.intersected_nodes(&bbox)
            .into_iter()
            .filter(|n| !n.walkable)
            .all(|n| !n.bounds.intersects_segment(a, b))
    }

    /// Snapshot of the walkable flags in row-major order.
    pub fn walkable_mask(&self) -> Vec<bool> {
        self.nodes.iter().map(|n| n.walkable).collect()
    }

    /// Iterate over all nodes in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub(crate) fn node_index(&self, coord: &GridCoord) -> Option<usize> {
        self.index(coord)
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn node_by_index(&self, index: usize) -> &Node {
        &self.nodes[index]
    }
}
