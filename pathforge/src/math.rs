use glam::DVec2;
use serde::{Deserialize, Serialize};

/// A point or displacement in world units.
///
/// Length and direction math delegates to `glam::DVec2`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_glam(self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    pub fn length(self) -> f64 {
        self.to_glam().length()
    }

    /// Unit vector in the same direction, or zero for the zero vector.
    pub fn normalized(self) -> Self {
        self.to_glam().normalize_or_zero().into()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance(self, other: Self) -> f64 {
        self.to_glam().distance(other.to_glam())
    }

    /// Unit vector at `angle` radians from the positive x axis.
    pub fn from_angle(angle: f64) -> Self {
        DVec2::from_angle(angle).into()
    }

    /// Heading in radians, `atan2(y, x)`.
    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }
}

impl From<DVec2> for Vec2 {
    fn from(v: DVec2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        (self.to_glam() + rhs.to_glam()).into()
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        (self.to_glam() - rhs.to_glam()).into()
    }
}

impl std::ops::Mul<f64> for Vec2 {
    type Output = Self;

    fn mul(self, scale: f64) -> Self {
        (self.to_glam() * scale).into()
    }
}

/// Axis-aligned rectangle in world space, anchored at its top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.width, self.y + self.height)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Half-open containment: the top/left edges are inside, the bottom/right edges are not.
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x
            && point.y >= self.y
            && point.x < self.x + self.width
            && point.y < self.y + self.height
    }

    /// True if the interiors overlap. Rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        other.x + other.width > self.x
            && other.y + other.height > self.y
            && other.x < self.x + self.width
            && other.y < self.y + self.height
    }

    /// Grow the rectangle by `dx` on the left and right and `dy` on the top and bottom.
    pub fn expanded(&self, dx: f64, dy: f64) -> Self {
        Self::new(
            self.x - dx,
            self.y - dy,
            self.width + dx * 2.0,
            self.height + dy * 2.0,
        )
    }

    /// Closed test: a segment touching the boundary counts as intersecting.
    pub fn intersects_segment(&self, a: Vec2, b: Vec2) -> bool {
        let min = self.min();
        let max = self.max();
        let inside = |p: Vec2| p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y;
        if inside(a) || inside(b) {
            return true;
        }

        let corners = [
            min,
            Vec2::new(max.x, min.y),
            max,
            Vec2::new(min.x, max.y),
        ];
        (0..4).any(|i| segments_intersect(a, b, corners[i], corners[(i + 1) % 4]))
    }

    /// True if a circle overlaps the rectangle's interior.
    pub fn intersects_circle(&self, center: Vec2, radius: f64) -> bool {
        if self.is_empty() || radius <= 0.0 {
            return false;
        }
        let max = self.max();
        let closest = Vec2::new(center.x.clamp(self.x, max.x), center.y.clamp(self.y, max.y));
        closest.distance(center) < radius
    }
}

/// Segment/segment intersection, collinear overlaps included.
pub fn segments_intersect(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> bool {
    let (p, r) = (a1.to_glam(), (a2 - a1).to_glam());
    let (q, s) = (b1.to_glam(), (b2 - b1).to_glam());
    let denom = r.perp_dot(s);
    let qp = q - p;

    if denom == 0.0 {
        if qp.perp_dot(r) != 0.0 {
            return false;
        }
        let rr = r.dot(r);
        if rr == 0.0 {
            // a is a single point
            let ss = s.dot(s);
            if ss == 0.0 {
                return a1 == b1;
            }
            if (p - q).perp_dot(s) != 0.0 {
                return false;
            }
            let t = (p - q).dot(s) / ss;
            return (0.0..=1.0).contains(&t);
        }
        // collinear: project b onto a

        let t0 = qp.dot(r) / rr;
        let t1 = t0 + s.dot(r) / rr;
        let (lo, hi) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        return hi >= 0.0 && lo <= 1.0;
    }

    let t = qp.perp_dot(s) / denom;
    let u = qp.perp_dot(r) / denom;
    (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)
}
