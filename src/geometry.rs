use serde::{Deserialize, Serialize};

/// Tolerance used for orientation and boundary tests in field inches.
pub const EPSILON: f64 = 1e-9;

/// A position in field coordinates (inches, origin at field center).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Z component of `(a - o) x (b - o)`. Positive when `o -> a -> b` turns
/// counter-clockwise.
pub fn cross(o: &Point, a: &Point, b: &Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    /// Square bounds symmetric about the origin.
    pub fn symmetric(half_extent: f64) -> Self {
        Self {
            min: Point::new(-half_extent, -half_extent),
            max: Point::new(half_extent, half_extent),
        }
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Self {
            min: *first,
            max: *first,
        };
        for p in &points[1..] {
            bounds.min.x = bounds.min.x.min(p.x);
            bounds.min.y = bounds.min.y.min(p.y);
            bounds.max.x = bounds.max.x.max(p.x);
            bounds.max.y = bounds.max.y.max(p.y);
        }
        Some(bounds)
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.min.x - EPSILON
            && p.x <= self.max.x + EPSILON
            && p.y >= self.min.y - EPSILON
            && p.y <= self.max.y + EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_sign_follows_turn_direction() {
        let o = Point::new(0.0, 0.0);
        let a = Point::new(1.0, 0.0);
        assert!(cross(&o, &a, &Point::new(1.0, 1.0)) > 0.0);
        assert!(cross(&o, &a, &Point::new(1.0, -1.0)) < 0.0);
        assert_eq!(cross(&o, &a, &Point::new(2.0, 0.0)), 0.0);
    }

    #[test]
    fn bounds_cover_all_points() {
        let pts = [
            Point::new(-3.0, 2.0),
            Point::new(4.0, -1.0),
            Point::new(0.5, 7.0),
        ];
        let b = Bounds::from_points(&pts).unwrap();
        assert_eq!(b.min, Point::new(-3.0, -1.0));
        assert_eq!(b.max, Point::new(4.0, 7.0));
        assert!(pts.iter().all(|p| b.contains(p)));
        assert!(Bounds::from_points(&[]).is_none());
    }
}
