//! Boundary construction from sampled points.
//!
//! Graham scan produces a counter-clockwise convex boundary; `simplify`
//! bounds the vertex count by decimating evenly around the ring.

use std::cmp::Ordering;

use serde::Serialize;

use crate::geometry::{Bounds, EPSILON, Point, cross};

/// Most vertices a rendered zone boundary may carry.
pub const MAX_VERTICES: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolygonKind {
    Empty,
    Point,
    Segment,
    Area,
}

/// Ordered, implicitly closed vertex ring in counter-clockwise order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl Polygon {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn kind(&self) -> PolygonKind {
        match self.vertices.len() {
            0 => PolygonKind::Empty,
            1 => PolygonKind::Point,
            2 => PolygonKind::Segment,
            _ => PolygonKind::Area,
        }
    }

    /// Signed shoelace area; positive for counter-clockwise rings.
    pub fn area(&self) -> f64 {
        if self.vertices.len() < 3 {
            return 0.0;
        }
        let n = self.vertices.len();
        let twice: f64 = (0..n)
            .map(|i| {
                let a = &self.vertices[i];
                let b = &self.vertices[(i + 1) % n];
                a.x * b.y - b.x * a.y
            })
            .sum();
        twice / 2.0
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.vertices)
    }

    /// Inside-or-on test for a convex counter-clockwise ring. Degenerate
    /// polygons contain the points of their vertex or segment.
    pub fn contains(&self, p: &Point) -> bool {
        match self.vertices.as_slice() {
            [] => false,
            [only] => only.distance_sq(p) <= EPSILON,
            [a, b] => on_segment(a, b, p),
            ring => {
                let n = ring.len();
                (0..n).all(|i| cross(&ring[i], &ring[(i + 1) % n], p) >= -tolerance(ring))
            }
        }
    }
}

fn tolerance(ring: &[Point]) -> f64 {
    // cross products scale with edge length; keep the slack relative
    let span = Bounds::from_points(ring)
        .map(|b| b.width().max(b.height()))
        .unwrap_or(1.0)
        .max(1.0);
    EPSILON * span * span
}

fn on_segment(a: &Point, b: &Point, p: &Point) -> bool {
    let span = a.distance_sq(b).max(1.0);
    if cross(a, b, p).abs() > EPSILON * span {
        return false;
    }
    p.x >= a.x.min(b.x) - EPSILON
        && p.x <= a.x.max(b.x) + EPSILON
        && p.y >= a.y.min(b.y) - EPSILON
        && p.y <= a.y.max(b.y) + EPSILON
}

/// Convex hull by Graham scan.
///
/// Collinear points on an edge are dropped, so a sampled rectangle comes
/// back as its four corners. Fewer than three distinct points, or all points
/// on one line, produce a one-vertex or two-vertex polygon instead of an
/// error.
pub fn convex_hull(points: &[Point]) -> Polygon {
    let mut pts: Vec<Point> = points
        .iter()
        .copied()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .collect();
    if pts.is_empty() {
        return Polygon::empty();
    }

    // pivot: lowest y, then lowest x
    let pivot_idx = pts
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let pivot = pts.swap_remove(pivot_idx);

    pts.retain(|p| p.distance_sq(&pivot) > EPSILON);
    if pts.is_empty() {
        return Polygon {
            vertices: vec![pivot],
        };
    }

    // Every remaining point lies on or above the pivot's row, so polar order
    // around the pivot is the turn direction. Collinear points put the
    // closer one first.
    pts.sort_by(|a, b| compare_polar(&pivot, a, b));

    let mut stack: Vec<Point> = Vec::with_capacity(pts.len() + 1);
    stack.push(pivot);
    for p in pts {
        while stack.len() >= 2 {
            let top = stack[stack.len() - 1];
            let below = stack[stack.len() - 2];
            if cross(&below, &top, &p) <= EPSILON {
                stack.pop();
            } else {
                break;
            }
        }
        stack.push(p);
    }

    Polygon { vertices: stack }
}

fn compare_polar(pivot: &Point, a: &Point, b: &Point) -> Ordering {
    let (da, db) = (pivot.distance_sq(a), pivot.distance_sq(b));
    let turn = cross(pivot, a, b);
    if turn.abs() <= EPSILON * da.max(db).max(1.0) {
        da.total_cmp(&db)
    } else if turn > 0.0 {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

/// Reduce a ring to at most `max_vertices` by keeping vertices at evenly
/// spaced indices. The first and last vertex are always kept.
pub fn simplify(polygon: &Polygon, max_vertices: usize) -> Polygon {
    let n = polygon.vertices.len();
    let max_vertices = max_vertices.max(3);
    if n <= max_vertices {
        return polygon.clone();
    }
    let last = (n - 1) as f64;
    let slots = (max_vertices - 1) as f64;
    let vertices = (0..max_vertices)
        .map(|i| {
            let idx = (i as f64 * last / slots).round() as usize;
            polygon.vertices[idx.min(n - 1)]
        })
        .collect();
    Polygon { vertices }
}

/// Hull then simplify, the full boundary pipeline for one point set.
pub fn build_boundary(points: &[Point], max_vertices: usize) -> Polygon {
    simplify(&convex_hull(points), max_vertices)
}
