//! Half-plane zones drawn from two points on the field.
//!
//! A measured line is kept in standard form `A·x + B·y + C = 0` and can be
//! rendered as a predicate selecting either side of it.

use std::fmt;

use crate::geometry::Point;

const AXIS_TOLERANCE: f64 = 1e-10;

/// Which side of the line a predicate selects, by the sign of `evaluate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfPlane {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl HalfPlane {
    /// Line through two points; `None` when they coincide.
    pub fn through(p1: impl Into<Point>, p2: impl Into<Point>) -> Option<Self> {
        let (p1, p2) = (p1.into(), p2.into());
        let dx = p2.x - p1.x;
        let dy = p2.y - p1.y;
        if dx.abs() < AXIS_TOLERANCE && dy.abs() < AXIS_TOLERANCE {
            return None;
        }
        if dx.abs() < AXIS_TOLERANCE {
            return Some(Self {
                a: 1.0,
                b: 0.0,
                c: -p1.x,
            });
        }
        if dy.abs() < AXIS_TOLERANCE {
            return Some(Self {
                a: 0.0,
                b: 1.0,
                c: -p1.y,
            });
        }
        Some(Self {
            a: p1.y - p2.y,
            b: dx,
            c: p1.x * dy - p1.y * dx,
        })
    }

    /// Signed side value: zero on the line.
    pub fn evaluate(&self, x: f64, y: f64) -> f64 {
        self.a * x + self.b * y + self.c
    }

    pub fn is_vertical(&self) -> bool {
        self.b.abs() < AXIS_TOLERANCE
    }

    pub fn is_horizontal(&self) -> bool {
        self.a.abs() < AXIS_TOLERANCE
    }

    /// Slope and intercept, unless the line is vertical.
    pub fn slope_intercept(&self) -> Option<(f64, f64)> {
        if self.is_vertical() {
            None
        } else {
            Some((-self.a / self.b, -self.c / self.b))
        }
    }

    /// Predicate text selecting `side`, in the zone predicate grammar.
    pub fn predicate(&self, side: Side) -> String {
        // flipping the sign of the leading coefficient flips the inequality
        let lead = if self.is_vertical() { self.a } else { self.b };
        let ge = (side == Side::Positive) == (lead > 0.0);
        let op = if ge { ">=" } else { "<=" };

        if self.is_vertical() {
            return format!("x {op} {}", trim_number(-self.c / self.a));
        }
        if self.is_horizontal() {
            return format!("y {op} {}", trim_number(-self.c / self.b));
        }
        let m = -self.a / self.b;
        let b = -self.c / self.b;
        let slope = match trim_number(m).as_str() {
            "1" => "x".to_string(),
            "-1" => "-x".to_string(),
            other => format!("{other}*x"),
        };
        let intercept = trim_number(b.abs());
        if intercept == "0" {
            format!("y {op} {slope}")
        } else if b > 0.0 {
            format!("y {op} {slope} + {intercept}")
        } else {
            format!("y {op} {slope} - {intercept}")
        }
    }
}

impl fmt::Display for HalfPlane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}x + {:.3}y + {:.3} = 0", self.a, self.b, self.c)
    }
}

/// Three-decimal rendering without trailing zeros.
fn trim_number(value: f64) -> String {
    let fixed = format!("{value:.3}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}
