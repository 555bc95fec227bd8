//! Field sampling.
//!
//! Walks the square field domain at a fixed resolution and collects the grid
//! points that satisfy a compiled predicate. Every candidate is tested on its
//! own: predicates need not be monotonic or axis-aligned, so no row is ever
//! skipped early.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::expr::{CompiledPredicate, EvalError};
use crate::geometry::{Bounds, Point};

/// Half of the playable field width in inches.
pub const DEFAULT_HALF_EXTENT: f64 = 70.5;
/// Sampling resolution in inches, fine enough to resolve sub-tile features.
pub const DEFAULT_STEP: f64 = 1.5;
/// Upper bound on grid points per sampling pass (2000 x 2000).
pub const MAX_SAMPLE_POINTS: usize = 4_000_000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("half extent must be finite and positive, got {0}")]
    HalfExtent(f64),
    #[error("step must be finite and positive, got {0}")]
    Step(f64),
    #[error("step {step} does not fit inside the domain width {width}")]
    StepTooLarge { step: f64, width: f64 },
    #[error("grid of {points} points exceeds the limit of {max}")]
    TooFine { points: usize, max: usize },
}

#[derive(Deserialize)]
struct RawGrid {
    half_extent: f64,
    step: f64,
}

impl TryFrom<RawGrid> for SampleGrid {
    type Error = GridError;

    fn try_from(raw: RawGrid) -> Result<Self, GridError> {
        SampleGrid::new(raw.half_extent, raw.step)
    }
}

/// Sampling domain `[-half_extent, half_extent]²` walked at `step`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGrid")]
pub struct SampleGrid {
    half_extent: f64,
    step: f64,
}

impl Default for SampleGrid {
    fn default() -> Self {
        Self {
            half_extent: DEFAULT_HALF_EXTENT,
            step: DEFAULT_STEP,
        }
    }
}

impl SampleGrid {
    pub fn new(half_extent: f64, step: f64) -> Result<Self, GridError> {
        if !half_extent.is_finite() || half_extent <= 0.0 {
            return Err(GridError::HalfExtent(half_extent));
        }
        if !step.is_finite() || step <= 0.0 {
            return Err(GridError::Step(step));
        }
        if step > 2.0 * half_extent {
            return Err(GridError::StepTooLarge {
                step,
                width: 2.0 * half_extent,
            });
        }
        let points = axis_len(half_extent, step).and_then(|axis| axis.checked_mul(axis));
        match points {
            Some(points) if points <= MAX_SAMPLE_POINTS => Ok(Self { half_extent, step }),
            _ => Err(GridError::TooFine {
                points: points.unwrap_or(usize::MAX),
                max: MAX_SAMPLE_POINTS,
            }),
        }
    }

    pub fn half_extent(&self) -> f64 {
        self.half_extent
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::symmetric(self.half_extent)
    }

    /// Number of intervals along one axis.
    pub fn steps(&self) -> usize {
        interval_count(self.half_extent, self.step) as usize
    }

    /// Samples per axis.
    pub fn axis_len(&self) -> usize {
        self.steps() + 1
    }

    pub fn point_count(&self) -> usize {
        self.axis_len().saturating_mul(self.axis_len())
    }

    /// Coordinate of the i-th sample along an axis, computed directly rather
    /// than accumulated so rounding never drifts across the field.
    pub fn coordinate(&self, index: usize) -> f64 {
        (-self.half_extent + index as f64 * self.step).min(self.half_extent)
    }

    /// Content bytes fed into cache keys.
    pub fn key_bytes(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.half_extent.to_le_bytes());
        bytes[8..].copy_from_slice(&self.step.to_le_bytes());
        bytes
    }
}

/// The small slack keeps `141 / 1.5` from landing on `93.999...`.
fn interval_count(half_extent: f64, step: f64) -> f64 {
    ((2.0 * half_extent) / step + 1e-9).floor()
}

fn axis_len(half_extent: f64, step: f64) -> Option<usize> {
    let intervals = interval_count(half_extent, step);
    if intervals >= usize::MAX as f64 {
        return None;
    }
    (intervals as usize).checked_add(1)
}

/// Result of one full sampling pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    pub points: Vec<Point>,
    /// Grid points tested.
    pub evaluated: usize,
    /// Grid points whose evaluation faulted and were treated as outside.
    pub faults: usize,
    pub first_fault: Option<EvalError>,
}

impl SampleSet {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Test every grid point against `predicate`.
pub fn sample(predicate: &CompiledPredicate, grid: &SampleGrid) -> SampleSet {
    let axis = grid.axis_len();
    let mut points = Vec::new();
    let mut faults = 0;
    let mut first_fault = None;

    for xi in 0..axis {
        let x = grid.coordinate(xi);
        for yi in 0..axis {
            let y = grid.coordinate(yi);
            match predicate.eval(x, y) {
                Ok(true) => points.push(Point::new(x, y)),
                Ok(false) => {}
                Err(err) => {
                    faults += 1;
                    first_fault.get_or_insert(err);
                }
            }
        }
    }

    SampleSet {
        points,
        evaluated: axis * axis,
        faults,
        first_fault,
    }
}

/// Lazily walk the matching grid points. The walk can be cloned to restart
/// it from the same position.
pub fn walk<'a>(predicate: &'a CompiledPredicate, grid: &SampleGrid) -> SampleWalk<'a> {
    SampleWalk {
        predicate,
        grid: *grid,
        next: 0,
    }
}

#[derive(Debug, Clone)]
pub struct SampleWalk<'a> {
    predicate: &'a CompiledPredicate,
    grid: SampleGrid,
    next: usize,
}

impl Iterator for SampleWalk<'_> {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        let axis = self.grid.axis_len();
        let total = axis * axis;
        while self.next < total {
            let idx = self.next;
            self.next += 1;
            let x = self.grid.coordinate(idx / axis);
            let y = self.grid.coordinate(idx % axis);
            if self.predicate.contains(x, y) {
                return Some(Point::new(x, y));
            }
        }
        None
    }
}
