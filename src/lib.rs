//! Field zone definitions and boundary extraction.
//!
//! Zones are named regions of a square playing field declared by boolean
//! predicates over `x` and `y`. The engine samples each predicate over a
//! fixed grid, wraps the matching points in a convex hull capped at 25
//! vertices and memoizes the result until the predicate or the grid changes.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod expr;
pub mod geometry;
pub mod hull;
pub mod lines;
pub mod logging;
pub mod metrics;
pub mod presets;
pub mod registry;
pub mod sampler;
pub mod tester;

pub use cache::{PolygonCache, PredicateCache, ZoneGeometry, ZoneNotice};
pub use config::{ConfigError, EngineConfig, FieldDocument, ZoneRecord};
pub use engine::{CollectReport, ZoneEngine, ZoneIssue, ZoneRenderItem, ZoneRenderList};
pub use error::{Result, ZoneError};
pub use expr::{CompiledPredicate, EvalError, ParseError, compile, validate};
pub use geometry::{Bounds, Point};
pub use hull::{MAX_VERTICES, Polygon, PolygonKind, build_boundary, convex_hull, simplify};
pub use lines::{HalfPlane, Side};
pub use logging::{LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult};
pub use metrics::{EngineMetrics, MetricSnapshot};
pub use registry::{
    Color, EditOutcome, RenderLayer, ZoneDefinition, ZoneDraft, ZoneEdit, ZoneId, ZoneRegistry,
    ZoneType,
};
pub use sampler::{GridError, SampleGrid, SampleSet};
pub use tester::{FieldMap, ProbeDriver, ProbeDriverError, ProbeKey, ProbePanel, ProbeState};
