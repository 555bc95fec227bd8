//! Zone engine façade.
//!
//! Ties the registry, the predicate and polygon caches and the background
//! build pool together behind the operations an editor and a renderer call.

mod core;
mod render;


pub use self::core::{CollectReport, PROBE_POINTS, ZoneEngine};
pub use render::{ZoneIssue, ZoneRenderItem, ZoneRenderList};
