//! Crate-wide error surface.
//!
//! Component-specific errors (`ParseError`, `EvalError`, `GridError`, ...)
//! live next to the code that raises them; this module folds them into the
//! `ZoneError` returned by registry and engine operations.

mod types;

pub use types::{Result, ZoneError};
