use thiserror::Error;

use crate::config::ConfigError;
use crate::expr::ParseError;
use crate::registry::{ColorError, ZoneId};
use crate::sampler::GridError;

/// Unified result type for zone registry and engine operations.
pub type Result<T> = std::result::Result<T, ZoneError>;

/// Errors surfaced to editors and renderers. None of them is fatal to the engine.
#[derive(Debug, Error)]
pub enum ZoneError {
    #[error("zone `{0}` not found")]
    NotFound(ZoneId),
    #[error("zone `{0}` already exists")]
    DuplicateZone(ZoneId),
    #[error("invalid predicate: {0}")]
    Parse(#[from] ParseError),
    #[error("invalid color: {0}")]
    Color(#[from] ColorError),
    #[error("invalid sample grid: {0}")]
    Grid(#[from] GridError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("cannot start build workers: {0}")]
    Pool(#[from] std::io::Error),
}
