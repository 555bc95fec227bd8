//! Zone definitions and the ordered registry that owns them.

mod core;
mod zone;

pub use self::core::{EditOutcome, ZoneRegistry};
pub use zone::{
    BORDER_OPACITY_BOOST, Color, ColorError, DEFAULT_FILL_OPACITY, RenderLayer, ZoneDefinition,
    ZoneDraft, ZoneEdit, ZoneId, ZoneType, clamp_opacity,
};
