use serde::Serialize;

use crate::cache::ZoneNotice;
use crate::expr::ParseError;
use crate::hull::Polygon;
use crate::registry::{Color, RenderLayer, ZoneId, ZoneType};

/// One zone ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneRenderItem {
    pub zone_id: ZoneId,
    pub name: String,
    pub zone_type: ZoneType,
    pub polygon: Polygon,
    pub color: Color,
    pub fill_opacity: f64,
    pub border_opacity: f64,
    pub layer: RenderLayer,
}

/// Why a zone is missing from, or flagged in, a render list.
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneIssue {
    /// Stored predicate text does not compile; nothing is drawn.
    Invalid(ParseError),
    Notice(ZoneNotice),
}

impl ZoneIssue {
    /// Issues that keep the zone from being drawn at all.
    pub fn is_blocking(&self) -> bool {
        matches!(self, ZoneIssue::Invalid(_) | ZoneIssue::Notice(ZoneNotice::Empty))
    }
}

impl std::fmt::Display for ZoneIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoneIssue::Invalid(err) => write!(f, "{err}"),
            ZoneIssue::Notice(ZoneNotice::Empty) => f.write_str("no field point matches"),
            ZoneIssue::Notice(ZoneNotice::EvalFaults { count, first }) => {
                write!(f, "{count} samples faulted ({first})")
            }
            ZoneIssue::Notice(ZoneNotice::ConstantFault(err)) => {
                write!(f, "constant sub-expression always faults ({err})")
            }
        }
    }
}

/// Everything the renderer needs for one frame, in registry order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneRenderList {
    pub items: Vec<ZoneRenderItem>,
    pub issues: Vec<(ZoneId, ZoneIssue)>,
}

impl ZoneRenderList {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.issues.is_empty()
    }

    pub fn item(&self, zone_id: &str) -> Option<&ZoneRenderItem> {
        self.items.iter().find(|item| item.zone_id == zone_id)
    }

    pub fn issue(&self, zone_id: &str) -> Option<&ZoneIssue> {
        self.issues
            .iter()
            .find(|(id, _)| id == zone_id)
            .map(|(_, issue)| issue)
    }
}
