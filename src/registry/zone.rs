use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub type ZoneId = String;

/// Default fill opacity for new zones.
pub const DEFAULT_FILL_OPACITY: f64 = 0.3;
/// Border is drawn this much more opaque than the fill.
pub const BORDER_OPACITY_BOOST: f64 = 0.3;

/// Closed set of zone categories. Each carries a default color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneType {
    RedAlliance,
    BlueAlliance,
    Neutral,
    Launch,
    Parking,
    Loading,
    Risky,
    #[default]
    Custom,
}

impl ZoneType {
    pub const ALL: [ZoneType; 8] = [
        ZoneType::RedAlliance,
        ZoneType::BlueAlliance,
        ZoneType::Neutral,
        ZoneType::Launch,
        ZoneType::Parking,
        ZoneType::Loading,
        ZoneType::Risky,
        ZoneType::Custom,
    ];

    pub const fn default_color(self) -> Color {
        match self {
            ZoneType::RedAlliance => Color::rgb(0xff, 0x4d, 0x4d),
            ZoneType::BlueAlliance => Color::rgb(0x4d, 0xa6, 0xff),
            ZoneType::Neutral => Color::rgb(0xff, 0xaa, 0x00),
            ZoneType::Launch => Color::rgb(0xff, 0x88, 0x00),
            ZoneType::Parking => Color::rgb(0xcc, 0x66, 0x00),
            ZoneType::Loading => Color::rgb(0x99, 0x00, 0x33),
            ZoneType::Risky => Color::rgb(0xff, 0xff, 0x00),
            ZoneType::Custom => Color::rgb(0xff, 0x6b, 0x6b),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ZoneType::RedAlliance => "red_alliance",
            ZoneType::BlueAlliance => "blue_alliance",
            ZoneType::Neutral => "neutral",
            ZoneType::Launch => "launch",
            ZoneType::Parking => "parking",
            ZoneType::Loading => "loading",
            ZoneType::Risky => "risky",
            ZoneType::Custom => "custom",
        }
    }
}

impl ZoneType {
    /// Lenient lookup used for configuration files: case and separators are
    /// ignored and unknown names fall back to `Custom`.
    pub fn from_name(name: &str) -> Self {
        let normalized: String = name
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                other => other.to_ascii_lowercase(),
            })
            .collect();
        ZoneType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .unwrap_or(ZoneType::Custom)
    }
}

impl<'de> Deserialize<'de> for ZoneType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ZoneType::from_name(&raw))
    }
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("`{0}` is not a #rrggbb color")]
    Format(String),
}

/// Opaque sRGB color, written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex = trimmed
            .strip_prefix('#')
            .filter(|h| h.len() == 6 && h.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| ColorError::Format(s.to_string()))?;
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ColorError::Format(s.to_string()))
        };
        Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Where zones sit in the draw stack: above the field image, below points
/// and measurement overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderLayer {
    Background,
    Zones,
    Overlays,
}

/// A named field region declared by a predicate over `x`/`y`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneDefinition {
    pub id: ZoneId,
    pub name: String,
    pub zone_type: ZoneType,
    pub predicate_text: String,
    pub color: Color,
    pub fill_opacity: f64,
    /// Geometry version; bumped only when the predicate text changes.
    pub version: u64,
    /// Bumped on every applied edit, style edits included.
    pub revision: u64,
}

impl ZoneDefinition {
    pub fn border_opacity(&self) -> f64 {
        (self.fill_opacity + BORDER_OPACITY_BOOST).min(1.0)
    }

    pub const fn render_layer(&self) -> RenderLayer {
        RenderLayer::Zones
    }
}

/// Everything needed to create a zone. Color falls back to the type default.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneDraft {
    pub id: Option<ZoneId>,
    pub name: String,
    pub zone_type: ZoneType,
    pub predicate_text: String,
    pub color: Option<Color>,
    pub fill_opacity: f64,
}

impl ZoneDraft {
    pub fn new(name: impl Into<String>, predicate_text: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            zone_type: ZoneType::Custom,
            predicate_text: predicate_text.into(),
            color: None,
            fill_opacity: DEFAULT_FILL_OPACITY,
        }
    }

    pub fn with_id(mut self, id: impl Into<ZoneId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_type(mut self, zone_type: ZoneType) -> Self {
        self.zone_type = zone_type;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_opacity(mut self, fill_opacity: f64) -> Self {
        self.fill_opacity = fill_opacity;
        self
    }
}

/// Partial update applied by `ZoneRegistry::edit`. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneEdit {
    pub name: Option<String>,
    pub zone_type: Option<ZoneType>,
    pub predicate_text: Option<String>,
    pub color: Option<Color>,
    pub fill_opacity: Option<f64>,
}

impl ZoneEdit {
    pub fn predicate(text: impl Into<String>) -> Self {
        Self {
            predicate_text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn style(color: Option<Color>, fill_opacity: Option<f64>) -> Self {
        Self {
            color,
            fill_opacity,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Clamp opacity into `[0, 1]`; non-finite input falls back to the default.
pub fn clamp_opacity(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        DEFAULT_FILL_OPACITY
    }
}
