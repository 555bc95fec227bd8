//! Engine knobs and the field document zones are loaded from.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::hull::MAX_VERTICES;
use crate::logging::Logger;
use crate::metrics::EngineMetrics;
use crate::registry::{Color, DEFAULT_FILL_OPACITY, ZoneDefinition, ZoneDraft, ZoneId, ZoneType};
use crate::sampler::SampleGrid;

pub const DEFAULT_FIELD_NAME: &str = "New Field";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed field document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Runtime knobs for a `ZoneEngine`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Sampling domain and resolution.
    pub grid: SampleGrid,
    /// Vertex cap applied to every boundary.
    pub max_vertices: usize,
    /// Worker threads used by `dispatch_dirty`.
    pub workers: usize,
    /// Optional structured logger.
    pub logger: Option<Logger>,
    /// Shared counters, if metrics are enabled.
    pub metrics: Option<Arc<Mutex<EngineMetrics>>>,
    /// Target used when emitting metric snapshots.
    pub metrics_target: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid: SampleGrid::default(),
            max_vertices: MAX_VERTICES,
            workers: 2,
            logger: None,
            metrics: None,
            metrics_target: "zones::engine.metrics".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn with_grid(mut self, grid: SampleGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(EngineMetrics::new())));
        }
    }

    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<EngineMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}

fn default_opacity() -> f64 {
    DEFAULT_FILL_OPACITY
}

fn default_field_name() -> String {
    DEFAULT_FIELD_NAME.to_string()
}

/// One zone as stored in a field document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ZoneId>,
    #[serde(default)]
    pub name: String,
    #[serde(alias = "predicate", alias = "predicate_text", alias = "predicateText")]
    pub equation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default = "default_opacity", alias = "fill_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub zone_type: ZoneType,
}

impl ZoneRecord {
    pub fn new(name: impl Into<String>, equation: impl Into<String>, zone_type: ZoneType) -> Self {
        Self {
            id: None,
            name: name.into(),
            equation: equation.into(),
            color: None,
            opacity: DEFAULT_FILL_OPACITY,
            zone_type,
        }
    }

    pub fn to_draft(&self) -> ZoneDraft {
        ZoneDraft {
            id: self.id.clone(),
            name: self.name.clone(),
            zone_type: self.zone_type,
            predicate_text: self.equation.clone(),
            color: self.color,
            fill_opacity: self.opacity,
        }
    }
}

impl From<&ZoneDefinition> for ZoneRecord {
    fn from(def: &ZoneDefinition) -> Self {
        Self {
            id: Some(def.id.clone()),
            name: def.name.clone(),
            equation: def.predicate_text.clone(),
            color: Some(def.color),
            opacity: def.fill_opacity,
            zone_type: def.zone_type,
        }
    }
}

/// Field configuration file. Only `zones` is interpreted; the rest is
/// carried through untouched so saving never loses editor data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDocument {
    #[serde(default = "default_field_name")]
    pub name: String,
    #[serde(default)]
    pub points: Vec<Value>,
    #[serde(default)]
    pub associated_images: Vec<Value>,
    #[serde(default)]
    pub zones: Vec<ZoneRecord>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Default for FieldDocument {
    fn default() -> Self {
        Self {
            name: default_field_name(),
            points: Vec::new(),
            associated_images: Vec::new(),
            zones: Vec::new(),
            metadata: Map::new(),
        }
    }
}

impl FieldDocument {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        fs::write(path, self.to_json_pretty()?).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn drafts(&self) -> Vec<ZoneDraft> {
        self.zones.iter().map(ZoneRecord::to_draft).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const EDITOR_FILE: &str = r##"{
        "name": "Decode 2025",
        "points": [{"name": "goal", "x": 60.0, "y": 60.0, "color": "#ff6b6b"}],
        "associated_images": ["field.png"],
        "zones": [
            {"name": "Red parking", "equation": "x >= 30 && y <= -24.7",
             "color": "#cc6600", "opacity": 0.5, "zone_type": "parking"},
            {"name": "Scoring", "predicate": "y >= 47", "zone_type": "scoring"},
            {"id": "far", "name": "Far", "predicateText": "x > 60", "fill_opacity": 0.1}
        ],
        "metadata": {"created": "2025-01-01", "description": "test"}
    }"##;

    #[test]
    fn reads_editor_documents_and_aliases() {
        let doc = FieldDocument::from_json_str(EDITOR_FILE).unwrap();
        assert_eq!(doc.name, "Decode 2025");
        assert_eq!(doc.zones.len(), 3);

        let parking = &doc.zones[0];
        assert_eq!(parking.zone_type, ZoneType::Parking);
        assert_eq!(parking.color, Some(Color::rgb(0xcc, 0x66, 0x00)));
        assert_eq!(parking.opacity, 0.5);

        let scoring = &doc.zones[1];
        assert_eq!(scoring.zone_type, ZoneType::Custom);
        assert_eq!(scoring.equation, "y >= 47");
        assert_eq!(scoring.opacity, DEFAULT_FILL_OPACITY);
        assert_eq!(scoring.color, None);

        let far = &doc.zones[2];
        assert_eq!(far.id.as_deref(), Some("far"));
        assert_eq!(far.opacity, 0.1);
        assert_eq!(doc.metadata["description"], json!("test"));
    }

    #[test]
    fn missing_sections_use_defaults() {
        let doc = FieldDocument::from_json_str("{}").unwrap();
        assert_eq!(doc, FieldDocument::default());
        assert_eq!(doc.name, DEFAULT_FIELD_NAME);
    }

    #[test]
    fn malformed_documents_are_reported() {
        assert!(matches!(
            FieldDocument::from_json_str("{\"zones\": [{\"name\": \"no equation\"}]}"),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            FieldDocument::from_json_str(
                "{\"zones\": [{\"equation\": \"x > 0\", \"color\": \"red\"}]}"
            ),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            FieldDocument::load("/definitely/not/here.json"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn saves_and_reloads_through_disk() {
        let doc = FieldDocument::from_json_str(EDITOR_FILE).unwrap();
        let path = std::env::temp_dir().join(format!("field_zones_doc_{}.json", std::process::id()));
        doc.save(&path).unwrap();
        let reloaded = FieldDocument::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(reloaded.points, doc.points);
        assert_eq!(reloaded.zones[0], doc.zones[0]);
        // canonical spelling on write
        let text = doc.to_json_pretty().unwrap();
        assert!(text.contains("\"equation\": \"x > 60\""));
        assert!(!text.contains("predicateText"));
    }

    #[test]
    fn records_become_drafts() {
        let record = ZoneRecord::new("Loading", "y <= -47 && x >= 47", ZoneType::Loading);
        let draft = record.to_draft();
        assert_eq!(draft.id, None);
        assert_eq!(draft.zone_type, ZoneType::Loading);
        assert_eq!(draft.predicate_text, "y <= -47 && x >= 47");
        assert_eq!(draft.fill_opacity, DEFAULT_FILL_OPACITY);
    }
}
