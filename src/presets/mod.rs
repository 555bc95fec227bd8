//! Built-in zone sets.

use crate::config::{FieldDocument, ZoneRecord};
use crate::registry::ZoneType;

/// Alliance areas come first so the smaller zones draw over them, and each
/// covers one quadrant so its hull stays convex.
const COMPETITION_ZONES: [(&str, &str, &str, ZoneType); 10] = [
    (
        "red-alliance-right",
        "Red alliance right",
        "y < 0 && x > 0",
        ZoneType::RedAlliance,
    ),
    (
        "red-alliance-left",
        "Red alliance left",
        "y > 0 && x < 0",
        ZoneType::RedAlliance,
    ),
    (
        "blue-alliance-right",
        "Blue alliance right",
        "y > 0 && x > 0",
        ZoneType::BlueAlliance,
    ),
    (
        "blue-alliance-left",
        "Blue alliance left",
        "y < 0 && x < 0",
        ZoneType::BlueAlliance,
    ),
    (
        "long-range",
        "Long range",
        "y <= x - 46 && y >= -x + 46",
        ZoneType::Launch,
    ),
    (
        "short-range",
        "Short range",
        "y >= 1.015*x && y <= -1.015*x",
        ZoneType::Launch,
    ),
    (
        "red-parking",
        "Red parking",
        "x >= 30 && x <= 45.75 && y >= -40.5 && y <= -24.7",
        ZoneType::Parking,
    ),
    (
        "blue-parking",
        "Blue parking",
        "x >= 30 && x <= 45.75 && y >= 24.7 && y <= 40.5",
        ZoneType::Parking,
    ),
    (
        "red-loading",
        "Red loading",
        "y <= -47 && x >= 47",
        ZoneType::Loading,
    ),
    (
        "blue-loading",
        "Blue loading",
        "y >= 47 && x >= 47",
        ZoneType::Loading,
    ),
];

/// Launch, parking, loading and alliance zones of the competition field.
pub fn competition_field() -> Vec<ZoneRecord> {
    COMPETITION_ZONES
        .iter()
        .map(|&(id, name, equation, zone_type)| {
            let mut record = ZoneRecord::new(name, equation, zone_type);
            record.id = Some(id.to_string());
            if matches!(zone_type, ZoneType::RedAlliance | ZoneType::BlueAlliance) {
                record.opacity = 0.15;
            }
            record
        })
        .collect()
}

/// `competition_field` wrapped in a document.
pub fn competition_document() -> FieldDocument {
    FieldDocument {
        name: "Competition field".to_string(),
        zones: competition_field(),
        ..FieldDocument::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::compile;

    #[test]
    fn every_preset_compiles_and_has_a_unique_id() {
        let zones = competition_field();
        assert_eq!(zones.len(), 10);
        let mut ids: Vec<_> = zones.iter().filter_map(|z| z.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 10);
        for zone in &zones {
            assert!(compile(&zone.equation).is_ok(), "{}", zone.name);
        }
    }

    #[test]
    fn preset_membership_matches_the_field_layout() {
        let zones = competition_field();
        let member = |id: &str, x: f64, y: f64| {
            let zone = zones.iter().find(|z| z.id.as_deref() == Some(id)).unwrap();
            compile(&zone.equation).unwrap().contains(x, y)
        };
        assert!(member("long-range", 60.0, 0.0));
        assert!(!member("long-range", 40.0, 0.0));
        assert!(member("short-range", -30.0, 0.0));
        assert!(member("red-parking", 35.0, -30.0));
        assert!(member("blue-loading", 60.0, 60.0));
        assert!(member("red-alliance-right", 10.0, -10.0));
        assert!(member("red-alliance-left", -10.0, 10.0));
        assert!(member("blue-alliance-left", -10.0, -10.0));
        for id in ["red-alliance-right", "red-alliance-left", "blue-alliance-right"] {
            assert!(!member(id, 0.0, 0.0), "{id}");
        }
    }
}
