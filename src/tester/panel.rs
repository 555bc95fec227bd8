use crate::engine::ZoneEngine;
use crate::registry::ZoneType;

use super::state::ProbeState;
use super::width::{display_width, pad_to};

const YES: &str = "\x1b[1;32mYES\x1b[0m";
const NO: &str = "\x1b[2mno\x1b[0m";

/// Aggregate rows shown under the per-zone list.
const AGGREGATES: [(&str, ZoneType); 3] = [
    ("In any launch zone", ZoneType::Launch),
    ("In any parking", ZoneType::Parking),
    ("In any loading", ZoneType::Loading),
];

/// Text side panel: controls, probe position and zone membership.
#[derive(Debug, Clone, Copy)]
pub struct ProbePanel {
    pub width: usize,
}

impl Default for ProbePanel {
    fn default() -> Self {
        Self { width: 36 }
    }
}

impl ProbePanel {
    pub fn new(width: usize) -> Self {
        Self { width }
    }

    pub fn render(&self, engine: &mut ZoneEngine, state: &ProbeState) -> Vec<String> {
        let inside = engine.test_point(state.x, state.y);
        let rows: Vec<(String, ZoneType, bool)> = engine
            .zones()
            .map(|zone| (zone.name.clone(), zone.zone_type, inside.contains(&zone.id)))
            .collect();

        let label_width = rows
            .iter()
            .map(|(name, _, _)| display_width(name))
            .chain(AGGREGATES.iter().map(|(label, _)| display_width(label)))
            .max()
            .unwrap_or(0);
        let flag = |hit: bool| if hit { YES } else { NO };
        let rule = "─".repeat(self.width);

        let mut lines = vec![
            "Zone tester".to_string(),
            "←/→/↑/↓ move  +/- step  q quit".to_string(),
            format!("Position  x = {:7.2}  y = {:7.2}", state.x, state.y),
            format!("Step      {:.2} in", state.step),
            rule.clone(),
        ];
        if rows.is_empty() {
            lines.push("(no zones loaded)".to_string());
        }
        for (name, _, hit) in &rows {
            lines.push(format!("{}  {}", pad_to(name, label_width), flag(*hit)));
        }
        lines.push(rule);
        for (label, zone_type) in AGGREGATES {
            let hit = rows.iter().any(|(_, t, hit)| *t == zone_type && *hit);
            lines.push(format!("{}  {}", pad_to(label, label_width), flag(hit)));
        }

        lines.into_iter().map(|line| pad_to(&line, self.width)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::presets;

    fn plain(line: &str) -> String {
        String::from_utf8_lossy(&strip_ansi_escapes::strip(line)).into_owned()
    }

    #[test]
    fn lists_membership_in_registry_order() {
        let mut engine =
            ZoneEngine::with_document(EngineConfig::default(), presets::competition_document())
                .unwrap();
        let mut state = ProbeState::new(70.5);
        state.x = 35.0;
        state.y = -30.0;

        let lines: Vec<String> = ProbePanel::new(40)
            .render(&mut engine, &state)
            .iter()
            .map(|l| plain(l))
            .collect();

        assert!(lines[2].contains("35.00") && lines[2].contains("-30.00"));
        let row = |label: &str| {
            lines
                .iter()
                .find(|l| l.starts_with(label))
                .map(|l| l.trim_end().to_string())
                .unwrap()
        };
        assert!(row("Red parking").ends_with("YES"));
        assert!(row("Blue parking").ends_with("no"));
        assert!(row("Red alliance right").ends_with("YES"));
        assert!(row("Red alliance left").ends_with("no"));
        assert!(row("In any parking").ends_with("YES"));
        assert!(row("In any launch zone").ends_with("no"));

        let names: Vec<&String> = lines
            .iter()
            .filter(|l| l.starts_with("Long range") || l.starts_with("Blue alliance"))
            .collect();
        assert!(names[0].starts_with("Blue alliance"));
        assert!(names[2].starts_with("Long range"));
    }

    #[test]
    fn every_line_has_the_panel_width() {
        let mut engine = ZoneEngine::new(EngineConfig::default());
        let lines = ProbePanel::new(40).render(&mut engine, &ProbeState::new(70.5));
        assert!(lines.iter().any(|l| l.contains("no zones loaded")));
        for line in &lines {
            assert_eq!(display_width(line), 40, "{line:?}");
        }
    }
}
