use crate::engine::ZoneEngine;
use crate::registry::{Color, ZoneType};

use super::state::ProbeState;

const RESET: &str = "\x1b[0m";
const EMPTY: char = '.';
const PROBE: char = '@';

fn glyph(zone_type: ZoneType) -> char {
    match zone_type {
        ZoneType::Launch => '^',
        ZoneType::Parking => 'P',
        ZoneType::Loading => 'L',
        ZoneType::Risky => '!',
        ZoneType::Neutral => 'n',
        ZoneType::RedAlliance => 'r',
        ZoneType::BlueAlliance => 'b',
        ZoneType::Custom => '#',
    }
}

fn foreground(color: Color) -> String {
    format!("\x1b[38;2;{};{};{}m", color.r, color.g, color.b)
}

/// Character raster of the field. Each cell shows the topmost zone at its
/// centre; later zones in registry order draw over earlier ones.
#[derive(Debug, Clone, Copy)]
pub struct FieldMap {
    pub cols: usize,
    pub rows: usize,
    pub colored: bool,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            cols: 48,
            rows: 24,
            colored: true,
        }
    }
}

impl FieldMap {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols: cols.max(1),
            rows: rows.max(1),
            colored: true,
        }
    }

    pub fn plain(mut self) -> Self {
        self.colored = false;
        self
    }

    /// Field coordinate at the centre of cell `(col, row)`. Row 0 is the top.
    pub fn cell_center(&self, half_extent: f64, col: usize, row: usize) -> (f64, f64) {
        let span = 2.0 * half_extent;
        let x = -half_extent + (col as f64 + 0.5) * span / self.cols as f64;
        let y = half_extent - (row as f64 + 0.5) * span / self.rows as f64;
        (x, y)
    }

    /// Cell containing `(x, y)`, clamped to the raster.
    pub fn cell_of(&self, half_extent: f64, x: f64, y: f64) -> (usize, usize) {
        let span = 2.0 * half_extent;
        if span <= 0.0 {
            return (0, 0);
        }
        let col = ((x + half_extent) / span * self.cols as f64).floor();
        let row = ((half_extent - y) / span * self.rows as f64).floor();
        (
            (col.max(0.0) as usize).min(self.cols - 1),
            (row.max(0.0) as usize).min(self.rows - 1),
        )
    }

    pub fn render(&self, engine: &mut ZoneEngine, state: &ProbeState) -> Vec<String> {
        let half = state.half_extent();
        let probe = self.cell_of(half, state.x, state.y);
        let layers: Vec<(String, char, Color)> = engine
            .zones()
            .map(|zone| (zone.id.clone(), glyph(zone.zone_type), zone.color))
            .collect();

        let mut lines = Vec::with_capacity(self.rows);
        for row in 0..self.rows {
            let mut line = String::with_capacity(self.cols * 4);
            for col in 0..self.cols {
                if (col, row) == probe {
                    line.push(PROBE);
                    continue;
                }
                let (x, y) = self.cell_center(half, col, row);
                let inside = engine.test_point(x, y);
                let top = layers.iter().rev().find(|(id, _, _)| inside.contains(id));
                match top {
                    Some((_, ch, color)) if self.colored => {
                        line.push_str(&foreground(*color));
                        line.push(*ch);
                        line.push_str(RESET);
                    }
                    Some((_, ch, _)) => line.push(*ch),
                    None => line.push(EMPTY),
                }
            }
            lines.push(line);
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::registry::ZoneDraft;
    use crate::tester::display_width;

    fn engine_with(drafts: Vec<ZoneDraft>) -> ZoneEngine {
        let mut engine = ZoneEngine::new(EngineConfig::default());
        for draft in drafts {
            engine.add_zone(draft).unwrap();
        }
        engine
    }

    #[test]
    fn cell_geometry_is_symmetric() {
        let map = FieldMap::new(10, 10);
        assert_eq!(map.cell_center(10.0, 0, 0), (-9.0, 9.0));
        assert_eq!(map.cell_center(10.0, 9, 9), (9.0, -9.0));
        assert_eq!(map.cell_of(10.0, -9.0, 9.0), (0, 0));
        assert_eq!(map.cell_of(10.0, 10.0, -10.0), (9, 9));
        assert_eq!(map.cell_of(10.0, 0.5, 0.5), (5, 4));
    }

    #[test]
    fn later_zones_draw_on_top() {
        let mut engine = engine_with(vec![
            ZoneDraft::new("Half", "x >= 0").with_type(ZoneType::Launch),
            ZoneDraft::new("Quarter", "x >= 0 && y >= 0").with_type(ZoneType::Parking),
        ]);
        let mut state = ProbeState::new(70.5);
        state.x = -70.5;
        state.y = -70.5;

        let lines = FieldMap::new(4, 4).plain().render(&mut engine, &state);
        assert_eq!(lines, vec!["..PP", "..PP", "..^^", "@.^^"]);
    }

    #[test]
    fn colored_cells_keep_the_grid_width() {
        let mut engine = engine_with(vec![ZoneDraft::new("All", "x == x")]);
        let state = ProbeState::new(70.5);
        let lines = FieldMap::new(8, 3).render(&mut engine, &state);
        assert_eq!(lines.len(), 3);
        for line in &lines {
            assert_eq!(display_width(line), 8);
        }
        assert!(lines[0].starts_with("\x1b[38;2;"));
    }
}
