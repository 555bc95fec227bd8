//! Zone tester - move a probe around the field and see which zones hold it.
//!
//! Usage: `cargo run --example zone_tester [field.json]`
//!
//! Without a path the competition preset is loaded. Set `ZONES_LOG` to a file
//! path to capture engine events as JSON lines. With `CI` or `HEADLESS` set a
//! short scripted walk is printed instead of opening the terminal UI.

use std::env;
use std::io;

use field_zones::logging::FileSink;
use field_zones::{
    EngineConfig, FieldDocument, FieldMap, Logger, ProbeDriver, ProbeKey, ZoneEngine, presets,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = EngineConfig::default();
    if let Ok(path) = env::var("ZONES_LOG") {
        config = config.with_logger(Logger::new(FileSink::new(path, 1 << 20)?));
    }
    config.enable_metrics();

    let document = match env::args().nth(1) {
        Some(path) => FieldDocument::load(&path)?,
        None => presets::competition_document(),
    };
    let mut engine = ZoneEngine::with_document(config, document)?;

    let report = engine.list_visible_zone_polygons(true);
    for (zone_id, issue) in &report.issues {
        eprintln!("{zone_id}: {issue}");
    }

    let is_headless = env::var("CI").is_ok() || env::var("HEADLESS").is_ok();
    if is_headless {
        let mut driver = ProbeDriver::new(engine).with_map(FieldMap::new(48, 24).plain());
        let script = [
            ProbeKey::Grow,
            ProbeKey::Grow,
            ProbeKey::Right,
            ProbeKey::Right,
            ProbeKey::Down,
            ProbeKey::Down,
        ];
        driver.run_scripted(&mut io::sink(), script)?;
        for line in driver.frame() {
            println!("{line}");
        }
        driver.engine().emit_metrics();
        return Ok(());
    }

    let state = ProbeDriver::new(engine).run()?;
    println!("probe left at x = {:.2}, y = {:.2}", state.x, state.y);
    Ok(())
}
