use std::io;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use field_zones::logging::NullSink;
use field_zones::{
    EngineConfig, FieldMap, Logger, ProbeDriver, ProbeKey, ZoneEngine, build_boundary, compile,
    presets, sampler,
};

fn engine() -> ZoneEngine {
    let mut config = EngineConfig::default().with_logger(Logger::new(NullSink));
    config.enable_metrics();
    ZoneEngine::with_document(config, presets::competition_document()).expect("engine")
}

fn cold_build(c: &mut Criterion) {
    c.bench_function("engine_cold_build", |b| {
        b.iter(|| {
            let mut engine = engine();
            black_box(engine.list_visible_zone_polygons(true));
        });
    });
}

fn cached_listing(c: &mut Criterion) {
    let mut engine = engine();
    engine.list_visible_zone_polygons(true);
    c.bench_function("engine_cached_listing", |b| {
        b.iter(|| black_box(engine.list_visible_zone_polygons(true)));
    });
}

fn background_rebuild(c: &mut Criterion) {
    c.bench_function("engine_background_rebuild", |b| {
        b.iter(|| {
            let mut engine = engine();
            engine.dispatch_dirty().expect("dispatch");
            black_box(engine.wait_for_builds());
        });
    });
}

fn circle_boundary(c: &mut Criterion) {
    let predicate = compile("x*x + y*y <= 2500").expect("compile");
    let grid = Default::default();
    c.bench_function("circle_sample_and_hull", |b| {
        b.iter(|| {
            let set = sampler::sample(&predicate, &grid);
            black_box(build_boundary(&set.points, 25))
        });
    });
}

fn scripted_tester(c: &mut Criterion) {
    let script = [
        ProbeKey::Grow,
        ProbeKey::Right,
        ProbeKey::Right,
        ProbeKey::Up,
        ProbeKey::Shrink,
        ProbeKey::Left,
    ];
    c.bench_function("tester_scripted_walk", |b| {
        b.iter(|| {
            let mut driver = ProbeDriver::new(engine()).with_map(FieldMap::new(48, 24));
            let mut sink = io::sink();
            driver
                .run_scripted(&mut sink, black_box(script))
                .expect("scripted run");
        });
    });
}

criterion_group!(
    benches,
    cold_build,
    cached_listing,
    background_rebuild,
    circle_boundary,
    scripted_tester
);
criterion_main!(benches);
