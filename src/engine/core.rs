use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::cache::{
    BuildJob, BuildOutcome, Commit, Fetch, PolygonCache, PredicateCache, RecomputePool,
    ZoneGeometry, ZoneNotice, cache_key,
};
use crate::config::{EngineConfig, FieldDocument, ZoneRecord};
use crate::error::{Result, ZoneError};
use crate::expr::{self, ParseError};
use crate::geometry::Point;
use crate::logging::{
    CACHE_TARGET, ENGINE_TARGET, LogLevel, POOL_TARGET, event_with_fields, json_kv, json_str,
};
use crate::metrics::{EngineMetrics, MetricSnapshot};
use crate::registry::{
    Color, EditOutcome, ZoneDefinition, ZoneDraft, ZoneEdit, ZoneId, ZoneRegistry,
};
use crate::sampler::SampleGrid;

use super::render::{ZoneIssue, ZoneRenderItem, ZoneRenderList};

/// Probe points used by `quick_probe`.
pub const PROBE_POINTS: [(f64, f64); 5] = [
    (0.0, 0.0),
    (25.0, 25.0),
    (-25.0, -25.0),
    (50.0, 0.0),
    (0.0, 50.0),
];

/// Tally of one `collect_finished` / `wait_for_builds` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectReport {
    pub stored: usize,
    pub stale: usize,
}

/// Owns the zone registry and every cache derived from it.
///
/// All mutation goes through the engine so the polygon cache can be
/// invalidated at the same time as the definition changes.
pub struct ZoneEngine {
    config: EngineConfig,
    registry: ZoneRegistry,
    polygons: PolygonCache,
    predicates: PredicateCache,
    pool: Option<RecomputePool>,
    /// Stored predicates already reported as broken, by zone and version.
    rejected: HashSet<(ZoneId, u64)>,
    document: FieldDocument,
    started: Instant,
}

impl ZoneEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            registry: ZoneRegistry::new(),
            polygons: PolygonCache::new(),
            predicates: PredicateCache::new(),
            pool: None,
            rejected: HashSet::new(),
            document: FieldDocument::default(),
            started: Instant::now(),
        }
    }

    pub fn with_document(config: EngineConfig, document: FieldDocument) -> Result<Self> {
        let mut engine = Self::new(config);
        engine.load_document(document)?;
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    pub fn zone(&self, zone_id: &str) -> Option<&ZoneDefinition> {
        self.registry.get(zone_id)
    }

    pub fn zones(&self) -> impl Iterator<Item = &ZoneDefinition> + '_ {
        self.registry.iter()
    }

    pub fn cached_polygons(&self) -> usize {
        self.polygons.len()
    }

    pub fn validate_predicate(&self, text: &str) -> std::result::Result<(), ParseError> {
        expr::validate(text)
    }

    /// Evaluate `text` at the standard probe points. Faulting points read
    /// as outside.
    pub fn quick_probe(&self, text: &str) -> std::result::Result<Vec<(Point, bool)>, ParseError> {
        let predicate = expr::compile(text)?;
        Ok(PROBE_POINTS
            .iter()
            .map(|&(x, y)| (Point::new(x, y), predicate.contains(x, y)))
            .collect())
    }

    pub fn add_zone(&mut self, draft: ZoneDraft) -> Result<ZoneId> {
        if let Err(err) = expr::validate(&draft.predicate_text) {
            self.log_rejection(draft.id.as_deref().unwrap_or("<new>"), &err);
            return Err(err.into());
        }
        let id = self.registry.add(draft)?.id.clone();
        self.log(
            LogLevel::Info,
            ENGINE_TARGET,
            "zone_added",
            [json_str("zone_id", id.clone())],
        );
        Ok(id)
    }

    /// Apply a partial edit. A new predicate is validated before anything
    /// changes; on error the zone keeps its old definition.
    pub fn edit_zone(&mut self, zone_id: &str, edit: ZoneEdit) -> Result<EditOutcome> {
        if !self.registry.contains(zone_id) {
            return Err(ZoneError::NotFound(zone_id.to_string()));
        }
        if let Some(text) = edit.predicate_text.as_deref() {
            if let Err(err) = expr::validate(text) {
                self.log_rejection(zone_id, &err);
                return Err(err.into());
            }
        }
        let outcome = self.registry.edit(zone_id, edit)?;
        if outcome.geometry_changed {
            self.polygons.invalidate(zone_id);
            self.prune_predicates();
        }
        Ok(outcome)
    }

    pub fn set_predicate(&mut self, zone_id: &str, text: &str) -> Result<EditOutcome> {
        self.edit_zone(zone_id, ZoneEdit::predicate(text))
    }

    /// Recolor a zone from `#rrggbb` text.
    pub fn set_color(&mut self, zone_id: &str, hex: &str) -> Result<EditOutcome> {
        if !self.registry.contains(zone_id) {
            return Err(ZoneError::NotFound(zone_id.to_string()));
        }
        let color: Color = hex.parse()?;
        self.edit_zone(zone_id, ZoneEdit::style(Some(color), None))
    }

    /// Switch the sampling grid. Every cached polygon is dropped and builds
    /// still in flight come back stale. An invalid grid leaves the old one.
    pub fn set_grid(&mut self, half_extent: f64, step: f64) -> Result<()> {
        let grid = SampleGrid::new(half_extent, step)?;
        if grid == self.config.grid {
            return Ok(());
        }
        self.config.grid = grid;
        self.polygons.clear();
        self.log(
            LogLevel::Info,
            ENGINE_TARGET,
            "grid_changed",
            [
                json_kv("half_extent", half_extent),
                json_kv("step", step),
                json_kv("points", grid.point_count()),
            ],
        );
        Ok(())
    }

    pub fn remove_zone(&mut self, zone_id: &str) -> Result<ZoneDefinition> {
        let removed = self.registry.remove(zone_id)?;
        self.polygons.remove(zone_id);
        self.rejected.retain(|(id, _)| id != zone_id);
        self.prune_predicates();
        self.log(
            LogLevel::Info,
            ENGINE_TARGET,
            "zone_removed",
            [json_str("zone_id", zone_id)],
        );
        Ok(removed)
    }

    /// Geometry for one zone, built on a cache miss.
    pub fn get_or_build(&mut self, zone_id: &str) -> Result<Arc<ZoneGeometry>> {
        let definition = self
            .registry
            .get(zone_id)
            .ok_or_else(|| ZoneError::NotFound(zone_id.to_string()))?;
        let fetched = self.polygons.get_or_build(
            definition,
            &self.config.grid,
            self.config.max_vertices,
            &mut self.predicates,
        );
        let version = definition.version;
        match fetched {
            Ok(fetch) => {
                self.note_fetch(zone_id, version, &fetch);
                Ok(fetch.geometry)
            }
            Err(err) => {
                if self.rejected.insert((zone_id.to_string(), version)) {
                    self.log_rejection(zone_id, &err);
                }
                Err(err.into())
            }
        }
    }

    /// Render list for every zone, in registry order. Turning visibility off
    /// returns an empty list and leaves the cache untouched.
    pub fn list_visible_zone_polygons(&mut self, visible: bool) -> ZoneRenderList {
        let mut list = ZoneRenderList::default();
        if !visible {
            return list;
        }
        let ids = self.registry.ids().to_vec();
        for zone_id in ids {
            let geometry = match self.get_or_build(&zone_id) {
                Ok(geometry) => geometry,
                Err(ZoneError::Parse(err)) => {
                    list.issues.push((zone_id, ZoneIssue::Invalid(err)));
                    continue;
                }
                Err(_) => continue,
            };
            if let Some(notice) = geometry.notice {
                list.issues.push((zone_id.clone(), ZoneIssue::Notice(notice)));
            }
            if geometry.polygon.is_empty() {
                continue;
            }
            if let Some(def) = self.registry.get(&zone_id) {
                list.items.push(ZoneRenderItem {
                    zone_id: def.id.clone(),
                    name: def.name.clone(),
                    zone_type: def.zone_type,
                    polygon: geometry.polygon.clone(),
                    color: def.color,
                    fill_opacity: def.fill_opacity,
                    border_opacity: def.border_opacity(),
                    layer: def.render_layer(),
                });
            }
        }
        list
    }

    /// Zones whose predicate holds at `(x, y)`. Zones with invalid or
    /// faulting predicates are left out.
    pub fn test_point(&mut self, x: f64, y: f64) -> BTreeSet<ZoneId> {
        let mut inside = BTreeSet::new();
        for def in self.registry.iter() {
            if let Ok((predicate, _)) = self.predicates.get_or_compile(&def.predicate_text) {
                if predicate.contains(x, y) {
                    inside.insert(def.id.clone());
                }
            }
        }
        inside
    }

    /// Replace every zone with the document's and drop all cached geometry.
    /// Stored predicates are not validated here; broken ones surface as
    /// issues when listed.
    pub fn load_document(&mut self, document: FieldDocument) -> Result<()> {
        self.registry.replace_all(document.drafts())?;
        self.polygons.clear();
        self.predicates.clear();
        self.rejected.clear();

        let invalid: Vec<(ZoneId, u64, ParseError)> = self
            .registry
            .iter()
            .filter_map(|def| {
                expr::validate(&def.predicate_text)
                    .err()
                    .map(|err| (def.id.clone(), def.version, err))
            })
            .collect();
        for (zone_id, version, err) in &invalid {
            self.log_rejection(zone_id, err);
            self.rejected.insert((zone_id.clone(), *version));
        }

        self.log(
            LogLevel::Info,
            ENGINE_TARGET,
            "config_loaded",
            [
                json_str("field", document.name.clone()),
                json_kv("zones", self.registry.len()),
                json_kv("invalid", invalid.len()),
            ],
        );
        self.document = FieldDocument {
            zones: Vec::new(),
            ..document
        };
        Ok(())
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let document = FieldDocument::load(path)?;
        self.load_document(document)
    }

    /// Current zones inside the last loaded document.
    pub fn to_document(&self) -> FieldDocument {
        FieldDocument {
            zones: self.registry.iter().map(ZoneRecord::from).collect(),
            ..self.document.clone()
        }
    }

    /// Queue background builds for every zone whose geometry changed since
    /// the last dispatch. Returns how many jobs were queued.
    pub fn dispatch_dirty(&mut self) -> Result<usize> {
        let dirty = self.registry.take_dirty();
        if dirty.is_empty() {
            return Ok(0);
        }
        if self.pool.is_none() {
            self.pool = Some(RecomputePool::new(self.config.workers)?);
        }

        let mut jobs = Vec::new();
        for zone_id in dirty {
            let Some(def) = self.registry.get(&zone_id) else {
                continue;
            };
            let key = cache_key(&def.predicate_text, &self.config.grid, self.config.max_vertices);
            if self.polygons.lookup(&zone_id, def.version, &key).is_some() {
                continue;
            }
            let version = def.version;
            match self.predicates.get_or_compile(&def.predicate_text) {
                Ok((predicate, compiled)) => {
                    if compiled {
                        self.with_metrics(EngineMetrics::record_compile);
                    }
                    jobs.push(BuildJob {
                        zone_id,
                        version,
                        generation: self.polygons.generation(),
                        key,
                        predicate,
                        grid: self.config.grid,
                        max_vertices: self.config.max_vertices,
                    });
                }
                Err(err) => self.log_rejection(&zone_id, &err),
            }
        }

        let mut queued = 0;
        if let Some(pool) = self.pool.as_mut() {
            for job in jobs {
                if pool.submit(job) {
                    queued += 1;
                }
            }
        }
        self.log(
            LogLevel::Debug,
            POOL_TARGET,
            "builds_dispatched",
            [json_kv("jobs", queued)],
        );
        Ok(queued)
    }

    /// Commit whatever background builds have finished, without blocking.
    pub fn collect_finished(&mut self) -> CollectReport {
        let outcomes = match self.pool.as_mut() {
            Some(pool) => pool.try_collect(),
            None => return CollectReport::default(),
        };
        self.commit_outcomes(outcomes)
    }

    /// Block until every dispatched build is done, then commit.
    pub fn wait_for_builds(&mut self) -> CollectReport {
        let outcomes = match self.pool.as_mut() {
            Some(pool) => pool.wait_all(),
            None => return CollectReport::default(),
        };
        self.commit_outcomes(outcomes)
    }

    pub fn pending_builds(&self) -> usize {
        self.pool.as_ref().map(RecomputePool::in_flight).unwrap_or(0)
    }

    fn commit_outcomes(&mut self, outcomes: Vec<BuildOutcome>) -> CollectReport {
        let mut report = CollectReport::default();
        for outcome in outcomes {
            let zone_id = outcome.zone_id.clone();
            let version = outcome.version;
            let (evaluated, faults, empty) = (
                outcome.geometry.evaluated,
                outcome.geometry.faults,
                outcome.geometry.is_empty(),
            );
            let current = self.registry.version_of(&zone_id);
            match self.polygons.commit(outcome, current) {
                Commit::Stored => {
                    report.stored += 1;
                    self.with_metrics(|m| m.record_build(evaluated, faults, empty));
                }
                Commit::Stale => {
                    report.stale += 1;
                    self.with_metrics(EngineMetrics::record_stale_discard);
                    self.log(
                        LogLevel::Debug,
                        POOL_TARGET,
                        "stale_discard",
                        [
                            json_str("zone_id", zone_id),
                            json_kv("built_version", version),
                            json_kv("current_version", current),
                        ],
                    );
                }
            }
        }
        report
    }

    pub fn metrics_snapshot(&self) -> Option<MetricSnapshot> {
        let metrics = self.config.metrics.as_ref()?;
        let guard = metrics.lock().ok()?;
        Some(guard.snapshot(self.started.elapsed()))
    }

    /// Log the current metrics snapshot under `metrics_target`.
    pub fn emit_metrics(&self) {
        if let (Some(logger), Some(snapshot)) =
            (self.config.logger.as_ref(), self.metrics_snapshot())
        {
            let _ = logger.log_event(snapshot.to_log_event(&self.config.metrics_target));
        }
    }

    fn note_fetch(&self, zone_id: &str, version: u64, fetch: &Fetch) {
        if fetch.hit {
            self.with_metrics(EngineMetrics::record_hit);
            return;
        }
        let geometry = &fetch.geometry;
        self.with_metrics(|m| {
            if fetch.compiled {
                m.record_compile();
            }
            m.record_build(geometry.evaluated, geometry.faults, geometry.is_empty());
        });
        self.log(
            LogLevel::Debug,
            CACHE_TARGET,
            "cache_miss",
            [
                json_str("zone_id", zone_id),
                json_kv("version", version),
                json_kv("matched", geometry.matched),
                json_kv("vertices", geometry.polygon.len()),
            ],
        );
        match geometry.notice {
            Some(ZoneNotice::Empty) => self.log(
                LogLevel::Info,
                ENGINE_TARGET,
                "zone_empty",
                [json_str("zone_id", zone_id)],
            ),
            Some(ZoneNotice::EvalFaults { count, first }) => self.log(
                LogLevel::Warn,
                ENGINE_TARGET,
                "eval_faults",
                [
                    json_str("zone_id", zone_id),
                    json_kv("count", count),
                    json_str("first", first.to_string()),
                ],
            ),
            Some(ZoneNotice::ConstantFault(err)) => self.log(
                LogLevel::Warn,
                ENGINE_TARGET,
                "constant_fault",
                [
                    json_str("zone_id", zone_id),
                    json_str("error", err.to_string()),
                    json_kv("count", geometry.faults),
                ],
            ),
            None => {}
        }
    }

    fn prune_predicates(&mut self) {
        let live: Vec<&str> = self
            .registry
            .iter()
            .map(|def| def.predicate_text.as_str())
            .collect();
        self.predicates.retain_sources(live);
    }

    fn log_rejection(&self, zone_id: &str, err: &ParseError) {
        let offset = err.offset().map(Value::from).unwrap_or(Value::Null);
        self.log(
            LogLevel::Warn,
            ENGINE_TARGET,
            "predicate_rejected",
            [
                json_str("zone_id", zone_id),
                json_str("error", err.to_string()),
                json_kv("offset", offset),
            ],
        );
    }

    fn log<I>(&self, level: LogLevel, target: &str, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        if let Some(logger) = self.config.logger.as_ref() {
            let _ = logger.log_event(event_with_fields(level, target, message, fields));
        }
    }

    fn with_metrics(&self, record: impl FnOnce(&mut EngineMetrics)) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                record(&mut guard);
            }
        }
    }
}
