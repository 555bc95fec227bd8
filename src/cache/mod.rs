//! Memoized zone geometry.
//!
//! Entries are keyed by zone id and validated against both the zone's
//! geometry version and a blake3 content hash over everything that shapes
//! the polygon. Style never enters the key.

mod pool;

use std::collections::HashMap;
use std::sync::Arc;

use blake3::Hash;
use serde::Serialize;

use crate::expr::{self, CompiledPredicate, EvalError, ParseError};
use crate::hull::{self, Polygon};
use crate::registry::{ZoneDefinition, ZoneId};
use crate::sampler::{self, SampleGrid};

pub use pool::{BuildJob, BuildOutcome, RecomputePool};

/// Non-blocking condition worth showing next to a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneNotice {
    /// No sample point matched; the zone draws nothing.
    Empty,
    /// Some samples faulted and were treated as outside.
    EvalFaults {
        count: usize,
        #[serde(serialize_with = "serialize_eval_error")]
        first: EvalError,
    },
    /// A variable-free sub-expression faults at every point.
    ConstantFault(#[serde(serialize_with = "serialize_eval_error")] EvalError),
}

fn serialize_eval_error<S: serde::Serializer>(err: &EvalError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(err)
}

/// Built boundary plus what the sampler saw while building it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneGeometry {
    pub polygon: Polygon,
    pub matched: usize,
    pub evaluated: usize,
    pub faults: usize,
    /// The hull had more vertices than the cap and was decimated.
    pub decimated: bool,
    pub notice: Option<ZoneNotice>,
}

impl ZoneGeometry {
    /// Sample the grid and hull the matches.
    pub fn build(predicate: &CompiledPredicate, grid: &SampleGrid, max_vertices: usize) -> Self {
        let set = sampler::sample(predicate, grid);
        let full = hull::convex_hull(&set.points);
        let polygon = hull::simplify(&full, max_vertices);
        let decimated = polygon.len() < full.len();
        let notice = match (predicate.constant_fault(), set.first_fault) {
            (Some(err), _) => Some(ZoneNotice::ConstantFault(err)),
            (None, Some(first)) => Some(ZoneNotice::EvalFaults {
                count: set.faults,
                first,
            }),
            (None, None) if set.points.is_empty() => Some(ZoneNotice::Empty),
            (None, None) => None,
        };
        Self {
            polygon,
            matched: set.points.len(),
            evaluated: set.evaluated,
            faults: set.faults,
            decimated,
            notice,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matched == 0
    }
}

/// Content hash over the predicate text, the grid and the vertex cap.
pub fn cache_key(predicate_text: &str, grid: &SampleGrid, max_vertices: usize) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(predicate_text.as_bytes());
    hasher.update(&[0]);
    hasher.update(&grid.key_bytes());
    hasher.update(&(max_vertices as u64).to_le_bytes());
    hasher.finalize()
}

/// Compiled predicates keyed by the content hash of their source.
#[derive(Debug, Default)]
pub struct PredicateCache {
    entries: HashMap<Hash, Arc<CompiledPredicate>>,
}

impl PredicateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the compiled predicate and whether it had to be compiled now.
    pub fn get_or_compile(&mut self, text: &str) -> Result<(Arc<CompiledPredicate>, bool), ParseError> {
        let hash = blake3::hash(text.as_bytes());
        if let Some(found) = self.entries.get(&hash) {
            return Ok((Arc::clone(found), false));
        }
        let compiled = Arc::new(expr::compile(text)?);
        self.entries.insert(hash, Arc::clone(&compiled));
        Ok((compiled, true))
    }

    /// Drop predicates whose source is no longer in use.
    pub fn retain_sources<'a>(&mut self, live: impl IntoIterator<Item = &'a str>) {
        let keep: std::collections::HashSet<Hash> = live
            .into_iter()
            .map(|text| blake3::hash(text.as_bytes()))
            .collect();
        self.entries.retain(|hash, _| keep.contains(hash));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    key: Hash,
    version: u64,
    geometry: Arc<ZoneGeometry>,
}

/// Geometry returned by `PolygonCache::get_or_build`.
#[derive(Debug, Clone)]
pub struct Fetch {
    pub geometry: Arc<ZoneGeometry>,
    /// Served from the cache without sampling.
    pub hit: bool,
    /// The predicate was compiled for this build.
    pub compiled: bool,
}

/// Result of committing a background build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    Stored,
    /// The zone moved on (or vanished) while the job ran.
    Stale,
}

/// Zone id → geometry memo. Owned by one engine; never global.
#[derive(Debug, Default)]
pub struct PolygonCache {
    entries: HashMap<ZoneId, CacheEntry>,
    generation: u64,
}

impl PolygonCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Geometry for `zone_id` if it was built from exactly this version and key.
    pub fn lookup(&self, zone_id: &str, version: u64, key: &Hash) -> Option<Arc<ZoneGeometry>> {
        self.entries
            .get(zone_id)
            .filter(|entry| entry.version == version && entry.key == *key)
            .map(|entry| Arc::clone(&entry.geometry))
    }

    pub fn get_or_build(
        &mut self,
        definition: &ZoneDefinition,
        grid: &SampleGrid,
        max_vertices: usize,
        predicates: &mut PredicateCache,
    ) -> Result<Fetch, ParseError> {
        let key = cache_key(&definition.predicate_text, grid, max_vertices);
        if let Some(geometry) = self.lookup(&definition.id, definition.version, &key) {
            return Ok(Fetch {
                geometry,
                hit: true,
                compiled: false,
            });
        }
        let (predicate, compiled) = predicates.get_or_compile(&definition.predicate_text)?;
        let geometry = Arc::new(ZoneGeometry::build(&predicate, grid, max_vertices));
        self.store(definition.id.clone(), definition.version, key, Arc::clone(&geometry));
        Ok(Fetch {
            geometry,
            hit: false,
            compiled,
        })
    }

    fn store(&mut self, zone_id: ZoneId, version: u64, key: Hash, geometry: Arc<ZoneGeometry>) {
        self.entries.insert(
            zone_id,
            CacheEntry {
                key,
                version,
                geometry,
            },
        );
    }

    /// Store a background result unless the zone's version moved on or the
    /// cache was cleared after the job was dispatched.
    pub fn commit(&mut self, outcome: BuildOutcome, current_version: Option<u64>) -> Commit {
        if outcome.generation != self.generation || current_version != Some(outcome.version) {
            return Commit::Stale;
        }
        self.store(
            outcome.zone_id,
            outcome.version,
            outcome.key,
            Arc::new(outcome.geometry),
        );
        Commit::Stored
    }

    pub fn invalidate(&mut self, zone_id: &str) -> bool {
        self.entries.remove(zone_id).is_some()
    }

    pub fn remove(&mut self, zone_id: &str) -> Option<Arc<ZoneGeometry>> {
        self.entries.remove(zone_id).map(|entry| entry.geometry)
    }

    /// Drop everything. Jobs dispatched before this point become stale.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn contains(&self, zone_id: &str) -> bool {
        self.entries.contains_key(zone_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hull::MAX_VERTICES;
    use crate::registry::ZoneType;

    fn zone(id: &str, predicate: &str, version: u64) -> ZoneDefinition {
        ZoneDefinition {
            id: id.into(),
            name: id.into(),
            zone_type: ZoneType::Custom,
            predicate_text: predicate.into(),
            color: ZoneType::Custom.default_color(),
            fill_opacity: 0.3,
            version,
            revision: version,
        }
    }

    #[test]
    fn second_lookup_is_a_hit_with_the_same_arc() {
        let mut cache = PolygonCache::new();
        let mut predicates = PredicateCache::new();
        let grid = SampleGrid::default();
        let def = zone("parking", "x >= 30 && y <= -24.7", 1);

        let first = cache
            .get_or_build(&def, &grid, MAX_VERTICES, &mut predicates)
            .unwrap();
        assert!(!first.hit && first.compiled);
        let second = cache
            .get_or_build(&def, &grid, MAX_VERTICES, &mut predicates)
            .unwrap();
        assert!(second.hit);
        assert!(Arc::ptr_eq(&first.geometry, &second.geometry));
    }

    #[test]
    fn version_or_grid_change_misses() {
        let mut cache = PolygonCache::new();
        let mut predicates = PredicateCache::new();
        let grid = SampleGrid::default();
        let def = zone("z", "x > 0", 1);
        cache.get_or_build(&def, &grid, MAX_VERTICES, &mut predicates).unwrap();

        let bumped = zone("z", "x < 0", 2);
        assert!(!cache
            .get_or_build(&bumped, &grid, MAX_VERTICES, &mut predicates)
            .unwrap()
            .hit);

        let coarse = SampleGrid::new(70.5, 3.0).unwrap();
        assert!(!cache
            .get_or_build(&bumped, &coarse, MAX_VERTICES, &mut predicates)
            .unwrap()
            .hit);
    }

    #[test]
    fn predicates_compile_once_per_distinct_text() {
        let mut predicates = PredicateCache::new();
        let (a, fresh_a) = predicates.get_or_compile("x > 1").unwrap();
        let (b, fresh_b) = predicates.get_or_compile("x > 1").unwrap();
        assert!(fresh_a && !fresh_b);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(predicates.get_or_compile("x >").is_err());
        assert_eq!(predicates.len(), 1);

        predicates.get_or_compile("y > 1").unwrap();
        predicates.retain_sources(["y > 1"]);
        assert_eq!(predicates.len(), 1);
    }

    #[test]
    fn notices_describe_empty_and_faulting_zones() {
        let grid = SampleGrid::default();
        let empty = ZoneGeometry::build(&expr::compile("x > 1000").unwrap(), &grid, MAX_VERTICES);
        assert_eq!(empty.notice, Some(ZoneNotice::Empty));
        assert!(empty.polygon.is_empty());

        let constant = ZoneGeometry::build(&expr::compile("1/0 == 1").unwrap(), &grid, MAX_VERTICES);
        assert_eq!(
            constant.notice,
            Some(ZoneNotice::ConstantFault(EvalError::DivisionByZero))
        );
        assert_eq!(constant.faults, constant.evaluated);

        let partial = ZoneGeometry::build(
            &expr::compile("y / x > 0").unwrap(),
            &SampleGrid::new(3.0, 1.0).unwrap(),
            MAX_VERTICES,
        );
        assert_eq!(
            partial.notice,
            Some(ZoneNotice::EvalFaults {
                count: 7,
                first: EvalError::DivisionByZero
            })
        );
    }

    #[test]
    fn invalidate_and_clear_drop_entries() {
        let mut cache = PolygonCache::new();
        let mut predicates = PredicateCache::new();
        let grid = SampleGrid::default();
        cache
            .get_or_build(&zone("a", "x > 0", 1), &grid, MAX_VERTICES, &mut predicates)
            .unwrap();
        cache
            .get_or_build(&zone("b", "y > 0", 1), &grid, MAX_VERTICES, &mut predicates)
            .unwrap();

        assert!(cache.invalidate("a"));
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));

        let before = cache.generation();
        cache.clear();
        assert!(cache.is_empty());
        assert_ne!(cache.generation(), before);
    }

    #[test]
    fn commit_discards_stale_results() {
        let mut cache = PolygonCache::new();
        let grid = SampleGrid::default();
        let predicate = expr::compile("x > 0").unwrap();
        let outcome = |version, generation| BuildOutcome {
            zone_id: "z".into(),
            version,
            generation,
            key: cache_key("x > 0", &grid, MAX_VERTICES),
            geometry: ZoneGeometry::build(&predicate, &grid, MAX_VERTICES),
        };

        assert_eq!(cache.commit(outcome(1, 0), Some(2)), Commit::Stale);
        assert_eq!(cache.commit(outcome(1, 0), None), Commit::Stale);
        assert_eq!(cache.commit(outcome(2, 0), Some(2)), Commit::Stored);
        assert!(cache.contains("z"));

        cache.clear();
        assert_eq!(cache.commit(outcome(2, 0), Some(2)), Commit::Stale);
    }
}
