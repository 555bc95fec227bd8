use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;
use std::time::Duration;

/// Counters accumulated by a `ZoneEngine`.
#[derive(Debug, Default, Clone)]
pub struct EngineMetrics {
    cache_hits: u64,
    cache_misses: u64,
    sampled_points: u64,
    eval_faults: u64,
    empty_zones: u64,
    stale_discards: u64,
    predicate_compiles: u64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&mut self) {
        self.cache_hits = self.cache_hits.saturating_add(1);
    }

    /// A geometry build: one miss plus the work the sampler did.
    pub fn record_build(&mut self, evaluated: usize, faults: usize, empty: bool) {
        self.cache_misses = self.cache_misses.saturating_add(1);
        self.sampled_points = self.sampled_points.saturating_add(evaluated as u64);
        self.eval_faults = self.eval_faults.saturating_add(faults as u64);
        if empty {
            self.empty_zones = self.empty_zones.saturating_add(1);
        }
    }

    pub fn record_stale_discard(&mut self) {
        self.stale_discards = self.stale_discards.saturating_add(1);
    }

    pub fn record_compile(&mut self) {
        self.predicate_compiles = self.predicate_compiles.saturating_add(1);
    }

    pub fn snapshot(&self, uptime: Duration) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            cache_hits: self.cache_hits,
            cache_misses: self.cache_misses,
            sampled_points: self.sampled_points,
            eval_faults: self.eval_faults,
            empty_zones: self.empty_zones,
            stale_discards: self.stale_discards,
            predicate_compiles: self.predicate_compiles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub sampled_points: u64,
    pub eval_faults: u64,
    pub empty_zones: u64,
    pub stale_discards: u64,
    pub predicate_compiles: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "engine_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("uptime_ms".to_string(), json!(self.uptime_ms));
        map.insert("cache_hits".to_string(), json!(self.cache_hits));
        map.insert("cache_misses".to_string(), json!(self.cache_misses));
        map.insert("sampled_points".to_string(), json!(self.sampled_points));
        map.insert("eval_faults".to_string(), json!(self.eval_faults));
        map.insert("empty_zones".to_string(), json!(self.empty_zones));
        map.insert("stale_discards".to_string(), json!(self.stale_discards));
        map.insert(
            "predicate_compiles".to_string(),
            json!(self.predicate_compiles),
        );
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_work() {
        let mut metrics = EngineMetrics::new();
        metrics.record_compile();
        metrics.record_build(9025, 0, false);
        metrics.record_build(9025, 9025, true);
        metrics.record_hit();
        metrics.record_stale_discard();

        let snap = metrics.snapshot(Duration::from_millis(1500));
        assert_eq!(snap.uptime_ms, 1500);
        assert_eq!(snap.cache_misses, 2);
        assert_eq!(snap.cache_hits, 1);
        assert_eq!(snap.sampled_points, 18050);
        assert_eq!(snap.eval_faults, 9025);
        assert_eq!(snap.empty_zones, 1);
        assert_eq!(snap.stale_discards, 1);

        let event = snap.to_log_event("zones::engine.metrics");
        assert_eq!(event.message, "engine_metrics");
        assert_eq!(event.fields["cache_hits"], json!(1));
    }
}
