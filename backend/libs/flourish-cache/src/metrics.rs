//! Cache metrics for observability

use prometheus::{CounterVec, Opts, Registry};
use std::sync::OnceLock;

static METRICS: OnceLock<CacheMetricsInner> = OnceLock::new();

struct CacheMetricsInner {
    hits: CounterVec,
    misses: CounterVec,
    negative_hits: CounterVec,
    writes: CounterVec,
    negative_writes: CounterVec,
    invalidations: CounterVec,
    evictions: CounterVec,
}

fn counter(name: &str, help: &str) -> CounterVec {
    CounterVec::new(Opts::new(name, help), &["cache"]).expect("valid metric definition")
}

impl CacheMetricsInner {
    fn new() -> Self {
        Self {
            hits: counter("flourish_cache_hits_total", "Total cache hits"),
            misses: counter("flourish_cache_misses_total", "Total cache misses"),
            negative_hits: counter(
                "flourish_cache_negative_hits_total",
                "Total reads that found an error entry",
            ),
            writes: counter("flourish_cache_writes_total", "Total cache writes"),
            negative_writes: counter(
                "flourish_cache_negative_writes_total",
                "Total error entry writes",
            ),
            invalidations: counter(
                "flourish_cache_invalidations_total",
                "Total explicit cache invalidations",
            ),
            evictions: counter(
                "flourish_cache_evictions_total",
                "Total entries removed because they expired",
            ),
        }
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.hits.clone()))?;
        registry.register(Box::new(self.misses.clone()))?;
        registry.register(Box::new(self.negative_hits.clone()))?;
        registry.register(Box::new(self.writes.clone()))?;
        registry.register(Box::new(self.negative_writes.clone()))?;
        registry.register(Box::new(self.invalidations.clone()))?;
        registry.register(Box::new(self.evictions.clone()))?;
        Ok(())
    }
}

fn get_metrics() -> &'static CacheMetricsInner {
    METRICS.get_or_init(CacheMetricsInner::new)
}

/// Cache metrics wrapper, labelled by cache instance name
#[derive(Clone, Debug)]
pub struct CacheMetrics {
    cache: &'static str,
}

impl CacheMetrics {
    pub fn new(cache: &'static str) -> Self {
        Self { cache }
    }

    /// Register metrics with a Prometheus registry
    pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
        get_metrics().register(registry)
    }

    pub fn record_hit(&self) {
        get_metrics().hits.with_label_values(&[self.cache]).inc();
    }

    pub fn record_miss(&self) {
        get_metrics().misses.with_label_values(&[self.cache]).inc();
    }

    pub fn record_negative_hit(&self) {
        get_metrics()
            .negative_hits
            .with_label_values(&[self.cache])
            .inc();
    }

    pub fn record_write(&self) {
        get_metrics().writes.with_label_values(&[self.cache]).inc();
    }

    pub fn record_negative_write(&self) {
        get_metrics()
            .negative_writes
            .with_label_values(&[self.cache])
            .inc();
    }

    pub fn record_invalidation(&self, count: usize) {
        get_metrics()
            .invalidations
            .with_label_values(&[self.cache])
            .inc_by(count as f64);
    }

    pub fn record_eviction(&self, count: usize) {
        get_metrics()
            .evictions
            .with_label_values(&[self.cache])
            .inc_by(count as f64);
    }
}
