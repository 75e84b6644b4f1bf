//! Cache Metrics Collection
//!
//! Passive hit/miss counters per named cache layer and response-time
//! tracking per logical operation. A pure observer: nothing here mutates
//! the replica or the metrics registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;

/// Upper bounds (microseconds) of the per-operation latency buckets.
/// Samples above the last bound land in an overflow bucket.
pub const LATENCY_BUCKET_BOUNDS_US: [u64; 5] = [100, 1_000, 10_000, 100_000, 1_000_000];

#[derive(Debug, Default)]
struct LayerCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Response-time accounting for one logical operation: sample count, total,
/// a smoothed moving average, and a fixed-bucket histogram.
#[derive(Debug, Default)]
struct OperationTimings {
    count: AtomicU64,
    sum_us: AtomicU64,
    ema_us: AtomicU64,
    /// One counter per bound in [`LATENCY_BUCKET_BOUNDS_US`], plus overflow
    buckets: [AtomicU64; LATENCY_BUCKET_BOUNDS_US.len() + 1],
}

impl OperationTimings {
    fn record(&self, sample_us: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_us.fetch_add(sample_us, Ordering::Relaxed);

        let slot = LATENCY_BUCKET_BOUNDS_US
            .iter()
            .position(|bound| sample_us <= *bound)
            .unwrap_or(LATENCY_BUCKET_BOUNDS_US.len());
        self.buckets[slot].fetch_add(1, Ordering::Relaxed);

        let alpha = 0.1; // EMA smoothing factor
        loop {
            let current = self.ema_us.load(Ordering::Relaxed);
            let updated = if current == 0 {
                sample_us
            } else {
                ((1.0 - alpha) * current as f64 + alpha * sample_us as f64) as u64
            };

            if self
                .ema_us
                .compare_exchange_weak(current, updated, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }
    }

    fn snapshot(&self) -> OperationLatencySnapshot {
        OperationLatencySnapshot {
            count: self.count.load(Ordering::Relaxed),
            sum_us: self.sum_us.load(Ordering::Relaxed),
            ema_us: self.ema_us.load(Ordering::Relaxed),
            buckets: self
                .buckets
                .iter()
                .enumerate()
                .map(|(i, counter)| LatencyBucket {
                    le_us: LATENCY_BUCKET_BOUNDS_US.get(i).copied(),
                    count: counter.load(Ordering::Relaxed),
                })
                .collect(),
        }
    }

    fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
        self.sum_us.store(0, Ordering::Relaxed);
        self.ema_us.store(0, Ordering::Relaxed);
        for bucket in &self.buckets {
            bucket.store(0, Ordering::Relaxed);
        }
    }
}

/// Cache metrics collector.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    layers: DashMap<String, LayerCounters>,
    operations: DashMap<String, OperationTimings>,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a hit on a named cache layer.
    pub fn record_hit(&self, layer: &str) {
        self.layers
            .entry(layer.to_string())
            .or_default()
            .hits
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Record a miss on a named cache layer.
    pub fn record_miss(&self, layer: &str) {
        self.layers
            .entry(layer.to_string())
            .or_default()
            .misses
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self, layer: &str) -> u64 {
        self.layers
            .get(layer)
            .map(|c| c.hits.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn misses(&self, layer: &str) -> u64 {
        self.layers
            .get(layer)
            .map(|c| c.misses.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Hit ratio for one layer; 0.0 when the layer has seen no traffic.
    pub fn hit_ratio(&self, layer: &str) -> f64 {
        let hits = self.hits(layer) as f64;
        let total = hits + self.misses(layer) as f64;
        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }

    /// Record a response-time sample for a logical operation.
    pub fn record_latency(&self, operation: &str, duration: Duration) {
        self.operations
            .entry(operation.to_string())
            .or_default()
            .record(duration.as_micros() as u64);
    }

    /// Smoothed response time for a logical operation.
    pub fn latency(&self, operation: &str) -> Duration {
        Duration::from_micros(
            self.operations
                .get(operation)
                .map(|t| t.ema_us.load(Ordering::Relaxed))
                .unwrap_or(0),
        )
    }

    /// Hit ratio across all layers combined.
    pub fn overall_hit_ratio(&self) -> f64 {
        let mut hits = 0u64;
        let mut misses = 0u64;
        for counters in self.layers.iter() {
            hits += counters.hits.load(Ordering::Relaxed);
            misses += counters.misses.load(Ordering::Relaxed);
        }
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Get a snapshot of all counters.
    pub fn snapshot(&self) -> CacheMetricsSnapshot {
        let layers = self
            .layers
            .iter()
            .map(|entry| {
                let hits = entry.hits.load(Ordering::Relaxed);
                let misses = entry.misses.load(Ordering::Relaxed);
                let total = hits + misses;
                let hit_ratio = if total == 0 {
                    0.0
                } else {
                    hits as f64 / total as f64
                };
                (
                    entry.key().clone(),
                    LayerSnapshot {
                        hits,
                        misses,
                        hit_ratio,
                    },
                )
            })
            .collect();

        let operations = self
            .operations
            .iter()
            .map(|entry| (entry.key().clone(), entry.snapshot()))
            .collect();

        CacheMetricsSnapshot {
            layers,
            operations,
            overall_hit_ratio: self.overall_hit_ratio(),
        }
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counters in self.layers.iter() {
            counters.hits.store(0, Ordering::Relaxed);
            counters.misses.store(0, Ordering::Relaxed);
        }
        for timings in self.operations.iter() {
            timings.reset();
        }
    }
}

/// Point-in-time snapshot of the cache counters.
#[derive(Debug, Clone, Serialize)]
pub struct CacheMetricsSnapshot {
    pub layers: HashMap<String, LayerSnapshot>,
    pub operations: HashMap<String, OperationLatencySnapshot>,
    pub overall_hit_ratio: f64,
}

/// Hit/miss counters for one named cache layer.
#[derive(Debug, Clone, Serialize)]
pub struct LayerSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub hit_ratio: f64,
}

/// Response-time distribution for one logical operation.
#[derive(Debug, Clone, Serialize)]
pub struct OperationLatencySnapshot {
    pub count: u64,
    pub sum_us: u64,
    pub ema_us: u64,
    pub buckets: Vec<LatencyBucket>,
}

/// One histogram bucket; `le_us` of None is the overflow bucket.
#[derive(Debug, Clone, Serialize)]
pub struct LatencyBucket {
    pub le_us: Option<u64>,
    pub count: u64,
}

// =============================================================================
// Tests
// =============================================================================
