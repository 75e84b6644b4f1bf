//! Popularity-driven cache tiering.
//!
//! Tracks per-post access metrics, derives hot/warm/cold tier assignments
//! and eviction signals from them, and rolls everything up into cache
//! statistics reports. Decision-only: the owning cache layer executes
//! promotions and evictions.

pub mod classifier;
pub mod metrics;
pub mod registry;
pub mod reporting;

pub use classifier::{CacheTierClassifier, TierThresholds};
pub use metrics::{
    CacheMetrics, CacheMetricsSnapshot, LatencyBucket, LayerSnapshot, OperationLatencySnapshot,
};
pub use registry::{PostMetricsRegistry, RegistryConfig};
pub use reporting::{CacheStatsReport, CacheStatsReporter};
