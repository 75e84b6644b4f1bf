//! Cache Stats Reporting
//!
//! Aggregates the metrics registry, the hit/miss counters, and the tier
//! classifier into one serializable report, grouped by category so a
//! dashboard or log line can pick the slice it cares about.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::cache::classifier::CacheTierClassifier;
use crate::cache::metrics::{CacheMetrics, CacheMetricsSnapshot};
use crate::cache::registry::PostMetricsRegistry;
use crate::domain::ports::CacheTier;

/// Minimum traffic on a layer before its hit ratio is trusted enough to
/// drive a recommendation.
const RECOMMENDATION_MIN_SAMPLES: u64 = 100;

/// Hit ratio below which a layer is called out as underperforming.
const LOW_HIT_RATIO: f64 = 0.5;

// =============================================================================
// Report shape
// =============================================================================

/// Full cache statistics report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsReport {
    pub overview: OverviewStats,
    pub performance: CacheMetricsSnapshot,
    pub tiers: TierStats,
    pub recommendations: Vec<String>,
    /// Per-post summary keyed by post id
    pub posts: HashMap<String, PostSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewStats {
    pub tracked_posts: usize,
    pub total_views: u64,
    pub trending_posts: usize,
    pub eviction_candidates: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierStats {
    pub hot: usize,
    pub warm: usize,
    pub cold: usize,
    /// Post ids per tier
    pub members: HashMap<CacheTier, Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub tier: CacheTier,
    pub total_views: u64,
    pub views_in_last_hour: u64,
    pub engagement_rate: f64,
    pub popularity_score: f64,
    pub trending: bool,
}

// =============================================================================
// Reporter
// =============================================================================

/// Builds point-in-time cache statistics reports.
pub struct CacheStatsReporter {
    metrics: Arc<CacheMetrics>,
    registry: Arc<PostMetricsRegistry>,
    classifier: CacheTierClassifier,
}

impl CacheStatsReporter {
    pub fn new(
        metrics: Arc<CacheMetrics>,
        registry: Arc<PostMetricsRegistry>,
        classifier: CacheTierClassifier,
    ) -> Self {
        Self {
            metrics,
            registry,
            classifier,
        }
    }

    /// Assemble a full report from the current state.
    pub fn report(&self) -> CacheStatsReport {
        let snapshots = self.registry.snapshot_all();
        let performance = self.metrics.snapshot();
        let eviction_candidates = self.classifier.eviction_candidates(&self.registry);

        let mut members: HashMap<CacheTier, Vec<String>> = HashMap::new();
        let mut posts = HashMap::new();
        let mut total_views = 0u64;
        let mut trending_posts = 0usize;

        for metrics in &snapshots {
            let tier = self.classifier.classify(metrics);
            total_views += metrics.total_views;
            if metrics.trending {
                trending_posts += 1;
            }
            members
                .entry(tier)
                .or_default()
                .push(metrics.post_id.clone());
            posts.insert(
                metrics.post_id.clone(),
                PostSummary {
                    tier,
                    total_views: metrics.total_views,
                    views_in_last_hour: metrics.views_in_last_hour,
                    engagement_rate: metrics.engagement_rate,
                    popularity_score: metrics.popularity_score,
                    trending: metrics.trending,
                },
            );
        }

        let tiers = TierStats {
            hot: members.get(&CacheTier::Hot).map_or(0, Vec::len),
            warm: members.get(&CacheTier::Warm).map_or(0, Vec::len),
            cold: members.get(&CacheTier::Cold).map_or(0, Vec::len),
            members,
        };

        let recommendations =
            self.recommendations(&performance, &eviction_candidates);

        CacheStatsReport {
            overview: OverviewStats {
                tracked_posts: snapshots.len(),
                total_views,
                trending_posts,
                eviction_candidates: eviction_candidates.len(),
            },
            performance,
            tiers,
            recommendations,
            posts,
        }
    }

    fn recommendations(
        &self,
        performance: &CacheMetricsSnapshot,
        eviction_candidates: &[String],
    ) -> Vec<String> {
        let mut out = Vec::new();

        for (layer, stats) in &performance.layers {
            let samples = stats.hits + stats.misses;
            if samples >= RECOMMENDATION_MIN_SAMPLES && stats.hit_ratio < LOW_HIT_RATIO {
                out.push(format!(
                    "layer '{}' hit ratio is {:.0}% over {} lookups; consider warming it or revisiting tier thresholds",
                    layer,
                    stats.hit_ratio * 100.0,
                    samples
                ));
            }
        }

        if !eviction_candidates.is_empty() {
            out.push(format!(
                "{} post(s) idle past the eviction TTL; run an eviction sweep",
                eviction_candidates.len()
            ));
        }

        out.sort();
        out
    }
}

// =============================================================================
// Tests
// =============================================================================
