//! Cache Tier Classification
//!
//! Maps per-post access metrics to a hot/warm/cold tier and signals
//! eviction candidates. Classification is re-derived on every pass: a post
//! that stops meeting a tier's thresholds demotes naturally, there is no
//! one-way promotion.
//!
//! This component only decides; executing promotions and evictions belongs
//! to the owning cache layer.

use chrono::{DateTime, Duration, Utc};

use crate::cache::registry::PostMetricsRegistry;
use crate::domain::model::PostMetrics;
use crate::domain::ports::CacheTier;

// =============================================================================
// Thresholds
// =============================================================================

/// Named, tunable tier thresholds.
///
/// All comparisons are strictly greater-than: a post sitting exactly on a
/// threshold does NOT qualify for the tier above it.
#[derive(Debug, Clone)]
pub struct TierThresholds {
    /// Rolling-window views above which a post is hot
    pub hot_views_per_hour: u64,
    /// Lifetime views above which a post is at least warm
    pub warm_total_views: u64,
    /// Engagement rate above which a post is at least warm
    pub warm_engagement_rate: f64,
    /// How long a post may go unaccessed before it becomes an eviction
    /// candidate (unless trending)
    pub idle_eviction_ttl: Duration,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            hot_views_per_hour: 100,
            warm_total_views: 500,
            warm_engagement_rate: 0.10,
            idle_eviction_ttl: Duration::hours(24),
        }
    }
}

// =============================================================================
// Classifier
// =============================================================================

/// Classifies content into cache tiers from live access metrics.
#[derive(Debug, Clone, Default)]
pub struct CacheTierClassifier {
    thresholds: TierThresholds,
}

impl CacheTierClassifier {
    pub fn new(thresholds: TierThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &TierThresholds {
        &self.thresholds
    }

    /// Assign a tier from the given metrics.
    pub fn classify(&self, metrics: &PostMetrics) -> CacheTier {
        if metrics.trending || metrics.views_in_last_hour > self.thresholds.hot_views_per_hour {
            CacheTier::Hot
        } else if metrics.total_views > self.thresholds.warm_total_views
            || metrics.engagement_rate > self.thresholds.warm_engagement_rate
        {
            CacheTier::Warm
        } else {
            CacheTier::Cold
        }
    }

    /// Whether the owning cache layer should drop this entry: idle past the
    /// TTL and not trending. Signal only; execution is the caller's job.
    pub fn should_evict(&self, metrics: &PostMetrics) -> bool {
        self.should_evict_at(metrics, Utc::now())
    }

    fn should_evict_at(&self, metrics: &PostMetrics, now: DateTime<Utc>) -> bool {
        !metrics.trending && now - metrics.last_accessed > self.thresholds.idle_eviction_ttl
    }

    /// Re-classify every tracked post. Demotions fall out of this pass the
    /// same way promotions do.
    pub fn classify_all(&self, registry: &PostMetricsRegistry) -> Vec<(String, CacheTier)> {
        registry
            .snapshot_all()
            .into_iter()
            .map(|metrics| {
                let tier = self.classify(&metrics);
                (metrics.post_id, tier)
            })
            .collect()
    }

    /// Posts currently eligible for eviction.
    pub fn eviction_candidates(&self, registry: &PostMetricsRegistry) -> Vec<String> {
        let now = Utc::now();
        registry
            .snapshot_all()
            .into_iter()
            .filter(|metrics| self.should_evict_at(metrics, now))
            .map(|metrics| metrics.post_id)
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(views_last_hour: u64, total_views: u64, engagement: f64) -> PostMetrics {
        PostMetrics {
            post_id: "post-1".to_string(),
            total_views,
            views_in_last_hour: views_last_hour,
            engagement_rate: engagement,
            popularity_score: 0.0,
            last_accessed: Utc::now(),
            trending: false,
        }
    }

    #[test]
    fn test_hot_boundary_is_exclusive() {
        let classifier = CacheTierClassifier::default();

        // Exactly at the threshold: NOT hot (falls through to warm/cold)
        let at = metrics(100, 0, 0.0);
        assert_eq!(classifier.classify(&at), CacheTier::Cold);

        // One past it: hot
        let above = metrics(101, 0, 0.0);
        assert_eq!(classifier.classify(&above), CacheTier::Hot);
    }

    #[test]
    fn test_trending_forces_hot() {
        let classifier = CacheTierClassifier::default();
        let mut m = metrics(1, 1, 0.0);
        m.trending = true;
        assert_eq!(classifier.classify(&m), CacheTier::Hot);
    }

    #[test]
    fn test_warm_on_total_views() {
        let classifier = CacheTierClassifier::default();
        assert_eq!(classifier.classify(&metrics(0, 501, 0.0)), CacheTier::Warm);
        assert_eq!(classifier.classify(&metrics(0, 500, 0.0)), CacheTier::Cold);
    }

    #[test]
    fn test_warm_on_engagement_rate() {
        let classifier = CacheTierClassifier::default();
        assert_eq!(classifier.classify(&metrics(0, 10, 0.11)), CacheTier::Warm);
        assert_eq!(classifier.classify(&metrics(0, 10, 0.10)), CacheTier::Cold);
    }

    #[test]
    fn test_demotion_when_thresholds_no_longer_met() {
        let classifier = CacheTierClassifier::default();

        let busy = metrics(150, 600, 0.2);
        assert_eq!(classifier.classify(&busy), CacheTier::Hot);

        // Same post, later: window cooled off, still warm on totals
        let cooled = metrics(5, 600, 0.2);
        assert_eq!(classifier.classify(&cooled), CacheTier::Warm);

        // Engagement diluted too: cold
        let idle = metrics(0, 400, 0.01);
        assert_eq!(classifier.classify(&idle), CacheTier::Cold);
    }

    #[test]
    fn test_eviction_requires_idle_and_not_trending() {
        let classifier = CacheTierClassifier::default();
        let now = Utc::now();

        let mut stale = metrics(0, 10, 0.0);
        stale.last_accessed = now - Duration::hours(25);
        assert!(classifier.should_evict_at(&stale, now));

        let mut fresh = metrics(0, 10, 0.0);
        fresh.last_accessed = now - Duration::hours(1);
        assert!(!classifier.should_evict_at(&fresh, now));

        let mut stale_but_trending = metrics(0, 10, 0.0);
        stale_but_trending.last_accessed = now - Duration::hours(25);
        stale_but_trending.trending = true;
        assert!(!classifier.should_evict_at(&stale_but_trending, now));
    }

    #[test]
    fn test_classify_all_over_registry() {
        use crate::cache::registry::RegistryConfig;

        let registry = PostMetricsRegistry::new(RegistryConfig::default());
        registry.record_view("post-1");

        let classifier = CacheTierClassifier::default();
        let tiers = classifier.classify_all(&registry);
        assert_eq!(tiers.len(), 1);
        assert_eq!(tiers[0].0, "post-1");
        assert_eq!(tiers[0].1, CacheTier::Cold);
    }
}
