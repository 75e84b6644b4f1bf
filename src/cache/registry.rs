//! Post Metrics Registry
//!
//! In-process table of per-content access metrics, mutated by cache-layer
//! read paths and read by the tier classifier and stats reporting. An
//! explicit arena: callers own the instance and reach it only through its
//! update/query methods; there is no ambient global.
//!
//! Entries are ephemeral by design: created on first access, held for the
//! process lifetime, lost on restart.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::domain::model::PostMetrics;

// =============================================================================
// Configuration
// =============================================================================

/// Tunables for access-metrics tracking.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Length of the rolling view window
    pub window: Duration,
    /// View velocity (views per minute within the window) at or above which
    /// a post is flagged trending
    pub trending_views_per_minute: f64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            window: Duration::hours(1),
            trending_views_per_minute: 5.0,
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Debug, Clone)]
struct MetricsEntry {
    total_views: u64,
    /// Start of the current rolling window; the window counter resets when
    /// it ages out rather than sliding view-by-view (bounded memory, same
    /// signal the thresholds need)
    window_started_at: DateTime<Utc>,
    views_in_window: u64,
    engagements: u64,
    popularity_score: f64,
    last_accessed: DateTime<Utc>,
}

impl MetricsEntry {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            total_views: 0,
            window_started_at: now,
            views_in_window: 0,
            engagements: 0,
            popularity_score: 0.0,
            last_accessed: now,
        }
    }
}

/// Registry of per-post access metrics, keyed by post id.
#[derive(Debug, Default)]
pub struct PostMetricsRegistry {
    config: RegistryConfig,
    entries: DashMap<String, MetricsEntry>,
}

impl PostMetricsRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
        }
    }

    /// Record one content access (view) for a post.
    pub fn record_view(&self, post_id: &str) {
        self.record_view_at(post_id, Utc::now());
    }

    fn record_view_at(&self, post_id: &str, now: DateTime<Utc>) {
        let mut entry = self
            .entries
            .entry(post_id.to_string())
            .or_insert_with(|| MetricsEntry::new(now));

        if now - entry.window_started_at >= self.config.window {
            entry.window_started_at = now;
            entry.views_in_window = 0;
        }
        entry.total_views += 1;
        entry.views_in_window += 1;
        entry.last_accessed = now;
    }

    /// Record one engagement event (like, comment, share) for a post.
    pub fn record_engagement(&self, post_id: &str) {
        self.record_engagement_at(post_id, Utc::now());
    }

    fn record_engagement_at(&self, post_id: &str, now: DateTime<Utc>) {
        let mut entry = self
            .entries
            .entry(post_id.to_string())
            .or_insert_with(|| MetricsEntry::new(now));
        entry.engagements += 1;
        entry.last_accessed = now;
    }

    /// Mirror the replica's popularity score into the metrics entry.
    pub fn record_score(&self, post_id: &str, score: f64) {
        let now = Utc::now();
        let mut entry = self
            .entries
            .entry(post_id.to_string())
            .or_insert_with(|| MetricsEntry::new(now));
        entry.popularity_score = score;
    }

    /// Current metrics for a post, if it has ever been accessed.
    pub fn get(&self, post_id: &str) -> Option<PostMetrics> {
        self.get_at(post_id, Utc::now())
    }

    fn get_at(&self, post_id: &str, now: DateTime<Utc>) -> Option<PostMetrics> {
        self.entries
            .get(post_id)
            .map(|entry| self.project(post_id, &entry, now))
    }

    /// Project a raw entry into read-time metrics. The trending flag is
    /// re-derived here from window velocity, so a post that went idle cools
    /// off on the next read instead of staying flagged until the window
    /// expires.
    fn project(&self, post_id: &str, entry: &MetricsEntry, now: DateTime<Utc>) -> PostMetrics {
        // A window that aged out without a new access reads as zero/cool.
        let window_expired = now - entry.window_started_at >= self.config.window;
        let trending = if window_expired {
            false
        } else {
            // Velocity over the elapsed window, floored at one minute so a
            // freshly started window is not a hair trigger.
            let elapsed_minutes =
                ((now - entry.window_started_at).num_seconds() as f64 / 60.0).max(1.0);
            entry.views_in_window as f64 / elapsed_minutes
                >= self.config.trending_views_per_minute
        };
        PostMetrics {
            post_id: post_id.to_string(),
            total_views: entry.total_views,
            views_in_last_hour: if window_expired {
                0
            } else {
                entry.views_in_window
            },
            engagement_rate: if entry.total_views == 0 {
                0.0
            } else {
                entry.engagements as f64 / entry.total_views as f64
            },
            popularity_score: entry.popularity_score,
            last_accessed: entry.last_accessed,
            trending,
        }
    }

    /// Snapshot of every tracked post's metrics.
    pub fn snapshot_all(&self) -> Vec<PostMetrics> {
        let now = Utc::now();
        self.entries
            .iter()
            .map(|entry| self.project(entry.key(), entry.value(), now))
            .collect()
    }

    /// Drop a post's metrics. Called by the owning cache layer when it
    /// executes an eviction this core signaled.
    pub fn remove(&self, post_id: &str) -> Option<PostMetrics> {
        let now = Utc::now();
        self.entries
            .remove(post_id)
            .map(|(id, entry)| self.project(&id, &entry, now))
    }

    /// Number of tracked posts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
