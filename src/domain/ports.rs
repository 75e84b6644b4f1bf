//! Domain Ports (Port/Adapter Pattern)
//!
//! Core abstractions the read-model update path depends on. Infrastructure
//! adapters implement these traits: the durable replica behind the store
//! ports, the message transport behind [`EventTransport`]. Swapping the
//! in-memory adapters for database- or broker-backed ones does not touch the
//! event-application logic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::events::EventKind;
use super::model::{ReadFeedItem, ReadPost, ReadUserProfile};
use crate::error::Result;

// =============================================================================
// Value Objects
// =============================================================================

/// Cache tier assigned to a piece of content from its access metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTier {
    Hot,
    Warm,
    Cold,
}

impl std::fmt::Display for CacheTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheTier::Hot => write!(f, "hot"),
            CacheTier::Warm => write!(f, "warm"),
            CacheTier::Cold => write!(f, "cold"),
        }
    }
}

// =============================================================================
// Read Store Ports
// =============================================================================

/// Port for the denormalized post table.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Insert (or overwrite) a post row.
    async fn insert_post(&self, post: ReadPost) -> Result<()>;

    /// Fetch a post by id.
    async fn get_post(&self, post_id: &str) -> Result<Option<ReadPost>>;

    /// Apply a single atomic adjustment to a post's like counter, floored
    /// at zero. Returns the new count, or None if the post is unknown to
    /// the replica.
    async fn adjust_like_count(&self, post_id: &str, delta: i64) -> Result<Option<u64>>;

    /// Apply a single atomic adjustment to a post's view counter, floored
    /// at zero. Returns the new count, or None if the post is unknown.
    async fn adjust_view_count(&self, post_id: &str, delta: i64) -> Result<Option<u64>>;

    /// Write a recomputed popularity score to a post row.
    async fn set_post_score(&self, post_id: &str, score: f64) -> Result<()>;

    /// Most recent posts first, up to `limit`.
    async fn recent_posts(&self, limit: usize) -> Result<Vec<ReadPost>>;
}

/// Port for the denormalized user-profile table.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert a profile only if no row exists for its id.
    /// Returns false when a row (real or placeholder) was already present.
    async fn insert_profile_if_absent(&self, profile: ReadUserProfile) -> Result<bool>;

    /// Replace a profile's identity fields, keeping its counters.
    /// Used when a real UserCreated event lands on a placeholder row.
    async fn update_identity(&self, user_id: &str, name: &str, email: &str) -> Result<()>;

    /// Fetch a profile by id.
    async fn get_profile(&self, user_id: &str) -> Result<Option<ReadUserProfile>>;

    /// Atomically adjust the posts counter, floored at zero.
    async fn adjust_posts_count(&self, user_id: &str, delta: i64) -> Result<()>;

    /// Atomically adjust the likes-given counter, floored at zero.
    async fn adjust_likes_given(&self, user_id: &str, delta: i64) -> Result<()>;

    /// Atomically adjust the likes-received counter, floored at zero.
    async fn adjust_likes_received(&self, user_id: &str, delta: i64) -> Result<()>;

    /// Update a user's last-active timestamp.
    async fn touch_last_active(&self, user_id: &str, at: DateTime<Utc>) -> Result<()>;

    /// First `limit` profiles. Fan-out target selection: a bounded heuristic
    /// standing in for a follower index, not a subscription model.
    async fn list_profiles(&self, limit: usize) -> Result<Vec<ReadUserProfile>>;
}

/// Port for the materialized per-(user, post) feed table.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Insert a batch of feed rows (one write per row is fine; callers keep
    /// batches within the fan-out bounds).
    async fn insert_feed_items(&self, items: Vec<ReadFeedItem>) -> Result<()>;

    /// Atomically move the like counter of every feed row referencing the
    /// post by the same delta as the source-of-truth counter, floored at
    /// zero. Returns the number of rows touched.
    async fn adjust_feed_like_counts(&self, post_id: &str, delta: i64) -> Result<u64>;

    /// Flip the per-viewer like flag on one feed row, if it exists.
    async fn set_feed_liked_flag(&self, user_id: &str, post_id: &str, liked: bool) -> Result<()>;

    /// Write a recomputed popularity score to every feed row referencing
    /// the post. Returns the number of rows touched.
    async fn set_feed_scores(&self, post_id: &str, score: f64) -> Result<u64>;

    /// A user's feed rows, most recent post first.
    async fn feed_for_user(&self, user_id: &str) -> Result<Vec<ReadFeedItem>>;
}

/// Combined read-store port: everything the update service needs.
pub trait ReadStore: PostStore + ProfileStore + FeedStore {}

impl<T: PostStore + ProfileStore + FeedStore> ReadStore for T {}

// =============================================================================
// Event Transport Port
// =============================================================================

/// A single delivery pulled from a logical queue.
///
/// The same event may be delivered more than once (at-least-once transport);
/// the delivery id identifies this particular delivery, not the event.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub delivery_id: u64,
    pub payload: String,
}

/// Port for the message transport carrying domain events.
///
/// One logical queue per event kind. `ack` marks a delivery handled; `nack`
/// returns it to the queue for redelivery.
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Enqueue a raw payload on the queue for the given event kind.
    async fn publish(&self, kind: EventKind, payload: String) -> Result<()>;

    /// Pull the next delivery from the queue, if any.
    async fn poll(&self, kind: EventKind) -> Result<Option<Delivery>>;

    /// Acknowledge a delivery as handled.
    async fn ack(&self, kind: EventKind, delivery_id: u64) -> Result<()>;

    /// Return a delivery to the queue for redelivery.
    async fn nack(&self, kind: EventKind, delivery_id: u64) -> Result<()>;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_tier_display() {
        assert_eq!(CacheTier::Hot.to_string(), "hot");
        assert_eq!(CacheTier::Warm.to_string(), "warm");
        assert_eq!(CacheTier::Cold.to_string(), "cold");
    }

    #[test]
    fn test_cache_tier_serialization() {
        assert_eq!(serde_json::to_string(&CacheTier::Hot).unwrap(), r#""hot""#);
        let tier: CacheTier = serde_json::from_str(r#""cold""#).unwrap();
        assert_eq!(tier, CacheTier::Cold);
    }
}
