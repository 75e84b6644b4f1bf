//! Denormalized Read Records
//!
//! Query-optimized rows maintained by the read-model update path. They are
//! replicas of write-side state, not sources of truth: identifiers mirror the
//! write side, author names are denormalized snapshots, and counters converge
//! via atomic increments applied from events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Denormalized post record.
///
/// Created once on PostCreated and never deleted by this core; counters move
/// only through atomic increment/decrement, the score through recomputation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadPost {
    /// Mirrors the write-side post id (not independently generated)
    pub id: String,
    pub author_id: String,
    /// Snapshot of the author's name at creation time, not live-joined
    pub author_name: String,
    pub text_content: String,
    pub image_url: Option<String>,
    pub like_count: u64,
    pub view_count: u64,
    pub popularity_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Denormalized user profile record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadUserProfile {
    /// Mirrors the write-side user id
    pub id: String,
    pub name: String,
    pub email: String,
    pub posts_count: u64,
    pub total_likes_received: u64,
    pub total_likes_given: u64,
    /// Reserved; no follower graph exists yet
    pub followers_count: u64,
    /// Reserved; no follower graph exists yet
    pub following_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReadUserProfile {
    /// Synthesize a placeholder profile for a user referenced by an event
    /// before their own UserCreated event has been processed.
    pub fn placeholder(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        let user_id = user_id.into();
        let now = Utc::now();
        Self {
            email: format!("{}@placeholder.invalid", user_id),
            id: user_id,
            name: name.into(),
            posts_count: 0,
            total_likes_received: 0,
            total_likes_given: 0,
            followers_count: 0,
            following_count: 0,
            created_at: now,
            last_active_at: now,
            updated_at: now,
        }
    }
}

/// Materialized per-(user, post) feed row.
///
/// Created in bulk at fan-out time; its counters follow the parent post's
/// counters via explicit sync calls and are eventually-reconciled, never
/// authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadFeedItem {
    pub user_id: String,
    pub post_id: String,
    pub author_id: String,
    pub author_name: String,
    pub text_content: String,
    pub image_url: Option<String>,
    pub like_count: u64,
    /// Per-viewer flag: whether this feed's owner has liked the post
    pub is_liked_by_user: bool,
    pub popularity_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReadFeedItem {
    /// Snapshot a post into a feed row for the given viewer.
    pub fn snapshot_of(post: &ReadPost, user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            post_id: post.id.clone(),
            author_id: post.author_id.clone(),
            author_name: post.author_name.clone(),
            text_content: post.text_content.clone(),
            image_url: post.image_url.clone(),
            like_count: post.like_count,
            is_liked_by_user: false,
            popularity_score: post.popularity_score,
            created_at: post.created_at,
            updated_at: Utc::now(),
        }
    }
}

/// Per-post access metrics tracked by the cache layer.
///
/// Ephemeral: held in an in-process registry, never persisted, lost on
/// restart. Created on first access.
#[derive(Debug, Clone, Serialize)]
pub struct PostMetrics {
    pub post_id: String,
    /// Monotonic total view counter
    pub total_views: u64,
    /// Rolling one-hour window view counter
    pub views_in_last_hour: u64,
    /// Engagement events over total views
    pub engagement_rate: f64,
    pub popularity_score: f64,
    pub last_accessed: DateTime<Utc>,
    /// Short-window view velocity exceeded the trending threshold
    pub trending: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_post() -> ReadPost {
        ReadPost {
            id: "post-1".to_string(),
            author_id: "user-1".to_string(),
            author_name: "Ann".to_string(),
            text_content: "hello".to_string(),
            image_url: None,
            like_count: 3,
            view_count: 40,
            popularity_score: 2.5,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_placeholder_profile() {
        let profile = ReadUserProfile::placeholder("user-9", "Ghost");
        assert_eq!(profile.id, "user-9");
        assert_eq!(profile.name, "Ghost");
        assert_eq!(profile.email, "user-9@placeholder.invalid");
        assert_eq!(profile.posts_count, 0);
        assert_eq!(profile.total_likes_given, 0);
    }

    #[test]
    fn test_feed_item_snapshot() {
        let post = sample_post();
        let item = ReadFeedItem::snapshot_of(&post, "viewer-1");

        assert_eq!(item.user_id, "viewer-1");
        assert_eq!(item.post_id, "post-1");
        assert_eq!(item.author_name, "Ann");
        assert_eq!(item.like_count, 3);
        assert_eq!(item.popularity_score, 2.5);
        assert!(!item.is_liked_by_user);
        assert_eq!(item.created_at, post.created_at);
    }

}
