//! In-Memory Read Store Adapter
//!
//! Implements the store ports over process-local concurrent maps. Counter
//! mutations happen under the per-key map lock as single saturating updates,
//! so concurrent events converge the same way they would against a durable
//! store with atomic UPDATE statements.
//!
//! Feed rows are keyed by (user_id, post_id), which makes the intended
//! at-most-one-row-per-pair invariant hold by construction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::domain::model::{ReadFeedItem, ReadPost, ReadUserProfile};
use crate::domain::ports::{FeedStore, PostStore, ProfileStore};
use crate::error::Result;

/// Apply a signed delta to an unsigned counter, floored at zero.
fn apply_delta(current: u64, delta: i64) -> u64 {
    if delta >= 0 {
        current.saturating_add(delta as u64)
    } else {
        current.saturating_sub(delta.unsigned_abs())
    }
}

/// In-memory read store.
///
/// Cheap to clone-by-Arc and share between the update service and tests.
#[derive(Debug, Default)]
pub struct InMemoryReadStore {
    posts: DashMap<String, ReadPost>,
    profiles: DashMap<String, ReadUserProfile>,
    /// Profile ids in insertion order; fan-out targets are "first N profiles"
    profile_order: RwLock<Vec<String>>,
    feed: DashMap<(String, String), ReadFeedItem>,
}

impl InMemoryReadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of post rows (test/reporting helper).
    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    /// Number of profile rows (test/reporting helper).
    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    /// Total number of feed rows across all users (test/reporting helper).
    pub fn feed_item_count(&self) -> usize {
        self.feed.len()
    }
}

#[async_trait]
impl PostStore for InMemoryReadStore {
    async fn insert_post(&self, post: ReadPost) -> Result<()> {
        self.posts.insert(post.id.clone(), post);
        Ok(())
    }

    async fn get_post(&self, post_id: &str) -> Result<Option<ReadPost>> {
        Ok(self.posts.get(post_id).map(|p| p.clone()))
    }

    async fn adjust_like_count(&self, post_id: &str, delta: i64) -> Result<Option<u64>> {
        match self.posts.get_mut(post_id) {
            Some(mut post) => {
                post.like_count = apply_delta(post.like_count, delta);
                post.updated_at = Utc::now();
                Ok(Some(post.like_count))
            }
            None => Ok(None),
        }
    }

    async fn adjust_view_count(&self, post_id: &str, delta: i64) -> Result<Option<u64>> {
        match self.posts.get_mut(post_id) {
            Some(mut post) => {
                post.view_count = apply_delta(post.view_count, delta);
                post.updated_at = Utc::now();
                Ok(Some(post.view_count))
            }
            None => Ok(None),
        }
    }

    async fn set_post_score(&self, post_id: &str, score: f64) -> Result<()> {
        if let Some(mut post) = self.posts.get_mut(post_id) {
            post.popularity_score = score;
            post.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn recent_posts(&self, limit: usize) -> Result<Vec<ReadPost>> {
        let mut posts: Vec<ReadPost> = self.posts.iter().map(|p| p.clone()).collect();
        posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        posts.truncate(limit);
        Ok(posts)
    }
}

#[async_trait]
impl ProfileStore for InMemoryReadStore {
    async fn insert_profile_if_absent(&self, profile: ReadUserProfile) -> Result<bool> {
        use dashmap::mapref::entry::Entry;

        match self.profiles.entry(profile.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                self.profile_order.write().push(profile.id.clone());
                slot.insert(profile);
                Ok(true)
            }
        }
    }

    async fn update_identity(&self, user_id: &str, name: &str, email: &str) -> Result<()> {
        if let Some(mut profile) = self.profiles.get_mut(user_id) {
            profile.name = name.to_string();
            profile.email = email.to_string();
            profile.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<ReadUserProfile>> {
        Ok(self.profiles.get(user_id).map(|p| p.clone()))
    }

    async fn adjust_posts_count(&self, user_id: &str, delta: i64) -> Result<()> {
        if let Some(mut profile) = self.profiles.get_mut(user_id) {
            profile.posts_count = apply_delta(profile.posts_count, delta);
            profile.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn adjust_likes_given(&self, user_id: &str, delta: i64) -> Result<()> {
        if let Some(mut profile) = self.profiles.get_mut(user_id) {
            profile.total_likes_given = apply_delta(profile.total_likes_given, delta);
            profile.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn adjust_likes_received(&self, user_id: &str, delta: i64) -> Result<()> {
        if let Some(mut profile) = self.profiles.get_mut(user_id) {
            profile.total_likes_received = apply_delta(profile.total_likes_received, delta);
            profile.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn touch_last_active(&self, user_id: &str, at: DateTime<Utc>) -> Result<()> {
        if let Some(mut profile) = self.profiles.get_mut(user_id) {
            profile.last_active_at = at;
            profile.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_profiles(&self, limit: usize) -> Result<Vec<ReadUserProfile>> {
        let order = self.profile_order.read();
        let mut profiles = Vec::with_capacity(limit.min(order.len()));
        for id in order.iter().take(limit) {
            if let Some(profile) = self.profiles.get(id) {
                profiles.push(profile.clone());
            }
        }
        Ok(profiles)
    }
}

#[async_trait]
impl FeedStore for InMemoryReadStore {
    async fn insert_feed_items(&self, items: Vec<ReadFeedItem>) -> Result<()> {
        for item in items {
            let key = (item.user_id.clone(), item.post_id.clone());
            self.feed.insert(key, item);
        }
        Ok(())
    }

    async fn adjust_feed_like_counts(&self, post_id: &str, delta: i64) -> Result<u64> {
        let mut touched = 0;
        for mut entry in self.feed.iter_mut() {
            if entry.post_id == post_id {
                entry.like_count = apply_delta(entry.like_count, delta);
                entry.updated_at = Utc::now();
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn set_feed_liked_flag(&self, user_id: &str, post_id: &str, liked: bool) -> Result<()> {
        let key = (user_id.to_string(), post_id.to_string());
        if let Some(mut item) = self.feed.get_mut(&key) {
            item.is_liked_by_user = liked;
            item.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_feed_scores(&self, post_id: &str, score: f64) -> Result<u64> {
        let mut touched = 0;
        for mut entry in self.feed.iter_mut() {
            if entry.post_id == post_id {
                entry.popularity_score = score;
                entry.updated_at = Utc::now();
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn feed_for_user(&self, user_id: &str) -> Result<Vec<ReadFeedItem>> {
        let mut items: Vec<ReadFeedItem> = self
            .feed
            .iter()
            .filter(|e| e.user_id == user_id)
            .map(|e| e.clone())
            .collect();
        items.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.post_id.cmp(&a.post_id))
        });
        Ok(items)
    }
}

// =============================================================================
// Tests
// =============================================================================
