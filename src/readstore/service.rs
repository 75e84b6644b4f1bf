//! Read Store Update Service
//!
//! Applies each domain-event variant to the denormalized tables: post
//! records, user-profile records, and per-viewer feed rows. One entry point
//! per consumed event kind, dispatched through [`apply`](ReadStoreUpdateService::apply).
//!
//! # Consistency notes
//!
//! - Counters move only through the store ports' single atomic adjustments;
//!   feed rows receive the same delta as the source-of-truth post counter,
//!   so concurrent likes converge. Feed counts are eventually-reconciled,
//!   the post counter is authoritative.
//! - A like/unlike for a post the replica has never seen is a logged no-op:
//!   the event counts as handled, since redelivery cannot conjure the post.
//! - A post event arriving before its author's UserCreated event self-heals
//!   by synthesizing a placeholder profile.
//! - Partial application before a store failure is not rolled back here;
//!   per-event atomicity is the surrounding transaction boundary's job.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::domain::events::DomainEvent;
use crate::domain::model::{ReadFeedItem, ReadPost, ReadUserProfile};
use crate::domain::ports::ReadStore;
use crate::error::Result;
use crate::scoring::PopularityScorer;

// =============================================================================
// Configuration
// =============================================================================

/// Fan-out bounds for feed materialization.
///
/// Both bounds are demo-scale stand-ins for a follower index: fan-out goes
/// to the first N profiles (post creation) or the N most recent posts
/// (cold start), not to an actual subscription graph.
#[derive(Debug, Clone)]
pub struct FanoutConfig {
    /// Maximum feed rows created when a post is created
    pub post_fanout_limit: usize,
    /// Maximum feed rows seeded for a newly created user
    pub cold_start_fanout_limit: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            post_fanout_limit: 10,
            cold_start_fanout_limit: 5,
        }
    }
}

// =============================================================================
// Service
// =============================================================================

/// Applies domain events to the denormalized read store.
pub struct ReadStoreUpdateService {
    store: Arc<dyn ReadStore>,
    scorer: PopularityScorer,
    config: FanoutConfig,
}

impl ReadStoreUpdateService {
    /// Create a service with default scoring weights.
    pub fn new(store: Arc<dyn ReadStore>, config: FanoutConfig) -> Self {
        Self {
            store,
            scorer: PopularityScorer::default(),
            config,
        }
    }

    /// Override the popularity scorer.
    pub fn with_scorer(mut self, scorer: PopularityScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Apply one domain event to the replica.
    ///
    /// Exhaustive over the event union: a new variant will not compile until
    /// it is handled here.
    pub async fn apply(&self, event: DomainEvent) -> Result<()> {
        match event {
            DomainEvent::PostCreated {
                post_id,
                author_id,
                author_name,
                text_content,
                image_url,
                created_at,
                ..
            } => {
                self.apply_post_created(
                    post_id,
                    author_id,
                    author_name,
                    text_content,
                    image_url,
                    created_at,
                )
                .await
            }
            DomainEvent::PostLiked {
                post_id,
                user_id,
                user_name,
                liked_at,
                ..
            } => {
                self.apply_like_delta(post_id, user_id, user_name, liked_at, 1)
                    .await
            }
            DomainEvent::PostUnliked {
                post_id,
                user_id,
                user_name,
                unliked_at,
                ..
            } => {
                self.apply_like_delta(post_id, user_id, user_name, unliked_at, -1)
                    .await
            }
            DomainEvent::UserCreated {
                user_id,
                name,
                email,
                created_at,
                ..
            } => self.apply_user_created(user_id, name, email, created_at).await,
        }
    }

    /// Create the post row, heal a missing author profile, and fan out
    /// feed rows to existing profiles.
    #[instrument(skip_all, fields(post_id = %post_id, author_id = %author_id))]
    async fn apply_post_created(
        &self,
        post_id: String,
        author_id: String,
        author_name: String,
        text_content: String,
        image_url: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        // Placeholder goes in before the counter increment, closing the race
        // where a post event beats its author's UserCreated event.
        self.ensure_profile(&author_id, &author_name).await?;
        self.store.adjust_posts_count(&author_id, 1).await?;

        let post = ReadPost {
            id: post_id.clone(),
            author_id,
            author_name,
            text_content,
            image_url,
            like_count: 0,
            view_count: 0,
            popularity_score: self.scorer.initial_score,
            created_at,
            updated_at: Utc::now(),
        };
        self.store.insert_post(post.clone()).await?;

        // Bounded fan-out: one snapshot row per existing profile, capped.
        // No follower graph exists; "first N profiles" is the heuristic.
        let targets = self
            .store
            .list_profiles(self.config.post_fanout_limit)
            .await?;
        let items: Vec<ReadFeedItem> = targets
            .iter()
            .map(|profile| ReadFeedItem::snapshot_of(&post, profile.id.clone()))
            .collect();
        let fanned_out = items.len();
        self.store.insert_feed_items(items).await?;

        info!(fanned_out, "post created in replica");
        Ok(())
    }

    /// Shared like/unlike path: `delta` is +1 for a like, -1 for an unlike.
    #[instrument(skip_all, fields(post_id = %post_id, user_id = %user_id, delta))]
    async fn apply_like_delta(
        &self,
        post_id: String,
        user_id: String,
        user_name: String,
        at: DateTime<Utc>,
        delta: i64,
    ) -> Result<()> {
        // Single atomic adjustment on the source-of-truth counter.
        let new_count = match self.store.adjust_like_count(&post_id, delta).await? {
            Some(count) => count,
            None => {
                // Referential inconsistency: the post never reached the
                // replica. Retrying cannot help; the event is handled.
                warn!("like delta for unknown post, ignoring");
                return Ok(());
            }
        };
        debug!(new_count, "post like counter adjusted");

        // Feed rows move by the same delta rather than a re-read of the
        // counter, so concurrent likes cannot propagate a stale snapshot.
        self.store.adjust_feed_like_counts(&post_id, delta).await?;
        self.store
            .set_feed_liked_flag(&user_id, &post_id, delta > 0)
            .await?;

        self.ensure_profile(&user_id, &user_name).await?;
        self.store.adjust_likes_given(&user_id, delta).await?;

        if let Some(post) = self.store.get_post(&post_id).await? {
            self.ensure_profile(&post.author_id, &post.author_name)
                .await?;
            self.store
                .adjust_likes_received(&post.author_id, delta)
                .await?;

            // Eager recomputation, pushed to the post and every feed row.
            let score = self.scorer.score(
                post.like_count,
                post.view_count,
                hours_since(post.created_at),
            );
            self.store.set_post_score(&post_id, score).await?;
            self.store.set_feed_scores(&post_id, score).await?;
        }

        self.store.touch_last_active(&user_id, at).await?;
        Ok(())
    }

    /// Create (or materialize) the profile and seed the user's feed with
    /// the most recent posts, bounded.
    #[instrument(skip_all, fields(user_id = %user_id))]
    async fn apply_user_created(
        &self,
        user_id: String,
        name: String,
        email: String,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        let profile = ReadUserProfile {
            id: user_id.clone(),
            name: name.clone(),
            email: email.clone(),
            posts_count: 0,
            total_likes_received: 0,
            total_likes_given: 0,
            followers_count: 0,
            following_count: 0,
            created_at,
            last_active_at: created_at,
            updated_at: Utc::now(),
        };

        let inserted = self.store.insert_profile_if_absent(profile).await?;
        if !inserted {
            // A placeholder already exists from an earlier post/like event.
            // Keep its accumulated counters, fill in the real identity.
            info!("materializing placeholder profile");
            self.store.update_identity(&user_id, &name, &email).await?;
        }

        // Cold-start fan-out: seed the new feed with recent posts.
        let recent = self
            .store
            .recent_posts(self.config.cold_start_fanout_limit)
            .await?;
        let items: Vec<ReadFeedItem> = recent
            .iter()
            .map(|post| ReadFeedItem::snapshot_of(post, user_id.clone()))
            .collect();
        let seeded = items.len();
        self.store.insert_feed_items(items).await?;

        info!(seeded, "user profile created in replica");
        Ok(())
    }

    /// Synthesize a placeholder profile if the user is not in the replica
    /// yet (author-not-yet-synced race).
    async fn ensure_profile(&self, user_id: &str, name: &str) -> Result<()> {
        let placeholder = ReadUserProfile::placeholder(user_id, name);
        let inserted = self.store.insert_profile_if_absent(placeholder).await?;
        if inserted {
            debug!(user_id, "synthesized placeholder profile");
        }
        Ok(())
    }
}

fn hours_since(created_at: DateTime<Utc>) -> f64 {
    (Utc::now() - created_at).num_milliseconds() as f64 / 3_600_000.0
}

// =============================================================================
// Tests
// =============================================================================
