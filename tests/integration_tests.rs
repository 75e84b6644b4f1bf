//! FeedStore Integration Tests
//!
//! End-to-end coverage of the event-driven read-store pipeline:
//! - Event flow: transport → consumer → update service → replica
//! - Delivery semantics: at-least-once, redelivery, poison payloads
//! - Cache tiering: access metrics, classification, stats reporting

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use feedstore::adapters::{InMemoryEventQueue, InMemoryReadStore};
use feedstore::consumer::{ConsumerConfig, EventConsumer};
use feedstore::domain::events::{DomainEvent, EventKind};
use feedstore::domain::model::{ReadFeedItem, ReadPost, ReadUserProfile};
use feedstore::domain::ports::{EventTransport, FeedStore, PostStore, ProfileStore};
use feedstore::error::{Error, Result};
use feedstore::readstore::{FanoutConfig, ReadStoreUpdateService};

// =============================================================================
// Helpers
// =============================================================================

struct Pipeline {
    queue: Arc<InMemoryEventQueue>,
    store: Arc<InMemoryReadStore>,
    consumer: Arc<EventConsumer>,
}

fn pipeline() -> Pipeline {
    let queue = Arc::new(InMemoryEventQueue::new());
    let store = Arc::new(InMemoryReadStore::new());
    let service = Arc::new(ReadStoreUpdateService::new(
        store.clone(),
        FanoutConfig::default(),
    ));
    let consumer = EventConsumer::new(queue.clone(), service, ConsumerConfig::default());
    Pipeline {
        queue,
        store,
        consumer,
    }
}

async fn publish(queue: &InMemoryEventQueue, event: &DomainEvent) {
    queue
        .publish(event.kind(), serde_json::to_string(event).unwrap())
        .await
        .unwrap();
}

// =============================================================================
// Event Flow Tests
// =============================================================================

mod event_flow_tests {
    use super::*;

    #[tokio::test]
    async fn test_full_user_post_like_scenario() {
        let p = pipeline();

        // Drain between publishes: the events land on different queues, and
        // one polling pass applies a batch concurrently.
        let mut settled = 0;
        publish(
            &p.queue,
            &DomainEvent::user_created("user-1", "Ann", "ann@example.com"),
        )
        .await;
        settled += p.consumer.run_until_idle().await.unwrap();
        publish(
            &p.queue,
            &DomainEvent::post_created("post-100", "user-1", "Ann", "first post", None),
        )
        .await;
        settled += p.consumer.run_until_idle().await.unwrap();
        publish(
            &p.queue,
            &DomainEvent::post_liked("post-100", "user-1", "Ann"),
        )
        .await;
        settled += p.consumer.run_until_idle().await.unwrap();
        assert_eq!(settled, 3);

        let post = p.store.get_post("post-100").await.unwrap().unwrap();
        assert_eq!(post.like_count, 1);
        assert_eq!(post.author_name, "Ann");
        assert!(post.popularity_score > 1.0);

        let profile = p.store.get_profile("user-1").await.unwrap().unwrap();
        assert_eq!(profile.posts_count, 1);
        assert_eq!(profile.total_likes_given, 1);
        assert_eq!(profile.total_likes_received, 1);

        let feed = p.store.feed_for_user("user-1").await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].like_count, 1);
        assert!(feed[0].is_liked_by_user);
    }

    #[tokio::test]
    async fn test_like_for_unknown_post_is_handled_without_rows() {
        let p = pipeline();

        publish(
            &p.queue,
            &DomainEvent::post_liked("no-such-post", "user-1", "Ann"),
        )
        .await;

        let settled = p.consumer.run_until_idle().await.unwrap();
        assert_eq!(settled, 1);
        assert_eq!(p.queue.nacked_count(), 0);
        assert!(p.queue.is_idle());

        assert_matches!(p.store.get_post("no-such-post").await.unwrap(), None);
        assert_eq!(p.store.post_count(), 0);
        assert_eq!(p.store.profile_count(), 0);
        assert_eq!(p.store.feed_item_count(), 0);
    }

    #[tokio::test]
    async fn test_cold_start_feed_is_bounded_and_recent_first() {
        let p = pipeline();

        for i in 0..8 {
            publish(
                &p.queue,
                &DomainEvent::post_created(
                    format!("post-{}", i),
                    "user-1",
                    "Ann",
                    "hello",
                    None,
                ),
            )
            .await;
            p.consumer.run_until_idle().await.unwrap();
            // Distinct created_at ordering between posts
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        publish(
            &p.queue,
            &DomainEvent::user_created("user-2", "Bob", "bob@example.com"),
        )
        .await;
        p.consumer.run_until_idle().await.unwrap();

        let feed = p.store.feed_for_user("user-2").await.unwrap();
        assert_eq!(feed.len(), 5);
        assert_eq!(feed[0].post_id, "post-7");
        assert_eq!(feed[4].post_id, "post-3");
    }

    #[tokio::test]
    async fn test_out_of_order_like_before_user_created() {
        let p = pipeline();

        publish(
            &p.queue,
            &DomainEvent::post_created("post-1", "user-1", "Ann", "hello", None),
        )
        .await;
        p.consumer.run_until_idle().await.unwrap();
        publish(&p.queue, &DomainEvent::post_liked("post-1", "user-2", "Bob")).await;
        p.consumer.run_until_idle().await.unwrap();

        // The liker got a placeholder row that accumulated the like
        let placeholder = p.store.get_profile("user-2").await.unwrap().unwrap();
        assert_eq!(placeholder.total_likes_given, 1);
        assert!(placeholder.email.ends_with("@placeholder.invalid"));

        // The real profile event materializes identity, keeps counters
        publish(
            &p.queue,
            &DomainEvent::user_created("user-2", "Bob", "bob@example.com"),
        )
        .await;
        p.consumer.run_until_idle().await.unwrap();

        let profile = p.store.get_profile("user-2").await.unwrap().unwrap();
        assert_eq!(profile.email, "bob@example.com");
        assert_eq!(profile.total_likes_given, 1);
    }
}

// =============================================================================
// Delivery Semantics Tests
// =============================================================================

mod delivery_tests {
    use super::*;

    #[tokio::test]
    async fn test_poison_payload_is_dropped_once() {
        let p = pipeline();

        p.queue
            .publish(EventKind::PostCreated, "{\"eventType\":\"Bogus\"}".to_string())
            .await
            .unwrap();

        let settled = p.consumer.run_until_idle().await.unwrap();
        assert_eq!(settled, 1);
        assert_eq!(p.consumer.dropped_count(), 1);
        assert_eq!(p.queue.nacked_count(), 0);
        assert!(p.queue.is_idle());
    }

    /// Duplicate deliveries of the same PostCreated event converge on the
    /// post row (keyed by id) but double-count the author's posts counter,
    /// and the second delivery's insert overwrites counters the row accrued
    /// in between.
    ///
    /// TODO: add a processed-event ledger keyed by event_id in front of the
    /// update service so applies become idempotent under at-least-once
    /// delivery; then flip posts_count to 1 and like_count to stay 1 here.
    #[tokio::test]
    async fn duplicate_post_created_redelivery() {
        let p = pipeline();

        let event = DomainEvent::post_created("post-1", "user-1", "Ann", "hello", None);
        publish(&p.queue, &event).await;
        p.consumer.run_until_idle().await.unwrap();

        publish(&p.queue, &DomainEvent::post_liked("post-1", "user-1", "Ann")).await;
        p.consumer.run_until_idle().await.unwrap();
        let post = p.store.get_post("post-1").await.unwrap().unwrap();
        assert_eq!(post.like_count, 1);

        publish(&p.queue, &event).await;
        p.consumer.run_until_idle().await.unwrap();

        assert_eq!(p.store.post_count(), 1);
        let profile = p.store.get_profile("user-1").await.unwrap().unwrap();
        assert_eq!(profile.posts_count, 2);
        // The accrued like was wiped by the redelivered insert
        let post = p.store.get_post("post-1").await.unwrap().unwrap();
        assert_eq!(post.like_count, 0);
    }

    #[tokio::test]
    async fn test_transient_store_failure_is_redelivered() {
        let queue = Arc::new(InMemoryEventQueue::new());
        let store = Arc::new(FlakyStore::new());
        let service = Arc::new(ReadStoreUpdateService::new(
            store.clone(),
            FanoutConfig::default(),
        ));
        let consumer = EventConsumer::new(queue.clone(), service, ConsumerConfig::default());

        publish(
            &queue,
            &DomainEvent::user_created("user-1", "Ann", "ann@example.com"),
        )
        .await;

        // First pass trips the injected failure and nacks; the no-progress
        // guard returns control. A second pass applies the redelivery.
        let settled = consumer.run_until_idle().await.unwrap();
        assert_eq!(settled, 0);
        assert_eq!(queue.nacked_count(), 1);

        let settled = consumer.run_until_idle().await.unwrap();
        assert_eq!(settled, 1);
        assert!(store
            .inner
            .get_profile("user-1")
            .await
            .unwrap()
            .is_some());
    }

    /// Delegating store that fails the first profile insert with a transient
    /// error, then behaves normally.
    struct FlakyStore {
        inner: InMemoryReadStore,
        fail_next: AtomicBool,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                inner: InMemoryReadStore::new(),
                fail_next: AtomicBool::new(true),
            }
        }
    }

    #[async_trait]
    impl ProfileStore for FlakyStore {
        async fn insert_profile_if_absent(&self, profile: ReadUserProfile) -> Result<bool> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(Error::Store("injected failure".to_string()));
            }
            self.inner.insert_profile_if_absent(profile).await
        }

        async fn update_identity(&self, user_id: &str, name: &str, email: &str) -> Result<()> {
            self.inner.update_identity(user_id, name, email).await
        }

        async fn get_profile(&self, user_id: &str) -> Result<Option<ReadUserProfile>> {
            self.inner.get_profile(user_id).await
        }

        async fn adjust_posts_count(&self, user_id: &str, delta: i64) -> Result<()> {
            self.inner.adjust_posts_count(user_id, delta).await
        }

        async fn adjust_likes_given(&self, user_id: &str, delta: i64) -> Result<()> {
            self.inner.adjust_likes_given(user_id, delta).await
        }

        async fn adjust_likes_received(&self, user_id: &str, delta: i64) -> Result<()> {
            self.inner.adjust_likes_received(user_id, delta).await
        }

        async fn touch_last_active(&self, user_id: &str, at: DateTime<Utc>) -> Result<()> {
            self.inner.touch_last_active(user_id, at).await
        }

        async fn list_profiles(&self, limit: usize) -> Result<Vec<ReadUserProfile>> {
            self.inner.list_profiles(limit).await
        }
    }

    #[async_trait]
    impl PostStore for FlakyStore {
        async fn insert_post(&self, post: ReadPost) -> Result<()> {
            self.inner.insert_post(post).await
        }

        async fn get_post(&self, post_id: &str) -> Result<Option<ReadPost>> {
            self.inner.get_post(post_id).await
        }

        async fn adjust_like_count(&self, post_id: &str, delta: i64) -> Result<Option<u64>> {
            self.inner.adjust_like_count(post_id, delta).await
        }

        async fn adjust_view_count(&self, post_id: &str, delta: i64) -> Result<Option<u64>> {
            self.inner.adjust_view_count(post_id, delta).await
        }

        async fn set_post_score(&self, post_id: &str, score: f64) -> Result<()> {
            self.inner.set_post_score(post_id, score).await
        }

        async fn recent_posts(&self, limit: usize) -> Result<Vec<ReadPost>> {
            self.inner.recent_posts(limit).await
        }
    }

    #[async_trait]
    impl FeedStore for FlakyStore {
        async fn insert_feed_items(&self, items: Vec<ReadFeedItem>) -> Result<()> {
            self.inner.insert_feed_items(items).await
        }

        async fn adjust_feed_like_counts(&self, post_id: &str, delta: i64) -> Result<u64> {
            self.inner.adjust_feed_like_counts(post_id, delta).await
        }

        async fn set_feed_liked_flag(
            &self,
            user_id: &str,
            post_id: &str,
            liked: bool,
        ) -> Result<()> {
            self.inner.set_feed_liked_flag(user_id, post_id, liked).await
        }

        async fn set_feed_scores(&self, post_id: &str, score: f64) -> Result<u64> {
            self.inner.set_feed_scores(post_id, score).await
        }

        async fn feed_for_user(&self, user_id: &str) -> Result<Vec<ReadFeedItem>> {
            self.inner.feed_for_user(user_id).await
        }
    }
}

// =============================================================================
// Cache Tiering Tests
// =============================================================================

mod cache_tiering_tests {
    use super::*;
    use feedstore::cache::{
        CacheMetrics, CacheStatsReporter, CacheTierClassifier, PostMetricsRegistry,
        RegistryConfig,
    };
    use feedstore::domain::ports::CacheTier;

    #[tokio::test]
    async fn test_replica_and_metrics_side_by_side() {
        let p = pipeline();
        let registry = Arc::new(PostMetricsRegistry::new(RegistryConfig::default()));
        let classifier = CacheTierClassifier::default();

        publish(
            &p.queue,
            &DomainEvent::post_created("post-1", "user-1", "Ann", "hello", None),
        )
        .await;
        p.consumer.run_until_idle().await.unwrap();

        // Serving layer reads the post and records access
        let post = p.store.get_post("post-1").await.unwrap().unwrap();
        for _ in 0..12 {
            registry.record_view(&post.id);
        }
        registry.record_score(&post.id, post.popularity_score);

        // 12 views inside a fresh window trends the post, hence hot
        let metrics = registry.get("post-1").unwrap();
        assert!(metrics.trending);
        assert_eq!(classifier.classify(&metrics), CacheTier::Hot);
    }

    #[tokio::test]
    async fn test_stats_report_over_live_pipeline() {
        let p = pipeline();
        let registry = Arc::new(PostMetricsRegistry::new(RegistryConfig::default()));
        let cache_metrics = Arc::new(CacheMetrics::new());
        let reporter = CacheStatsReporter::new(
            cache_metrics.clone(),
            registry.clone(),
            CacheTierClassifier::default(),
        );

        publish(
            &p.queue,
            &DomainEvent::post_created("post-1", "user-1", "Ann", "hello", None),
        )
        .await;
        p.consumer.run_until_idle().await.unwrap();

        registry.record_view("post-1");
        registry.record_engagement("post-1");
        cache_metrics.record_hit("post");
        cache_metrics.record_miss("post");

        let report = reporter.report();
        assert_eq!(report.overview.tracked_posts, 1);
        assert_eq!(report.overview.total_views, 1);
        assert_eq!(report.posts["post-1"].total_views, 1);
        assert!((report.performance.layers["post"].hit_ratio - 0.5).abs() < 1e-9);
    }
}

// =============================================================================
// Property Tests
// =============================================================================

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Any interleaving of likes and unlikes leaves the counter at the
        /// running tally, never below zero.
        #[test]
        fn like_counter_matches_floored_tally(ops in prop::collection::vec(any::<bool>(), 1..40)) {
            tokio_test::block_on(async {
                let store = Arc::new(InMemoryReadStore::new());
                let service = ReadStoreUpdateService::new(store.clone(), FanoutConfig::default());

                service
                    .apply(DomainEvent::post_created("post-1", "user-1", "Ann", "hello", None))
                    .await
                    .unwrap();

                let mut expected: i64 = 0;
                for (i, like) in ops.iter().enumerate() {
                    let user = format!("user-{}", i);
                    let event = if *like {
                        DomainEvent::post_liked("post-1", user, "User")
                    } else {
                        DomainEvent::post_unliked("post-1", user, "User")
                    };
                    service.apply(event).await.unwrap();
                    expected = (expected + if *like { 1 } else { -1 }).max(0);
                }

                let post = store.get_post("post-1").await.unwrap().unwrap();
                prop_assert_eq!(post.like_count, expected as u64);
                Ok(())
            })?;
        }
    }
}
