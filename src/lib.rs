//! FeedStore - Event-Driven Social Feed Read Store
//!
//! Maintains a denormalized read-side replica of a social feed (posts,
//! user profiles, materialized per-user feeds) by consuming domain events
//! from a message transport, and layers popularity-driven cache tiering
//! on top of it.
//!
//! # Architecture
//!
//! ```text
//! Event Transport → Event Consumer → Update Service → Read Store
//!                                                        │
//!                       Metrics Registry ← access metrics┘
//!                             │
//!                       Tier Classifier → Stats Reporting
//! ```
//!
//! The write path is eventually consistent and at-least-once: events may
//! arrive out of order or more than once, and every update converges the
//! replica rather than assuming a clean slate.
//!
//! # Modules
//!
//! - [`adapters`] - Infrastructure adapters implementing domain ports
//! - [`cache`] - Access metrics, tier classification, stats reporting
//! - [`consumer`] - Event consumer bridging transport and update service
//! - [`domain`] - Domain layer with events, read models, and ports
//! - [`error`] - Error types
//! - [`readstore`] - Read-model update service and fan-out
//! - [`scoring`] - Popularity scoring

pub mod adapters;
pub mod cache;
pub mod consumer;
pub mod domain;
pub mod error;
pub mod readstore;
pub mod scoring;

// Re-export commonly used types
pub use cache::{CacheMetrics, CacheStatsReporter, CacheTierClassifier, PostMetricsRegistry};
pub use consumer::{ConsumerConfig, EventConsumer};
pub use domain::events::DomainEvent;
pub use error::{Error, Result};
pub use readstore::{FanoutConfig, ReadStoreUpdateService};
pub use scoring::PopularityScorer;
