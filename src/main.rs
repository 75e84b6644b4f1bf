//! FeedStore Service
//!
//! Hosts the event-driven read-store pipeline: consumes domain events from
//! the transport, applies them to the denormalized replica, and runs a
//! periodic cache-tier sweep over the access-metrics registry.
//!
//! ```text
//! Event Transport → Event Consumer → Update Service → Read Store
//!                                                        │
//!                       Metrics Registry ← access metrics┘
//!                             │
//!                       Tier Classifier → Stats Reporting
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedstore::adapters;
use feedstore::cache::{
    CacheMetrics, CacheStatsReporter, CacheTierClassifier, PostMetricsRegistry, RegistryConfig,
    TierThresholds,
};
use feedstore::consumer::{ConsumerConfig, EventConsumer};
use feedstore::domain::ports::CacheTier;
use feedstore::error::Result;
use feedstore::readstore::{FanoutConfig, ReadStoreUpdateService};

// =============================================================================
// CLI Arguments
// =============================================================================

/// FeedStore - event-driven social feed read store
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Maximum events applied concurrently
    #[arg(long, env = "MAX_CONCURRENT_EVENTS", default_value = "4")]
    max_concurrent_events: usize,

    /// Transport poll interval in milliseconds
    #[arg(long, env = "POLL_INTERVAL_MS", default_value = "100")]
    poll_interval_ms: u64,

    /// Feed rows written per new post
    #[arg(long, env = "POST_FANOUT_LIMIT", default_value = "10")]
    post_fanout_limit: usize,

    /// Recent posts seeded into a new user's feed
    #[arg(long, env = "COLD_START_FANOUT_LIMIT", default_value = "5")]
    cold_start_fanout_limit: usize,

    /// Rolling-window views above which a post is hot
    #[arg(long, env = "HOT_VIEWS_PER_HOUR", default_value = "100")]
    hot_views_per_hour: u64,

    /// Lifetime views above which a post is at least warm
    #[arg(long, env = "WARM_TOTAL_VIEWS", default_value = "500")]
    warm_total_views: u64,

    /// Engagement rate above which a post is at least warm
    #[arg(long, env = "WARM_ENGAGEMENT_RATE", default_value = "0.10")]
    warm_engagement_rate: f64,

    /// Idle hours before a post becomes an eviction candidate
    #[arg(long, env = "IDLE_EVICTION_TTL_HOURS", default_value = "24")]
    idle_eviction_ttl_hours: i64,

    /// View velocity (views/minute) at which a post is flagged trending
    #[arg(long, env = "TRENDING_VIEWS_PER_MINUTE", default_value = "5.0")]
    trending_views_per_minute: f64,

    /// Seconds between cache-tier sweeps
    #[arg(long, env = "TIER_SWEEP_INTERVAL_SECONDS", default_value = "60")]
    tier_sweep_interval_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    info!("Starting FeedStore service");
    info!("  Max concurrent events: {}", args.max_concurrent_events);
    info!("  Poll interval: {}ms", args.poll_interval_ms);
    info!("  Post fan-out limit: {}", args.post_fanout_limit);
    info!(
        "  Cold-start fan-out limit: {}",
        args.cold_start_fanout_limit
    );
    info!(
        "  Tier sweep interval: {}s",
        args.tier_sweep_interval_seconds
    );

    // Wire the write path: transport → consumer → update service → replica
    let transport = Arc::new(adapters::InMemoryEventQueue::new());
    let store = Arc::new(adapters::InMemoryReadStore::new());

    let service = Arc::new(ReadStoreUpdateService::new(
        store.clone(),
        FanoutConfig {
            post_fanout_limit: args.post_fanout_limit,
            cold_start_fanout_limit: args.cold_start_fanout_limit,
        },
    ));

    let consumer = EventConsumer::new(
        transport.clone(),
        service,
        ConsumerConfig {
            max_concurrent: args.max_concurrent_events,
            poll_interval: Duration::from_millis(args.poll_interval_ms),
        },
    );

    // Wire the cache-tiering side
    let registry = Arc::new(PostMetricsRegistry::new(RegistryConfig {
        window: chrono::Duration::hours(1),
        trending_views_per_minute: args.trending_views_per_minute,
    }));
    let cache_metrics = Arc::new(CacheMetrics::new());
    let classifier = CacheTierClassifier::new(TierThresholds {
        hot_views_per_hour: args.hot_views_per_hour,
        warm_total_views: args.warm_total_views,
        warm_engagement_rate: args.warm_engagement_rate,
        idle_eviction_ttl: chrono::Duration::hours(args.idle_eviction_ttl_hours),
    });
    let reporter = CacheStatsReporter::new(
        cache_metrics.clone(),
        registry.clone(),
        classifier.clone(),
    );

    // Periodic tier sweep and stats report
    let sweep_registry = registry.clone();
    let sweep_classifier = classifier.clone();
    let sweep_interval = Duration::from_secs(args.tier_sweep_interval_seconds.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            run_tier_sweep(&sweep_registry, &sweep_classifier, &reporter);
        }
    });

    // Run the consumer until shutdown
    info!("Starting event consumer");
    let consumer_handle = tokio::spawn(consumer.run());

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| feedstore::Error::Internal(format!("failed to listen for ctrl-c: {}", e)))?;
    info!("Shutdown signal received");

    consumer_handle.abort();
    info!("FeedStore shutdown complete");
    Ok(())
}

// =============================================================================
// Tier Sweep
// =============================================================================

fn run_tier_sweep(
    registry: &PostMetricsRegistry,
    classifier: &CacheTierClassifier,
    reporter: &CacheStatsReporter,
) {
    let tiers = classifier.classify_all(registry);
    let hot = tiers.iter().filter(|(_, t)| *t == CacheTier::Hot).count();
    let warm = tiers.iter().filter(|(_, t)| *t == CacheTier::Warm).count();
    let cold = tiers.iter().filter(|(_, t)| *t == CacheTier::Cold).count();
    let evictable = classifier.eviction_candidates(registry);

    info!(
        tracked = tiers.len(),
        hot, warm, cold,
        eviction_candidates = evictable.len(),
        "cache tier sweep"
    );

    let report = reporter.report();
    for recommendation in &report.recommendations {
        info!(recommendation = %recommendation, "cache recommendation");
    }
    match serde_json::to_string(&report) {
        Ok(json) => debug!(report = %json, "cache stats report"),
        Err(e) => error!(error = %e, "failed to serialize cache stats report"),
    }
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("tokio=warn".parse().unwrap());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
