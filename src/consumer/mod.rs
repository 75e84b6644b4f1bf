//! Event Consumer
//!
//! Ingress adapter between the message transport and the read-model update
//! service: one logical subscription per event kind, bounded worker
//! concurrency, ack on success, nack (redelivery) on transient failure.
//!
//! The transport is at-least-once, so there is no ordering guarantee across
//! or within a queue, and the same event may be dispatched more than once.
//! A payload that cannot be decoded is acknowledged and dropped with a warn
//! log: redelivering a poison message cannot succeed, and handing garbage to
//! the update service helps nobody.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, instrument, warn};

use crate::domain::events::{DomainEvent, EventKind};
use crate::domain::ports::{Delivery, EventTransport};
use crate::error::{Error, Result};
use crate::readstore::ReadStoreUpdateService;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the event consumer.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Maximum number of events applied concurrently
    pub max_concurrent: usize,
    /// Sleep between polling passes when all queues are empty
    pub poll_interval: std::time::Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            poll_interval: std::time::Duration::from_millis(100),
        }
    }
}

/// Outcome of settling one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settlement {
    /// Applied and acknowledged
    Acked,
    /// Failed transiently; left for redelivery
    Redelivered,
    /// Poison payload; acknowledged and discarded
    Dropped,
}

// =============================================================================
// Consumer
// =============================================================================

/// Pulls deliveries from the transport and applies them to the replica.
pub struct EventConsumer {
    transport: Arc<dyn EventTransport>,
    service: Arc<ReadStoreUpdateService>,
    concurrency: Arc<Semaphore>,
    config: ConsumerConfig,

    applied: AtomicU64,
    redelivered: AtomicU64,
    dropped: AtomicU64,
}

impl EventConsumer {
    pub fn new(
        transport: Arc<dyn EventTransport>,
        service: Arc<ReadStoreUpdateService>,
        config: ConsumerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            transport,
            service,
            concurrency: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            config,
            applied: AtomicU64::new(0),
            redelivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        })
    }

    /// Events applied and acknowledged so far.
    pub fn applied_count(&self) -> u64 {
        self.applied.load(Ordering::Relaxed)
    }

    /// Deliveries left for redelivery so far.
    pub fn redelivered_count(&self) -> u64 {
        self.redelivered.load(Ordering::Relaxed)
    }

    /// Poison payloads discarded so far.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Run forever: drain all queues, then sleep for the poll interval.
    ///
    /// Never returns under normal operation; callers race it against their
    /// shutdown signal.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        loop {
            self.run_until_idle().await?;
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Drain every queue until a polling pass finds nothing, or until a pass
    /// makes no progress (every delivery in it was nacked back).
    ///
    /// Returns the number of deliveries settled (acked or dropped).
    pub async fn run_until_idle(self: &Arc<Self>) -> Result<u64> {
        let mut settled = 0;
        loop {
            // Phase 1: pull everything currently pending. Polled deliveries
            // sit in-flight, so a nack during phase 2 cannot be re-polled
            // within the same pass.
            let mut batch = Vec::new();
            for kind in EventKind::ALL {
                while let Some(delivery) = self.transport.poll(kind).await? {
                    batch.push((kind, delivery));
                }
            }
            if batch.is_empty() {
                return Ok(settled);
            }

            // Phase 2: apply concurrently under the worker bound.
            let mut join_set = JoinSet::new();
            for (kind, delivery) in batch {
                let permit = self
                    .concurrency
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| Error::Internal("consumer semaphore closed".to_string()))?;
                let consumer = Arc::clone(self);
                join_set.spawn(async move {
                    let _permit = permit;
                    consumer.settle(kind, delivery).await
                });
            }

            let mut progressed = false;
            while let Some(outcome) = join_set.join_next().await {
                match outcome {
                    Ok(Ok(Settlement::Acked)) | Ok(Ok(Settlement::Dropped)) => {
                        settled += 1;
                        progressed = true;
                    }
                    Ok(Ok(Settlement::Redelivered)) => {}
                    Ok(Err(e)) => error!(error = %e, "transport error while settling delivery"),
                    Err(e) => error!(error = %e, "consumer worker panicked"),
                }
            }

            // Every delivery bounced: back off and let the outer loop retry
            // instead of hot-looping on a struggling store.
            if !progressed {
                return Ok(settled);
            }
        }
    }

    /// Decode, dispatch, and acknowledge or requeue one delivery. The
    /// error taxonomy decides the split: retryable failures are nacked for
    /// redelivery, everything else (poison payloads) is acked and dropped.
    #[instrument(skip_all, fields(queue = kind.queue_name(), delivery_id = delivery.delivery_id))]
    async fn settle(&self, kind: EventKind, delivery: Delivery) -> Result<Settlement> {
        match self.process(&delivery.payload).await {
            Ok(event_id) => {
                debug!(event_id = %event_id, "event applied");
                self.transport.ack(kind, delivery.delivery_id).await?;
                self.applied.fetch_add(1, Ordering::Relaxed);
                Ok(Settlement::Acked)
            }
            Err(e) if e.is_retryable() => {
                // Transient or unexpected: leave unacknowledged so the
                // transport redelivers. The consumer itself never crashes.
                warn!(error = %e, "event application failed, leaving for redelivery");
                self.transport.nack(kind, delivery.delivery_id).await?;
                self.redelivered.fetch_add(1, Ordering::Relaxed);
                Ok(Settlement::Redelivered)
            }
            Err(e) => {
                warn!(error = %e, "malformed event payload, dropping");
                self.transport.ack(kind, delivery.delivery_id).await?;
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Ok(Settlement::Dropped)
            }
        }
    }

    /// Decode and apply one payload. A payload that does not deserialize
    /// surfaces as a non-retryable error.
    async fn process(&self, payload: &str) -> Result<String> {
        let event: DomainEvent = serde_json::from_str(payload)?;
        let event_id = event.event_id().to_string();
        self.service.apply(event).await?;
        Ok(event_id)
    }
}

// =============================================================================
// Tests
// =============================================================================
