//! In-Memory Event Queue Adapter
//!
//! An at-least-once transport for tests and single-process deployments:
//! one logical queue per event kind, `nack` requeues the delivery at the
//! front so it is redelivered, `ack` drops it. Payloads stay opaque strings;
//! decoding belongs to the consumer.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::domain::events::EventKind;
use crate::domain::ports::{Delivery, EventTransport};
use crate::error::Result;

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<Delivery>,
    /// Deliveries handed to a consumer but neither acked nor nacked yet
    in_flight: HashMap<u64, Delivery>,
}

/// In-memory at-least-once queue.
#[derive(Debug, Default)]
pub struct InMemoryEventQueue {
    queues: DashMap<EventKind, Mutex<QueueState>>,
    next_delivery_id: AtomicU64,
    acked: AtomicU64,
    nacked: AtomicU64,
}

impl InMemoryEventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total deliveries acknowledged across all queues.
    pub fn acked_count(&self) -> u64 {
        self.acked.load(Ordering::Relaxed)
    }

    /// Total deliveries returned for redelivery across all queues.
    pub fn nacked_count(&self) -> u64 {
        self.nacked.load(Ordering::Relaxed)
    }

    /// Deliveries currently waiting on the given queue.
    pub fn pending_count(&self, kind: EventKind) -> usize {
        self.queues
            .get(&kind)
            .map(|q| q.lock().pending.len())
            .unwrap_or(0)
    }

    /// True when no queue has pending or in-flight deliveries.
    pub fn is_idle(&self) -> bool {
        self.queues.iter().all(|q| {
            let state = q.lock();
            state.pending.is_empty() && state.in_flight.is_empty()
        })
    }
}

#[async_trait]
impl EventTransport for InMemoryEventQueue {
    async fn publish(&self, kind: EventKind, payload: String) -> Result<()> {
        let delivery_id = self.next_delivery_id.fetch_add(1, Ordering::Relaxed);
        let queue = self.queues.entry(kind).or_default();
        queue.lock().pending.push_back(Delivery {
            delivery_id,
            payload,
        });
        Ok(())
    }

    async fn poll(&self, kind: EventKind) -> Result<Option<Delivery>> {
        let queue = self.queues.entry(kind).or_default();
        let mut state = queue.lock();
        match state.pending.pop_front() {
            Some(delivery) => {
                state.in_flight.insert(delivery.delivery_id, delivery.clone());
                Ok(Some(delivery))
            }
            None => Ok(None),
        }
    }

    async fn ack(&self, kind: EventKind, delivery_id: u64) -> Result<()> {
        if let Some(queue) = self.queues.get(&kind) {
            if queue.lock().in_flight.remove(&delivery_id).is_some() {
                self.acked.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    async fn nack(&self, kind: EventKind, delivery_id: u64) -> Result<()> {
        if let Some(queue) = self.queues.get(&kind) {
            let mut state = queue.lock();
            if let Some(delivery) = state.in_flight.remove(&delivery_id) {
                state.pending.push_front(delivery);
                self.nacked.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
