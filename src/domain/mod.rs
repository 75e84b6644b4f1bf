//! Domain Layer
//!
//! Core types and abstractions of the read-model service:
//!
//! - **Events** (`events.rs`) - the domain-event union consumed from the
//!   write side and its wire format
//! - **Model** (`model.rs`) - denormalized read records and per-post access
//!   metrics
//! - **Ports** (`ports.rs`) - trait abstractions over the durable replica
//!   and the message transport

pub mod events;
pub mod model;
pub mod ports;

// Re-export commonly used types
pub use events::{DomainEvent, EventKind};
pub use model::{PostMetrics, ReadFeedItem, ReadPost, ReadUserProfile};
pub use ports::{
    CacheTier, Delivery, EventTransport, FeedStore, PostStore, ProfileStore, ReadStore,
};
