//! Domain Events
//!
//! Events emitted by the authoritative write side and consumed here to keep
//! the denormalized replica in sync. Events are immutable records of things
//! that have already happened; the transport delivering them is
//! at-least-once, so every application of an event may run more than once.
//!
//! # Wire shape
//!
//! Each event is a flat JSON object tagged by `eventType`, with camelCase
//! field names:
//!
//! ```json
//! {
//!   "eventType": "PostLiked",
//!   "eventId": "4f1c...",
//!   "occurredAt": "2024-05-01T12:00:00Z",
//!   "aggregateId": "post-100",
//!   "aggregateVersion": 3,
//!   "postId": "post-100",
//!   "userId": "user-1",
//!   "userName": "Ann",
//!   "likedAt": "2024-05-01T12:00:00Z"
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of a domain event, also used to name its logical input queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PostCreated,
    PostLiked,
    PostUnliked,
    UserCreated,
}

impl EventKind {
    /// All event kinds, one logical queue each.
    pub const ALL: [EventKind; 4] = [
        EventKind::PostCreated,
        EventKind::PostLiked,
        EventKind::PostUnliked,
        EventKind::UserCreated,
    ];

    /// Name of the logical queue carrying this event kind.
    pub fn queue_name(&self) -> &'static str {
        match self {
            EventKind::PostCreated => "post-created",
            EventKind::PostLiked => "post-liked",
            EventKind::PostUnliked => "post-unliked",
            EventKind::UserCreated => "user-created",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::PostCreated => write!(f, "PostCreated"),
            EventKind::PostLiked => write!(f, "PostLiked"),
            EventKind::PostUnliked => write!(f, "PostUnliked"),
            EventKind::UserCreated => write!(f, "UserCreated"),
        }
    }
}

/// Domain event consumed by the read-model update path.
///
/// An exhaustive tagged union: adding a variant forces every dispatch site
/// to handle it at compile time. There is no "unknown kind" fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum DomainEvent {
    /// A post was published on the write side.
    #[serde(rename_all = "camelCase")]
    PostCreated {
        event_id: String,
        occurred_at: DateTime<Utc>,
        aggregate_id: String,
        aggregate_version: u64,
        post_id: String,
        author_id: String,
        author_name: String,
        text_content: String,
        image_url: Option<String>,
        created_at: DateTime<Utc>,
    },

    /// A user liked a post.
    #[serde(rename_all = "camelCase")]
    PostLiked {
        event_id: String,
        occurred_at: DateTime<Utc>,
        aggregate_id: String,
        aggregate_version: u64,
        post_id: String,
        user_id: String,
        user_name: String,
        liked_at: DateTime<Utc>,
    },

    /// A user withdrew a like.
    #[serde(rename_all = "camelCase")]
    PostUnliked {
        event_id: String,
        occurred_at: DateTime<Utc>,
        aggregate_id: String,
        aggregate_version: u64,
        post_id: String,
        user_id: String,
        user_name: String,
        unliked_at: DateTime<Utc>,
    },

    /// A user account was created.
    #[serde(rename_all = "camelCase")]
    UserCreated {
        event_id: String,
        occurred_at: DateTime<Utc>,
        aggregate_id: String,
        aggregate_version: u64,
        user_id: String,
        name: String,
        email: String,
        created_at: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Get the unique identifier of this event occurrence.
    pub fn event_id(&self) -> &str {
        match self {
            DomainEvent::PostCreated { event_id, .. } => event_id,
            DomainEvent::PostLiked { event_id, .. } => event_id,
            DomainEvent::PostUnliked { event_id, .. } => event_id,
            DomainEvent::UserCreated { event_id, .. } => event_id,
        }
    }

    /// Get the timestamp at which the event occurred on the write side.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::PostCreated { occurred_at, .. } => *occurred_at,
            DomainEvent::PostLiked { occurred_at, .. } => *occurred_at,
            DomainEvent::PostUnliked { occurred_at, .. } => *occurred_at,
            DomainEvent::UserCreated { occurred_at, .. } => *occurred_at,
        }
    }

    /// Get the identifier of the aggregate this event belongs to.
    pub fn aggregate_id(&self) -> &str {
        match self {
            DomainEvent::PostCreated { aggregate_id, .. } => aggregate_id,
            DomainEvent::PostLiked { aggregate_id, .. } => aggregate_id,
            DomainEvent::PostUnliked { aggregate_id, .. } => aggregate_id,
            DomainEvent::UserCreated { aggregate_id, .. } => aggregate_id,
        }
    }

    /// Get the write-side version of the aggregate after this event.
    pub fn aggregate_version(&self) -> u64 {
        match self {
            DomainEvent::PostCreated {
                aggregate_version, ..
            } => *aggregate_version,
            DomainEvent::PostLiked {
                aggregate_version, ..
            } => *aggregate_version,
            DomainEvent::PostUnliked {
                aggregate_version, ..
            } => *aggregate_version,
            DomainEvent::UserCreated {
                aggregate_version, ..
            } => *aggregate_version,
        }
    }

    /// Get the event kind.
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::PostCreated { .. } => EventKind::PostCreated,
            DomainEvent::PostLiked { .. } => EventKind::PostLiked,
            DomainEvent::PostUnliked { .. } => EventKind::PostUnliked,
            DomainEvent::UserCreated { .. } => EventKind::UserCreated,
        }
    }
}

// =============================================================================
// Event Builders
// =============================================================================

impl DomainEvent {
    /// Create a PostCreated event.
    pub fn post_created(
        post_id: impl Into<String>,
        author_id: impl Into<String>,
        author_name: impl Into<String>,
        text_content: impl Into<String>,
        image_url: Option<String>,
    ) -> Self {
        let post_id = post_id.into();
        let now = Utc::now();
        DomainEvent::PostCreated {
            event_id: uuid::Uuid::new_v4().to_string(),
            occurred_at: now,
            aggregate_id: post_id.clone(),
            aggregate_version: 1,
            post_id,
            author_id: author_id.into(),
            author_name: author_name.into(),
            text_content: text_content.into(),
            image_url,
            created_at: now,
        }
    }

    /// Create a PostLiked event.
    pub fn post_liked(
        post_id: impl Into<String>,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
    ) -> Self {
        let post_id = post_id.into();
        let now = Utc::now();
        DomainEvent::PostLiked {
            event_id: uuid::Uuid::new_v4().to_string(),
            occurred_at: now,
            aggregate_id: post_id.clone(),
            aggregate_version: 1,
            post_id,
            user_id: user_id.into(),
            user_name: user_name.into(),
            liked_at: now,
        }
    }

    /// Create a PostUnliked event.
    pub fn post_unliked(
        post_id: impl Into<String>,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
    ) -> Self {
        let post_id = post_id.into();
        let now = Utc::now();
        DomainEvent::PostUnliked {
            event_id: uuid::Uuid::new_v4().to_string(),
            occurred_at: now,
            aggregate_id: post_id.clone(),
            aggregate_version: 1,
            post_id,
            user_id: user_id.into(),
            user_name: user_name.into(),
            unliked_at: now,
        }
    }

    /// Create a UserCreated event.
    pub fn user_created(
        user_id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        let user_id = user_id.into();
        let now = Utc::now();
        DomainEvent::UserCreated {
            event_id: uuid::Uuid::new_v4().to_string(),
            occurred_at: now,
            aggregate_id: user_id.clone(),
            aggregate_version: 1,
            user_id,
            name: name.into(),
            email: email.into(),
            created_at: now,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
