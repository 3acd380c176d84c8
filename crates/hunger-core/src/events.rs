//! Analytics and observability events, envelope schema, and event bus.
//!
//! The buffer controller and the annotation submitter never surface failures
//! to the rendering layer. Instead they publish [`AnnotationEvent`]s on an
//! [`EventBus`]; analytics consumers subscribe to `annotation.submitted`,
//! diagnostics consumers to the failure and stale-response events.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{AnnotationValue, CandidateSource, Generation, ItemKind};

// ============================================================================
// Event Envelope
// ============================================================================

/// Versioned, self-describing wrapper around an [`AnnotationEvent`].
///
/// ## Wire Format
///
/// ```text
/// {"event_id":"...","event_type":"annotation.submitted","occurred_at":"...","payload_version":1,"payload":{"type":"AnnotationSubmitted",...}}
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// Unique event identifier (UUIDv7 for temporal ordering).
    pub event_id: Uuid,
    /// Namespaced event type (e.g., `"annotation.submitted"`, `"fetch.failed"`).
    pub event_type: String,
    /// When the event occurred (UTC).
    pub occurred_at: DateTime<Utc>,
    /// Payload schema version.
    pub payload_version: u32,
    /// Domain-specific event data.
    pub payload: AnnotationEvent,
}

impl EventEnvelope {
    pub fn new(event: AnnotationEvent) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event.namespaced_event_type().to_string(),
            occurred_at: Utc::now(),
            payload_version: 1,
            payload: event,
        }
    }
}

// ============================================================================
// Annotation Event (domain payloads)
// ============================================================================

/// Events emitted by a work-queue session.
///
/// Serialized as JSON with a `type` tag field, e.g.:
/// `{"type":"AnnotationSubmitted","count":3,"value":1,"kind":"insight"}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum AnnotationEvent {
    /// Decisions were recorded remotely (analytics).
    AnnotationSubmitted {
        count: usize,
        value: AnnotationValue,
        kind: ItemKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        annotation_type: Option<String>,
    },
    /// Decisions could not be recorded remotely. The items stay evicted.
    SubmissionFailed {
        count: usize,
        kind: ItemKind,
        error: String,
    },
    /// The filter changed and the buffer was reset.
    FilterChanged {
        generation: Generation,
        source: CandidateSource,
        start_page: u32,
    },
    /// A page was appended to the buffer.
    PageAppended {
        generation: Generation,
        page: u32,
        appended: usize,
        duplicates: usize,
    },
    /// A page fetch failed; the buffer stops growing until the next refill.
    FetchFailed {
        generation: Generation,
        page: u32,
        error: String,
    },
    /// A response for a superseded generation was discarded.
    StaleResponseDiscarded {
        response_generation: Generation,
        live_generation: Generation,
        page: u32,
    },
    /// No items are left for the current filter.
    Exhausted { generation: Generation },
}

impl AnnotationEvent {
    /// Returns the event type name (variant name).
    pub fn event_type(&self) -> &'static str {
        match self {
            AnnotationEvent::AnnotationSubmitted { .. } => "AnnotationSubmitted",
            AnnotationEvent::SubmissionFailed { .. } => "SubmissionFailed",
            AnnotationEvent::FilterChanged { .. } => "FilterChanged",
            AnnotationEvent::PageAppended { .. } => "PageAppended",
            AnnotationEvent::FetchFailed { .. } => "FetchFailed",
            AnnotationEvent::StaleResponseDiscarded { .. } => "StaleResponseDiscarded",
            AnnotationEvent::Exhausted { .. } => "Exhausted",
        }
    }

    /// Returns the namespaced event type for the envelope.
    pub fn namespaced_event_type(&self) -> &'static str {
        match self {
            AnnotationEvent::AnnotationSubmitted { .. } => "annotation.submitted",
            AnnotationEvent::SubmissionFailed { .. } => "annotation.failed",
            AnnotationEvent::FilterChanged { .. } => "buffer.filter_changed",
            AnnotationEvent::PageAppended { .. } => "buffer.page_appended",
            AnnotationEvent::FetchFailed { .. } => "fetch.failed",
            AnnotationEvent::StaleResponseDiscarded { .. } => "fetch.stale",
            AnnotationEvent::Exhausted { .. } => "buffer.exhausted",
        }
    }

    /// Whether this event is meant for analytics consumers.
    pub fn is_analytics(&self) -> bool {
        matches!(self, AnnotationEvent::AnnotationSubmitted { .. })
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast-based event bus.
///
/// Uses `tokio::sync::broadcast`. Slow receivers that fall behind receive a
/// `Lagged` error and miss events. Emitting with no subscribers is a no-op.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: AnnotationEvent) {
        let envelope = EventEnvelope::new(event);
        let subscriber_count = self.tx.receiver_count();
        tracing::debug!(
            event_type = %envelope.event_type,
            event_id = %envelope.event_id,
            subscriber_count,
            "EventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    /// Subscribe to receive enveloped events.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}

// ============================================================================
// Tests
// ============================================================================
