//! Lifecycle events emitted by the file service.
//!
//! Events are delivered synchronously through the service's event bus.
//! Listeners subscribe to one [`EventType`] or to every event via
//! [`EventFilter::AnyEvent`].

pub mod file;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use file::{EventType, FileEvent};

use crate::types::FileId;

/// Wrapper for lifecycle events with metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// The file the event is about.
    pub file_id: FileId,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The event payload.
    pub payload: FileEvent,
}

impl DomainEvent {
    /// Create a new event stamped with the current time.
    pub fn new(file_id: FileId, payload: FileEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_id,
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }
}

/// Which events a listener receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventFilter {
    /// Only events of one type.
    Kind(EventType),
    /// Every event.
    AnyEvent,
}

impl EventFilter {
    pub fn matches(&self, event_type: EventType) -> bool {
        match self {
            Self::Kind(kind) => *kind == event_type,
            Self::AnyEvent => true,
        }
    }
}

impl From<EventType> for EventFilter {
    fn from(kind: EventType) -> Self {
        Self::Kind(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_names() {
        let event = DomainEvent::new(
            FileId::new(),
            FileEvent::UploadError {
                error: "TRANSFER: disk full".into(),
            },
        );
        assert_eq!(event.event_type().as_str(), "upload:error");
        assert_eq!(event.payload.error(), Some("TRANSFER: disk full"));
        assert!(EventFilter::AnyEvent.matches(EventType::DeleteComplete));
        assert!(!EventFilter::Kind(EventType::UploadStart).matches(EventType::UploadError));
    }

    #[test]
    fn test_payload_is_tagged() {
        let json = serde_json::to_value(FileEvent::DownloadComplete { size_bytes: 10 }).unwrap();
        assert_eq!(json["type"], "download_complete");
        assert_eq!(json["size_bytes"], 10);
    }
}
