//! Change events, the notification sink, and identifier supply.
//!
//! The notification transport itself is an external collaborator; the
//! engine only needs somewhere to hand a serialized change event.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use oxrdf::NamedNodeRef;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::vocab::activitystreams;

/// The kind of mutation a change event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityType {
    Create,
    Update,
    Delete,
}

impl ActivityType {
    /// The ActivityStreams IRI for this activity.
    pub fn as_iri(&self) -> NamedNodeRef<'static> {
        match self {
            ActivityType::Create => activitystreams::CREATE,
            ActivityType::Update => activitystreams::UPDATE,
            ActivityType::Delete => activitystreams::DELETE,
        }
    }
}

/// One resource mutation, as published downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub timestamp: DateTime<Utc>,
    pub identifier: String,
    pub activity: ActivityType,
    #[serde(default)]
    pub agents: Vec<String>,
}

impl ChangeEvent {
    pub fn new(
        timestamp: DateTime<Utc>,
        identifier: impl Into<String>,
        activity: ActivityType,
    ) -> Self {
        Self {
            timestamp,
            identifier: identifier.into(),
            activity,
            agents: Vec::new(),
        }
    }
}

/// Downstream notification sink.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &ChangeEvent) -> Result<(), StoreError>;
}

/// Collects events in memory. The default sink for embedded deployments
/// and tests.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<ChangeEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of everything published so far.
    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventSink for MemoryEventSink {
    fn publish(&self, event: &ChangeEvent) -> Result<(), StoreError> {
        self.events
            .lock()
            .map_err(|_| StoreError::EventPublish("event sink poisoned".to_string()))?
            .push(event.clone());
        Ok(())
    }
}

/// Supplies unique opaque strings used to skolemize blank nodes.
pub trait IdentifierSupplier: Send + Sync {
    fn get(&self) -> String;
}

/// Random UUID identifier supplier.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidSupplier;

impl IdentifierSupplier for UuidSupplier {
    fn get(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
