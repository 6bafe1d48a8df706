// src/lib.rs
// Versioned, append-only RDF resource store with time-travel retrieval
// Journal is the source of truth; cache and quads blob are derived

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

// Module declarations
pub mod cached;
pub mod config;
pub mod error;
pub mod events;
pub mod init;
pub mod layout;
mod line;
pub mod locks;
pub mod model;
pub mod patch;
pub mod service;
pub mod topology;
pub mod versioned;
pub mod vocab;

// Re-export main types
pub use cached::{CacheHeader, CachedResource};
pub use config::{KafkaConfig, StoreConfig, ZkConfig};
pub use error::StoreError;
pub use events::{
    ActivityType, ChangeEvent, EventSink, IdentifierSupplier, MemoryEventSink, UuidSupplier,
};
pub use locks::{LockGuard, LockStore, MemoryLockStore};
pub use model::{Datastream, Resource, TripleContext, VersionRange};
pub use patch::{PatchBlock, PatchOp, Projection};
pub use service::ResourceService;
pub use topology::{
    ChannelProducer, EventProducer, NullProducer, StreamTopology, TopicRecord, TOPIC_DELETE,
    TOPIC_EVENT, TOPIC_INBOUND_ADD, TOPIC_INBOUND_DELETE, TOPIC_LDP_CONTAINER_ADD,
    TOPIC_LDP_CONTAINER_DELETE, TOPIC_RECACHE, TOPIC_UPDATE,
};
pub use versioned::VersionedResource;
