//! Stream topology: the event pipeline behind the resource service.
//!
//! Mutations arrive as `(key, dataset)` records on named logical topics.
//! The topology branches updates and deletes into containment maintenance,
//! inbound-reference maintenance, or recache legs, and coalesces cache
//! regenerations inside a tumbling time window so a busy resource is
//! rewritten at most once per window.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use oxrdf::{NamedNode, Quad, Subject, Term};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cached::CachedResource;
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::events::{ActivityType, ChangeEvent, EventSink};
use crate::layout;
use crate::locks::{self, LockStore};
use crate::patch::{self, PatchOp};
use crate::vocab::{self, ldp, repo};

pub const TOPIC_UPDATE: &str = "trellis.update";
pub const TOPIC_DELETE: &str = "trellis.delete";
pub const TOPIC_LDP_CONTAINER_ADD: &str = "trellis.container.add";
pub const TOPIC_LDP_CONTAINER_DELETE: &str = "trellis.container.delete";
pub const TOPIC_INBOUND_ADD: &str = "trellis.inbound.add";
pub const TOPIC_INBOUND_DELETE: &str = "trellis.inbound.delete";
pub const TOPIC_RECACHE: &str = "trellis.recache";
pub const TOPIC_EVENT: &str = "trellis.event";

/// One record on a logical topic: a resource key and a full dataset.
#[derive(Debug, Clone)]
pub struct TopicRecord {
    pub topic: &'static str,
    pub key: String,
    pub dataset: Vec<Quad>,
    redelivered: bool,
}

impl TopicRecord {
    pub fn new(topic: &'static str, key: impl Into<String>, dataset: Vec<Quad>) -> Self {
        Self {
            topic,
            key: key.into(),
            dataset,
            redelivered: false,
        }
    }

    /// Marks the record as a republished copy; the dispatcher never
    /// processes one twice.
    fn redelivery(mut self) -> Self {
        self.redelivered = true;
        self
    }
}

/// Accepts records keyed by resource IRI.
pub trait EventProducer: Send + Sync {
    fn send(&self, record: TopicRecord) -> Result<(), StoreError>;
}

/// Producer handle feeding a spawned topology.
pub struct ChannelProducer {
    tx: mpsc::UnboundedSender<TopicRecord>,
}

impl EventProducer for ChannelProducer {
    fn send(&self, record: TopicRecord) -> Result<(), StoreError> {
        self.tx
            .send(record)
            .map_err(|_| StoreError::EventPublish("topology channel closed".to_string()))
    }
}

/// Drops every record. For synchronous deployments with no topology.
pub struct NullProducer;

impl EventProducer for NullProducer {
    fn send(&self, _record: TopicRecord) -> Result<(), StoreError> {
        Ok(())
    }
}

/// The event-driven pipeline.
///
/// Records for the same key are processed in arrival order; a forwarded
/// record is handled depth-first before the next inbound one, so the
/// per-key ordering guarantee holds across internal topic hops.
pub struct StreamTopology {
    config: StoreConfig,
    sink: Arc<dyn EventSink>,
    locks: Arc<dyn LockStore>,
}

impl StreamTopology {
    pub fn new(config: StoreConfig, sink: Arc<dyn EventSink>, locks: Arc<dyn LockStore>) -> Self {
        Self {
            config,
            sink,
            locks,
        }
    }

    /// Spawns the topology loop on the current runtime.
    ///
    /// The loop drains records until every producer handle is dropped,
    /// then flushes the window a final time and exits.
    pub fn spawn(
        config: StoreConfig,
        sink: Arc<dyn EventSink>,
        locks: Arc<dyn LockStore>,
    ) -> (Arc<ChannelProducer>, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let topology = Self::new(config, sink, locks);
        let handle = tokio::spawn(topology.run(rx));
        (Arc::new(ChannelProducer { tx }), handle)
    }

    async fn run(self, mut rx: mpsc::UnboundedReceiver<TopicRecord>) {
        let mut window: HashMap<String, TopicRecord> = HashMap::new();
        let mut ticker = tokio::time::interval(self.config.window_delay());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // the first interval tick completes immediately
        ticker.tick().await;
        loop {
            tokio::select! {
                record = rx.recv() => match record {
                    Some(record) => self.dispatch(record, &mut window),
                    None => {
                        self.flush(&mut window);
                        break;
                    }
                },
                _ = ticker.tick() => self.flush(&mut window),
            }
        }
    }

    /// Routes one record to its topic handler.
    pub fn dispatch(&self, record: TopicRecord, window: &mut HashMap<String, TopicRecord>) {
        match record.topic {
            TOPIC_UPDATE => self.branch_update(record, window),
            TOPIC_DELETE => self.branch_delete(record, window),
            TOPIC_LDP_CONTAINER_ADD => self.apply_containment(record, PatchOp::Add, window),
            TOPIC_LDP_CONTAINER_DELETE => self.apply_containment(record, PatchOp::Delete, window),
            TOPIC_INBOUND_ADD => self.apply_inbound(record, PatchOp::Add),
            TOPIC_INBOUND_DELETE => self.apply_inbound(record, PatchOp::Delete),
            TOPIC_RECACHE => self.recache(record, window),
            TOPIC_EVENT => self.emit(&record.key, ActivityType::Update),
            other => warn!(topic = other, "record on unknown topic"),
        }
    }

    fn branch_update(&self, record: TopicRecord, window: &mut HashMap<String, TopicRecord>) {
        if let Some(parent) = containment_parent(&record.dataset) {
            self.dispatch(
                TopicRecord::new(TOPIC_LDP_CONTAINER_ADD, parent, record.dataset),
                window,
            );
        } else if has_inbound(&record.dataset) {
            self.dispatch(
                TopicRecord::new(TOPIC_INBOUND_ADD, record.key, record.dataset),
                window,
            );
        } else {
            self.dispatch(
                TopicRecord::new(TOPIC_RECACHE, record.key, record.dataset),
                window,
            );
        }
    }

    fn branch_delete(&self, record: TopicRecord, window: &mut HashMap<String, TopicRecord>) {
        if record.redelivered {
            // auditor copy; terminal
            debug!(key = %record.key, "dropping redelivered delete record");
            return;
        }
        if let Some(parent) = containment_parent(&record.dataset) {
            self.dispatch(
                TopicRecord::new(TOPIC_LDP_CONTAINER_DELETE, parent, record.dataset.clone()),
                window,
            );
        } else if has_inbound(&record.dataset) {
            self.dispatch(
                TopicRecord::new(
                    TOPIC_INBOUND_DELETE,
                    record.key.clone(),
                    record.dataset.clone(),
                ),
                window,
            );
        } else {
            self.emit(&record.key, ActivityType::Delete);
        }
        // residual copy for downstream auditors
        self.dispatch(record.redelivery(), window);
    }

    /// Applies a containment mutation to the parent journal, then forwards
    /// recache records for both parent and child.
    fn apply_containment(
        &self,
        record: TopicRecord,
        op: PatchOp,
        window: &mut HashMap<String, TopicRecord>,
    ) {
        let now = Utc::now();
        let mut touched: Vec<String> = Vec::new();
        for quad in record
            .dataset
            .iter()
            .filter(|q| q.predicate.as_ref() == ldp::CONTAINS)
        {
            let (Subject::NamedNode(parent), Term::NamedNode(child)) =
                (&quad.subject, &quad.object)
            else {
                continue;
            };
            let stored = Quad::new(
                parent.clone(),
                ldp::CONTAINS,
                child.clone(),
                repo::PREFER_SERVER_MANAGED,
            );
            let appended = self.append_locked(parent.as_str(), |journal| match op {
                PatchOp::Add => patch::append(journal, &[], &[stored.clone()], now),
                PatchOp::Delete => patch::append(journal, &[stored.clone()], &[], now),
            });
            if let Err(err) = appended {
                warn!(parent = %parent, %err, "containment update failed");
                continue;
            }
            for key in [parent.as_str(), child.as_str()] {
                if !touched.iter().any(|k| k == key) {
                    touched.push(key.to_string());
                }
            }
        }
        for key in touched {
            self.dispatch(
                TopicRecord::new(TOPIC_RECACHE, key, record.dataset.clone()),
                window,
            );
        }
    }

    /// Writes or removes inbound-reference quads on the target resource's
    /// journal. Terminal: nothing is forwarded.
    fn apply_inbound(&self, record: TopicRecord, op: PatchOp) {
        let now = Utc::now();
        for quad in record
            .dataset
            .iter()
            .filter(|q| vocab::graph_is(&q.graph_name, repo::INBOUND_REFERENCES))
        {
            let Term::NamedNode(target) = &quad.object else {
                continue;
            };
            let appended = self.append_locked(target.as_str(), |journal| match op {
                PatchOp::Add => patch::append(journal, &[], &[quad.clone()], now),
                PatchOp::Delete => patch::append(journal, &[quad.clone()], &[], now),
            });
            if let Err(err) = appended {
                warn!(target = %target, %err, "inbound reference update failed");
            }
        }
    }

    /// Runs a journal mutation under the per-resource lock.
    fn append_locked<F>(&self, identifier: &str, mutate: F) -> Result<(), StoreError>
    where
        F: FnOnce(&std::path::Path) -> Result<(), StoreError>,
    {
        let dir = self.config.resource_directory(identifier)?;
        let _guard = locks::acquire(
            self.locks.as_ref(),
            identifier,
            self.config.lock_timeout(),
        )?;
        std::fs::create_dir_all(&dir)?;
        mutate(&dir.join(layout::JOURNAL_FILE))
    }

    /// Admits a record to the coalescing window, keeping the first record
    /// per key. A full window is closed early rather than evicted.
    fn recache(&self, record: TopicRecord, window: &mut HashMap<String, TopicRecord>) {
        if window.len() >= self.config.kafka.window_cache_size
            && !window.contains_key(&record.key)
        {
            self.flush(window);
        }
        window.entry(record.key.clone()).or_insert(record);
    }

    /// Closes the window: one cache regeneration and one change event per
    /// coalesced key.
    pub fn flush(&self, window: &mut HashMap<String, TopicRecord>) {
        if window.is_empty() {
            return;
        }
        debug!(keys = window.len(), "closing recache window");
        for (key, _) in window.drain() {
            let identifier = match NamedNode::new(key.clone()) {
                Ok(n) => n,
                Err(_) => {
                    warn!(key = %key, "recache key is not an IRI");
                    continue;
                }
            };
            let written = self
                .config
                .resource_directory(identifier.as_str())
                .and_then(|dir| CachedResource::write(&dir, &identifier));
            match written {
                Ok(()) => self.emit(&key, ActivityType::Update),
                Err(err) => warn!(resource = %key, %err, "cache regeneration failed"),
            }
        }
    }

    fn emit(&self, key: &str, activity: ActivityType) {
        let event = ChangeEvent::new(Utc::now(), key, activity);
        if let Err(err) = self.sink.publish(&event) {
            warn!(resource = %key, %err, "failed to publish change event");
        }
    }
}

fn containment_parent(dataset: &[Quad]) -> Option<String> {
    dataset.iter().find_map(|quad| {
        if quad.predicate.as_ref() != ldp::CONTAINS {
            return None;
        }
        match &quad.subject {
            Subject::NamedNode(parent) => Some(parent.as_str().to_string()),
            _ => None,
        }
    })
}

fn has_inbound(dataset: &[Quad]) -> bool {
    dataset
        .iter()
        .any(|quad| vocab::graph_is(&quad.graph_name, repo::INBOUND_REFERENCES))
}
