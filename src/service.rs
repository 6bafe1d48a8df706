// src/service.rs
// Resource service façade over the journal, cache, and event pipeline

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use oxrdf::{BlankNode, GraphName, NamedNode, Quad, Subject, Term};
use tracing::{debug, info, warn};

use crate::cached::CachedResource;
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::events::{ActivityType, ChangeEvent, EventSink, IdentifierSupplier};
use crate::init;
use crate::layout;
use crate::locks::{self, LockStore};
use crate::model::Resource;
use crate::patch::{self, PatchOp};
use crate::topology::{EventProducer, TopicRecord, TOPIC_RECACHE};
use crate::versioned::VersionedResource;
use crate::vocab::{self, dc, repo};

/// The public façade of the storage engine.
///
/// Thread-safe; mutating operations serialize per resource through the
/// cross-process lock store. Read paths are lock-free and tolerate torn
/// journal tails.
pub struct ResourceService {
    config: StoreConfig,
    locks: Arc<dyn LockStore>,
    events: Arc<dyn EventSink>,
    ids: Arc<dyn IdentifierSupplier>,
    producer: Arc<dyn EventProducer>,
}

impl ResourceService {
    /// Builds the service, validating every configured partition and
    /// idempotently initializing each partition root.
    ///
    /// Fails when a partition root cannot be created or is not writable.
    pub fn new(
        config: StoreConfig,
        locks: Arc<dyn LockStore>,
        events: Arc<dyn EventSink>,
        ids: Arc<dyn IdentifierSupplier>,
        producer: Arc<dyn EventProducer>,
    ) -> Result<Self, StoreError> {
        if config.partitions.is_empty() {
            return Err(StoreError::Config("no partitions configured".to_string()));
        }
        for (name, root) in &config.partitions {
            fs::create_dir_all(root)?;
            if fs::metadata(root)?.permissions().readonly() {
                return Err(StoreError::Config(format!(
                    "partition {name} is not writable: {}",
                    root.display()
                )));
            }
            let root_iri =
                NamedNode::new_unchecked(format!("{}{name}", layout::IDENTIFIER_PREFIX));
            let dir = layout::resource_directory(root, root_iri.as_str());
            if init::initialize_root(&dir, &root_iri, ids.as_ref(), Utc::now())? {
                info!(partition = %name, root = %root_iri, "created partition root");
            }
        }
        Ok(Self {
            config,
            locks,
            events,
            ids,
            producer,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the latest view of a resource: the cached snapshot when
    /// present, else the versioned view at the current instant.
    pub fn get(&self, identifier: &NamedNode) -> Result<Option<Resource>, StoreError> {
        let dir = self.config.resource_directory(identifier.as_str())?;
        if let Some(resource) = CachedResource::find(&dir, identifier)? {
            return Ok(Some(resource));
        }
        VersionedResource::find(&dir, identifier, Utc::now())
    }

    /// Returns the versioned view of a resource at the given instant.
    pub fn get_at(
        &self,
        identifier: &NamedNode,
        time: DateTime<Utc>,
    ) -> Result<Option<Resource>, StoreError> {
        let dir = self.config.resource_directory(identifier.as_str())?;
        VersionedResource::find(&dir, identifier, time)
    }

    /// Appends one journal block for the resource.
    ///
    /// Runs under the per-resource lock. Blank nodes in the additions are
    /// skolemized and default-graph quads land in the user-managed context.
    /// In synchronous mode the cache is regenerated before returning;
    /// otherwise a recache record is enqueued. A change event is published
    /// either way; publish failures are logged and never roll back the
    /// journal append.
    pub fn write(
        &self,
        identifier: &NamedNode,
        delete: &[Quad],
        add: &[Quad],
        time: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let dir = self.config.resource_directory(identifier.as_str())?;
        let _guard = locks::acquire(
            self.locks.as_ref(),
            identifier.as_str(),
            self.config.lock_timeout(),
        )?;

        fs::create_dir_all(&dir)?;
        let journal = dir.join(layout::JOURNAL_FILE);
        let existed = journal.is_file();

        let add = self.normalize(add, true);
        let delete = self.normalize(delete, false);
        patch::append(&journal, &delete, &add, time)?;
        debug!(resource = %identifier, deletes = delete.len(), adds = add.len(), "appended journal block");

        if self.config.async_cache {
            let record = TopicRecord::new(TOPIC_RECACHE, identifier.as_str(), add.clone());
            if let Err(err) = self.producer.send(record) {
                warn!(resource = %identifier, %err, "failed to enqueue recache record");
            }
        } else if let Err(err) = CachedResource::write(&dir, identifier) {
            // recoverable: the next read falls back to journal replay
            warn!(resource = %identifier, %err, "cache regeneration failed");
        }

        let activity = if !existed {
            ActivityType::Create
        } else if add.iter().any(is_tombstone) {
            ActivityType::Delete
        } else {
            ActivityType::Update
        };
        let event = ChangeEvent::new(time, identifier.as_str(), activity);
        if let Err(err) = self.events.publish(&event) {
            warn!(resource = %identifier, %err, "failed to publish change event");
        }
        Ok(())
    }

    /// Records a resource deletion: one block removing the current
    /// user-managed projection and adding the tombstone type.
    pub fn delete(&self, identifier: &NamedNode, time: DateTime<Utc>) -> Result<(), StoreError> {
        let dir = self.config.resource_directory(identifier.as_str())?;
        let remove = match VersionedResource::find(&dir, identifier, time)? {
            Some(resource) => resource
                .stream(&[crate::model::TripleContext::UserManaged])
                .collect(),
            None => Vec::new(),
        };
        let tombstone = Quad::new(
            identifier.clone(),
            oxrdf::vocab::rdf::TYPE,
            repo::DELETED_RESOURCE,
            repo::PREFER_SERVER_MANAGED,
        );
        self.write(identifier, &remove, &[tombstone], time)
    }

    /// Removes the journal and every derived artifact for the resource.
    ///
    /// Returns the binary datastream IRIs referenced anywhere in the
    /// journal history so the caller may reclaim them.
    pub fn purge(&self, identifier: &NamedNode) -> Result<Vec<NamedNode>, StoreError> {
        let dir = self.config.resource_directory(identifier.as_str())?;
        let _guard = locks::acquire(
            self.locks.as_ref(),
            identifier.as_str(),
            self.config.lock_timeout(),
        )?;

        let journal = dir.join(layout::JOURNAL_FILE);
        let mut binaries: Vec<NamedNode> = Vec::new();
        if journal.is_file() {
            for block in patch::blocks(&journal)? {
                let block = block?;
                for (op, quad) in block.ops {
                    if op != PatchOp::Add
                        || quad.predicate.as_ref() != dc::HAS_PART
                        || !vocab::graph_is(&quad.graph_name, repo::PREFER_SERVER_MANAGED)
                    {
                        continue;
                    }
                    if !matches!(&quad.subject, Subject::NamedNode(n) if n == identifier) {
                        continue;
                    }
                    if let Term::NamedNode(binary) = quad.object {
                        if !binaries.contains(&binary) {
                            binaries.push(binary);
                        }
                    }
                }
            }
        }

        for name in [
            layout::JOURNAL_FILE,
            layout::CACHE_FILE,
            layout::QUADS_FILE,
            layout::MEMENTO_FILE,
        ] {
            match fs::remove_file(dir.join(name)) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        if let Err(err) = fs::remove_dir(&dir) {
            warn!(resource = %identifier, %err, "could not remove resource directory");
        }

        let event = ChangeEvent::new(Utc::now(), identifier.as_str(), ActivityType::Delete);
        if let Err(err) = self.events.publish(&event) {
            warn!(resource = %identifier, %err, "failed to publish change event");
        }
        info!(resource = %identifier, binaries = binaries.len(), "purged resource");
        Ok(binaries)
    }

    /// Walks a partition for materialized resources, yielding each cached
    /// `(identifier, ldp-type)` pair.
    pub fn list(&self, partition: &str) -> Result<Vec<(NamedNode, NamedNode)>, StoreError> {
        let root = self
            .config
            .partitions
            .get(partition)
            .ok_or_else(|| StoreError::Config(format!("unknown partition: {partition}")))?;
        let mut out = Vec::new();
        walk_caches(root, &mut out)?;
        Ok(out)
    }

    /// Journal compaction is reserved.
    pub fn compact(&self, _identifier: &NamedNode) -> Result<(), StoreError> {
        Err(StoreError::Unsupported("compact"))
    }

    /// Skolemizes blank nodes (additions only) and maps default-graph
    /// quads into the user-managed context.
    fn normalize(&self, quads: &[Quad], skolemize: bool) -> Vec<Quad> {
        let mut minted: HashMap<String, NamedNode> = HashMap::new();
        quads
            .iter()
            .map(|quad| {
                let mut quad = quad.clone();
                if quad.graph_name == GraphName::DefaultGraph {
                    quad.graph_name = GraphName::NamedNode(repo::PREFER_USER_MANAGED.into());
                }
                if !skolemize {
                    return quad;
                }
                quad.subject = match quad.subject {
                    Subject::BlankNode(b) => Subject::NamedNode(self.mint(&mut minted, &b)),
                    other => other,
                };
                quad.object = match quad.object {
                    Term::BlankNode(b) => Term::NamedNode(self.mint(&mut minted, &b)),
                    other => other,
                };
                quad
            })
            .collect()
    }

    fn mint(&self, minted: &mut HashMap<String, NamedNode>, node: &BlankNode) -> NamedNode {
        minted
            .entry(node.as_str().to_string())
            .or_insert_with(|| init::skolemize(self.ids.as_ref()))
            .clone()
    }
}

fn walk_caches(dir: &Path, out: &mut Vec<(NamedNode, NamedNode)>) -> Result<(), StoreError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk_caches(&path, out)?;
        } else if entry.file_name() == layout::CACHE_FILE {
            let parent = match path.parent() {
                Some(p) => p,
                None => continue,
            };
            let Some(header) = CachedResource::read_header(parent)? else {
                continue;
            };
            match (NamedNode::new(&*header.id), NamedNode::new(&*header.ldp_type)) {
                (Ok(id), Ok(ldp_type)) => out.push((id, ldp_type)),
                _ => warn!(cache = %path.display(), "skipping cache with bad header IRIs"),
            }
        }
    }
    Ok(())
}

fn is_tombstone(quad: &Quad) -> bool {
    quad.predicate.as_ref() == oxrdf::vocab::rdf::TYPE
        && quad.object == Term::from(repo::DELETED_RESOURCE)
        && vocab::graph_is(&quad.graph_name, repo::PREFER_SERVER_MANAGED)
}
