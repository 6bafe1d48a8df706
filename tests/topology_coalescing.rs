// tests/topology_coalescing.rs
// Stream topology behavior: window coalescing, containment and inbound
// routing, and the delete republication contract

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use oxrdf::{NamedNode, Quad};

use ldpstore::vocab::{ldp, repo};
use ldpstore::{
    patch, ActivityType, CachedResource, EventProducer, MemoryEventSink, MemoryLockStore,
    ResourceService, StoreConfig, StreamTopology, TopicRecord, UuidSupplier, VersionedResource,
    TOPIC_DELETE, TOPIC_RECACHE, TOPIC_UPDATE,
};

fn named(iri: &str) -> NamedNode {
    NamedNode::new(iri).expect("valid IRI")
}

fn config(root: &Path) -> StoreConfig {
    let mut config = StoreConfig::single_partition("repository", root);
    config.kafka.window_delay_ms = 100;
    config
}

/// Appends a minimal journal so cache regeneration has something to read.
fn seed_journal(config: &StoreConfig, identifier: &NamedNode) {
    let dir = config
        .resource_directory(identifier.as_str())
        .expect("directory");
    std::fs::create_dir_all(&dir).expect("create dir");
    patch::append(
        &dir.join("resource.rdfp"),
        &[],
        &[Quad::new(
            identifier.clone(),
            named("http://purl.org/dc/terms/title"),
            oxrdf::Literal::new_simple_literal("seeded"),
            repo::PREFER_USER_MANAGED,
        )],
        Utc::now(),
    )
    .expect("append");
}

#[tokio::test]
async fn test_window_coalesces_to_one_cache_write() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config(dir.path());
    let identifier = named("info:trellis/repository/busy");
    seed_journal(&config, &identifier);

    let sink = Arc::new(MemoryEventSink::new());
    let (producer, handle) = StreamTopology::spawn(config.clone(), sink.clone(), Arc::new(MemoryLockStore::new()));

    for _ in 0..5 {
        producer
            .send(TopicRecord::new(
                TOPIC_RECACHE,
                identifier.as_str(),
                Vec::new(),
            ))
            .expect("send");
    }
    tokio::time::sleep(Duration::from_millis(400)).await;

    // five mutations, one window, one regeneration event
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].identifier, identifier.as_str());
    assert_eq!(events[0].activity, ActivityType::Update);

    let resource_dir = config
        .resource_directory(identifier.as_str())
        .expect("directory");
    assert!(resource_dir.join("resource.cache").is_file());

    drop(producer);
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("topology drains and exits")
        .expect("topology task completes");
}

#[tokio::test]
async fn test_distinct_keys_each_get_a_cache_write() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config(dir.path());
    let a = named("info:trellis/repository/key-a");
    let b = named("info:trellis/repository/key-b");
    seed_journal(&config, &a);
    seed_journal(&config, &b);

    let sink = Arc::new(MemoryEventSink::new());
    let (producer, _handle) = StreamTopology::spawn(config, sink.clone(), Arc::new(MemoryLockStore::new()));

    for identifier in [&a, &b, &a, &b] {
        producer
            .send(TopicRecord::new(
                TOPIC_RECACHE,
                identifier.as_str(),
                Vec::new(),
            ))
            .expect("send");
    }
    tokio::time::sleep(Duration::from_millis(400)).await;

    let events = sink.events();
    assert_eq!(events.len(), 2);
    let mut keys: Vec<&str> = events.iter().map(|e| e.identifier.as_str()).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec![a.as_str(), b.as_str()]);
}

#[tokio::test]
async fn test_update_with_containment_patches_parent_journal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config(dir.path());
    let parent = named("info:trellis/repository");
    let child = named("info:trellis/repository/new-child");
    seed_journal(&config, &parent);
    seed_journal(&config, &child);

    let sink = Arc::new(MemoryEventSink::new());
    let (producer, _handle) = StreamTopology::spawn(config.clone(), sink.clone(), Arc::new(MemoryLockStore::new()));

    let containment = Quad::new(
        parent.clone(),
        NamedNode::from(ldp::CONTAINS),
        child.clone(),
        ldp::PREFER_CONTAINMENT,
    );
    producer
        .send(TopicRecord::new(
            TOPIC_UPDATE,
            child.as_str(),
            vec![containment],
        ))
        .expect("send");
    tokio::time::sleep(Duration::from_millis(400)).await;

    let parent_dir = config
        .resource_directory(parent.as_str())
        .expect("directory");
    let view = VersionedResource::find(&parent_dir, &parent, Utc::now())
        .expect("find")
        .expect("parent present");
    assert_eq!(view.contains, vec![child.clone()]);

    // both parent and child were recached in the same window
    assert_eq!(sink.events().len(), 2);
    let cached = CachedResource::find(&parent_dir, &parent)
        .expect("find cache")
        .expect("parent cache present");
    assert_eq!(cached.contains, vec![child]);
}

#[tokio::test]
async fn test_update_with_inbound_reference_is_terminal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config(dir.path());
    let source = named("info:trellis/repository/citing");
    let target = named("info:trellis/repository/cited");
    seed_journal(&config, &target);

    let sink = Arc::new(MemoryEventSink::new());
    let (producer, _handle) = StreamTopology::spawn(config.clone(), sink.clone(), Arc::new(MemoryLockStore::new()));

    let reference = Quad::new(
        source.clone(),
        named("http://purl.org/dc/terms/relation"),
        target.clone(),
        repo::INBOUND_REFERENCES,
    );
    producer
        .send(TopicRecord::new(
            TOPIC_UPDATE,
            source.as_str(),
            vec![reference.clone()],
        ))
        .expect("send");
    tokio::time::sleep(Duration::from_millis(400)).await;

    // the reference landed on the target's journal
    let target_dir = config
        .resource_directory(target.as_str())
        .expect("directory");
    let view = VersionedResource::find(&target_dir, &target, Utc::now())
        .expect("find")
        .expect("target present");
    assert!(view.quads().contains(&reference));

    // terminal leg: no recache event was emitted
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn test_async_service_defers_cache_to_topology() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config(dir.path());
    config.async_cache = true;

    let topology_sink = Arc::new(MemoryEventSink::new());
    let locks: Arc<MemoryLockStore> = Arc::new(MemoryLockStore::new());
    let (producer, _handle) =
        StreamTopology::spawn(config.clone(), topology_sink.clone(), locks.clone());
    let service = ResourceService::new(
        config.clone(),
        locks,
        Arc::new(MemoryEventSink::new()),
        Arc::new(UuidSupplier),
        producer,
    )
    .expect("service construction");

    let identifier = named("info:trellis/repository/deferred");
    service
        .write(
            &identifier,
            &[],
            &[Quad::new(
                identifier.clone(),
                named("http://purl.org/dc/terms/title"),
                oxrdf::Literal::new_simple_literal("deferred"),
                repo::PREFER_USER_MANAGED,
            )],
            Utc::now(),
        )
        .expect("write");

    let resource_dir = config
        .resource_directory(identifier.as_str())
        .expect("directory");
    // async mode: the journal is written but the cache waits for the window
    assert!(resource_dir.join("resource.rdfp").is_file());
    assert!(!resource_dir.join("resource.cache").is_file());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(resource_dir.join("resource.cache").is_file());
    let events = topology_sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].identifier, identifier.as_str());
}

#[tokio::test]
async fn test_delete_republication_terminates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config(dir.path());
    let identifier = named("info:trellis/repository/gone");

    let sink = Arc::new(MemoryEventSink::new());
    let (producer, handle) = StreamTopology::spawn(config, sink.clone(), Arc::new(MemoryLockStore::new()));

    producer
        .send(TopicRecord::new(
            TOPIC_DELETE,
            identifier.as_str(),
            Vec::new(),
        ))
        .expect("send");
    tokio::time::sleep(Duration::from_millis(300)).await;

    // the residual leg emitted exactly one delete event; the republished
    // auditor copy did not loop
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].activity, ActivityType::Delete);

    // the loop is still healthy afterwards
    producer
        .send(TopicRecord::new(
            TOPIC_DELETE,
            identifier.as_str(),
            Vec::new(),
        ))
        .expect("send");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(sink.events().len(), 2);

    drop(producer);
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("topology drains and exits")
        .expect("topology task completes");
}
