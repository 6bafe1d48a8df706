// tests/journal_replay.rs
// Seeded journal scenarios: a hand-written patch log replayed at several
// instants, plus write-then-read at the same instant

use chrono::{DateTime, Utc};
use oxrdf::{NamedNode, Quad, Term};
use tempfile::TempDir;

use ldpstore::patch;
use ldpstore::vocab::repo;

const USER: &str = "http://www.trellisldp.org/ns/trellis#PreferUserManaged";

const JOURNAL: &str = r#"
A <http://www.trellisldp.org/ns/trellis#PreferUserManaged> <info:trellis/resource> <http://purl.org/dc/terms/title> "A title" .
A <http://www.trellisldp.org/ns/trellis#PreferUserManaged> <info:trellis/resource> <http://purl.org/dc/terms/description> "A description" .
A <http://www.trellisldp.org/ns/trellis#PreferUserManaged> <info:trellis/resource> <http://purl.org/dc/terms/subject> <http://example.org/subject/1> .
A <http://www.trellisldp.org/ns/trellis#PreferUserManaged> <info:trellis/resource> <http://purl.org/dc/terms/subject> <http://example.org/subject/2> .
A <http://www.trellisldp.org/ns/trellis#PreferUserManaged> <info:trellis/resource> <http://purl.org/dc/terms/isPartOf> <info:trellis/collection> .
END 2017-01-10T05:00:00Z .
A <http://www.trellisldp.org/ns/trellis#PreferUserManaged> <info:trellis/resource> <http://purl.org/dc/terms/extent> "1 item" .
A <http://www.trellisldp.org/ns/trellis#PreferUserManaged> <info:trellis/resource> <http://purl.org/dc/terms/spatial> <http://example.org/place/Somewhere> .
END 2017-01-20T05:00:00Z .
D <http://www.trellisldp.org/ns/trellis#PreferUserManaged> <info:trellis/resource> <http://purl.org/dc/terms/title> "A title" .
D <http://www.trellisldp.org/ns/trellis#PreferUserManaged> <info:trellis/resource> <http://purl.org/dc/terms/description> "A description" .
D <http://www.trellisldp.org/ns/trellis#PreferUserManaged> <info:trellis/resource> <http://purl.org/dc/terms/extent> "1 item" .
D <http://www.trellisldp.org/ns/trellis#PreferUserManaged> <info:trellis/resource> <http://purl.org/dc/terms/spatial> <http://example.org/place/Somewhere> .
D <http://www.trellisldp.org/ns/trellis#PreferUserManaged> <info:trellis/resource> <http://purl.org/dc/terms/subject> <http://example.org/subject/1> .
A <http://www.trellisldp.org/ns/trellis#PreferUserManaged> <info:trellis/resource> <http://www.w3.org/2004/02/skos/core#prefLabel> "A preferred label" .
END 2017-02-01T05:00:00Z .
D <http://www.trellisldp.org/ns/trellis#PreferUserManaged> <info:trellis/resource> <http://purl.org/dc/terms/subject> <http://example.org/subject/2> .
END 2017-02-10T05:00:00Z .
END 2017-02-11T02:51:35Z .
"#;

fn seeded_journal() -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("resource.rdfp");
    std::fs::write(&path, JOURNAL.trim_start()).expect("write journal");
    (dir, path)
}

fn instant(text: &str) -> DateTime<Utc> {
    patch::parse_instant(text).expect("valid instant")
}

fn count_predicate(quads: &[Quad], predicate: &str) -> usize {
    let predicate = NamedNode::new(predicate).expect("valid IRI");
    quads.iter().filter(|q| q.predicate == predicate).count()
}

#[test]
fn test_replay_at_final_instant() {
    let (_dir, journal) = seeded_journal();
    let projection =
        patch::replay(&journal, instant("2017-02-11T02:51:35Z")).expect("replay");
    assert_eq!(projection.quads.len(), 2);
    assert_eq!(
        count_predicate(
            &projection.quads,
            "http://www.w3.org/2004/02/skos/core#prefLabel"
        ),
        1
    );
    assert_eq!(
        projection.modified,
        Some(instant("2017-02-11T02:51:35Z"))
    );
}

#[test]
fn test_replay_early_february() {
    let (_dir, journal) = seeded_journal();
    let projection =
        patch::replay(&journal, instant("2017-02-09T02:51:35Z")).expect("replay");
    assert_eq!(projection.quads.len(), 3);
    assert_eq!(
        count_predicate(
            &projection.quads,
            "http://www.w3.org/2004/02/skos/core#prefLabel"
        ),
        1
    );
    assert_eq!(
        count_predicate(&projection.quads, "http://purl.org/dc/terms/isPartOf"),
        1
    );
}

#[test]
fn test_replay_late_january() {
    let (_dir, journal) = seeded_journal();
    let projection =
        patch::replay(&journal, instant("2017-01-30T02:51:35Z")).expect("replay");
    assert_eq!(projection.quads.len(), 7);
    assert_eq!(
        count_predicate(
            &projection.quads,
            "http://www.w3.org/2004/02/skos/core#prefLabel"
        ),
        0
    );
    assert_eq!(
        count_predicate(&projection.quads, "http://purl.org/dc/terms/subject"),
        2
    );
}

#[test]
fn test_replay_mid_january() {
    let (_dir, journal) = seeded_journal();
    let projection =
        patch::replay(&journal, instant("2017-01-15T09:14:00Z")).expect("replay");
    assert_eq!(projection.quads.len(), 5);
    assert_eq!(
        count_predicate(&projection.quads, "http://purl.org/dc/terms/extent"),
        0
    );
    assert_eq!(
        count_predicate(&projection.quads, "http://purl.org/dc/terms/spatial"),
        0
    );
    assert_eq!(
        count_predicate(&projection.quads, "http://purl.org/dc/terms/title"),
        1
    );
    assert_eq!(
        count_predicate(&projection.quads, "http://purl.org/dc/terms/description"),
        1
    );
    assert_eq!(
        count_predicate(&projection.quads, "http://purl.org/dc/terms/subject"),
        2
    );
}

#[test]
fn test_write_then_replay_at_same_instant() {
    let dir = tempfile::tempdir().expect("tempdir");
    let journal = dir.path().join("resource.rdfp");
    let now = Utc::now();
    let added = vec![
        Quad::new(
            NamedNode::new("info:trellis/fresh").expect("valid IRI"),
            NamedNode::new("http://purl.org/dc/terms/title").expect("valid IRI"),
            Term::from(oxrdf::Literal::new_simple_literal("fresh resource")),
            repo::PREFER_USER_MANAGED,
        ),
        Quad::new(
            NamedNode::new("info:trellis/fresh").expect("valid IRI"),
            NamedNode::new("http://purl.org/dc/terms/isPartOf").expect("valid IRI"),
            NamedNode::new("info:trellis/collection").expect("valid IRI"),
            repo::PREFER_USER_MANAGED,
        ),
    ];
    patch::append(&journal, &[], &added, now).expect("append");

    let projection = patch::replay(&journal, now).expect("replay");
    assert_eq!(projection.quads.len(), 2);
    for quad in &added {
        assert!(projection.quads.contains(quad));
    }
}

#[test]
fn test_memento_ranges_cover_all_block_instants() {
    let (_dir, journal) = seeded_journal();
    let ranges = patch::mementos(&journal).expect("mementos");
    assert_eq!(ranges.len(), 5);
    assert_eq!(ranges[0].from, instant("2017-01-10T05:00:00Z"));
    assert_eq!(ranges[0].until, Some(instant("2017-01-20T05:00:00Z")));
    assert_eq!(ranges[3].from, instant("2017-02-10T05:00:00Z"));
    assert_eq!(ranges[3].until, Some(instant("2017-02-11T02:51:35Z")));
    assert_eq!(ranges[4].from, instant("2017-02-11T02:51:35Z"));
    assert_eq!(ranges[4].until, None);
}

#[test]
fn test_projection_is_monotone_through_the_log() {
    // replay(t1) minus the deletions in (t1, t2] is a subset of replay(t2)
    let (_dir, journal) = seeded_journal();
    let early = patch::replay(&journal, instant("2017-01-15T00:00:00Z")).expect("replay");
    let late = patch::replay(&journal, instant("2017-01-30T00:00:00Z")).expect("replay");
    for quad in &early.quads {
        assert!(
            late.quads.contains(quad),
            "no deletions between the instants, so {quad} must survive"
        );
    }
    let user_graph = oxrdf::GraphName::from(NamedNode::new(USER).expect("valid IRI"));
    assert!(late.quads.iter().all(|q| q.graph_name == user_graph));
}
