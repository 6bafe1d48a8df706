// src/model.rs
// Resource record, triple contexts, and attribute derivation

use chrono::{DateTime, Utc};
use oxrdf::{GraphName, NamedNode, NamedNodeRef, Quad, Subject, Term};
use serde::{Deserialize, Serialize};

use crate::vocab::{self, acl, dc, ldp, oa, repo};

/// One historical snapshot boundary: `[from, until)`. The final range of a
/// journal is open (`until` is `None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRange {
    pub from: DateTime<Utc>,
    pub until: Option<DateTime<Utc>>,
}

/// Binary datastream attributes of a non-RDF source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datastream {
    pub location: NamedNode,
    pub format: Option<String>,
    pub size: Option<u64>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// The semantic context a triple belongs to.
///
/// The first five are stored graphs; `Containment` and `Membership` are
/// synthesized from server-managed state on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TripleContext {
    UserManaged,
    ServerManaged,
    AccessControl,
    Audit,
    Containment,
    Membership,
    Inbound,
}

impl TripleContext {
    /// The named graph backing this context, if it is a stored one.
    pub fn graph(&self) -> Option<NamedNodeRef<'static>> {
        match self {
            TripleContext::UserManaged => Some(repo::PREFER_USER_MANAGED),
            TripleContext::ServerManaged => Some(repo::PREFER_SERVER_MANAGED),
            TripleContext::AccessControl => Some(repo::PREFER_ACCESS_CONTROL),
            TripleContext::Audit => Some(repo::PREFER_AUDIT),
            TripleContext::Inbound => Some(repo::INBOUND_REFERENCES),
            TripleContext::Containment | TripleContext::Membership => None,
        }
    }
}

/// A single resource view.
///
/// One record covers every interaction model; behavior that used to hang
/// off a subtype hierarchy is a conditional on `interaction_model`.
#[derive(Debug, Clone)]
pub struct Resource {
    pub identifier: NamedNode,
    pub interaction_model: NamedNode,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub types: Vec<NamedNode>,
    pub inbox: Option<NamedNode>,
    pub acl: Option<NamedNode>,
    pub membership_resource: Option<NamedNode>,
    pub has_member_relation: Option<NamedNode>,
    pub is_member_of_relation: Option<NamedNode>,
    pub inserted_content_relation: Option<NamedNode>,
    pub annotation_service: Option<NamedNode>,
    pub creator: Option<NamedNode>,
    pub contains: Vec<NamedNode>,
    pub mementos: Vec<VersionRange>,
    pub is_memento: bool,
    pub is_page: bool,
    pub next: Option<NamedNode>,
    pub is_deleted: bool,
    pub datastream: Option<Datastream>,
    quads: Vec<Quad>,
}

impl Resource {
    /// Builds a resource view by scanning a projected quad set for the
    /// well-known predicates.
    pub fn from_quads(
        identifier: NamedNode,
        quads: Vec<Quad>,
        created: DateTime<Utc>,
        modified: DateTime<Utc>,
        mementos: Vec<VersionRange>,
        is_memento: bool,
    ) -> Self {
        let mut derived = Derivation::default();
        for quad in &quads {
            derived.scan(&identifier, quad);
        }
        let datastream = derived.binary.map(|location| {
            let mut format = None;
            let mut size = None;
            for quad in &quads {
                if !vocab::graph_is(&quad.graph_name, repo::PREFER_SERVER_MANAGED) {
                    continue;
                }
                if !matches!(&quad.subject, Subject::NamedNode(n) if *n == location) {
                    continue;
                }
                if let Term::Literal(value) = &quad.object {
                    if quad.predicate.as_ref() == dc::FORMAT {
                        format = Some(value.value().to_string());
                    } else if quad.predicate.as_ref() == dc::EXTENT {
                        size = value.value().parse::<u64>().ok();
                    }
                }
            }
            Datastream {
                location,
                format,
                size,
                created,
                modified,
            }
        });
        Resource {
            identifier,
            interaction_model: derived
                .interaction_model
                .unwrap_or_else(|| ldp::RDF_SOURCE.into()),
            created,
            modified,
            types: derived.types,
            inbox: derived.inbox,
            acl: derived.acl,
            membership_resource: derived.membership_resource,
            has_member_relation: derived.has_member_relation,
            is_member_of_relation: derived.is_member_of_relation,
            inserted_content_relation: derived.inserted_content_relation,
            annotation_service: derived.annotation_service,
            creator: derived.creator,
            contains: derived.contains,
            mementos,
            is_memento,
            is_page: false,
            next: None,
            is_deleted: derived.is_deleted,
            datastream,
            quads,
        }
    }

    /// The raw projected quad set backing this view.
    pub fn quads(&self) -> &[Quad] {
        &self.quads
    }

    /// Streams the triples of the requested contexts.
    ///
    /// Stored contexts filter the projection by graph; containment and
    /// membership are synthesized from server-managed state. The sequence
    /// is single-pass; collect first to iterate twice.
    pub fn stream(&self, contexts: &[TripleContext]) -> impl Iterator<Item = Quad> + '_ {
        let mut out = Vec::new();
        for context in contexts {
            match context {
                TripleContext::Containment => {
                    for child in &self.contains {
                        out.push(Quad::new(
                            self.identifier.clone(),
                            NamedNode::from(ldp::CONTAINS),
                            child.clone(),
                            NamedNode::from(ldp::PREFER_CONTAINMENT),
                        ));
                    }
                }
                TripleContext::Membership => {
                    if let (Some(target), Some(relation)) =
                        (&self.membership_resource, &self.has_member_relation)
                    {
                        for child in &self.contains {
                            out.push(Quad::new(
                                target.clone(),
                                relation.clone(),
                                child.clone(),
                                NamedNode::from(ldp::PREFER_MEMBERSHIP),
                            ));
                        }
                    }
                    if let (Some(target), Some(relation)) =
                        (&self.membership_resource, &self.is_member_of_relation)
                    {
                        for child in &self.contains {
                            out.push(Quad::new(
                                child.clone(),
                                relation.clone(),
                                target.clone(),
                                NamedNode::from(ldp::PREFER_MEMBERSHIP),
                            ));
                        }
                    }
                }
                stored => {
                    if let Some(graph) = stored.graph() {
                        out.extend(
                            self.quads
                                .iter()
                                .filter(|q| {
                                    vocab::graph_is(&q.graph_name, graph)
                                        || (*stored == TripleContext::UserManaged
                                            && q.graph_name == GraphName::DefaultGraph)
                                })
                                .cloned(),
                        );
                    }
                }
            }
        }
        out.into_iter()
    }
}

#[derive(Default)]
struct Derivation {
    interaction_model: Option<NamedNode>,
    types: Vec<NamedNode>,
    contains: Vec<NamedNode>,
    inbox: Option<NamedNode>,
    acl: Option<NamedNode>,
    membership_resource: Option<NamedNode>,
    has_member_relation: Option<NamedNode>,
    is_member_of_relation: Option<NamedNode>,
    inserted_content_relation: Option<NamedNode>,
    annotation_service: Option<NamedNode>,
    creator: Option<NamedNode>,
    is_deleted: bool,
    binary: Option<NamedNode>,
}

impl Derivation {
    fn scan(&mut self, identifier: &NamedNode, quad: &Quad) {
        let about_self = matches!(&quad.subject, Subject::NamedNode(n) if n == identifier);
        let server = vocab::graph_is(&quad.graph_name, repo::PREFER_SERVER_MANAGED);
        let user = vocab::graph_is(&quad.graph_name, repo::PREFER_USER_MANAGED)
            || quad.graph_name == GraphName::DefaultGraph;
        if !about_self || !(server || user) {
            return;
        }
        let object_node = match &quad.object {
            Term::NamedNode(n) => Some(n),
            _ => None,
        };
        if quad.predicate.as_ref() == oxrdf::vocab::rdf::TYPE {
            if let Some(node) = object_node {
                if server {
                    if node.as_ref() == repo::DELETED_RESOURCE {
                        self.is_deleted = true;
                    } else if node.as_str().starts_with("http://www.w3.org/ns/ldp#") {
                        self.interaction_model = Some(node.clone());
                    }
                } else {
                    self.types.push(node.clone());
                }
            }
            return;
        }
        let Some(node) = object_node else { return };
        if quad.predicate.as_ref() == ldp::CONTAINS {
            if server {
                self.contains.push(node.clone());
            }
        } else if quad.predicate.as_ref() == dc::HAS_PART {
            if server {
                self.binary = Some(node.clone());
            }
        } else if quad.predicate.as_ref() == ldp::INBOX {
            self.inbox = Some(node.clone());
        } else if quad.predicate.as_ref() == acl::ACCESS_CONTROL {
            self.acl = Some(node.clone());
        } else if quad.predicate.as_ref() == ldp::MEMBERSHIP_RESOURCE {
            self.membership_resource = Some(node.clone());
        } else if quad.predicate.as_ref() == ldp::HAS_MEMBER_RELATION {
            self.has_member_relation = Some(node.clone());
        } else if quad.predicate.as_ref() == ldp::IS_MEMBER_OF_RELATION {
            self.is_member_of_relation = Some(node.clone());
        } else if quad.predicate.as_ref() == ldp::INSERTED_CONTENT_RELATION {
            self.inserted_content_relation = Some(node.clone());
        } else if quad.predicate.as_ref() == oa::ANNOTATION_SERVICE {
            self.annotation_service = Some(node.clone());
        } else if quad.predicate.as_ref() == dc::CREATOR {
            self.creator = Some(node.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    use super::*;
    use chrono::TimeZone;

    fn named(iri: &str) -> NamedNode {
        NamedNode::new(iri).expect("valid IRI")
    }

    fn at(year: i32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single().expect("valid date")
    }

    fn build(quads: Vec<Quad>) -> Resource {
        Resource::from_quads(
            named("info:trellis/resource"),
            quads,
            at(2020),
            at(2021),
            Vec::new(),
            false,
        )
    }

    #[test]
    fn test_interaction_model_from_server_managed_type() {
        let resource = build(vec![Quad::new(
            named("info:trellis/resource"),
            NamedNode::from(oxrdf::vocab::rdf::TYPE),
            NamedNode::from(ldp::CONTAINER),
            repo::PREFER_SERVER_MANAGED,
        )]);
        assert_eq!(resource.interaction_model.as_ref(), ldp::CONTAINER);
        assert!(resource.types.is_empty());
    }

    #[test]
    fn test_default_interaction_model_is_rdf_source() {
        let resource = build(Vec::new());
        assert_eq!(resource.interaction_model.as_ref(), ldp::RDF_SOURCE);
    }

    #[test]
    fn test_user_managed_types_and_attributes() {
        let resource = build(vec![
            Quad::new(
                named("info:trellis/resource"),
                NamedNode::from(oxrdf::vocab::rdf::TYPE),
                named("http://www.w3.org/2004/02/skos/core#Concept"),
                repo::PREFER_USER_MANAGED,
            ),
            Quad::new(
                named("info:trellis/resource"),
                NamedNode::from(ldp::INBOX),
                named("info:trellis/inbox"),
                repo::PREFER_USER_MANAGED,
            ),
            Quad::new(
                named("info:trellis/resource"),
                NamedNode::from(dc::CREATOR),
                named("info:trellis/users/alice"),
                repo::PREFER_USER_MANAGED,
            ),
        ]);
        assert_eq!(resource.types.len(), 1);
        assert_eq!(resource.inbox, Some(named("info:trellis/inbox")));
        assert_eq!(resource.creator, Some(named("info:trellis/users/alice")));
    }

    #[test]
    fn test_containment_is_derived_and_synthesized() {
        let resource = build(vec![
            Quad::new(
                named("info:trellis/resource"),
                NamedNode::from(ldp::CONTAINS),
                named("info:trellis/resource/child"),
                repo::PREFER_SERVER_MANAGED,
            ),
            Quad::new(
                named("info:trellis/resource"),
                NamedNode::from(ldp::CONTAINS),
                named("info:trellis/resource/other"),
                repo::PREFER_SERVER_MANAGED,
            ),
        ]);
        assert_eq!(resource.contains.len(), 2);
        let synthesized: Vec<Quad> = resource.stream(&[TripleContext::Containment]).collect();
        assert_eq!(synthesized.len(), 2);
        assert!(synthesized
            .iter()
            .all(|q| vocab::graph_is(&q.graph_name, ldp::PREFER_CONTAINMENT)));
    }

    #[test]
    fn test_membership_synthesis_uses_member_relations() {
        let resource = build(vec![
            Quad::new(
                named("info:trellis/resource"),
                NamedNode::from(ldp::MEMBERSHIP_RESOURCE),
                named("info:trellis/members"),
                repo::PREFER_USER_MANAGED,
            ),
            Quad::new(
                named("info:trellis/resource"),
                NamedNode::from(ldp::HAS_MEMBER_RELATION),
                named("http://purl.org/dc/terms/hasPart"),
                repo::PREFER_USER_MANAGED,
            ),
            Quad::new(
                named("info:trellis/resource"),
                NamedNode::from(ldp::CONTAINS),
                named("info:trellis/resource/child"),
                repo::PREFER_SERVER_MANAGED,
            ),
        ]);
        let membership: Vec<Quad> = resource.stream(&[TripleContext::Membership]).collect();
        assert_eq!(membership.len(), 1);
        assert_eq!(
            membership[0].subject,
            Subject::from(named("info:trellis/members"))
        );
    }

    #[test]
    fn test_deleted_tombstone_sets_flag() {
        let resource = build(vec![Quad::new(
            named("info:trellis/resource"),
            NamedNode::from(oxrdf::vocab::rdf::TYPE),
            NamedNode::from(repo::DELETED_RESOURCE),
            repo::PREFER_SERVER_MANAGED,
        )]);
        assert!(resource.is_deleted);
        assert_eq!(resource.interaction_model.as_ref(), ldp::RDF_SOURCE);
    }

    #[test]
    fn test_datastream_from_has_part() {
        let resource = build(vec![
            Quad::new(
                named("info:trellis/resource"),
                NamedNode::from(dc::HAS_PART),
                named("file:///data/blob0001"),
                repo::PREFER_SERVER_MANAGED,
            ),
            Quad::new(
                named("file:///data/blob0001"),
                NamedNode::from(dc::FORMAT),
                oxrdf::Literal::new_simple_literal("image/tiff"),
                repo::PREFER_SERVER_MANAGED,
            ),
            Quad::new(
                named("file:///data/blob0001"),
                NamedNode::from(dc::EXTENT),
                oxrdf::Literal::new_typed_literal("4096", oxrdf::vocab::xsd::LONG),
                repo::PREFER_SERVER_MANAGED,
            ),
        ]);
        let datastream = resource.datastream.expect("datastream present");
        assert_eq!(datastream.location, named("file:///data/blob0001"));
        assert_eq!(datastream.format.as_deref(), Some("image/tiff"));
        assert_eq!(datastream.size, Some(4096));
    }

    #[test]
    fn test_stream_filters_stored_contexts() {
        let user = Quad::new(
            named("info:trellis/resource"),
            named("http://purl.org/dc/terms/title"),
            oxrdf::Literal::new_simple_literal("title"),
            repo::PREFER_USER_MANAGED,
        );
        let audit = Quad::new(
            named("info:trellis/resource"),
            NamedNode::from(oxrdf::vocab::rdf::TYPE),
            NamedNode::from(crate::vocab::prov::ACTIVITY),
            repo::PREFER_AUDIT,
        );
        let resource = build(vec![user.clone(), audit.clone()]);
        let streamed: Vec<Quad> = resource.stream(&[TripleContext::UserManaged]).collect();
        assert_eq!(streamed, vec![user]);
        let audited: Vec<Quad> = resource.stream(&[TripleContext::Audit]).collect();
        assert_eq!(audited, vec![audit]);
    }
}
