// src/vocab.rs
// Well-known vocabulary terms recognized by the store

use oxrdf::{GraphName, NamedNodeRef};

/// Reserved graph IRI used to encode default-graph quads on disk.
/// The journal format never leaves the graph position empty.
pub const DEFAULT_GRAPH: NamedNodeRef<'_> = NamedNodeRef::new_unchecked("urn:x-ldp:default");

/// Returns true when the graph name is the given named graph.
pub fn graph_is(graph: &GraphName, name: NamedNodeRef<'_>) -> bool {
    matches!(graph, GraphName::NamedNode(n) if n.as_ref() == name)
}

/// [Linked Data Platform](https://www.w3.org/ns/ldp) vocabulary.
pub mod ldp {
    use oxrdf::NamedNodeRef;

    pub const RESOURCE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#Resource");
    pub const RDF_SOURCE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#RDFSource");
    pub const NON_RDF_SOURCE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#NonRDFSource");
    pub const CONTAINER: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#Container");
    pub const BASIC_CONTAINER: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#BasicContainer");
    pub const DIRECT_CONTAINER: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#DirectContainer");
    pub const INDIRECT_CONTAINER: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#IndirectContainer");

    pub const CONTAINS: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#contains");
    pub const INBOX: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#inbox");
    pub const MEMBERSHIP_RESOURCE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#membershipResource");
    pub const HAS_MEMBER_RELATION: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#hasMemberRelation");
    pub const IS_MEMBER_OF_RELATION: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#isMemberOfRelation");
    pub const INSERTED_CONTENT_RELATION: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#insertedContentRelation");

    pub const PREFER_CONTAINMENT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#PreferContainment");
    pub const PREFER_MEMBERSHIP: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#PreferMembership");
}

/// Repository-internal vocabulary: graph contexts and reserved agents.
pub mod repo {
    use oxrdf::NamedNodeRef;

    pub const PREFER_USER_MANAGED: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.trellisldp.org/ns/trellis#PreferUserManaged");
    pub const PREFER_SERVER_MANAGED: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.trellisldp.org/ns/trellis#PreferServerManaged");
    pub const PREFER_ACCESS_CONTROL: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.trellisldp.org/ns/trellis#PreferAccessControl");
    pub const PREFER_AUDIT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.trellisldp.org/ns/trellis#PreferAudit");
    pub const INBOUND_REFERENCES: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.trellisldp.org/ns/trellis#InboundReferences");

    pub const ADMINISTRATOR_AGENT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.trellisldp.org/ns/trellis#AdministratorAgent");
    pub const DELETED_RESOURCE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.trellisldp.org/ns/trellis#DeletedResource");
}

/// Dublin Core terms used for datastreams and provenance.
pub mod dc {
    use oxrdf::NamedNodeRef;

    pub const HAS_PART: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/hasPart");
    pub const FORMAT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/format");
    pub const EXTENT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/extent");
    pub const CREATOR: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/creator");
}

/// [Web Access Control](http://www.w3.org/ns/auth/acl) vocabulary.
pub mod acl {
    use oxrdf::NamedNodeRef;

    pub const AUTHORIZATION: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#Authorization");
    pub const ACCESS_CONTROL: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#accessControl");
    pub const ACCESS_TO: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#accessTo");
    pub const AGENT_CLASS: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#agentClass");
    pub const DEFAULT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#default");
    pub const MODE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#mode");
    pub const READ: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#Read");
    pub const WRITE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#Write");
    pub const CONTROL: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#Control");
}

/// PROV-O terms for audit records.
pub mod prov {
    use oxrdf::NamedNodeRef;

    pub const ACTIVITY: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/prov#Activity");
    pub const WAS_ASSOCIATED_WITH: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/prov#wasAssociatedWith");
    pub const WAS_GENERATED_BY: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/prov#wasGeneratedBy");
    pub const GENERATED_AT_TIME: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/prov#generatedAtTime");
}

/// ActivityStreams activity types carried on change events.
pub mod activitystreams {
    use oxrdf::NamedNodeRef;

    pub const CREATE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://www.w3.org/ns/activitystreams#Create");
    pub const UPDATE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://www.w3.org/ns/activitystreams#Update");
    pub const DELETE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://www.w3.org/ns/activitystreams#Delete");
}

/// Web Annotation vocabulary.
pub mod oa {
    use oxrdf::NamedNodeRef;

    pub const ANNOTATION_SERVICE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/oa#annotationService");
}
