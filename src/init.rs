// src/init.rs
// Idempotent creation of a partition root resource

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use oxrdf::{Literal, NamedNode, Quad};
use tracing::debug;

use crate::cached::CachedResource;
use crate::error::StoreError;
use crate::events::IdentifierSupplier;
use crate::layout;
use crate::patch;
use crate::vocab::{acl, activitystreams, ldp, prov, repo};

/// Replaces a blank node with a fresh IRI minted from the supplier.
pub fn skolemize(ids: &dyn IdentifierSupplier) -> NamedNode {
    NamedNode::new_unchecked(format!("{}bnode/{}", layout::IDENTIFIER_PREFIX, ids.get()))
}

/// Ensures the partition root resource exists.
///
/// When the root has no journal, writes a single block typing the root as
/// an `ldp:Container`, granting the administrator agent class a default
/// ACL, and recording the creation activity. Returns whether anything was
/// written; an existing journal is left untouched.
pub fn initialize_root(
    dir: &Path,
    root: &NamedNode,
    ids: &dyn IdentifierSupplier,
    time: DateTime<Utc>,
) -> Result<bool, StoreError> {
    let journal = dir.join(layout::JOURNAL_FILE);
    if journal.is_file() {
        return Ok(false);
    }
    fs::create_dir_all(dir)?;

    let mut add = vec![Quad::new(
        root.clone(),
        oxrdf::vocab::rdf::TYPE,
        ldp::CONTAINER,
        repo::PREFER_SERVER_MANAGED,
    )];

    let authorization = skolemize(ids);
    add.push(Quad::new(
        authorization.clone(),
        oxrdf::vocab::rdf::TYPE,
        acl::AUTHORIZATION,
        repo::PREFER_ACCESS_CONTROL,
    ));
    for mode in [acl::READ, acl::WRITE, acl::CONTROL] {
        add.push(Quad::new(
            authorization.clone(),
            acl::MODE,
            mode,
            repo::PREFER_ACCESS_CONTROL,
        ));
    }
    add.push(Quad::new(
        authorization.clone(),
        acl::AGENT_CLASS,
        repo::ADMINISTRATOR_AGENT,
        repo::PREFER_ACCESS_CONTROL,
    ));
    add.push(Quad::new(
        authorization.clone(),
        acl::ACCESS_TO,
        root.clone(),
        repo::PREFER_ACCESS_CONTROL,
    ));
    add.push(Quad::new(
        authorization,
        acl::DEFAULT,
        root.clone(),
        repo::PREFER_ACCESS_CONTROL,
    ));

    let activity = skolemize(ids);
    add.push(Quad::new(
        root.clone(),
        prov::WAS_GENERATED_BY,
        activity.clone(),
        repo::PREFER_AUDIT,
    ));
    add.push(Quad::new(
        activity.clone(),
        oxrdf::vocab::rdf::TYPE,
        prov::ACTIVITY,
        repo::PREFER_AUDIT,
    ));
    add.push(Quad::new(
        activity.clone(),
        oxrdf::vocab::rdf::TYPE,
        activitystreams::CREATE,
        repo::PREFER_AUDIT,
    ));
    add.push(Quad::new(
        activity.clone(),
        prov::WAS_ASSOCIATED_WITH,
        repo::ADMINISTRATOR_AGENT,
        repo::PREFER_AUDIT,
    ));
    add.push(Quad::new(
        activity,
        prov::GENERATED_AT_TIME,
        Literal::new_typed_literal(patch::format_instant(time), oxrdf::vocab::xsd::DATE_TIME),
        repo::PREFER_AUDIT,
    ));

    patch::append(&journal, &[], &add, time)?;
    CachedResource::write(dir, root)?;
    debug!(root = %root, "initialized partition root");
    Ok(true)
}
