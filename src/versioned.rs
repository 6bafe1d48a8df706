// src/versioned.rs
// Journal-replay view of a resource at an arbitrary instant

use std::path::Path;

use chrono::{DateTime, Utc};
use oxrdf::NamedNode;

use crate::error::StoreError;
use crate::layout;
use crate::model::Resource;
use crate::patch;

/// The time-travel realization of `Resource`: every read replays the
/// journal up to the requested instant.
pub struct VersionedResource;

impl VersionedResource {
    /// Reconstructs the resource as it stood at `time`.
    ///
    /// Returns `None` when the directory or journal is missing, or when the
    /// instant predates the first journal block. The returned view is
    /// flagged as a memento and its range list is restricted to ranges
    /// closing at or before `time`.
    pub fn find(
        dir: &Path,
        identifier: &NamedNode,
        time: DateTime<Utc>,
    ) -> Result<Option<Resource>, StoreError> {
        let journal = dir.join(layout::JOURNAL_FILE);
        if !journal.is_file() {
            return Ok(None);
        }
        let projection = patch::replay(&journal, time)?;
        let Some(modified) = projection.modified else {
            return Ok(None);
        };
        let created = projection.created.unwrap_or(modified);
        let mementos = patch::mementos(&journal)?
            .into_iter()
            .filter(|range| range.until.map_or(false, |until| until <= time))
            .collect();
        Ok(Some(Resource::from_quads(
            identifier.clone(),
            projection.quads,
            created,
            modified,
            mementos,
            true,
        )))
    }
}
