// src/cached.rs
// Materialized latest-snapshot view of a resource
// The cache is derived from the journal and may be deleted at any time

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use oxrdf::NamedNode;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StoreError;
use crate::layout;
use crate::line;
use crate::model::{Resource, VersionRange};
use crate::patch;

/// First line of the cache file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheHeader {
    pub id: String,
    #[serde(rename = "ldpType")]
    pub ldp_type: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// The materialized realization of `Resource`: reads never touch the
/// journal.
pub struct CachedResource;

impl CachedResource {
    /// Reads the snapshot materialized by the last successful `write`.
    ///
    /// Returns `None` when the cache file is missing or corrupt; the caller
    /// falls back to the versioned path.
    pub fn read(dir: &Path) -> Result<Option<Resource>, StoreError> {
        let path = dir.join(layout::CACHE_FILE);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut lines = BufReader::new(file).lines();
        let Some(first) = lines.next() else {
            return Ok(None);
        };
        let header: CacheHeader = match serde_json::from_str(&first?) {
            Ok(h) => h,
            Err(err) => {
                warn!(cache = %path.display(), %err, "unreadable cache header");
                return Ok(None);
            }
        };
        let identifier = match NamedNode::new(header.id.clone()) {
            Ok(n) => n,
            Err(_) => {
                warn!(cache = %path.display(), id = %header.id, "bad identifier in cache header");
                return Ok(None);
            }
        };
        let mut quads = Vec::new();
        for entry in lines {
            let entry = entry?;
            let trimmed = entry.trim();
            if trimmed.is_empty() {
                continue;
            }
            match line::parse_terms(trimmed) {
                Ok(quad) => quads.push(quad),
                Err(err) => {
                    warn!(cache = %path.display(), %err, "corrupt cache body");
                    return Ok(None);
                }
            }
        }
        let mementos = read_memento_index(dir)?;
        Ok(Some(Resource::from_quads(
            identifier,
            quads,
            header.created,
            header.modified,
            mementos,
            false,
        )))
    }

    /// Reads the snapshot and verifies it describes the given identifier.
    pub fn find(dir: &Path, identifier: &NamedNode) -> Result<Option<Resource>, StoreError> {
        Ok(Self::read(dir)?.filter(|resource| resource.identifier == *identifier))
    }

    /// Regenerates the cache, quads blob, and memento index from the
    /// current journal state, atomically replacing each file.
    ///
    /// A journal with no complete block clears the derived files instead.
    pub fn write(dir: &Path, identifier: &NamedNode) -> Result<(), StoreError> {
        let journal = dir.join(layout::JOURNAL_FILE);
        if !journal.is_file() {
            remove_derived(dir);
            return Ok(());
        }
        let projection = patch::replay(&journal, Utc::now())?;
        let Some(modified) = projection.modified else {
            remove_derived(dir);
            return Ok(());
        };
        let created = projection.created.unwrap_or(modified);
        let ranges = patch::mementos(&journal)?;
        let resource = Resource::from_quads(
            identifier.clone(),
            projection.quads,
            created,
            modified,
            ranges.clone(),
            false,
        );
        let header = CacheHeader {
            id: identifier.as_str().to_string(),
            ldp_type: resource.interaction_model.as_str().to_string(),
            created,
            modified,
        };

        replace_file(dir, layout::CACHE_FILE, |out| {
            serde_json::to_writer(&mut *out, &header)?;
            writeln!(out)?;
            for quad in resource.quads() {
                writeln!(out, "{} .", line::QuadTerms(quad))?;
            }
            Ok(())
        })?;
        replace_file(dir, layout::QUADS_FILE, |out| {
            for quad in resource.quads() {
                writeln!(out, "{quad} .")?;
            }
            Ok(())
        })?;
        replace_file(dir, layout::MEMENTO_FILE, |out| {
            for range in &ranges {
                let until = range
                    .until
                    .map(patch::format_instant)
                    .unwrap_or_default();
                writeln!(out, "{}\t{}", patch::format_instant(range.from), until)?;
            }
            Ok(())
        })
    }

    /// Reads only the cache header, for partition listings.
    pub fn read_header(dir: &Path) -> Result<Option<CacheHeader>, StoreError> {
        let path = dir.join(layout::CACHE_FILE);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut first = String::new();
        BufReader::new(file).read_line(&mut first)?;
        match serde_json::from_str(&first) {
            Ok(header) => Ok(Some(header)),
            Err(err) => {
                warn!(cache = %path.display(), %err, "unreadable cache header");
                Ok(None)
            }
        }
    }
}

/// Writes a derived artifact through a temp file and renames it into
/// place, so readers never observe a partial file.
fn replace_file<F>(dir: &Path, name: &str, fill: F) -> Result<(), StoreError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), StoreError>,
{
    let tmp = dir.join(format!("{name}.tmp"));
    let mut out = BufWriter::new(File::create(&tmp)?);
    fill(&mut out)?;
    out.flush()?;
    drop(out);
    fs::rename(&tmp, dir.join(name))?;
    Ok(())
}

fn remove_derived(dir: &Path) {
    for name in [layout::CACHE_FILE, layout::QUADS_FILE, layout::MEMENTO_FILE] {
        let _ = fs::remove_file(dir.join(name));
    }
}

fn read_memento_index(dir: &Path) -> Result<Vec<VersionRange>, StoreError> {
    let path = dir.join(layout::MEMENTO_FILE);
    let file = match File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut ranges = Vec::new();
    for entry in BufReader::new(file).lines() {
        let entry = entry?;
        let trimmed = entry.trim_end();
        if trimmed.is_empty() {
            continue;
        }
        let mut parts = trimmed.split('\t');
        let from = parts.next().unwrap_or_default();
        let until = parts.next().unwrap_or_default();
        match patch::parse_instant(from) {
            Ok(from) => {
                let until = if until.is_empty() {
                    None
                } else {
                    patch::parse_instant(until).ok()
                };
                ranges.push(VersionRange { from, until });
            }
            Err(err) => {
                warn!(index = %path.display(), %err, "skipping bad memento range");
            }
        }
    }
    Ok(ranges)
}
