// src/patch.rs
// Append-only RDF patch journal codec
// A block is a run of A/D lines closed by one END line carrying the instant

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use oxrdf::Quad;
use tracing::warn;

use crate::error::StoreError;
use crate::line;
use crate::model::VersionRange;

/// One journal operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOp {
    Add,
    Delete,
}

/// One complete journal block: the operations and their shared instant.
#[derive(Debug, Clone)]
pub struct PatchBlock {
    pub ops: Vec<(PatchOp, Quad)>,
    pub time: DateTime<Utc>,
}

/// The quad set projected at some instant, plus the block instants that
/// bound it.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    pub quads: Vec<Quad>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

/// Appends one block to the journal, creating the file if absent.
///
/// Deletions are written before additions; the END line closes the block.
/// Readers ignore a trailing block with no END line, so a torn write is
/// recoverable.
pub fn append(
    path: &Path,
    delete: &[Quad],
    add: &[Quad],
    time: DateTime<Utc>,
) -> Result<(), StoreError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut out = BufWriter::new(file);
    for quad in delete {
        writeln!(out, "D {} .", line::QuadTerms(quad))?;
    }
    for quad in add {
        writeln!(out, "A {} .", line::QuadTerms(quad))?;
    }
    writeln!(out, "END {} .", format_instant(time))?;
    out.flush()?;
    // best-effort fsync; readers tolerate a torn tail
    let _ = out.get_ref().sync_data();
    Ok(())
}

pub fn format_instant(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_instant(text: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| StoreError::CorruptLine(format!("bad instant: {text}")))
}

/// Streaming reader over complete journal blocks.
///
/// Corrupt lines are logged and skipped; a trailing run of operations with
/// no END line is dropped.
pub(crate) struct Blocks {
    lines: Lines<BufReader<File>>,
    path: String,
}

pub(crate) fn blocks(path: &Path) -> Result<Blocks, StoreError> {
    let file = File::open(path)?;
    Ok(Blocks {
        lines: BufReader::new(file).lines(),
        path: path.display().to_string(),
    })
}

impl Iterator for Blocks {
    type Item = Result<PatchBlock, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut ops = Vec::new();
        loop {
            let raw = match self.lines.next() {
                None => return None,
                Some(Err(e)) => return Some(Err(e.into())),
                Some(Ok(l)) => l,
            };
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            match parse_journal_line(trimmed) {
                Ok(JournalLine::Op(op, quad)) => ops.push((op, quad)),
                Ok(JournalLine::End(time)) => return Some(Ok(PatchBlock { ops, time })),
                Err(err) => {
                    warn!(journal = %self.path, %err, "skipping corrupt journal line");
                }
            }
        }
    }
}

enum JournalLine {
    Op(PatchOp, Quad),
    End(DateTime<Utc>),
}

fn parse_journal_line(text: &str) -> Result<JournalLine, StoreError> {
    if let Some(rest) = text.strip_prefix("A ") {
        Ok(JournalLine::Op(PatchOp::Add, line::parse_terms(rest)?))
    } else if let Some(rest) = text.strip_prefix("D ") {
        Ok(JournalLine::Op(PatchOp::Delete, line::parse_terms(rest)?))
    } else if let Some(rest) = text.strip_prefix("END ") {
        let instant = rest
            .trim_end()
            .strip_suffix('.')
            .ok_or_else(|| StoreError::CorruptLine(format!("END line without dot: {text}")))?
            .trim();
        Ok(JournalLine::End(parse_instant(instant)?))
    } else {
        Err(StoreError::CorruptLine(text.to_string()))
    }
}

/// Projects the quad set at the given instant.
///
/// A single forward sweep keeps the last operation seen for each quad; a
/// quad is present iff that operation is an addition. Blocks are in
/// non-decreasing instant order, so the scan stops at the first block past
/// the requested instant. Memory is bounded by the number of distinct quads
/// ever touched, not by journal length.
pub fn replay(path: &Path, time: DateTime<Utc>) -> Result<Projection, StoreError> {
    let mut last: HashMap<Quad, PatchOp> = HashMap::new();
    let mut projection = Projection::default();
    for block in blocks(path)? {
        let block = block?;
        if block.time > time {
            break;
        }
        projection.created.get_or_insert(block.time);
        projection.modified = Some(block.time);
        for (op, quad) in block.ops {
            last.insert(quad, op);
        }
    }
    projection.quads = last
        .into_iter()
        .filter(|(_, op)| *op == PatchOp::Add)
        .map(|(quad, _)| quad)
        .collect();
    Ok(projection)
}

/// Derives the ordered memento ranges from the distinct block instants.
///
/// Each range is `[tᵢ, tᵢ₊₁)`; the final range is open (`until` is `None`)
/// and the caller decides whether to surface it.
pub fn mementos(path: &Path) -> Result<Vec<VersionRange>, StoreError> {
    let mut instants: Vec<DateTime<Utc>> = Vec::new();
    for block in blocks(path)? {
        let block = block?;
        if instants.last() != Some(&block.time) {
            instants.push(block.time);
        }
    }
    Ok(instants
        .iter()
        .enumerate()
        .map(|(i, from)| VersionRange {
            from: *from,
            until: instants.get(i + 1).copied(),
        })
        .collect())
}
