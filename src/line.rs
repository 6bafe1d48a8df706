// src/line.rs
// Term-level codec for journal and cache lines
// One line carries four terms in graph-first order plus a trailing dot

use std::fmt;

use oxrdf::{BlankNode, GraphName, Literal, NamedNode, Quad, Subject, Term};

use crate::error::StoreError;
use crate::vocab;

/// Displays the four terms of a quad in line order: graph, subject,
/// predicate, object. Default-graph quads are rendered with the reserved
/// graph IRI so the graph position is never empty.
pub(crate) struct QuadTerms<'a>(pub &'a Quad);

impl fmt::Display for QuadTerms<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.graph_name {
            GraphName::NamedNode(n) => write!(f, "{n}")?,
            GraphName::BlankNode(b) => write!(f, "{b}")?,
            GraphName::DefaultGraph => write!(f, "{}", vocab::DEFAULT_GRAPH)?,
        }
        write!(f, " {} {} {}", self.0.subject, self.0.predicate, self.0.object)
    }
}

/// Parses the four-term body of a line (everything after the op code),
/// including the terminating dot.
pub(crate) fn parse_terms(input: &str) -> Result<Quad, StoreError> {
    let mut cursor = Cursor::new(input);
    let graph = to_graph(cursor.term()?, input)?;
    let subject = to_subject(cursor.term()?, input)?;
    let predicate = match cursor.term()? {
        Term::NamedNode(n) => n,
        _ => return Err(corrupt("predicate must be an IRI", input)),
    };
    let object = cursor.term()?;
    cursor.end_of_statement()?;
    Ok(Quad::new(subject, predicate, object, graph))
}

fn to_graph(term: Term, input: &str) -> Result<GraphName, StoreError> {
    match term {
        Term::NamedNode(n) if n.as_ref() == vocab::DEFAULT_GRAPH => Ok(GraphName::DefaultGraph),
        Term::NamedNode(n) => Ok(GraphName::NamedNode(n)),
        Term::BlankNode(b) => Ok(GraphName::BlankNode(b)),
        Term::Literal(_) => Err(corrupt("graph must not be a literal", input)),
    }
}

fn to_subject(term: Term, input: &str) -> Result<Subject, StoreError> {
    match term {
        Term::NamedNode(n) => Ok(Subject::NamedNode(n)),
        Term::BlankNode(b) => Ok(Subject::BlankNode(b)),
        Term::Literal(_) => Err(corrupt("subject must not be a literal", input)),
    }
}

fn corrupt(message: &str, input: &str) -> StoreError {
    StoreError::CorruptLine(format!("{message}: {input}"))
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn bytes(&self) -> &'a [u8] {
        self.input.as_bytes()
    }

    fn skip_ws(&mut self) {
        let bytes = self.bytes();
        while self.pos < bytes.len() && (bytes[self.pos] == b' ' || bytes[self.pos] == b'\t') {
            self.pos += 1;
        }
    }

    fn term(&mut self) -> Result<Term, StoreError> {
        self.skip_ws();
        match self.bytes().get(self.pos) {
            Some(b'<') => Ok(Term::NamedNode(self.iri()?)),
            Some(b'_') => Ok(Term::BlankNode(self.blank()?)),
            Some(b'"') => Ok(Term::Literal(self.literal()?)),
            _ => Err(self.fail("expected a term")),
        }
    }

    fn iri(&mut self) -> Result<NamedNode, StoreError> {
        let start = self.pos + 1;
        let bytes = self.bytes();
        let mut i = start;
        while i < bytes.len() && bytes[i] != b'>' {
            i += 1;
        }
        if i >= bytes.len() {
            return Err(self.fail("unterminated IRI"));
        }
        let raw = &self.input[start..i];
        self.pos = i + 1;
        let iri = unescape(raw).map_err(|_| self.fail("bad escape in IRI"))?;
        NamedNode::new(iri).map_err(|_| self.fail("invalid IRI"))
    }

    fn blank(&mut self) -> Result<BlankNode, StoreError> {
        let bytes = self.bytes();
        if bytes.get(self.pos + 1) != Some(&b':') {
            return Err(self.fail("expected blank node"));
        }
        let start = self.pos + 2;
        let mut i = start;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let label = &self.input[start..i];
        self.pos = i;
        BlankNode::new(label).map_err(|_| self.fail("invalid blank node label"))
    }

    fn literal(&mut self) -> Result<Literal, StoreError> {
        let value = unescape(self.scan_string()?).map_err(|_| self.fail("bad literal escape"))?;
        let bytes = self.bytes();
        match bytes.get(self.pos) {
            Some(b'@') => {
                let start = self.pos + 1;
                let mut i = start;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
                    i += 1;
                }
                let tag = &self.input[start..i];
                self.pos = i;
                Literal::new_language_tagged_literal(value, tag)
                    .map_err(|_| self.fail("invalid language tag"))
            }
            Some(b'^') if bytes.get(self.pos + 1) == Some(&b'^') => {
                self.pos += 2;
                if bytes.get(self.pos) != Some(&b'<') {
                    return Err(self.fail("expected datatype IRI"));
                }
                let datatype = self.iri()?;
                Ok(Literal::new_typed_literal(value, datatype))
            }
            _ => Ok(Literal::new_simple_literal(value)),
        }
    }

    /// Scans the quoted lexical form, honoring backslash escapes, and leaves
    /// the cursor just past the closing quote.
    fn scan_string(&mut self) -> Result<&'a str, StoreError> {
        let bytes = self.bytes();
        let start = self.pos + 1;
        let mut i = start;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'"' => {
                    let raw = &self.input[start..i];
                    self.pos = i + 1;
                    return Ok(raw);
                }
                _ => i += 1,
            }
        }
        Err(self.fail("unterminated literal"))
    }

    fn end_of_statement(&mut self) -> Result<(), StoreError> {
        self.skip_ws();
        if self.bytes().get(self.pos) != Some(&b'.') {
            return Err(self.fail("expected terminating dot"));
        }
        self.pos += 1;
        self.skip_ws();
        if self.pos != self.input.len() {
            return Err(self.fail("trailing content after dot"));
        }
        Ok(())
    }

    fn fail(&self, message: &str) -> StoreError {
        StoreError::CorruptLine(format!("{message} at byte {}: {}", self.pos, self.input))
    }
}

fn unescape(raw: &str) -> Result<String, ()> {
    if !raw.contains('\\') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{0008}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{000C}'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some('u') => out.push(take_codepoint(&mut chars, 4)?),
            Some('U') => out.push(take_codepoint(&mut chars, 8)?),
            _ => return Err(()),
        }
    }
    Ok(out)
}

fn take_codepoint(chars: &mut std::str::Chars<'_>, len: usize) -> Result<char, ()> {
    let mut value: u32 = 0;
    for _ in 0..len {
        let digit = chars.next().and_then(|c| c.to_digit(16)).ok_or(())?;
        value = value * 16 + digit;
    }
    char::from_u32(value).ok_or(())
}
