//! Framing of SIMBAD responses.
//!
//! A response starts with an optional plain-text header made of sections,
//! each introduced by a marker line such as `::script::::::::`, and
//! continues with the VOTable document. Framing reads the stream line by
//! line up to and including the XML declaration, so the reader is left on
//! the first byte after that line for the table adapter to pick up.
//!
//! ```text
//! C.D.S.  -  SIMBAD4 rel 1.8  -  2024.07.15CEST10:12:33
//!
//! ::script::::::::::::::::::::::::::::::::::::::::::::::::::::::::::::::::
//! set limit 2
//! ...
//! ::data::::::::::::::::::::::::::::::::::::::::::::::::::::::::::::::::::
//! <?xml version="1.0" encoding="UTF-8"?>
//! <VOTABLE ...
//! ```
//!
//! A response whose header carries an `error` section is a failed query;
//! [`SimbadResponse::into_payload`] refuses to hand such a stream on.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};

use tracing::debug;

use crate::error::{Result, SimbadError};
use crate::table::{RowCursor, Table, TableAdapter};

pub const SECTION_MARKER: &str = "::";
pub const ERROR_SECTION: &str = "error";

/// Section name to accumulated section text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMetadata {
    sections: HashMap<String, String>,
}

impl HeaderMetadata {
    pub fn get(&self, section: &str) -> Option<&str> {
        self.sections.get(section).map(String::as_str)
    }

    pub fn error(&self) -> Option<&str> {
        self.get(ERROR_SECTION)
    }

    pub fn contains(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// Section names in alphabetical order.
    pub fn section_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sections.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl From<HashMap<String, String>> for HeaderMetadata {
    fn from(sections: HashMap<String, String>) -> Self {
        Self { sections }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FramedHeader {
    pub metadata: HeaderMetadata,
    /// Every line consumed, the XML declaration included when one was found.
    pub lines: Vec<String>,
}

/// Whole-line match of `<\?xml.*\?>`.
pub fn is_xml_declaration(line: &str) -> bool {
    line.starts_with("<?xml") && line.ends_with("?>")
}

/// Reads header lines until the XML declaration or end of stream.
///
/// Lines end at `\n` or end of stream and every `\r` is dropped. A marker
/// line commits the section being accumulated and starts a new one named by
/// the text between the marker and the next `:`. Text before the first
/// marker belongs to no section. The section open when framing stops is
/// committed as well.
pub fn frame_header<R: BufRead + ?Sized>(reader: &mut R) -> Result<FramedHeader> {
    let mut sections = HashMap::new();
    let mut lines = Vec::new();
    let mut current: Option<String> = None;
    let mut content = String::new();
    let mut raw = Vec::new();

    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        if raw.last() == Some(&b'\n') {
            raw.pop();
        }
        raw.retain(|&b| b != b'\r');
        let line = String::from_utf8_lossy(&raw).into_owned();

        if is_xml_declaration(&line) {
            lines.push(line);
            break;
        }

        if let Some(rest) = line.strip_prefix(SECTION_MARKER) {
            if let Some(name) = current.take() {
                commit_section(&mut sections, name, &mut content);
            }
            let name = rest.split(':').next().unwrap_or_default();
            current = Some(name.to_string());
        } else if current.is_some() {
            content.push_str(&line);
            content.push('\n');
        }
        lines.push(line);
    }

    if let Some(name) = current.take() {
        commit_section(&mut sections, name, &mut content);
    }

    Ok(FramedHeader {
        metadata: sections.into(),
        lines,
    })
}

fn commit_section(sections: &mut HashMap<String, String>, name: String, content: &mut String) {
    debug!(section = %name, chars = content.len(), "read response section");
    sections.insert(name, std::mem::take(content));
}

/// A framed response: parsed header plus the stream positioned at the
/// tabular payload.
pub struct SimbadResponse {
    reader: Box<dyn BufRead + Send>,
    header: FramedHeader,
}

impl SimbadResponse {
    pub fn new(stream: Box<dyn Read + Send>) -> Result<Self> {
        Self::from_reader(BufReader::new(stream))
    }

    pub fn from_reader(reader: impl BufRead + Send + 'static) -> Result<Self> {
        let mut reader: Box<dyn BufRead + Send> = Box::new(reader);
        let header = frame_header(&mut reader)?;
        Ok(Self { reader, header })
    }

    pub fn metadata(&self) -> &HeaderMetadata {
        &self.header.metadata
    }

    pub fn header_lines(&self) -> &[String] {
        &self.header.lines
    }

    pub fn error(&self) -> Option<&str> {
        self.header.metadata.error()
    }

    /// The payload stream, or the service error if the header reported one.
    pub fn into_payload(self) -> Result<Box<dyn BufRead + Send>> {
        if let Some(message) = self.error() {
            return Err(SimbadError::service(message.trim()));
        }
        Ok(self.reader)
    }

    pub fn open_table(self, adapter: &dyn TableAdapter) -> Result<Box<dyn RowCursor>> {
        adapter.open(self.into_payload()?)
    }

    pub fn into_table(self, adapter: &dyn TableAdapter) -> Result<Table> {
        let mut cursor = self.open_table(adapter)?;
        Table::collect(cursor.as_mut())
    }
}

impl std::fmt::Debug for SimbadResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimbadResponse")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}
