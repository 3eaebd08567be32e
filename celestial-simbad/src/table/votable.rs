//! Streaming reader for VOTable `TABLEDATA` payloads.
//!
//! Only the pieces needed for row access are interpreted: `FIELD` elements
//! give the column names, `TR`/`TD` give the cells, and a TAP
//! `<INFO name="QUERY_STATUS" value="ERROR">` ahead of the data is turned
//! into a service error. Binary serializations are rejected.

use std::io::BufRead;
use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{Row, RowCursor, TableAdapter};
use crate::error::{Result, SimbadError};

#[derive(Debug, Clone, Copy, Default)]
pub struct VoTableAdapter;

impl TableAdapter for VoTableAdapter {
    fn open(&self, payload: Box<dyn BufRead + Send>) -> Result<Box<dyn RowCursor>> {
        Ok(Box::new(VoTableCursor::new(payload)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Field,
    Info,
    TableData,
    Binary,
    Tr,
    Td,
    Other,
}

impl Tag {
    fn of(local_name: &[u8]) -> Self {
        match local_name {
            b"FIELD" => Tag::Field,
            b"INFO" => Tag::Info,
            b"TABLEDATA" => Tag::TableData,
            b"BINARY" | b"BINARY2" | b"FITS" => Tag::Binary,
            b"TR" => Tag::Tr,
            b"TD" => Tag::Td,
            _ => Tag::Other,
        }
    }
}

/// Owned view of one XML event, so no borrow of the read buffer outlives
/// the call that produced it.
#[derive(Debug)]
enum Node {
    Open {
        tag: Tag,
        empty: bool,
        attrs: Vec<(String, String)>,
    },
    Close(Tag),
    Text(String),
    Eof,
    Skip,
}

impl Node {
    fn open(element: &BytesStart, empty: bool) -> Result<Self> {
        let tag = Tag::of(element.local_name().as_ref());
        let mut attrs = Vec::new();
        if matches!(tag, Tag::Field | Tag::Info) {
            for attr in element.attributes() {
                let attr = attr.map_err(|e| SimbadError::table(e.to_string()))?;
                let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                let value = attr.unescape_value()?.into_owned();
                attrs.push((key, value));
            }
        }
        Ok(Node::Open { tag, empty, attrs })
    }
}

fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}

fn read_node<R: BufRead>(reader: &mut Reader<R>, buf: &mut Vec<u8>) -> Result<Node> {
    buf.clear();
    let node = match reader.read_event_into(buf)? {
        Event::Start(ref e) => Node::open(e, false)?,
        Event::Empty(ref e) => Node::open(e, true)?,
        Event::End(ref e) => Node::Close(Tag::of(e.local_name().as_ref())),
        Event::Text(e) => Node::Text(e.unescape()?.into_owned()),
        Event::CData(e) => Node::Text(String::from_utf8_lossy(&e.into_inner()).into_owned()),
        Event::Eof => Node::Eof,
        _ => Node::Skip,
    };
    Ok(node)
}

/// Tracks TAP `<INFO name="QUERY_STATUS" value="ERROR">` elements, which
/// may appear before the table or after its rows.
#[derive(Debug, Default)]
struct QueryStatus {
    error: Option<String>,
}

impl QueryStatus {
    fn observe(&mut self, node: &Node) -> Result<()> {
        match node {
            Node::Open {
                tag: Tag::Info,
                empty,
                attrs,
            } => {
                let failed = attr(attrs, "name") == Some("QUERY_STATUS")
                    && attr(attrs, "value") == Some("ERROR");
                if failed && *empty {
                    return Err(SimbadError::service("query failed without a message"));
                }
                if failed {
                    self.error = Some(String::new());
                }
            }
            Node::Text(text) => {
                if let Some(message) = self.error.as_mut() {
                    message.push_str(text);
                }
            }
            Node::Close(Tag::Info) => {
                if let Some(message) = self.error.take() {
                    return Err(SimbadError::service(message.trim()));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Reads the rest of the document after `TABLEDATA`, failing on a trailing
/// error status.
fn check_trailer<R: BufRead>(reader: &mut Reader<R>, buf: &mut Vec<u8>) -> Result<()> {
    let mut status = QueryStatus::default();
    loop {
        let node = read_node(reader, buf)?;
        status.observe(&node)?;
        if matches!(node, Node::Eof) {
            return Ok(());
        }
    }
}

/// [`RowCursor`] that parses rows lazily from the payload stream.
pub struct VoTableCursor<R: BufRead> {
    reader: Option<Reader<R>>,
    buf: Vec<u8>,
    columns: Arc<[String]>,
    current: Option<Row>,
    finished: bool,
}

impl<R: BufRead> VoTableCursor<R> {
    /// Reads the document up to the start of `TABLEDATA`, collecting the
    /// column names on the way.
    pub fn new(payload: R) -> Result<Self> {
        let mut reader = Reader::from_reader(payload);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();

        let mut columns = Vec::new();
        let mut status = QueryStatus::default();
        let mut finished = false;

        loop {
            let node = read_node(&mut reader, &mut buf)?;
            status.observe(&node)?;
            match node {
                Node::Open {
                    tag: Tag::Field,
                    attrs,
                    ..
                } => {
                    let name = attr(&attrs, "name")
                        .or_else(|| attr(&attrs, "ID"))
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("col{}", columns.len()));
                    columns.push(name);
                }
                Node::Open {
                    tag: Tag::Binary, ..
                } => {
                    return Err(SimbadError::table(
                        "binary VOTable serialization is not supported",
                    ));
                }
                Node::Open {
                    tag: Tag::TableData,
                    empty,
                    ..
                } => {
                    if empty {
                        check_trailer(&mut reader, &mut buf)?;
                    }
                    finished = empty;
                    break;
                }
                Node::Eof => {
                    finished = true;
                    break;
                }
                _ => {}
            }
        }

        Ok(Self {
            reader: Some(reader),
            buf,
            columns: columns.into(),
            current: None,
            finished,
        })
    }
}

impl<R: BufRead + Send> RowCursor for VoTableCursor<R> {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next(&mut self) -> Result<bool> {
        self.current = None;
        if self.finished {
            return Ok(false);
        }
        let Some(reader) = self.reader.as_mut() else {
            return Ok(false);
        };

        let mut cells: Option<Vec<String>> = None;
        let mut cell: Option<String> = None;

        loop {
            match read_node(reader, &mut self.buf)? {
                Node::Open { tag: Tag::Tr, empty, .. } => {
                    if empty {
                        self.current = Some(Row::new(Arc::clone(&self.columns), Vec::new()));
                        return Ok(true);
                    }
                    cells = Some(Vec::new());
                }
                Node::Open { tag: Tag::Td, empty, .. } => {
                    if empty {
                        if let Some(cells) = cells.as_mut() {
                            cells.push(String::new());
                        }
                    } else {
                        cell = Some(String::new());
                    }
                }
                Node::Text(text) => {
                    if let Some(cell) = cell.as_mut() {
                        cell.push_str(&text);
                    }
                }
                Node::Close(Tag::Td) => {
                    if let (Some(cells), Some(value)) = (cells.as_mut(), cell.take()) {
                        cells.push(value);
                    }
                }
                Node::Close(Tag::Tr) => {
                    if let Some(cells) = cells.take() {
                        self.current = Some(Row::new(Arc::clone(&self.columns), cells));
                        return Ok(true);
                    }
                }
                Node::Close(Tag::TableData) => {
                    self.finished = true;
                    check_trailer(reader, &mut self.buf)?;
                    return Ok(false);
                }
                Node::Eof => {
                    self.finished = true;
                    return Ok(false);
                }
                _ => {}
            }
        }
    }

    fn row(&self) -> Option<&Row> {
        self.current.as_ref()
    }

    fn close(&mut self) {
        self.reader = None;
        self.current = None;
        self.finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;
    use std::io::Cursor;

    const STARS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<VOTABLE version="1.4" xmlns="http://www.ivoa.net/xml/VOTable/v1.3">
<RESOURCE type="results">
<INFO name="QUERY_STATUS" value="OK"/>
<TABLE>
<FIELD name="oid" datatype="long"/>
<FIELD name="id" datatype="char" arraysize="*"/>
<FIELD name="description" datatype="unicodeChar" arraysize="*"/>
<DATA>
<TABLEDATA>
<TR><TD>1234</TD><TD>NAME Sirius</TD><TD>Double or Multiple Star</TD></TR>
<TR><TD>5678</TD><TD>NAME Vega &amp; co</TD><TD/></TR>
<TR><TD>91</TD><TD><![CDATA[NAME <Rigel>]]></TD><TD></TD></TR>
</TABLEDATA>
</DATA>
</TABLE>
</RESOURCE>
</VOTABLE>
"#;

    fn cursor(xml: &str) -> Result<VoTableCursor<Cursor<Vec<u8>>>> {
        VoTableCursor::new(Cursor::new(xml.as_bytes().to_vec()))
    }

    #[test]
    fn test_reads_field_names() {
        let cursor = cursor(STARS).unwrap();
        assert_eq!(cursor.columns(), ["oid", "id", "description"]);
    }

    #[test]
    fn test_walks_rows() {
        let mut cursor = cursor(STARS).unwrap();

        assert!(cursor.next().unwrap());
        let row = cursor.row().unwrap();
        assert_eq!(row.get("oid"), Some("1234"));
        assert_eq!(row.get("id"), Some("NAME Sirius"));
        assert_eq!(row.get("description"), Some("Double or Multiple Star"));

        assert!(cursor.next().unwrap());
        let row = cursor.row().unwrap();
        assert_eq!(row.get("id"), Some("NAME Vega & co"));
        assert_eq!(row.get("description"), Some(""));

        assert!(cursor.next().unwrap());
        let row = cursor.row().unwrap();
        assert_eq!(row.get("id"), Some("NAME <Rigel>"));
        assert_eq!(row.get("description"), Some(""));

        assert!(!cursor.next().unwrap());
        assert!(cursor.row().is_none());
        assert!(!cursor.next().unwrap());
    }

    #[test]
    fn test_payload_without_declaration() {
        let body = STARS.split_once('\n').unwrap().1;
        let table = Table::collect(&mut cursor(body).unwrap()).unwrap();
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn test_empty_tabledata() {
        let xml = r#"<VOTABLE><RESOURCE><TABLE><FIELD name="oid"/><DATA><TABLEDATA/></DATA></TABLE></RESOURCE></VOTABLE>"#;
        let mut cursor = cursor(xml).unwrap();
        assert_eq!(cursor.columns(), ["oid"]);
        assert!(!cursor.next().unwrap());
    }

    #[test]
    fn test_table_without_data() {
        let xml = r#"<VOTABLE><RESOURCE><TABLE><FIELD ID="ra"/><FIELD/></TABLE></RESOURCE></VOTABLE>"#;
        let mut cursor = cursor(xml).unwrap();
        assert_eq!(cursor.columns(), ["ra", "col1"]);
        assert!(!cursor.next().unwrap());
    }

    #[test]
    fn test_query_status_error() {
        let xml = r#"<?xml version="1.0"?>
<VOTABLE><RESOURCE type="results">
<INFO name="QUERY_STATUS" value="ERROR">Incorrect ADQL query: unknown column "foo"</INFO>
</RESOURCE></VOTABLE>"#;
        let err = cursor(xml).err().expect("expected service error");
        assert!(matches!(err, SimbadError::Service { .. }));
        assert!(err.to_string().contains("unknown column \"foo\""));
    }

    #[test]
    fn test_query_status_error_without_message() {
        let xml = r#"<VOTABLE><RESOURCE><INFO name="QUERY_STATUS" value="ERROR"/></RESOURCE></VOTABLE>"#;
        assert!(matches!(cursor(xml), Err(SimbadError::Service { .. })));
    }

    #[test]
    fn test_error_status_after_rows() {
        let xml = r#"<VOTABLE><RESOURCE type="results">
<INFO name="QUERY_STATUS" value="OK"/>
<TABLE><FIELD name="oid"/><DATA><TABLEDATA>
<TR><TD>1</TD></TR>
</TABLEDATA></DATA></TABLE>
<INFO name="QUERY_STATUS" value="ERROR">Query execution timed out</INFO>
</RESOURCE></VOTABLE>"#;
        let mut cursor = cursor(xml).unwrap();
        assert!(cursor.next().unwrap());
        assert_eq!(cursor.row().unwrap().get("oid"), Some("1"));

        let err = cursor.next().err().expect("expected service error");
        assert!(matches!(err, SimbadError::Service { ref message } if message == "Query execution timed out"));
        assert!(!cursor.next().unwrap());
    }

    #[test]
    fn test_overflow_status_after_rows() {
        let xml = r#"<VOTABLE><RESOURCE><TABLE><FIELD name="oid"/><DATA><TABLEDATA>
<TR><TD>1</TD></TR>
</TABLEDATA></DATA></TABLE>
<INFO name="QUERY_STATUS" value="OVERFLOW"/>
</RESOURCE></VOTABLE>"#;
        let table = Table::collect(&mut cursor(xml).unwrap()).unwrap();
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_binary_serialization_rejected() {
        let xml = r#"<VOTABLE><RESOURCE><TABLE><FIELD name="oid"/><DATA><BINARY2><STREAM encoding="base64">AAAA</STREAM></BINARY2></DATA></TABLE></RESOURCE></VOTABLE>"#;
        let err = cursor(xml).err().expect("expected table error");
        assert!(err.to_string().contains("binary VOTable"));
    }

    #[test]
    fn test_malformed_xml_is_table_error() {
        let xml = r#"<VOTABLE><TABLE><FIELD name="oid"/><DATA><TABLEDATA><TR><TD>1</TR></TABLEDATA>"#;
        let mut cursor = cursor(xml).unwrap();
        let err = cursor.next().err().expect("expected XML error");
        assert!(matches!(err, SimbadError::Table { .. }));
    }

    #[test]
    fn test_close_releases_reader() {
        let mut cursor = cursor(STARS).unwrap();
        assert!(cursor.next().unwrap());
        cursor.close();
        assert!(cursor.reader.is_none());
        assert!(cursor.row().is_none());
        assert!(!cursor.next().unwrap());
    }

    #[test]
    fn test_adapter_opens_boxed_stream() {
        let payload: Box<dyn BufRead + Send> = Box::new(Cursor::new(STARS.as_bytes().to_vec()));
        let mut cursor = VoTableAdapter.open(payload).unwrap();
        let table = Table::collect(cursor.as_mut()).unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.row(0).unwrap().get("oid"), Some("1234"));
    }
}
