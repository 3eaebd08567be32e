//! Row access over tabular payloads.
//!
//! A [`TableAdapter`] turns the payload stream of a framed response into a
//! [`RowCursor`]: a single-pass, forward-only sequence of [`Row`]s that owns
//! the underlying stream until [`RowCursor::close`] is called or the cursor
//! is dropped. [`Table`] materialises a cursor for random access.
//!
//! Rows are addressed by column name (case-insensitive) so that a column
//! reordering on the service side cannot shift values into the wrong field.

pub mod votable;

use std::fmt;
use std::io::BufRead;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Result, SimbadError};

pub use votable::{VoTableAdapter, VoTableCursor};

/// One table row: string cells plus the column names they belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    columns: Arc<[String]>,
    cells: Vec<String>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, cells: Vec<String>) -> Self {
        Self { columns, cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(String::as_str)
    }

    /// `(column, cell)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.cells.iter().map(String::as_str))
    }

    /// Cell of the first column whose name matches `name`, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&str> {
        let index = self
            .columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))?;
        self.cell(index)
    }

    /// Like [`Row::get`], but a missing column or cell is an error.
    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name)
            .ok_or_else(|| SimbadError::row(format!("missing column '{}'", name)))
    }

    /// Parses the named cell after trimming surrounding whitespace.
    pub fn parse<T>(&self, name: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self.require(name)?;
        raw.trim().parse::<T>().map_err(|e| {
            SimbadError::row(format!("column '{}' has invalid value '{}': {}", name, raw, e))
        })
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cells.join("\t"))
    }
}

/// Forward-only cursor over the rows of a payload.
///
/// `next` advances and reports whether a row is available through `row`.
/// `close` releases the underlying stream; it is idempotent and `next`
/// returns `false` afterwards.
pub trait RowCursor: Send {
    fn columns(&self) -> &[String];

    fn next(&mut self) -> Result<bool>;

    fn row(&self) -> Option<&Row>;

    fn close(&mut self);
}

/// Builds a [`RowCursor`] from a stream positioned at the start of the
/// tabular payload.
pub trait TableAdapter: Send + Sync {
    fn open(&self, payload: Box<dyn BufRead + Send>) -> Result<Box<dyn RowCursor>>;
}

/// Fully materialised table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Arc<[String]>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let columns: Arc<[String]> = columns.into();
        let rows = rows
            .into_iter()
            .map(|cells| Row::new(Arc::clone(&columns), cells))
            .collect();
        Self { columns, rows }
    }

    /// Drains `cursor` and closes it, whether or not reading succeeded.
    pub fn collect(cursor: &mut dyn RowCursor) -> Result<Self> {
        let columns: Arc<[String]> = cursor.columns().to_vec().into();
        let mut rows = Vec::new();
        let drained = loop {
            match cursor.next() {
                Ok(true) => {
                    if let Some(row) = cursor.row() {
                        rows.push(row.clone());
                    }
                }
                Ok(false) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        cursor.close();
        drained.map(|_| Self { columns, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_cursor(self) -> MemoryCursor {
        MemoryCursor {
            columns: self.columns,
            rows: self.rows.into_iter(),
            current: None,
            closed: false,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.columns.join("\t"))?;
        for row in &self.rows {
            write!(f, "\n{}", row)?;
        }
        Ok(())
    }
}

/// Cursor over rows already held in memory.
#[derive(Debug)]
pub struct MemoryCursor {
    columns: Arc<[String]>,
    rows: std::vec::IntoIter<Row>,
    current: Option<Row>,
    closed: bool,
}

impl MemoryCursor {
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl RowCursor for MemoryCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next(&mut self) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }
        self.current = self.rows.next();
        Ok(self.current.is_some())
    }

    fn row(&self) -> Option<&Row> {
        self.current.as_ref()
    }

    fn close(&mut self) {
        self.closed = true;
        self.current = None;
        self.rows = Vec::new().into_iter();
    }
}
