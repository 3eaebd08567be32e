//! ADQL compiler for star listings.
//!
//! Every query selects `basic.oid`, `ident.id` and `otypedef.description`
//! from a fixed join chain:
//!
//! ```text
//! ident ── JOIN basic ON basic.oid = ident.oidref
//!       └─ LEFT JOIN otypedef ON otypedef.otype = basic.otype
//! ```
//!
//! Filters on any other table join that table to `ident` through its
//! `oidref` column. An ordering on a table that carries no filters gets a
//! `LEFT JOIN` of its own so that the sort column resolves.
//!
//! Filter values are inserted into the query text as given. Use
//! [`Filter::like`] / [`Filter::contains`] (which quote through
//! [`quote_literal`]) for string matches, or quote by hand when building a
//! raw [`Filter::new`].

use std::fmt;

use crate::model::StarOverview;

/// Core object table (`oid`, coordinates, `otype`).
pub const BASIC: &str = "basic";
/// Identifier table (`id`, `oidref`).
pub const IDENT: &str = "ident";
/// Object type definitions (`otype`, `label`, `description`).
pub const OTYPEDEF: &str = "otypedef";

const BASE_TABLES: [&str; 3] = [BASIC, IDENT, OTYPEDEF];

/// Renders `value` as an ADQL string literal, doubling embedded quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// A single `<table>.<field> <operator> <value>` condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub operator: String,
    pub value: String,
}

impl Filter {
    /// Raw condition; `value` is emitted verbatim.
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    /// Equality with a verbatim value, e.g. `Filter::eq("oid", "1234")`.
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, "=", value)
    }

    /// `LIKE` match. Wildcards in `pattern` are kept as written; the pattern
    /// becomes a quoted string literal.
    pub fn like(field: impl Into<String>, pattern: &str) -> Self {
        Self::new(field, "LIKE", quote_literal(pattern))
    }

    /// `LIKE '%substring%'`.
    pub fn contains(field: impl Into<String>, substring: &str) -> Self {
        Self::like(field, &format!("%{substring}%"))
    }

    /// Renders `<table>.<field> <operator> <value>`.
    pub fn build(&self, table: &str) -> String {
        format!("{}.{} {} {}", table, self.field, self.operator, self.value)
    }
}

/// Sort direction, ascending by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// ADQL keyword, `ASC` or `DESC`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort specification.
///
/// `table` decides which join makes the column available; only `field` and
/// the direction are written into the `ORDER BY` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub table: String,
    pub field: String,
    pub direction: Direction,
}

impl Ordering {
    /// Sort on `<table>.<field>` in `direction`.
    pub fn new(table: impl Into<String>, field: impl Into<String>, direction: Direction) -> Self {
        Self {
            table: table.into(),
            field: field.into(),
            direction,
        }
    }

    /// Ascending sort on `<table>.<field>`.
    pub fn asc(table: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(table, field, Direction::Asc)
    }

    /// Descending sort on `<table>.<field>`.
    pub fn desc(table: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(table, field, Direction::Desc)
    }

    /// Renders `ORDER BY <field> <direction>`.
    pub fn build(&self) -> String {
        format!("ORDER BY {} {}", self.field, self.direction)
    }
}

/// Declarative description of a star listing: filters per table, at most
/// one ordering and an optional row cap.
///
/// Tables keep their first-insertion order and filters keep their
/// insertion order within a table, so compilation is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StarQuery {
    filters: Vec<(String, Vec<Filter>)>,
    ordering: Option<Ordering>,
    limit: Option<u32>,
}

impl StarQuery {
    /// Query with no filters, ordering or limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `filter` to the conditions on `table`.
    pub fn filter(mut self, table: impl Into<String>, filter: Filter) -> Self {
        let table = table.into();
        match self.filters.iter_mut().find(|(name, _)| *name == table) {
            Some((_, filters)) => filters.push(filter),
            None => self.filters.push((table, vec![filter])),
        }
        self
    }

    /// Replaces any previous ordering.
    pub fn order(mut self, ordering: Ordering) -> Self {
        self.ordering = Some(ordering);
        self
    }

    /// Replaces any previous limit. Zero is not rejected here.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Filters registered on `table`, in insertion order.
    pub fn filters_for(&self, table: &str) -> &[Filter] {
        self.filters
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, filters)| filters.as_slice())
            .unwrap_or(&[])
    }

    /// Filtered tables in first-insertion order.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(|(name, _)| name.as_str())
    }

    /// Total number of filters across all tables.
    pub fn filter_count(&self) -> usize {
        self.filters.iter().map(|(_, filters)| filters.len()).sum()
    }

    /// The ordering, if one was set.
    pub fn ordering(&self) -> Option<&Ordering> {
        self.ordering.as_ref()
    }

    /// The `TOP` limit, if one was set.
    pub fn row_limit(&self) -> Option<u32> {
        self.limit
    }

    /// Compiles the query to ADQL, one clause per line.
    pub fn build(&self) -> String {
        let mut sql = String::new();

        match self.limit {
            Some(limit) => push_line(&mut sql, &format!("SELECT TOP {limit}")),
            None => push_line(&mut sql, "SELECT"),
        }
        push_line(&mut sql, "    basic.oid,");
        push_line(&mut sql, "    ident.id,");
        push_line(&mut sql, "    otypedef.description");
        push_line(&mut sql, "FROM ident");
        push_line(&mut sql, "JOIN basic ON basic.oid = ident.oidref");
        self.push_filters(&mut sql, BASIC);
        self.push_filters(&mut sql, IDENT);

        push_line(&mut sql, "LEFT JOIN otypedef ON otypedef.otype = basic.otype");
        self.push_filters(&mut sql, OTYPEDEF);

        for (table, _) in &self.filters {
            if BASE_TABLES.contains(&table.as_str()) {
                continue;
            }
            push_line(&mut sql, &format!("JOIN {table} ON {table}.oidref = ident.oidref"));
            self.push_filters(&mut sql, table);
        }

        if let Some(ordering) = &self.ordering {
            let table = ordering.table.as_str();
            // base tables are always part of the join chain
            if self.filters_for(table).is_empty() && !BASE_TABLES.contains(&table) {
                push_line(
                    &mut sql,
                    &format!("LEFT JOIN {table} ON {table}.oidref = ident.oidref"),
                );
            }
            push_line(&mut sql, &ordering.build());
        }

        sql
    }

    fn push_filters(&self, sql: &mut String, table: &str) {
        for filter in self.filters_for(table) {
            push_line(sql, &format!("AND {}", filter.build(table)));
        }
    }
}

impl fmt::Display for StarQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}

fn push_line(sql: &mut String, line: &str) {
    sql.push_str(line);
    sql.push('\n');
}

/// Fetch function injected into an [`AdqlQueryBuilder`]: compiled ADQL in,
/// star overviews out.
pub type FetchFn<'a> = Box<dyn FnOnce(String) -> Vec<StarOverview> + Send + 'a>;

/// Fluent builder for one star listing request.
///
/// Wraps a [`StarQuery`] together with the function that executes compiled
/// ADQL. [`AdqlQueryBuilder::fetch`] consumes the builder, so every request
/// gets a fresh one from
/// [`StarDataSource::list_stars_request`](crate::source::StarDataSource::list_stars_request).
///
/// ```
/// use celestial_simbad::query::{AdqlQueryBuilder, Filter, Ordering};
///
/// let builder = AdqlQueryBuilder::new(|_sql| Vec::new())
///     .filter("ident", Filter::like("id", "NAME %Sirius%"))
///     .order(Ordering::asc("allfluxes", "V"))
///     .limit(10);
/// assert!(builder.build().contains("TOP 10"));
/// ```
pub struct AdqlQueryBuilder<'a> {
    query: StarQuery,
    fetch: FetchFn<'a>,
}

impl<'a> AdqlQueryBuilder<'a> {
    /// Builder over an empty query.
    pub fn new(fetch: impl FnOnce(String) -> Vec<StarOverview> + Send + 'a) -> Self {
        Self::with_query(StarQuery::new(), fetch)
    }

    /// Builder starting from an existing query.
    pub fn with_query(
        query: StarQuery,
        fetch: impl FnOnce(String) -> Vec<StarOverview> + Send + 'a,
    ) -> Self {
        Self {
            query,
            fetch: Box::new(fetch),
        }
    }

    /// See [`StarQuery::filter`].
    pub fn filter(mut self, table: impl Into<String>, filter: Filter) -> Self {
        self.query = self.query.filter(table, filter);
        self
    }

    /// See [`StarQuery::order`].
    pub fn order(mut self, ordering: Ordering) -> Self {
        self.query = self.query.order(ordering);
        self
    }

    /// See [`StarQuery::limit`].
    pub fn limit(mut self, limit: u32) -> Self {
        self.query = self.query.limit(limit);
        self
    }

    /// The query built so far.
    pub fn query(&self) -> &StarQuery {
        &self.query
    }

    /// Compiled ADQL for the query built so far.
    pub fn build(&self) -> String {
        self.query.build()
    }

    /// Compiles the query and hands the text to the fetch function.
    pub fn fetch(self) -> Vec<StarOverview> {
        let sql = self.query.build();
        (self.fetch)(sql)
    }
}

impl fmt::Debug for AdqlQueryBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdqlQueryBuilder")
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}
