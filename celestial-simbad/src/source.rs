//! Star data source: compiled queries in, domain records out.
//!
//! [`SimbadSqlSource`] runs the whole pipeline for one request:
//!
//! ```text
//! compile → fetch → frame header → error check → open table → map rows → close
//! ```
//!
//! Failures never escape the [`StarDataSource`] methods. A list query that
//! hits any problem, including a single unmappable row, yields an empty
//! list; a detail query yields `None`. The detail is logged through
//! `tracing`.

use tracing::warn;

use crate::client::Simbad;
use crate::error::{Result, SimbadError};
use crate::model::{StarDetails, StarOverview};
use crate::query::{AdqlQueryBuilder, QueryScript, StarQuery};
use crate::response::HeaderMetadata;
use crate::table::{RowCursor, Table, TableAdapter, VoTableAdapter};

pub trait StarDataSource: Send + Sync {
    /// A fresh builder whose `fetch` runs against this source.
    fn list_stars_request(&self) -> AdqlQueryBuilder<'_> {
        AdqlQueryBuilder::new(move |sql| self.fetch_overviews(&sql))
    }

    fn list_stars(&self, query: &StarQuery) -> Vec<StarOverview> {
        self.fetch_overviews(&query.build())
    }

    /// Runs compiled listing ADQL.
    fn fetch_overviews(&self, sql: &str) -> Vec<StarOverview>;

    fn star_details(&self, oid: i64) -> Option<StarDetails>;
}

/// ADQL for a single object by `oid`, restricted to its common name.
pub fn details_query(oid: i64) -> String {
    format!(
        "SELECT oid, id, ra, dec, V, label, description FROM basic\n\
         JOIN ident ON oid = oidref\n\
         LEFT JOIN allfluxes USING(oidref)\n\
         LEFT JOIN otypedef USING(otype)\n\
         WHERE oid = {} AND id LIKE 'NAME%'\n",
        oid
    )
}

/// Output of a raw script run: the header sections and the result table.
#[derive(Debug, Clone)]
pub struct ScriptOutput {
    pub metadata: HeaderMetadata,
    pub table: Table,
}

pub struct SimbadSqlSource {
    simbad: Simbad,
    adapter: Box<dyn TableAdapter>,
}

impl SimbadSqlSource {
    pub fn new(simbad: Simbad) -> Self {
        Self::with_adapter(simbad, VoTableAdapter)
    }

    pub fn with_adapter(simbad: Simbad, adapter: impl TableAdapter + 'static) -> Self {
        Self {
            simbad,
            adapter: Box::new(adapter),
        }
    }

    pub fn simbad(&self) -> &Simbad {
        &self.simbad
    }

    /// Runs arbitrary ADQL and materialises the result.
    pub fn run_adql(&self, sql: &str) -> Result<Table> {
        self.simbad
            .fetch_adql(sql)?
            .into_table(self.adapter.as_ref())
    }

    /// Runs a script and materialises the result, keeping the header.
    pub fn run_script(&self, script: &QueryScript) -> Result<ScriptOutput> {
        let response = self.simbad.fetch_script(script)?;
        let metadata = response.metadata().clone();
        let table = response.into_table(self.adapter.as_ref())?;
        Ok(ScriptOutput { metadata, table })
    }

    fn open_cursor(&self, sql: &str) -> Result<Box<dyn RowCursor>> {
        self.simbad
            .fetch_adql(sql)?
            .open_table(self.adapter.as_ref())
    }

    fn try_list(&self, sql: &str) -> Result<Vec<StarOverview>> {
        let mut cursor = self.open_cursor(sql)?;
        let stars = map_overviews(cursor.as_mut());
        cursor.close();
        stars
    }

    fn try_details(&self, oid: i64) -> Result<Option<StarDetails>> {
        let mut cursor = self.open_cursor(&details_query(oid))?;
        let details = first_details(cursor.as_mut());
        cursor.close();
        details
    }
}

fn map_overviews(cursor: &mut dyn RowCursor) -> Result<Vec<StarOverview>> {
    let mut stars = Vec::new();
    while cursor.next()? {
        let row = cursor
            .row()
            .ok_or_else(|| SimbadError::row("cursor advanced without a row"))?;
        match StarOverview::from_row(row) {
            Ok(star) => stars.push(star),
            Err(e) => {
                warn!(row = %row, error = %e, "invalid table row");
                return Err(e);
            }
        }
    }
    Ok(stars)
}

fn first_details(cursor: &mut dyn RowCursor) -> Result<Option<StarDetails>> {
    if !cursor.next()? {
        return Ok(None);
    }
    let Some(row) = cursor.row() else {
        return Ok(None);
    };
    StarDetails::from_row(row)
        .map(Some)
        .inspect_err(|e| warn!(row = %row, error = %e, "invalid table row"))
}

impl StarDataSource for SimbadSqlSource {
    fn fetch_overviews(&self, sql: &str) -> Vec<StarOverview> {
        match self.try_list(sql) {
            Ok(stars) => stars,
            Err(e) => {
                warn!(error = %e, "star listing failed");
                Vec::new()
            }
        }
    }

    fn star_details(&self, oid: i64) -> Option<StarDetails> {
        match self.try_details(oid) {
            Ok(details) => details,
            Err(e) => {
                warn!(oid, error = %e, "star details lookup failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for SimbadSqlSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimbadSqlSource")
            .field("simbad", &self.simbad)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;

    #[test]
    fn test_details_query_shape() {
        let sql = details_query(1234);
        assert!(sql.starts_with("SELECT oid, id, ra, dec, V, label, description FROM basic\n"));
        assert!(sql.contains("LEFT JOIN allfluxes USING(oidref)\n"));
        assert!(sql.contains("LEFT JOIN otypedef USING(otype)\n"));
        assert!(sql.ends_with("WHERE oid = 1234 AND id LIKE 'NAME%'\n"));
    }

    fn overview_cursor(rows: Vec<[&str; 3]>) -> crate::table::MemoryCursor {
        Table::new(
            vec!["oid".into(), "id".into(), "description".into()],
            rows.into_iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
        .into_cursor()
    }

    #[test]
    fn test_map_overviews_all_good() {
        let mut cursor = overview_cursor(vec![
            ["1", "NAME Sirius", "Star"],
            ["2", "NAME Vega", "Star"],
        ]);
        let stars = map_overviews(&mut cursor).unwrap();
        assert_eq!(stars.len(), 2);
        assert_eq!(stars[1].name, "Vega");
    }

    #[test]
    fn test_map_overviews_stops_on_bad_row() {
        let mut cursor = overview_cursor(vec![
            ["1", "NAME Sirius", "Star"],
            ["x", "NAME Vega", "Star"],
            ["3", "NAME Deneb", "Star"],
        ]);
        assert!(map_overviews(&mut cursor).is_err());
    }

    #[test]
    fn test_first_details_empty_table() {
        let mut cursor = Table::new(vec!["oid".into()], Vec::new()).into_cursor();
        assert!(first_details(&mut cursor).unwrap().is_none());
    }
}
