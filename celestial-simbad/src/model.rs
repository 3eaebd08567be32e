//! Domain records mapped from SIMBAD table rows.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimbadError};
use crate::table::Row;

/// Prefix of SIMBAD common-name identifiers (`NAME Sirius`).
pub const NAME_PREFIX: &str = "NAME ";

/// Summary of one catalog object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarOverview {
    pub oid: i64,
    pub name: String,
    /// Object type description, e.g. `Double or Multiple Star`.
    pub otype: String,
}

impl StarOverview {
    /// Maps a row carrying `oid`, `id` and `description` columns.
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            oid: row.parse("oid")?,
            name: strip_name_prefix(row.require("id")?)?,
            otype: row.require("description")?.to_string(),
        })
    }
}

/// Full record of one catalog object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarDetails {
    pub oid: i64,
    pub name: String,
    /// Right ascension (ICRS), in degrees.
    pub ra: f64,
    /// Declination (ICRS), in degrees.
    pub dec: f64,
    /// Johnson V magnitude.
    pub magnitude: f32,
    /// Short object type label, e.g. `**`.
    pub short_type: String,
    pub otype: String,
}

impl StarDetails {
    /// Maps a row carrying `oid`, `id`, `ra`, `dec`, `V`, `label` and
    /// `description` columns. A missing magnitude fails the row.
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            oid: row.parse("oid")?,
            name: strip_name_prefix(row.require("id")?)?,
            ra: row.parse("ra")?,
            dec: row.parse("dec")?,
            magnitude: row.parse("V")?,
            short_type: row.require("label")?.to_string(),
            otype: row.require("description")?.to_string(),
        })
    }

    pub fn overview(&self) -> StarOverview {
        StarOverview {
            oid: self.oid,
            name: self.name.clone(),
            otype: self.otype.clone(),
        }
    }
}

/// Drops the fixed-length [`NAME_PREFIX`] from an identifier.
///
/// The prefix is removed by length, not by content; identifiers shorter
/// than the prefix are rejected.
pub fn strip_name_prefix(id: &str) -> Result<String> {
    id.get(NAME_PREFIX.len()..)
        .map(str::to_string)
        .ok_or_else(|| SimbadError::row(format!("identifier '{}' is too short", id)))
}
