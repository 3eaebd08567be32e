//! SIMBAD script language compiler.
//!
//! A script is a short list of directives executed by the `sim-script`
//! endpoint. [`QueryScript`] produces the four-line form used for VOTable
//! output:
//!
//! ```text
//! set limit 10
//! votable {main_id,ra,dec}
//! votable open
//! query sample Vmag < 2
//! ```
//!
//! The criteria clause is not validated; SIMBAD reports malformed criteria
//! in the `::error::` section of the response.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryScript {
    pub limit: u32,
    pub fields: Vec<String>,
    pub criteria: String,
}

impl QueryScript {
    pub fn new<I, S>(limit: u32, fields: I, criteria: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            limit,
            fields: fields.into_iter().map(Into::into).collect(),
            criteria: criteria.into(),
        }
    }

    pub fn build(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for QueryScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "set limit {}", self.limit)?;
        writeln!(f, "votable {{{}}}", self.fields.join(","))?;
        writeln!(f, "votable open")?;
        write!(f, "query sample {}", self.criteria)
    }
}
