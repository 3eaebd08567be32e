//! Query text compilers for the two SIMBAD query surfaces.
//!
//! - [`script`]: the line-oriented `sim-script` language
//! - [`adql`]: star listings over the TAP endpoint, with implicit joins

pub mod adql;
pub mod script;

pub use adql::{
    quote_literal, AdqlQueryBuilder, Direction, FetchFn, Filter, Ordering, StarQuery, BASIC, IDENT,
    OTYPEDEF,
};
pub use script::QueryScript;
