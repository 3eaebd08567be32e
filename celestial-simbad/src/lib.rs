//! Client for the SIMBAD astronomical object database.
//!
//! Queries are compiled to text, sent to a SIMBAD mirror over HTTP, and the
//! reply is framed into a plain-text header and a VOTable payload that is
//! read row by row into domain records.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`query::script`] | [`QueryScript`](query::QueryScript) compiler for the `sim-script` endpoint |
//! | [`query::adql`] | [`StarQuery`](query::StarQuery), [`Filter`](query::Filter), [`Ordering`](query::Ordering) and the [`AdqlQueryBuilder`](query::AdqlQueryBuilder) |
//! | [`client`] | [`Simbad`] request URLs and the [`Transport`](client::Transport) seam |
//! | [`response`] | Header framing, [`HeaderMetadata`](response::HeaderMetadata), error sections |
//! | [`table`] | [`TableAdapter`](table::TableAdapter) / [`RowCursor`](table::RowCursor) and the VOTable reader |
//! | [`source`] | [`StarDataSource`] and the SIMBAD-backed [`SimbadSqlSource`] |
//! | [`background`] | Async wrapper running a source on tokio's blocking pool |
//! | [`bookmarks`] | JSON-file bookmark store |
//!
//! # Quick Start
//!
//! ```no_run
//! use celestial_simbad::query::{Filter, Ordering};
//! use celestial_simbad::{Simbad, SimbadConfig, SimbadSqlSource, StarDataSource};
//!
//! let source = SimbadSqlSource::new(Simbad::new(SimbadConfig::from_env())?);
//!
//! let stars = source
//!     .list_stars_request()
//!     .filter("ident", Filter::like("id", "NAME %Sirius%"))
//!     .order(Ordering::asc("allfluxes", "V"))
//!     .limit(10)
//!     .fetch();
//!
//! for star in &stars {
//!     println!("{} {} ({})", star.oid, star.name, star.otype);
//! }
//!
//! if let Some(first) = stars.first() {
//!     let details = source.star_details(first.oid);
//!     println!("{:?}", details);
//! }
//! # Ok::<(), celestial_simbad::SimbadError>(())
//! ```
//!
//! # Failure model
//!
//! The low-level pieces ([`Simbad`], [`response`], [`table`]) return
//! [`Result`]. [`StarDataSource`] does not: listings degrade to an empty
//! `Vec` and detail lookups to `None`, with the cause logged via `tracing`.
//!
//! # Features
//!
//! - **`cli`**: Enables the `simbad` binary.
//! - **`integration-tests`**: Enables tests against the live service.

pub mod background;
pub mod bookmarks;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod query;
pub mod response;
pub mod source;
pub mod table;

pub use background::BackgroundSource;
pub use bookmarks::{BookmarkStore, Bookmarks};
pub use client::{HttpTransport, Simbad, Transport};
pub use config::SimbadConfig;
pub use error::{Result, SimbadError};
pub use model::{StarDetails, StarOverview};
pub use response::{HeaderMetadata, SimbadResponse};
pub use source::{SimbadSqlSource, StarDataSource};
