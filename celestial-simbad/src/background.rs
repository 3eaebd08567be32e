//! Async facade over a blocking [`StarDataSource`].
//!
//! Each call moves the blocking request onto tokio's blocking pool so an
//! async caller never waits on network I/O on its own worker thread.
//! Results keep the source's contract: empty on failure, `None` when no
//! details are available.

use std::sync::Arc;

use tracing::warn;

use crate::model::{StarDetails, StarOverview};
use crate::query::StarQuery;
use crate::source::StarDataSource;

#[derive(Debug)]
pub struct BackgroundSource<S> {
    inner: Arc<S>,
}

impl<S> Clone for BackgroundSource<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: StarDataSource + 'static> BackgroundSource<S> {
    pub fn new(source: S) -> Self {
        Self::from_arc(Arc::new(source))
    }

    pub fn from_arc(inner: Arc<S>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub async fn list_stars(&self, query: StarQuery) -> Vec<StarOverview> {
        let source = Arc::clone(&self.inner);
        match tokio::task::spawn_blocking(move || source.list_stars(&query)).await {
            Ok(stars) => stars,
            Err(e) => {
                warn!(error = %e, "background star listing did not complete");
                Vec::new()
            }
        }
    }

    /// Runs already-compiled listing ADQL.
    pub async fn fetch_overviews(&self, sql: String) -> Vec<StarOverview> {
        let source = Arc::clone(&self.inner);
        match tokio::task::spawn_blocking(move || source.fetch_overviews(&sql)).await {
            Ok(stars) => stars,
            Err(e) => {
                warn!(error = %e, "background star listing did not complete");
                Vec::new()
            }
        }
    }

    pub async fn star_details(&self, oid: i64) -> Option<StarDetails> {
        let source = Arc::clone(&self.inner);
        match tokio::task::spawn_blocking(move || source.star_details(oid)).await {
            Ok(details) => details,
            Err(e) => {
                warn!(oid, error = %e, "background details lookup did not complete");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Filter;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSource {
        seen: Mutex<Vec<String>>,
    }

    impl StarDataSource for FakeSource {
        fn fetch_overviews(&self, sql: &str) -> Vec<StarOverview> {
            self.seen.lock().unwrap().push(sql.to_string());
            vec![StarOverview {
                oid: 1,
                name: "Sirius".to_string(),
                otype: "Star".to_string(),
            }]
        }

        fn star_details(&self, oid: i64) -> Option<StarDetails> {
            if oid == 1 {
                Some(StarDetails {
                    oid,
                    name: "Sirius".to_string(),
                    ra: 101.287,
                    dec: -16.716,
                    magnitude: -1.46,
                    short_type: "SB*".to_string(),
                    otype: "Spectroscopic binary".to_string(),
                })
            } else {
                None
            }
        }
    }

    struct PanickingSource;

    impl StarDataSource for PanickingSource {
        fn fetch_overviews(&self, _sql: &str) -> Vec<StarOverview> {
            panic!("listing exploded");
        }

        fn star_details(&self, _oid: i64) -> Option<StarDetails> {
            panic!("details exploded");
        }
    }

    #[tokio::test]
    async fn test_list_stars_runs_compiled_query() {
        let background = BackgroundSource::new(FakeSource::default());
        let query = StarQuery::new()
            .filter("ident", Filter::like("id", "NAME %Sirius%"))
            .limit(1);
        let expected = query.build();

        let stars = background.list_stars(query).await;
        assert_eq!(stars.len(), 1);
        assert_eq!(stars[0].name, "Sirius");
        assert_eq!(*background.inner().seen.lock().unwrap(), vec![expected]);
    }

    #[tokio::test]
    async fn test_star_details() {
        let background = BackgroundSource::new(FakeSource::default());
        let details = background.star_details(1).await.unwrap();
        assert_eq!(details.short_type, "SB*");
        assert!(background.star_details(2).await.is_none());
    }

    #[tokio::test]
    async fn test_clones_share_source() {
        let background = BackgroundSource::new(FakeSource::default());
        let other = background.clone();
        other.fetch_overviews("SELECT 1".to_string()).await;
        assert_eq!(background.inner().seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_panicking_source_degrades() {
        let background = BackgroundSource::new(PanickingSource);
        assert!(background.list_stars(StarQuery::new()).await.is_empty());
        assert!(background.star_details(7).await.is_none());
    }
}
