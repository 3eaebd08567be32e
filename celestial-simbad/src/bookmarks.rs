//! Bookmarked stars persisted as a JSON array of [`StarOverview`].
//!
//! The file is read once on open and rewritten in full on every mutation.
//! A missing or unreadable file opens as an empty store.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;
use crate::model::StarOverview;

pub trait Bookmarks {
    /// Adds a star. Re-adding an `oid` already present is a no-op.
    fn add(&mut self, star: StarOverview) -> Result<()>;

    /// Removes the star with `oid`, returning whether one was present.
    fn remove(&mut self, oid: i64) -> Result<bool>;

    fn list(&self) -> &[StarOverview];

    fn clear(&mut self) -> Result<()>;

    fn contains(&self, oid: i64) -> bool {
        self.list().iter().any(|star| star.oid == oid)
    }
}

#[derive(Debug, Clone)]
pub struct BookmarkStore {
    path: PathBuf,
    bookmarks: Vec<StarOverview>,
}

impl BookmarkStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let bookmarks = load_bookmarks(&path);
        debug!(path = %path.display(), count = bookmarks.len(), "loaded bookmarks");
        Self { path, bookmarks }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `bookmarks` to the file and adopts them once the write succeeded.
    fn commit(&mut self, bookmarks: Vec<StarOverview>) -> Result<()> {
        let json = serde_json::to_string_pretty(&bookmarks)?;
        fs::write(&self.path, json)?;
        self.bookmarks = bookmarks;
        Ok(())
    }
}

fn load_bookmarks(path: &Path) -> Vec<StarOverview> {
    match fs::read_to_string(path) {
        Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "ignoring unreadable bookmarks file");
            Vec::new()
        }),
        Err(_) => Vec::new(),
    }
}

impl Bookmarks for BookmarkStore {
    fn add(&mut self, star: StarOverview) -> Result<()> {
        if self.contains(star.oid) {
            return Ok(());
        }
        let mut bookmarks = self.bookmarks.clone();
        bookmarks.push(star);
        self.commit(bookmarks)
    }

    fn remove(&mut self, oid: i64) -> Result<bool> {
        if !self.contains(oid) {
            return Ok(false);
        }
        let bookmarks = self
            .bookmarks
            .iter()
            .filter(|star| star.oid != oid)
            .cloned()
            .collect();
        self.commit(bookmarks)?;
        Ok(true)
    }

    fn list(&self) -> &[StarOverview] {
        &self.bookmarks
    }

    fn clear(&mut self) -> Result<()> {
        self.commit(Vec::new())
    }
}
