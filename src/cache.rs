//! In-memory memo of computed hashes.
//!
//! Entries are kept in insertion order alongside an index from path to the
//! newest entry for that path. Lookups are O(1) and return the most recent
//! hash; listings walk newest first. Nothing is ever evicted.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::{CacheMode, ListingMode};
use crate::protocol::{listing_line, EMPTY_CACHE_LINE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub hash: String,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: Vec<CacheEntry>,
    latest: HashMap<PathBuf, usize>,
}

#[derive(Debug, Default)]
pub struct ResultCache {
    inner: RwLock<CacheInner>,
    mode: CacheMode,
}

impl ResultCache {
    pub fn new(mode: CacheMode) -> Self {
        Self {
            inner: RwLock::new(CacheInner::default()),
            mode,
        }
    }

    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    // A panicking writer leaves the entries consistent, so poison is ignored.
    fn read(&self) -> RwLockReadGuard<'_, CacheInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn lookup(&self, path: &Path) -> Option<String> {
        let inner = self.read();
        inner
            .latest
            .get(path)
            .map(|&idx| inner.entries[idx].hash.clone())
    }

    /// Record a computed hash.
    ///
    /// With [`CacheMode::AllowDuplicates`] the entry is always added and
    /// becomes the one lookups return. With [`CacheMode::CheckAndInsert`] an
    /// existing entry for the path wins and `false` is returned.
    pub fn insert(&self, path: PathBuf, hash: String) -> bool {
        let mut inner = self.write();
        if self.mode == CacheMode::CheckAndInsert && inner.latest.contains_key(&path) {
            return false;
        }
        let idx = inner.entries.len();
        inner.latest.insert(path.clone(), idx);
        inner.entries.push(CacheEntry { path, hash });
        true
    }

    /// Every entry, newest first. Duplicate paths appear once per insert.
    pub fn snapshot(&self) -> Vec<CacheEntry> {
        self.read().entries.iter().rev().cloned().collect()
    }

    /// Number of entries, counting duplicates.
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    /// Write the listing served to cache inspection requests.
    ///
    /// Returns the number of data lines written; an empty cache produces
    /// one informational line and returns 0.
    pub fn write_listing<W: Write>(&self, out: &mut W, mode: ListingMode) -> std::io::Result<usize> {
        match mode {
            ListingMode::HoldLock => {
                // Inserts block on this guard until the reader has drained
                // the whole listing.
                let inner = self.read();
                write_entries(out, inner.entries.iter().rev())
            }
            ListingMode::Buffered => {
                let entries = self.snapshot();
                write_entries(out, entries.iter())
            }
        }
    }
}

fn write_entries<'a, W, I>(out: &mut W, entries: I) -> std::io::Result<usize>
where
    W: Write,
    I: Iterator<Item = &'a CacheEntry>,
{
    let mut written = 0;
    for entry in entries {
        writeln!(out, "{}", listing_line(&entry.path, &entry.hash))?;
        written += 1;
    }
    if written == 0 {
        writeln!(out, "{}", EMPTY_CACHE_LINE)?;
    }
    out.flush()?;
    Ok(written)
}
