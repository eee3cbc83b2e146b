//! Parse cache shared between evaluators.
//!
//! Keyed by resolved path. Each entry remembers the file's modification time
//! when it was parsed; a lookup with a different time is a miss, so an edited
//! file is re-tokenized on its next use.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use parking_lot::Mutex;
use tracing::trace;

use crate::opcode::ProFile;

struct CacheEntry {
    modified: Option<SystemTime>,
    file: Arc<ProFile>,
}

/// Hit and miss counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: usize,
    /// Lookups that required parsing.
    pub misses: usize,
    /// Files currently cached.
    pub entries: usize,
}

/// Thread-safe cache of parsed files.
#[derive(Default)]
pub struct ParseCache {
    entries: Mutex<HashMap<PathBuf, CacheEntry>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl ParseCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached file for `path` if it was parsed at `modified`.
    #[must_use]
    pub fn lookup(&self, path: &Path, modified: Option<SystemTime>) -> Option<Arc<ProFile>> {
        let entries = self.entries.lock();
        match entries.get(path) {
            Some(entry) if entry.modified == modified => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(path = %path.display(), "parse cache hit");
                Some(Arc::clone(&entry.file))
            }
            stale => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!(path = %path.display(), stale = stale.is_some(), "parse cache miss");
                None
            }
        }
    }

    /// Stores a freshly parsed file.
    pub fn insert(&self, path: &Path, modified: Option<SystemTime>, file: Arc<ProFile>) {
        self.entries
            .lock()
            .insert(path.to_path_buf(), CacheEntry { modified, file });
    }

    /// Drops the entry for `path`. Returns true if there was one.
    pub fn discard(&self, path: &Path) -> bool {
        self.entries.lock().remove(path).is_some()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Returns true if `path` has an entry (fresh or stale).
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.lock().contains_key(path)
    }

    /// Number of cached files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

impl fmt::Debug for ParseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseCache")
            .field("stats", &self.stats())
            .finish()
    }
}
