use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{CacheError, Result};

/// A committed cache record.
///
/// Entries are only produced for fully committed writes, so the file behind
/// an entry is never partially written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    key: String,
    path: PathBuf,
    len: u64,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, path: impl Into<PathBuf>, len: u64) -> Self {
        Self {
            key: key.into(),
            path: path.into(),
            len,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn open(&self) -> Result<File> {
        File::open(&self.path).map_err(|e| {
            CacheError::Fs(sluice_fs::Error::Read {
                path: self.path.clone(),
                source: e,
            })
        })
    }

    pub fn read_all(&self) -> Result<Vec<u8>> {
        Ok(sluice_fs::atomic_read(&self.path)?)
    }
}

/// An open write transaction for one cache key.
///
/// Exactly one of [`CacheEditor::commit`] or [`CacheEditor::abort`] ends the
/// transaction. Until then the previously committed entry for the key stays
/// visible to lookups.
pub trait CacheEditor: Write + Send {
    fn key(&self) -> &str;

    /// Publishes the written bytes as the entry for this key.
    fn commit(self: Box<Self>) -> Result<()>;

    /// Discards everything written so far. Best effort; never fails.
    fn abort(self: Box<Self>);
}

/// Transactional key/value store on disk.
///
/// The store does not serialize writers itself; callers that open editors
/// hold the key's [`crate::KeyLock`] for the whole transaction.
pub trait DiskCache: Send + Sync {
    fn get(&self, key: &str) -> Option<CacheEntry>;

    fn edit(&self, key: &str) -> Result<Box<dyn CacheEditor>>;

    fn remove(&self, key: &str) -> Result<bool>;

    /// Drops every entry and invalidates editors that are still open.
    fn clear(&self) -> Result<()>;

    /// Total bytes held by committed entries.
    fn size(&self) -> u64;

    fn max_size(&self) -> u64;

    fn close(&self);

    fn is_closed(&self) -> bool;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}
