use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use sluice_fs::StagedFile;

use crate::key::entry_file_name;
use crate::lock::KeyLockRegistry;
use crate::store::{CacheEditor, CacheEntry, DiskCache};
use crate::{CacheError, Result};

const STAGING_DIR: &str = ".staging";

#[derive(Clone, Debug)]
pub struct DiskCacheOptions {
    pub dir: PathBuf,
    /// Upper bound on the total size of committed entries, in bytes.
    pub max_size: u64,
    pub extension: String,
    /// Registry whose held keys are never evicted. Must be the one the
    /// writers lock with.
    pub locks: Arc<KeyLockRegistry>,
}

impl Default for DiskCacheOptions {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir().join("sluice-cache"),
            max_size: 100 * 1024 * 1024,
            extension: "entry".to_string(),
            locks: KeyLockRegistry::global(),
        }
    }
}

impl DiskCacheOptions {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    #[must_use]
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    #[must_use]
    pub fn locks(mut self, locks: Arc<KeyLockRegistry>) -> Self {
        self.locks = locks;
        self
    }
}

struct Slot {
    key: Option<String>,
    len: u64,
    last_access: u64,
}

#[derive(Default)]
struct State {
    slots: HashMap<String, Slot>,
    total: u64,
    tick: u64,
}

impl State {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

struct Inner {
    options: DiskCacheOptions,
    staging_dir: PathBuf,
    state: Mutex<State>,
    generation: AtomicU64,
    closed: AtomicBool,
}

impl Inner {
    fn entry_path(&self, file_name: &str) -> PathBuf {
        self.options.dir.join(file_name)
    }

    /// A slot whose key is locked belongs to a writer that may still look
    /// it up.
    fn is_pinned(&self, slot: &Slot) -> bool {
        slot.key
            .as_deref()
            .is_some_and(|key| self.options.locks.is_locked(key))
    }

    /// Evicts least recently used entries until the total fits, never
    /// touching `keep` or entries of locked keys.
    fn trim(&self, state: &mut State, keep: Option<&str>) {
        while state.total > self.options.max_size {
            let victim = state
                .slots
                .iter()
                .filter(|(name, slot)| Some(name.as_str()) != keep && !self.is_pinned(slot))
                .min_by_key(|(_, slot)| slot.last_access)
                .map(|(name, _)| name.clone());

            let Some(name) = victim else { break };
            if let Some(slot) = state.slots.remove(&name) {
                state.total -= slot.len;
                if let Err(e) = sluice_fs::remove_file_if_exists(self.entry_path(&name)) {
                    tracing::warn!(file = %name, error = %e, "failed to remove evicted entry");
                }
                tracing::debug!(
                    file = %name,
                    key = ?slot.key,
                    len = slot.len,
                    total = state.total,
                    "evicted cache entry"
                );
            }
        }
    }
}

/// Size-bounded disk cache with least-recently-used eviction.
///
/// Layout: each committed entry is one file `<sha256(key)>.<extension>` in
/// the cache directory; editors stream into `.staging/` and commit with a
/// rename, so lookups never see partial data.
#[derive(Clone)]
pub struct LruDiskCache {
    inner: Arc<Inner>,
}

impl LruDiskCache {
    /// Opens (or creates) the cache directory and indexes existing entries.
    ///
    /// Leftover staging files from an interrupted process are removed.
    pub fn open(options: DiskCacheOptions) -> Result<Self> {
        std::fs::create_dir_all(&options.dir).map_err(|e| sluice_fs::Error::Write {
            path: options.dir.clone(),
            source: e,
        })?;

        let staging_dir = options.dir.join(STAGING_DIR);
        if staging_dir.exists() {
            std::fs::remove_dir_all(&staging_dir).map_err(|e| sluice_fs::Error::Remove {
                path: staging_dir.clone(),
                source: e,
            })?;
        }

        let mut state = State::default();
        for record in sluice_fs::scan_files(&options.dir, Some(&options.extension))? {
            let Some(name) = record.file_name().map(str::to_owned) else {
                continue;
            };
            let last_access = state.next_tick();
            state.total += record.len;
            let slot = Slot {
                key: None,
                len: record.len,
                last_access,
            };
            state.slots.insert(name, slot);
        }

        tracing::debug!(
            dir = %options.dir.display(),
            entries = state.slots.len(),
            total = state.total,
            "opened disk cache"
        );

        let inner = Inner {
            options,
            staging_dir,
            state: Mutex::new(State::default()),
            generation: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        };
        inner.trim(&mut state, None);
        *inner.state.lock() = state;

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.inner.options.dir
    }

    pub fn entry_count(&self) -> usize {
        self.inner.state.lock().slots.len()
    }
}

impl DiskCache for LruDiskCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        if self.is_closed() {
            return None;
        }

        let name = entry_file_name(key, &self.inner.options.extension);
        let path = self.inner.entry_path(&name);
        let mut state = self.inner.state.lock();

        let len = state.slots.get(&name)?.len;
        if !path.is_file() {
            // removed behind our back
            if let Some(slot) = state.slots.remove(&name) {
                state.total -= slot.len;
            }
            return None;
        }

        let tick = state.next_tick();
        if let Some(slot) = state.slots.get_mut(&name) {
            slot.last_access = tick;
            slot.key.get_or_insert_with(|| key.to_owned());
        }
        Some(CacheEntry::new(key, path, len))
    }

    fn edit(&self, key: &str) -> Result<Box<dyn CacheEditor>> {
        if self.is_closed() {
            return Err(CacheError::Closed);
        }

        let staged = StagedFile::create_in(&self.inner.staging_dir)?;
        Ok(Box::new(LruEditor {
            inner: Arc::clone(&self.inner),
            key: key.to_owned(),
            staged: Some(staged),
            generation: self.inner.generation.load(Ordering::Acquire),
        }))
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let name = entry_file_name(key, &self.inner.options.extension);
        let mut state = self.inner.state.lock();
        if let Some(slot) = state.slots.remove(&name) {
            state.total -= slot.len;
        }
        Ok(sluice_fs::remove_file_if_exists(self.inner.entry_path(&name))?)
    }

    fn clear(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        self.inner.generation.fetch_add(1, Ordering::AcqRel);

        let options = &self.inner.options;
        for record in sluice_fs::scan_files(&options.dir, Some(&options.extension))? {
            sluice_fs::remove_file_if_exists(&record.path)?;
        }
        let removed = state.slots.len();
        state.slots.clear();
        state.total = 0;

        tracing::debug!(removed, "cleared disk cache");
        Ok(())
    }

    fn size(&self) -> u64 {
        self.inner.state.lock().total
    }

    fn max_size(&self) -> u64 {
        self.inner.options.max_size
    }

    fn close(&self) {
        let _state = self.inner.state.lock();
        self.inner.closed.store(true, Ordering::Release);
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

struct LruEditor {
    inner: Arc<Inner>,
    key: String,
    staged: Option<StagedFile>,
    generation: u64,
}

impl LruEditor {
    fn staged(&mut self) -> io::Result<&mut StagedFile> {
        self.staged
            .as_mut()
            .ok_or_else(|| io::Error::other("cache editor already finished"))
    }
}

impl Write for LruEditor {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.staged()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.staged()?.flush()
    }
}

impl CacheEditor for LruEditor {
    fn key(&self) -> &str {
        &self.key
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        let Some(staged) = self.staged.take() else {
            return Err(CacheError::EntryMissing { key: self.key.clone() });
        };

        let mut state = self.inner.state.lock();
        if self.inner.closed.load(Ordering::Acquire) {
            staged.discard();
            return Err(CacheError::Closed);
        }
        if self.inner.generation.load(Ordering::Acquire) != self.generation {
            staged.discard();
            return Err(CacheError::EditorInvalidated { key: self.key.clone() });
        }

        let name = entry_file_name(&self.key, &self.inner.options.extension);
        let len = staged.persist(self.inner.entry_path(&name))?;

        let slot = Slot {
            key: Some(self.key.clone()),
            len,
            last_access: state.next_tick(),
        };
        if let Some(previous) = state.slots.insert(name.clone(), slot) {
            state.total -= previous.len;
        }
        state.total += len;
        self.inner.trim(&mut state, Some(&name));

        tracing::debug!(key = %self.key, len, total = state.total, "committed cache entry");
        Ok(())
    }

    fn abort(mut self: Box<Self>) {
        if let Some(staged) = self.staged.take() {
            staged.discard();
            tracing::trace!(key = %self.key, "aborted cache editor");
        }
    }
}

impl Drop for LruEditor {
    fn drop(&mut self) {
        if let Some(staged) = self.staged.take() {
            tracing::warn!(key = %self.key, "cache editor dropped without commit or abort");
            staged.discard();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_entry(cache: &LruDiskCache, key: &str, data: &[u8]) {
        let mut editor = cache.edit(key).unwrap();
        editor.write_all(data).unwrap();
        editor.commit().unwrap();
    }

    #[test]
    fn test_commit_then_get() {
        let dir = tempdir().unwrap();
        let cache = LruDiskCache::open(DiskCacheOptions::new(dir.path())).unwrap();

        assert!(cache.get("a").is_none());
        write_entry(&cache, "a", b"hello");

        let entry = cache.get("a").unwrap();
        assert_eq!(entry.key(), "a");
        assert_eq!(entry.len(), 5);
        assert_eq!(entry.read_all().unwrap(), b"hello");
        assert_eq!(cache.size(), 5);
    }

    #[test]
    fn test_uncommitted_write_is_invisible() {
        let dir = tempdir().unwrap();
        let cache = LruDiskCache::open(DiskCacheOptions::new(dir.path())).unwrap();
        write_entry(&cache, "a", b"old");

        let mut editor = cache.edit("a").unwrap();
        editor.write_all(b"new content").unwrap();
        editor.flush().unwrap();
        assert_eq!(cache.get("a").unwrap().read_all().unwrap(), b"old");

        editor.commit().unwrap();
        assert_eq!(cache.get("a").unwrap().read_all().unwrap(), b"new content");
        assert_eq!(cache.size(), 11);
    }

    #[test]
    fn test_abort_leaves_no_trace() {
        let dir = tempdir().unwrap();
        let cache = LruDiskCache::open(DiskCacheOptions::new(dir.path())).unwrap();
        write_entry(&cache, "a", b"old");

        let mut editor = cache.edit("a").unwrap();
        editor.write_all(b"partial").unwrap();
        editor.abort();

        assert_eq!(cache.get("a").unwrap().read_all().unwrap(), b"old");
        assert_eq!(std::fs::read_dir(dir.path().join(STAGING_DIR)).unwrap().count(), 0);
    }

    #[test]
    fn test_dropped_editor_aborts() {
        let dir = tempdir().unwrap();
        let cache = LruDiskCache::open(DiskCacheOptions::new(dir.path())).unwrap();
        {
            let mut editor = cache.edit("a").unwrap();
            editor.write_all(b"partial").unwrap();
        }
        assert!(cache.get("a").is_none());
        assert_eq!(std::fs::read_dir(dir.path().join(STAGING_DIR)).unwrap().count(), 0);
    }

    #[test]
    fn test_clear_invalidates_open_editor() {
        let dir = tempdir().unwrap();
        let cache = LruDiskCache::open(DiskCacheOptions::new(dir.path())).unwrap();
        write_entry(&cache, "a", b"data");

        let mut editor = cache.edit("b").unwrap();
        editor.write_all(b"data").unwrap();
        cache.clear().unwrap();

        let err = editor.commit().unwrap_err();
        assert!(matches!(err, CacheError::EditorInvalidated { .. }));
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_none());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_closed_cache_rejects_writes() {
        let dir = tempdir().unwrap();
        let cache = LruDiskCache::open(DiskCacheOptions::new(dir.path())).unwrap();
        write_entry(&cache, "a", b"data");

        let editor = cache.edit("b").unwrap();
        cache.close();

        assert!(cache.is_closed());
        assert!(cache.get("a").is_none());
        assert!(matches!(editor.commit().unwrap_err(), CacheError::Closed));
        assert!(matches!(cache.edit("c").err(), Some(CacheError::Closed)));
    }

    #[test]
    fn test_lru_eviction_keeps_recent_entries() {
        let dir = tempdir().unwrap();
        let cache = LruDiskCache::open(DiskCacheOptions::new(dir.path()).max_size(10)).unwrap();

        write_entry(&cache, "a", b"1234");
        write_entry(&cache, "b", b"1234");
        assert!(cache.get("a").is_some());
        write_entry(&cache, "c", b"1234");

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.size(), 8);
    }

    #[test]
    fn test_oversized_entry_survives_its_own_commit() {
        let dir = tempdir().unwrap();
        let cache = LruDiskCache::open(DiskCacheOptions::new(dir.path()).max_size(4)).unwrap();

        write_entry(&cache, "small", b"12");
        write_entry(&cache, "big", b"123456");

        assert!(cache.get("small").is_none());
        assert_eq!(cache.get("big").unwrap().len(), 6);
    }

    #[test]
    fn test_reopen_indexes_existing_entries() {
        let dir = tempdir().unwrap();
        {
            let cache = LruDiskCache::open(DiskCacheOptions::new(dir.path())).unwrap();
            write_entry(&cache, "a", b"persisted");
            let _pending = cache.edit("b").unwrap();
        }

        let cache = LruDiskCache::open(DiskCacheOptions::new(dir.path())).unwrap();
        assert_eq!(cache.entry_count(), 1);
        assert_eq!(cache.size(), 9);
        assert_eq!(cache.get("a").unwrap().read_all().unwrap(), b"persisted");
    }

    #[test]
    fn test_remove() {
        let dir = tempdir().unwrap();
        let cache = LruDiskCache::open(DiskCacheOptions::new(dir.path())).unwrap();
        write_entry(&cache, "a", b"data");

        assert!(cache.remove("a").unwrap());
        assert!(!cache.remove("a").unwrap());
        assert!(!cache.contains("a"));
        assert_eq!(cache.size(), 0);
    }
}
