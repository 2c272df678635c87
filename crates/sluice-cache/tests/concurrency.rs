use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use sluice_cache::{DiskCache, DiskCacheOptions, KeyLockRegistry, LruDiskCache};
use tempfile::tempdir;

#[test]
fn test_readers_never_observe_partial_writes() {
    let dir = tempdir().unwrap();
    let cache = LruDiskCache::open(DiskCacheOptions::new(dir.path())).unwrap();

    let old = vec![b'a'; 64 * 1024];
    let new = vec![b'b'; 128 * 1024];
    {
        let mut editor = cache.edit("k").unwrap();
        editor.write_all(&old).unwrap();
        editor.commit().unwrap();
    }

    std::thread::scope(|s| {
        let writer = s.spawn(|| {
            let mut editor = cache.edit("k").unwrap();
            for chunk in new.chunks(4096) {
                editor.write_all(chunk).unwrap();
            }
            editor.commit().unwrap();
        });

        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..50 {
                    let data = cache.get("k").unwrap().read_all().unwrap();
                    assert!(data == old || data == new, "observed {} bytes", data.len());
                }
            });
        }

        writer.join().unwrap();
    });

    assert_eq!(cache.get("k").unwrap().read_all().unwrap(), new);
}

#[test]
fn test_key_lock_serializes_editors() {
    let dir = tempdir().unwrap();
    let cache = LruDiskCache::open(DiskCacheOptions::new(dir.path())).unwrap();
    let registry = KeyLockRegistry::new();
    let open_editors = AtomicUsize::new(0);
    let max_open = AtomicUsize::new(0);
    let barrier = Barrier::new(8);

    std::thread::scope(|s| {
        for i in 0..8u8 {
            let cache = &cache;
            let registry = &registry;
            let open_editors = &open_editors;
            let max_open = &max_open;
            let barrier = &barrier;
            s.spawn(move || {
                barrier.wait();
                let lock = registry.lock_for("shared");
                let _guard = lock.lock();

                let mut editor = cache.edit("shared").unwrap();
                let now = open_editors.fetch_add(1, Ordering::SeqCst) + 1;
                max_open.fetch_max(now, Ordering::SeqCst);
                editor.write_all(&[i; 1024]).unwrap();
                std::thread::yield_now();
                open_editors.fetch_sub(1, Ordering::SeqCst);
                editor.commit().unwrap();
            });
        }
    });

    assert_eq!(max_open.load(Ordering::SeqCst), 1);
    assert_eq!(cache.get("shared").unwrap().len(), 1024);
}

fn commit(cache: &LruDiskCache, key: &str, data: &[u8]) {
    let mut editor = cache.edit(key).unwrap();
    editor.write_all(data).unwrap();
    editor.commit().unwrap();
}

#[test]
fn test_eviction_skips_entries_under_held_lock() {
    let dir = tempdir().unwrap();
    let registry = Arc::new(KeyLockRegistry::new());
    let cache = LruDiskCache::open(
        DiskCacheOptions::new(dir.path())
            .max_size(10)
            .locks(Arc::clone(&registry)),
    )
    .unwrap();

    let lock = registry.lock_for("held");
    let guard = lock.lock();
    commit(&cache, "held", &[1; 6]);

    // another writer pushes the cache over its bound while "held" is still locked
    std::thread::scope(|s| {
        s.spawn(|| commit(&cache, "other", &[2; 6])).join().unwrap();
    });

    assert_eq!(cache.get("held").unwrap().read_all().unwrap(), [1; 6]);
    assert!(cache.get("other").is_some());
    assert_eq!(cache.size(), 12);

    drop(guard);
    commit(&cache, "late", &[3; 2]);

    assert!(cache.get("held").is_none());
    assert!(cache.size() <= 10);
}
