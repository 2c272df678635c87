use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use once_cell::sync::Lazy;
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};

/// Guard returned by [`KeyLock::lock`]; the key is unlocked when it drops.
pub type KeyLockGuard<'a> = ReentrantMutexGuard<'a, ()>;

const INITIAL_PRUNE_THRESHOLD: usize = 64;

static GLOBAL_REGISTRY: Lazy<Arc<KeyLockRegistry>> = Lazy::new(|| Arc::new(KeyLockRegistry::new()));

/// A reentrant lock scoped to one cache key.
///
/// Clones share the same underlying mutex. The registry only keeps a weak
/// reference, so the lock lives exactly as long as some holder or waiter
/// keeps a `KeyLock` for it.
#[derive(Clone)]
pub struct KeyLock {
    key: Arc<str>,
    mutex: Arc<ReentrantMutex<()>>,
}

impl KeyLock {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Blocks the current thread until the key is available.
    pub fn lock(&self) -> KeyLockGuard<'_> {
        self.mutex.lock()
    }

    pub fn try_lock(&self) -> Option<KeyLockGuard<'_>> {
        self.mutex.try_lock()
    }

    pub fn is_locked(&self) -> bool {
        self.mutex.is_locked()
    }

    /// Returns `true` if both handles guard the same key instance.
    pub fn same_lock(&self, other: &KeyLock) -> bool {
        Arc::ptr_eq(&self.mutex, &other.mutex)
    }
}

impl fmt::Debug for KeyLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyLock")
            .field("key", &self.key)
            .field("locked", &self.is_locked())
            .finish()
    }
}

struct Slots {
    map: HashMap<String, Weak<ReentrantMutex<()>>>,
    prune_at: usize,
}

impl Slots {
    fn prune(&mut self) -> usize {
        let before = self.map.len();
        self.map.retain(|_, lock| lock.strong_count() > 0);
        self.prune_at = (self.map.len() * 2).max(INITIAL_PRUNE_THRESHOLD);
        before - self.map.len()
    }
}

/// Identity map from cache key to [`KeyLock`].
///
/// Entries whose lock is no longer referenced are dropped lazily: whenever
/// the map grows past a threshold, dead slots are swept and the threshold
/// is reset to twice the live count.
pub struct KeyLockRegistry {
    slots: Mutex<Slots>,
}

impl fmt::Debug for KeyLockRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyLockRegistry")
            .field("slots", &self.slot_count())
            .finish()
    }
}

impl Default for KeyLockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyLockRegistry {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Slots {
                map: HashMap::new(),
                prune_at: INITIAL_PRUNE_THRESHOLD,
            }),
        }
    }

    /// The process-wide registry.
    pub fn global() -> Arc<KeyLockRegistry> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    pub fn lock_for(&self, key: &str) -> KeyLock {
        let mut slots = self.slots.lock();

        if let Some(mutex) = slots.map.get(key).and_then(Weak::upgrade) {
            return KeyLock {
                key: Arc::from(key),
                mutex,
            };
        }

        let mutex = Arc::new(ReentrantMutex::new(()));
        slots.map.insert(key.to_owned(), Arc::downgrade(&mutex));
        if slots.map.len() >= slots.prune_at {
            let removed = slots.prune();
            tracing::trace!(removed, live = slots.map.len(), "pruned key lock registry");
        }

        KeyLock {
            key: Arc::from(key),
            mutex,
        }
    }

    /// Returns `true` if some thread currently holds the lock for `key`.
    ///
    /// Waiters alone do not count.
    pub fn is_locked(&self, key: &str) -> bool {
        self.slots
            .lock()
            .map
            .get(key)
            .and_then(Weak::upgrade)
            .is_some_and(|mutex| mutex.is_locked())
    }

    /// Number of keys whose lock is still referenced somewhere.
    pub fn live_count(&self) -> usize {
        self.slots
            .lock()
            .map
            .values()
            .filter(|lock| lock.strong_count() > 0)
            .count()
    }

    /// Sweeps unreferenced slots now, returning how many were removed.
    pub fn prune(&self) -> usize {
        self.slots.lock().prune()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.lock().map.len()
    }
}
