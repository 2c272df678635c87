//! Storage side of the download engine.
//!
//! - [`KeyLockRegistry`] hands out one reentrant lock per cache key so that
//!   writers for the same key serialize.
//! - [`DiskCache`] is the transactional store contract: lookups return
//!   committed [`CacheEntry`] values, writes go through a [`CacheEditor`] that
//!   is either committed or aborted.
//! - [`LruDiskCache`] is the filesystem implementation, bounded by size.

mod error;
mod key;
mod lock;
mod lru;
mod store;

pub use error::{CacheError, Result};
pub use key::entry_file_name;
pub use lock::{KeyLock, KeyLockGuard, KeyLockRegistry};
pub use lru::{DiskCacheOptions, LruDiskCache};
pub use store::{CacheEditor, CacheEntry, DiskCache};
