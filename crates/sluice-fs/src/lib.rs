//! Atomic filesystem primitives.
//!
//! Everything here follows one rule: readers of a destination path observe
//! either the old content or the new content, never a partial write. New
//! bytes always go to a sibling temporary file first and are promoted with a
//! rename.
//!
//! - [`atomic_write`] / [`atomic_read`] for whole-buffer writes
//! - [`StagedFile`] for streaming writes that are promoted or discarded later
//! - [`scan_files`] for rebuilding an index from a directory

mod error;
mod primitives;
mod scan;
mod staged;

pub use error::{Error, Result};
pub use primitives::{
    Options, ReplaceOptions, atomic_read, atomic_write, remove_file_if_exists, replace_file,
};
pub use scan::{FileRecord, scan_files};
pub use staged::StagedFile;

pub(crate) fn temp_name(prefix: &str) -> String {
    format!("{prefix}.{}.tmp", uuid::Uuid::new_v4().simple())
}
