use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub len: u64,
    pub modified: SystemTime,
}

impl FileRecord {
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }
}

/// Lists the regular files directly inside `dir`, oldest first.
///
/// Hidden files (leading `.`) are skipped. When `extension` is given only
/// files with that extension are returned.
pub fn scan_files(dir: impl AsRef<Path>, extension: Option<&str>) -> Result<Vec<FileRecord>> {
    let dir = dir.as_ref();
    let read_dir = std::fs::read_dir(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound(dir.to_path_buf()),
        _ => Error::Read {
            path: dir.to_path_buf(),
            source: e,
        },
    })?;

    let mut records = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| Error::Read {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();

        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_none_or(|n| n.starts_with('.'));
        if hidden {
            continue;
        }
        if let Some(ext) = extension
            && path.extension().and_then(|e| e.to_str()) != Some(ext)
        {
            continue;
        }

        let metadata = entry.metadata().map_err(|e| Error::Read {
            path: path.clone(),
            source: e,
        })?;
        if !metadata.is_file() {
            continue;
        }

        records.push(FileRecord {
            len: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            path,
        });
    }

    records.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));
    Ok(records)
}
