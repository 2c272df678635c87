use crate::{Error, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

const BUFFER_CAPACITY: usize = 8 * 1024;

/// A temporary file that is either promoted to its destination or removed.
///
/// Bytes written to a `StagedFile` are invisible at the destination until
/// [`StagedFile::persist`] renames the file into place. Dropping it without
/// persisting removes the temporary file.
pub struct StagedFile {
    writer: Option<BufWriter<File>>,
    path: PathBuf,
    finished: bool,
}

impl StagedFile {
    /// Creates a uniquely named temporary file inside `dir`.
    pub fn create_in(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| Error::Write {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let path = dir.join(crate::temp_name("staged"));
        let file = File::options()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| Error::Write {
                path: path.clone(),
                source: e,
            })?;

        Ok(Self {
            writer: Some(BufWriter::with_capacity(BUFFER_CAPACITY, file)),
            path,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes, syncs, and renames the staged file over `destination`.
    ///
    /// Returns the number of bytes in the promoted file.
    pub fn persist(mut self, destination: impl AsRef<Path>) -> Result<u64> {
        let destination = destination.as_ref();
        let writer = self.writer.take().ok_or(Error::AlreadyFinished)?;

        let file = writer.into_inner().map_err(|e| Error::Write {
            path: self.path.clone(),
            source: e.into_error(),
        })?;
        file.sync_all().map_err(|e| Error::Write {
            path: self.path.clone(),
            source: e,
        })?;
        let len = file
            .metadata()
            .map_err(|e| Error::Read {
                path: self.path.clone(),
                source: e,
            })?
            .len();
        drop(file);

        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        crate::replace_file(&self.path, destination, Default::default())?;
        self.finished = true;
        Ok(len)
    }

    /// Removes the staged file. Never fails; cleanup is best effort.
    pub fn discard(mut self) {
        self.cleanup();
    }

    fn cleanup(&mut self) {
        if self.finished {
            return;
        }
        self.writer = None;
        let _ = std::fs::remove_file(&self.path);
        self.finished = true;
    }
}

impl Write for StagedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.writer.as_mut() {
            Some(writer) => writer.write(buf),
            None => Err(io::Error::other("staged file already finished")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Err(io::Error::other("staged file already finished")),
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        self.cleanup();
    }
}
