use crate::{Error, Result};
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Copy, Debug)]
pub struct ReplaceOptions {
    pub retry_count: u32,
    pub retry_delay: Duration,
}

impl Default for ReplaceOptions {
    fn default() -> Self {
        Self {
            retry_count: 5,
            retry_delay: Duration::from_millis(20),
        }
    }
}

impl ReplaceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retry_count(mut self, count: u32) -> Self {
        self.retry_count = count;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}

/// Renames `src` over `dest`, replacing any existing file.
///
/// Windows refuses the rename while another handle has `dest` open, so the
/// rename is retried there. On unix the rename is attempted once.
pub fn replace_file(
    src: impl AsRef<Path>,
    dest: impl AsRef<Path>,
    options: ReplaceOptions,
) -> Result<()> {
    let src = src.as_ref();
    let dest = dest.as_ref();

    #[cfg(not(windows))]
    {
        let _ = options;
        std::fs::rename(src, dest).map_err(|e| Error::Replace {
            path: dest.to_path_buf(),
            source: e,
        })
    }

    #[cfg(windows)]
    {
        let mut attempts = 0;
        loop {
            match std::fs::rename(src, dest) {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied
                    && attempts < options.retry_count =>
                {
                    attempts += 1;
                    std::thread::sleep(options.retry_delay);
                }
                Err(e) => {
                    return Err(Error::Replace {
                        path: dest.to_path_buf(),
                        source: e,
                    });
                }
            }
        }
    }
}

/// Removes `path`, returning whether a file was actually removed.
pub fn remove_file_if_exists(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::Remove {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
