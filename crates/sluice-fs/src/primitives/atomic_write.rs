use crate::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

#[derive(Clone, Copy, Debug, Default)]
pub struct Options {
    pub permissions: Option<u32>,
    pub sync: bool,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn permissions(mut self, mode: u32) -> Self {
        self.permissions = Some(mode);
        self
    }

    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }
}

/// Writes `content` to a sibling temporary file and renames it over `path`.
pub fn atomic_write(path: impl AsRef<Path>, content: &[u8], options: Options) -> Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let tmp_path = parent.join(crate::temp_name(".sluice"));

    let mut file = fs::File::create(&tmp_path).map_err(|e| Error::Write {
        path: tmp_path.clone(),
        source: e,
    })?;
    let written = file.write_all(content).and_then(|_| {
        if options.sync {
            file.sync_all()
        } else {
            Ok(())
        }
    });
    drop(file);
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(Error::Write {
            path: tmp_path,
            source: e,
        });
    }

    #[cfg(unix)]
    if let Some(mode) = options.permissions {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp_path, fs::Permissions::from_mode(mode)).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            Error::Write {
                path: tmp_path.clone(),
                source: e,
            }
        })?;
    }

    crate::replace_file(&tmp_path, path, Default::default()).inspect_err(|_| {
        let _ = fs::remove_file(&tmp_path);
    })
}

pub fn atomic_read(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
        _ => Error::Read {
            path: path.to_path_buf(),
            source: e,
        },
    })
}
