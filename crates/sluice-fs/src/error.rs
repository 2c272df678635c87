use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove {path}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to replace {path}")]
    Replace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("path not found: {0}")]
    NotFound(PathBuf),

    #[error("staged file already finished")]
    AlreadyFinished,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Error::Write { path, .. }
            | Error::Read { path, .. }
            | Error::Remove { path, .. }
            | Error::Replace { path, .. }
            | Error::NotFound(path) => Some(path),
            Error::AlreadyFinished => None,
        }
    }
}
