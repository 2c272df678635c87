#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error(transparent)]
    Fs(#[from] sluice_fs::Error),

    #[error("disk cache is closed")]
    Closed,

    #[error("editor for {key} was invalidated by a concurrent cache reset")]
    EditorInvalidated { key: String },

    #[error("entry file for {key} disappeared before it could be committed")]
    EntryMissing { key: String },

    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;
