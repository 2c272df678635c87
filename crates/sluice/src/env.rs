use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use home::home_dir;

/// On-disk layout rooted at `$SLUICE_ROOT`, or `~/.sluice` when unset.
#[derive(Debug, Clone)]
pub struct SluiceEnv {
    root: PathBuf,
}

impl SluiceEnv {
    pub fn new() -> Result<Self> {
        let root = match env::var_os("SLUICE_ROOT") {
            Some(root) => PathBuf::from(root),
            None => home_dir().context("Failed to get home directory")?.join(".sluice"),
        };
        Ok(Self::from_root(root))
    }

    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }
}
