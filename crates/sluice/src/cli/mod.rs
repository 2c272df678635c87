use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use sluice_cache::{DiskCacheOptions, LruDiskCache};
use sluice_fetch::{Configuration, Downloader, ReqwestTransport, TransportOptions};

use crate::config::AppConfig;
use crate::env::SluiceEnv;

pub mod app;
pub mod cache;
pub mod get;

/// Everything a command needs, resolved from the environment and the
/// configuration file.
#[derive(Debug)]
pub struct Context {
    pub env: SluiceEnv,
    pub config: AppConfig,
}

impl Context {
    pub fn new(env: SluiceEnv, config: AppConfig) -> Self {
        Self { env, config }
    }

    pub fn open_cache(&self) -> Result<LruDiskCache> {
        let dir = self.config.cache.dir.clone().unwrap_or_else(|| self.env.cache_dir());
        let options = DiskCacheOptions::new(&dir).max_size(self.config.cache.max_size);
        LruDiskCache::open(options)
            .with_context(|| format!("Failed to open disk cache at {}", dir.display()))
    }

    pub fn transport_options(&self) -> TransportOptions {
        let http = &self.config.http;
        let mut options = TransportOptions::default()
            .connect_timeout(Duration::from_millis(http.connect_timeout_ms))
            .read_timeout(Duration::from_millis(http.read_timeout_ms))
            .max_retry_count(http.max_retry_count)
            .retry_backoff(Duration::from_millis(http.retry_backoff_ms));
        if let Some(user_agent) = &http.user_agent {
            options = options.user_agent(user_agent.clone());
        }
        for (name, value) in &http.headers {
            options = options.header(name.clone(), value.clone());
        }
        options
    }

    pub fn downloader(&self) -> Result<Downloader> {
        let cache = self.open_cache()?;
        let transport = ReqwestTransport::new(self.transport_options())
            .context("Failed to build HTTP client")?;
        let config = Configuration::builder(Arc::new(cache), Arc::new(transport)).build();
        Ok(Downloader::new(Arc::new(config)))
    }
}
