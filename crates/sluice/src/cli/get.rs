use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Args, ValueEnum};
use sluice_fetch::{DataSource, DownloadRequest, NetworkKind, PauseDownloadController, Progress};

use super::Context;
use crate::ui::tracker::{ProgressTracker, ProgressTrackerConfig};

#[derive(Args, Clone, Debug)]
pub struct GetArg {
    /// URL to download
    pub url: String,

    /// Disk cache key (defaults to the URL)
    #[arg(long)]
    pub key: Option<String>,

    /// Bypass the disk cache entirely
    #[arg(long)]
    pub no_cache: bool,

    /// Write the downloaded bytes to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Current network, consulted when `pause_on_metered` is enabled
    #[arg(long, value_enum)]
    pub network: Option<NetworkArg>,

    /// Download even while downloads are paused
    #[arg(long)]
    pub ignore_pause: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum NetworkArg {
    Metered,
    Unmetered,
}

impl From<NetworkArg> for NetworkKind {
    fn from(arg: NetworkArg) -> Self {
        match arg {
            NetworkArg::Metered => NetworkKind::Metered,
            NetworkArg::Unmetered => NetworkKind::Unmetered,
        }
    }
}

pub fn get(arg: GetArg, ctx: &Context) -> Result<()> {
    let downloader = ctx.downloader()?;

    if ctx.config.pause_on_metered {
        let controller = PauseDownloadController::new(Arc::clone(downloader.config()));
        controller.set_opened(true);
        if let Some(network) = arg.network {
            controller.update(network.into());
        }
    }

    let tracker = ProgressTracker::new(ProgressTrackerConfig { len: None });
    let bar = tracker.clone();
    let mut request = DownloadRequest::new(&arg.url)
        .cache_disabled(arg.no_cache)
        .ignore_global_pause(arg.ignore_pause)
        .on_progress(Arc::new(move |progress: &Progress| bar.update(progress)));
    if let Some(key) = &arg.key {
        request = request.disk_cache_key(key);
    }

    let result = match downloader.download(&request) {
        Ok(result) => result,
        Err(err) => {
            tracker.abandon();
            let cause = err.cause();
            return Err(err).with_context(|| format!("Failed to download {} ({cause})", arg.url));
        }
    };

    let source = match result.source() {
        DataSource::DiskCache => "disk cache",
        DataSource::Network => "network",
    };
    tracker.finish(Some(format!("{} bytes from {source}", result.len())));

    if let Some(output) = &arg.output {
        let bytes = result.to_bytes().context("Failed to read cached entry")?;
        sluice_fs::atomic_write(output, &bytes, sluice_fs::Options::default())
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("{}", output.display());
    } else if let Some(entry) = result.entry() {
        println!("{}", entry.path().display());
    } else {
        println!("{} bytes", result.len());
    }

    Ok(())
}
