//! Shared engine configuration.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use sluice_cache::{DiskCache, KeyLockRegistry};

use crate::effects::Transport;
use crate::tracker::{ErrorTracker, LogErrorTracker};

/// Collaborators a [`Downloader`](crate::Downloader) works with.
///
/// Built once and shared behind an `Arc`; only the global pause flag changes
/// after construction.
pub struct Configuration {
    disk_cache: Arc<dyn DiskCache>,
    transport: Arc<dyn Transport>,
    error_tracker: Arc<dyn ErrorTracker>,
    locks: Arc<KeyLockRegistry>,
    pause_download: AtomicBool,
}

impl Configuration {
    pub fn builder(
        disk_cache: Arc<dyn DiskCache>,
        transport: Arc<dyn Transport>,
    ) -> ConfigurationBuilder {
        ConfigurationBuilder {
            disk_cache,
            transport,
            error_tracker: None,
            locks: None,
            pause_download: false,
        }
    }

    pub fn disk_cache(&self) -> &Arc<dyn DiskCache> {
        &self.disk_cache
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn error_tracker(&self) -> &Arc<dyn ErrorTracker> {
        &self.error_tracker
    }

    pub fn locks(&self) -> &Arc<KeyLockRegistry> {
        &self.locks
    }

    /// When set, requests that miss the cache fail with
    /// [`DownloadError::Paused`](crate::DownloadError::Paused).
    pub fn is_global_pause_download(&self) -> bool {
        self.pause_download.load(Ordering::Acquire)
    }

    pub fn set_global_pause_download(&self, pause: bool) {
        let previous = self.pause_download.swap(pause, Ordering::AcqRel);
        if previous != pause {
            tracing::info!(pause, "global pause download changed");
        }
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("disk_cache_size", &self.disk_cache.size())
            .field("max_retry_count", &self.transport.max_retry_count())
            .field("pause_download", &self.is_global_pause_download())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Configuration`].
pub struct ConfigurationBuilder {
    disk_cache: Arc<dyn DiskCache>,
    transport: Arc<dyn Transport>,
    error_tracker: Option<Arc<dyn ErrorTracker>>,
    locks: Option<Arc<KeyLockRegistry>>,
    pause_download: bool,
}

impl ConfigurationBuilder {
    /// Defaults to [`LogErrorTracker`].
    #[must_use]
    pub fn error_tracker(mut self, tracker: Arc<dyn ErrorTracker>) -> Self {
        self.error_tracker = Some(tracker);
        self
    }

    /// Defaults to the process-wide [`KeyLockRegistry::global`].
    ///
    /// Pass the same registry the disk cache was opened with, or eviction
    /// cannot tell which entries are still being written.
    #[must_use]
    pub fn locks(mut self, locks: Arc<KeyLockRegistry>) -> Self {
        self.locks = Some(locks);
        self
    }

    #[must_use]
    pub fn pause_download(mut self, pause: bool) -> Self {
        self.pause_download = pause;
        self
    }

    pub fn build(self) -> Configuration {
        Configuration {
            disk_cache: self.disk_cache,
            transport: self.transport,
            error_tracker: self.error_tracker.unwrap_or_else(|| Arc::new(LogErrorTracker)),
            locks: self.locks.unwrap_or_else(KeyLockRegistry::global),
            pause_download: AtomicBool::new(self.pause_download),
        }
    }
}

/// Connectivity as reported by whatever watches the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkKind {
    /// Connected over a link billed by traffic, such as mobile data.
    Metered,
    Unmetered,
    Unavailable,
}

/// Pauses downloads while the device is on a metered network.
///
/// While opened, every [`update`](Self::update) sets the configuration's
/// global pause flag to "connected and metered". Closing the controller
/// clears the flag.
pub struct PauseDownloadController {
    config: Arc<Configuration>,
    state: Mutex<ControllerState>,
}

#[derive(Debug, Default)]
struct ControllerState {
    opened: bool,
    last: Option<NetworkKind>,
}

impl PauseDownloadController {
    pub fn new(config: Arc<Configuration>) -> Self {
        Self {
            config,
            state: Mutex::new(ControllerState::default()),
        }
    }

    pub fn is_opened(&self) -> bool {
        self.state.lock().opened
    }

    /// Opening applies the last known network kind immediately.
    pub fn set_opened(&self, opened: bool) {
        let mut state = self.state.lock();
        if state.opened == opened {
            return;
        }
        state.opened = opened;

        if opened {
            let paused = state.last.is_some_and(Self::pauses);
            self.config.set_global_pause_download(paused);
        } else {
            self.config.set_global_pause_download(false);
        }
    }

    pub fn update(&self, network: NetworkKind) {
        let mut state = self.state.lock();
        state.last = Some(network);
        if state.opened {
            tracing::debug!(?network, "network changed");
            self.config.set_global_pause_download(Self::pauses(network));
        }
    }

    fn pauses(network: NetworkKind) -> bool {
        network == NetworkKind::Metered
    }
}

impl fmt::Debug for PauseDownloadController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PauseDownloadController")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}
