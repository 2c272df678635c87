use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use super::progress::{Progress, ProgressCallback};

/// Lifecycle of a request, advanced only by the downloader.
///
/// `Idle → CheckingCancel → WaitingForLock → CheckingCache → Connecting →
/// ValidatingResponse → ReadingBody → Committing → Done`. `WaitingForLock`
/// and `CheckingCache` are skipped when caching is disabled. `Canceled` and
/// `Failed` are terminal and reachable from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum RequestStatus {
    #[default]
    Idle = 0,
    CheckingCancel,
    WaitingForLock,
    CheckingCache,
    Connecting,
    ValidatingResponse,
    ReadingBody,
    Committing,
    Done,
    Canceled,
    Failed,
}

impl RequestStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RequestStatus::CheckingCancel,
            2 => RequestStatus::WaitingForLock,
            3 => RequestStatus::CheckingCache,
            4 => RequestStatus::Connecting,
            5 => RequestStatus::ValidatingResponse,
            6 => RequestStatus::ReadingBody,
            7 => RequestStatus::Committing,
            8 => RequestStatus::Done,
            9 => RequestStatus::Canceled,
            10 => RequestStatus::Failed,
            _ => RequestStatus::Idle,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Done | RequestStatus::Canceled | RequestStatus::Failed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestStatus::Idle => "idle",
            RequestStatus::CheckingCancel => "checking-cancel",
            RequestStatus::WaitingForLock => "waiting-for-lock",
            RequestStatus::CheckingCache => "checking-cache",
            RequestStatus::Connecting => "connecting",
            RequestStatus::ValidatingResponse => "validating-response",
            RequestStatus::ReadingBody => "reading-body",
            RequestStatus::Committing => "committing",
            RequestStatus::Done => "done",
            RequestStatus::Canceled => "canceled",
            RequestStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Default)]
struct RequestState {
    canceled: AtomicBool,
    status: AtomicU8,
}

/// Shared view of a request: cancel it, or watch its status.
///
/// Cheap to clone and safe to hand to other threads. The status is read-only
/// from here.
#[derive(Clone, Default)]
pub struct RequestHandle {
    state: Arc<RequestState>,
}

impl RequestHandle {
    /// Asks the download to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.state.canceled.store(true, Ordering::Release);
    }

    pub fn is_canceled(&self) -> bool {
        self.state.canceled.load(Ordering::Acquire)
    }

    pub fn status(&self) -> RequestStatus {
        RequestStatus::from_u8(self.state.status.load(Ordering::Acquire))
    }

    pub(crate) fn set_status(&self, status: RequestStatus) {
        self.state.status.store(status as u8, Ordering::Release);
    }
}

impl fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandle")
            .field("canceled", &self.is_canceled())
            .field("status", &self.status())
            .finish()
    }
}

/// One logical fetch of one resource.
///
/// # Examples
///
/// ```
/// use sluice_fetch::DownloadRequest;
///
/// let request = DownloadRequest::new("https://example.com/cat.png?token=abc")
///     .disk_cache_key("https://example.com/cat.png");
/// assert_eq!(request.log_key(), "https://example.com/cat.png?token=abc");
/// assert_eq!(request.cache_key(), "https://example.com/cat.png");
/// ```
pub struct DownloadRequest {
    uri: String,
    key: String,
    disk_cache_key: String,
    cache_disabled: bool,
    ignore_global_pause: bool,
    on_progress: Option<ProgressCallback>,
    handle: RequestHandle,
}

impl DownloadRequest {
    /// Creates a request whose log key and disk-cache key are both `uri`.
    pub fn new(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        Self {
            key: uri.clone(),
            disk_cache_key: uri.clone(),
            uri,
            cache_disabled: false,
            ignore_global_pause: false,
            on_progress: None,
            handle: RequestHandle::default(),
        }
    }

    /// Sets the identity used in logs and diagnostics.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Sets the identity used to address the disk cache.
    #[must_use]
    pub fn disk_cache_key(mut self, disk_cache_key: impl Into<String>) -> Self {
        self.disk_cache_key = disk_cache_key.into();
        self
    }

    /// Skips the disk cache: no lock, no lookup, body returned in memory.
    #[must_use]
    pub fn cache_disabled(mut self, disabled: bool) -> Self {
        self.cache_disabled = disabled;
        self
    }

    #[must_use]
    pub fn ignore_global_pause(mut self, ignore: bool) -> Self {
        self.ignore_global_pause = ignore;
        self
    }

    #[must_use]
    pub fn on_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn log_key(&self) -> &str {
        &self.key
    }

    pub fn cache_key(&self) -> &str {
        &self.disk_cache_key
    }

    pub fn is_cache_disabled(&self) -> bool {
        self.cache_disabled
    }

    pub fn ignores_global_pause(&self) -> bool {
        self.ignore_global_pause
    }

    pub fn handle(&self) -> RequestHandle {
        self.handle.clone()
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    pub fn is_canceled(&self) -> bool {
        self.handle.is_canceled()
    }

    pub fn status(&self) -> RequestStatus {
        self.handle.status()
    }

    pub(crate) fn set_status(&self, status: RequestStatus) {
        self.handle.set_status(status);
    }

    pub(crate) fn update_progress(&self, progress: Progress) {
        if let Some(ref callback) = self.on_progress {
            callback(&progress);
        }
    }
}

impl fmt::Debug for DownloadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadRequest")
            .field("uri", &self.uri)
            .field("key", &self.key)
            .field("disk_cache_key", &self.disk_cache_key)
            .field("cache_disabled", &self.cache_disabled)
            .field("ignore_global_pause", &self.ignore_global_pause)
            .field("on_progress", &self.on_progress.as_ref().map(|_| "{ ... }"))
            .field("handle", &self.handle)
            .finish()
    }
}
