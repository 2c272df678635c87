use crate::data::DownloadRequest;
use crate::error::DownloadError;

/// Observer for failed download attempts.
///
/// Receives every terminal error and every transient error that was retried,
/// whether or not the download eventually succeeded. A cancel observed once a
/// connection attempt has started is reported as
/// [`ErrorCause::DownloadCanceled`](crate::ErrorCause::DownloadCanceled);
/// a cancel before any attempt and [`DownloadError::Paused`] are not.
/// Must not block.
pub trait ErrorTracker: Send + Sync {
    fn on_download_error(&self, request: &DownloadRequest, error: &DownloadError);
}

/// Forwards failures to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorTracker;

impl ErrorTracker for LogErrorTracker {
    fn on_download_error(&self, request: &DownloadRequest, error: &DownloadError) {
        tracing::warn!(
            key = request.log_key(),
            cause = error.cause().as_str(),
            error = %error,
            "download error"
        );
    }
}
