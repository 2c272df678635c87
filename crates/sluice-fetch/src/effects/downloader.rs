use std::io::{self, Read, Write};
use std::sync::Arc;
use std::thread;

use sluice_cache::{CacheEditor, DiskCache};
use tracing::{debug, error, warn};

use crate::config::Configuration;
use crate::core::{
    ContentLengthCheck, ProgressThrottle, RetryDecision, check_content_length, decide_retry,
    is_fully_read, is_success_status, retry_delay,
};
use crate::data::{DownloadRequest, DownloadResult, Progress, RequestStatus};
use crate::effects::TransportResponse;
use crate::error::{DownloadError, TransportError};

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Runs the lock / lookup / download / commit sequence for requests.
///
/// `download` blocks the calling thread; run it on a worker pool for
/// concurrency. One `Downloader` can serve any number of threads at once.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use sluice_cache::{DiskCacheOptions, LruDiskCache};
/// use sluice_fetch::{
///     Configuration, DownloadRequest, Downloader, ReqwestTransport, TransportOptions,
/// };
///
/// let cache = LruDiskCache::open(DiskCacheOptions::new("/tmp/sluice"))?;
/// let transport = ReqwestTransport::new(TransportOptions::default())?;
/// let downloader = Downloader::new(Arc::new(
///     Configuration::builder(Arc::new(cache), Arc::new(transport)).build(),
/// ));
///
/// let result = downloader.download(&DownloadRequest::new("https://example.com/cat.png"))?;
/// println!("{} bytes from {:?}", result.len(), result.source());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct Downloader {
    config: Arc<Configuration>,
}

impl Downloader {
    pub fn new(config: Arc<Configuration>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Arc<Configuration> {
        &self.config
    }

    /// Downloads `request`, serving it from the disk cache when possible.
    ///
    /// On return the request's status is `Done`, `Canceled` or `Failed`.
    /// A paused download reports `Canceled`.
    pub fn download(&self, request: &DownloadRequest) -> Result<DownloadResult, DownloadError> {
        let span = tracing::info_span!(
            "download",
            key = request.log_key(),
            thread = %thread_name()
        );
        let _enter = span.enter();

        let outcome = self.run(request);
        let status = match &outcome {
            Ok(_) => RequestStatus::Done,
            Err(err) if err.is_canceled() || matches!(err, DownloadError::Paused) => {
                RequestStatus::Canceled
            }
            Err(_) => RequestStatus::Failed,
        };
        request.set_status(status);
        outcome
    }

    fn run(&self, request: &DownloadRequest) -> Result<DownloadResult, DownloadError> {
        request.set_status(RequestStatus::CheckingCancel);
        checkpoint(request, "canceled before download")?;

        if request.is_cache_disabled() {
            return self.fetch(request, None);
        }

        let disk_cache = self.config.disk_cache();
        let key = request.cache_key();

        request.set_status(RequestStatus::WaitingForLock);
        let lock = self.config.locks().lock_for(key);
        let _guard = lock.lock();

        checkpoint(request, "canceled after acquiring edit lock")?;

        request.set_status(RequestStatus::CheckingCache);
        if let Some(entry) = disk_cache.get(key) {
            debug!(len = entry.len(), "disk cache hit");
            return Ok(DownloadResult::from_cache(entry));
        }

        self.fetch(request, Some(disk_cache.as_ref()))
    }

    /// The retry loop around [`Self::attempt`].
    fn fetch(
        &self,
        request: &DownloadRequest,
        cache: Option<&dyn DiskCache>,
    ) -> Result<DownloadResult, DownloadError> {
        if self.config.is_global_pause_download() && !request.ignores_global_pause() {
            debug!("global pause download");
            return Err(DownloadError::Paused);
        }

        let transport = self.config.transport();
        let tracker = self.config.error_tracker();
        let max_retry_count = transport.max_retry_count();
        let mut retry_count = 0;

        loop {
            let err = match self.attempt(request, cache) {
                Ok(result) => return Ok(result),
                Err(err) => err,
            };

            tracker.on_download_error(request, &err);
            if matches!(err, DownloadError::Canceled) {
                return Err(err);
            }

            let retryable = err.retry_candidate().is_some_and(|e| transport.is_retryable(e));
            match decide_retry(request.is_canceled(), retryable, retry_count, max_retry_count) {
                RetryDecision::Cancel => {
                    debug!(error = %err, "download failed after cancel");
                    return Err(DownloadError::CanceledAfterFailure {
                        source: Box::new(err.into_terminal()),
                    });
                }
                RetryDecision::Retry => {
                    let delay = retry_delay(retry_count, transport.retry_backoff());
                    retry_count += 1;
                    warn!(
                        attempt = retry_count,
                        max_retry_count,
                        ?delay,
                        error = %err,
                        "download failed, retrying"
                    );
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                }
                RetryDecision::Fail => {
                    let err = err.into_terminal();
                    error!(cause = err.cause().as_str(), error = %err, "download failed");
                    return Err(err);
                }
            }
        }
    }

    /// One connection to the server.
    fn attempt(
        &self,
        request: &DownloadRequest,
        cache: Option<&dyn DiskCache>,
    ) -> Result<DownloadResult, DownloadError> {
        request.set_status(RequestStatus::Connecting);
        let mut response = self
            .config
            .transport()
            .open(request.uri())
            .map_err(DownloadError::Transport)?;

        let result = self.exchange(request, cache, response.as_mut());
        response.release();
        result
    }

    fn exchange(
        &self,
        request: &DownloadRequest,
        cache: Option<&dyn DiskCache>,
        response: &mut dyn TransportResponse,
    ) -> Result<DownloadResult, DownloadError> {
        checkpoint(request, "canceled after opening connection")?;

        request.set_status(RequestStatus::ValidatingResponse);
        let code = response
            .status_code()
            .map_err(|source| DownloadError::ResponseCodeUnavailable {
                headers: response.headers_string(),
                source,
            })?;
        if !is_success_status(code) {
            return Err(DownloadError::ResponseCode {
                code,
                headers: response.headers_string(),
            });
        }

        let content_length = response.content_length();
        let length = check_content_length(content_length, response.is_chunked());
        if length == ContentLengthCheck::Invalid {
            return Err(DownloadError::ContentLength {
                length: content_length,
                headers: response.headers_string(),
            });
        }

        checkpoint(request, "canceled after validating response")?;

        let mut body = response.body().map_err(DownloadError::Transport)?;
        checkpoint(request, "canceled after opening body stream")?;

        request.set_status(RequestStatus::ReadingBody);
        let mut destination = match cache {
            Some(cache) => {
                let editor = cache
                    .edit(request.cache_key())
                    .map_err(DownloadError::DiskCacheOpen)?;
                Destination::Editor(editor)
            }
            None => Destination::Memory(Vec::new()),
        };

        let completed = match read_body(request, body.as_mut(), &mut destination, length) {
            Ok(completed) => completed,
            Err(err) => {
                destination.abort();
                return Err(err);
            }
        };

        if !is_fully_read(length, completed) {
            destination.abort();
            return Err(DownloadError::IncompleteData {
                expected: length.expected().unwrap_or_default(),
                completed,
            });
        }

        if request.is_canceled() {
            destination.abort();
            debug!(completed, "canceled before commit");
            return Err(DownloadError::Canceled);
        }

        request.set_status(RequestStatus::Committing);
        match destination {
            Destination::Memory(data) => {
                debug!(completed, "download finished in memory");
                Ok(DownloadResult::downloaded_bytes(data))
            }
            Destination::Editor(editor) => {
                editor.commit().map_err(DownloadError::DiskCacheCommit)?;
                // the key lock is still held, so the entry must be there
                let key = request.cache_key();
                let entry = cache
                    .and_then(|cache| cache.get(key))
                    .ok_or_else(|| DownloadError::CacheInconsistency { key: key.to_owned() })?;
                debug!(completed, "download committed to disk cache");
                Ok(DownloadResult::downloaded_entry(entry))
            }
        }
    }
}

/// Where the body goes: a cache transaction or a plain buffer.
enum Destination {
    Editor(Box<dyn CacheEditor>),
    Memory(Vec<u8>),
}

impl Destination {
    fn abort(self) {
        if let Destination::Editor(editor) = self {
            editor.abort();
        }
    }
}

impl Write for Destination {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Destination::Editor(editor) => editor.write(buf),
            Destination::Memory(data) => data.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Destination::Editor(editor) => editor.flush(),
            Destination::Memory(_) => Ok(()),
        }
    }
}

/// Streams the body into `destination`, returning the number of bytes read.
fn read_body(
    request: &DownloadRequest,
    body: &mut dyn Read,
    destination: &mut Destination,
    length: ContentLengthCheck,
) -> Result<u64, DownloadError> {
    let total = length.expected();
    let mut buf = [0_u8; READ_BUFFER_SIZE];
    let mut completed = 0_u64;
    let mut throttle = ProgressThrottle::default();

    loop {
        if request.is_canceled() {
            debug!(completed, ?total, "canceled while reading data");
            return Err(DownloadError::Canceled);
        }

        let read = body
            .read(&mut buf)
            .map_err(|e| DownloadError::ReadData(TransportError::from_io(e)))?;
        if read == 0 {
            break;
        }

        destination
            .write_all(&buf[..read])
            .map_err(DownloadError::DestinationWrite)?;
        completed += read as u64;

        if throttle.ready() {
            request.update_progress(Progress::new(total, completed));
        }
    }

    request.update_progress(Progress::new(total, completed));
    destination.flush().map_err(DownloadError::DestinationWrite)?;
    Ok(completed)
}

fn checkpoint(request: &DownloadRequest, stage: &'static str) -> Result<(), DownloadError> {
    if request.is_canceled() {
        debug!("{stage}");
        return Err(DownloadError::Canceled);
    }
    Ok(())
}

fn thread_name() -> String {
    thread::current().name().unwrap_or("<unnamed>").to_owned()
}
