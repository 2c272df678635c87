//! Error types for sluice-fetch.

use std::fmt;
use std::io;

use sluice_cache::CacheError;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Broad class of a transport failure.
///
/// The transport's retry policy decides which kinds are worth retrying; the
/// downloader never inspects the kind itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Interrupted,
    Connect,
    Protocol,
    Io,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Timeout => write!(f, "timeout"),
            TransportErrorKind::Interrupted => write!(f, "interrupted"),
            TransportErrorKind::Connect => write!(f, "connect"),
            TransportErrorKind::Protocol => write!(f, "protocol"),
            TransportErrorKind::Io => write!(f, "io"),
            TransportErrorKind::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Error)]
#[error("{kind} error: {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Protocol, message)
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Classifies an I/O error raised while talking to the peer.
    pub fn from_io(err: io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportErrorKind::Timeout,
            io::ErrorKind::Interrupted => TransportErrorKind::Interrupted,
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected => TransportErrorKind::Connect,
            io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
                TransportErrorKind::Protocol
            }
            _ => TransportErrorKind::Io,
        };
        Self::new(kind, err.to_string()).with_source(err)
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        Self::from_io(err)
    }
}

/// Stable diagnostic code attached to every [`DownloadError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCause {
    DownloadCanceled,
    DownloadExceptionAndCanceled,
    PauseDownload,
    GetResponseCodeException,
    ResponseCodeException,
    ContentLengthException,
    OpenDiskCacheException,
    ReadDataException,
    DataNotFullyRead,
    DiskCacheCommitException,
    NotFoundDiskCacheAfterSuccess,
    UnknownException,
}

impl ErrorCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCause::DownloadCanceled => "DOWNLOAD_CANCELED",
            ErrorCause::DownloadExceptionAndCanceled => "DOWNLOAD_EXCEPTION_AND_CANCELED",
            ErrorCause::PauseDownload => "PAUSE_DOWNLOAD",
            ErrorCause::GetResponseCodeException => "DOWNLOAD_GET_RESPONSE_CODE_EXCEPTION",
            ErrorCause::ResponseCodeException => "DOWNLOAD_RESPONSE_CODE_EXCEPTION",
            ErrorCause::ContentLengthException => "DOWNLOAD_CONTENT_LENGTH_EXCEPTION",
            ErrorCause::OpenDiskCacheException => "DOWNLOAD_OPEN_DISK_CACHE_EXCEPTION",
            ErrorCause::ReadDataException => "DOWNLOAD_READ_DATA_EXCEPTION",
            ErrorCause::DataNotFullyRead => "DOWNLOAD_DATA_NOT_FULLY_READ",
            ErrorCause::DiskCacheCommitException => "DOWNLOAD_DISK_CACHE_COMMIT_EXCEPTION",
            ErrorCause::NotFoundDiskCacheAfterSuccess => {
                "DOWNLOAD_NOT_FOUND_DISK_CACHE_AFTER_SUCCESS"
            }
            ErrorCause::UnknownException => "DOWNLOAD_UNKNOWN_EXCEPTION",
        }
    }
}

impl fmt::Display for ErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download canceled")]
    Canceled,

    #[error("download failed and the request was canceled")]
    CanceledAfterFailure {
        #[source]
        source: Box<DownloadError>,
    },

    #[error("download paused by the global pause switch")]
    Paused,

    #[error("failed to read response code (headers: {headers})")]
    ResponseCodeUnavailable {
        headers: String,
        #[source]
        source: TransportError,
    },

    #[error("unexpected response code {code} (headers: {headers})")]
    ResponseCode { code: u16, headers: String },

    #[error("invalid content length {length:?} without chunked transfer (headers: {headers})")]
    ContentLength { length: Option<u64>, headers: String },

    #[error("failed to open disk cache editor")]
    DiskCacheOpen(#[source] CacheError),

    #[error("failed to write downloaded data")]
    DestinationWrite(#[source] io::Error),

    #[error("failed to read response body")]
    ReadData(#[source] TransportError),

    #[error("data not fully read: {completed} of {expected} bytes")]
    IncompleteData { expected: u64, completed: u64 },

    #[error("failed to commit disk cache entry")]
    DiskCacheCommit(#[source] CacheError),

    #[error("disk cache has no entry for {key} right after a successful commit")]
    CacheInconsistency { key: String },

    /// A raw transport failure as seen by the retry loop and the error
    /// tracker. When it ends the download it is wrapped into `Unknown`.
    #[error(transparent)]
    Transport(TransportError),

    #[error("download failed")]
    Unknown(#[source] BoxError),
}

impl DownloadError {
    pub fn cause(&self) -> ErrorCause {
        match self {
            DownloadError::Canceled => ErrorCause::DownloadCanceled,
            DownloadError::CanceledAfterFailure { .. } => ErrorCause::DownloadExceptionAndCanceled,
            DownloadError::Paused => ErrorCause::PauseDownload,
            DownloadError::ResponseCodeUnavailable { .. } => ErrorCause::GetResponseCodeException,
            DownloadError::ResponseCode { .. } => ErrorCause::ResponseCodeException,
            DownloadError::ContentLength { .. } => ErrorCause::ContentLengthException,
            DownloadError::DiskCacheOpen(_) => ErrorCause::OpenDiskCacheException,
            DownloadError::DestinationWrite(_) | DownloadError::ReadData(_) => {
                ErrorCause::ReadDataException
            }
            DownloadError::IncompleteData { .. } => ErrorCause::DataNotFullyRead,
            DownloadError::DiskCacheCommit(_) => ErrorCause::DiskCacheCommitException,
            DownloadError::CacheInconsistency { .. } => ErrorCause::NotFoundDiskCacheAfterSuccess,
            DownloadError::Transport(_) | DownloadError::Unknown(_) => ErrorCause::UnknownException,
        }
    }

    /// `true` when the download ended because the caller canceled it.
    pub fn is_canceled(&self) -> bool {
        matches!(self, DownloadError::Canceled | DownloadError::CanceledAfterFailure { .. })
    }

    /// The underlying transport failure, if this error carries one.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            DownloadError::Transport(e) | DownloadError::ReadData(e) => Some(e),
            DownloadError::ResponseCodeUnavailable { source, .. } => Some(source),
            DownloadError::Unknown(e) => e.downcast_ref::<TransportError>(),
            DownloadError::CanceledAfterFailure { source } => source.transport_error(),
            _ => None,
        }
    }

    /// Failures the transport may classify as transient.
    ///
    /// Only raw connection failures and body read failures qualify; every
    /// other variant is already a final verdict.
    pub(crate) fn retry_candidate(&self) -> Option<&TransportError> {
        match self {
            DownloadError::Transport(e) | DownloadError::ReadData(e) => Some(e),
            _ => None,
        }
    }

    /// Converts an error that ends the download into its public form.
    pub(crate) fn into_terminal(self) -> Self {
        match self {
            DownloadError::Transport(e) => DownloadError::Unknown(Box::new(e)),
            other => other,
        }
    }
}
