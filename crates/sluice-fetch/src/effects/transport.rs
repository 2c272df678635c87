use std::io::Read;
use std::time::Duration;

use crate::error::{TransportError, TransportErrorKind};

/// Opens HTTP connections and owns the retry policy.
///
/// The downloader never decides on its own which failures are transient:
/// it asks [`Transport::is_retryable`] and stops after
/// [`Transport::max_retry_count`] retries.
///
/// # Implementations
///
/// - [`ReqwestTransport`](crate::ReqwestTransport): blocking `reqwest` client
/// - scripted transports in tests
pub trait Transport: Send + Sync {
    /// Sends a GET request for `uri` and returns once headers are available.
    fn open(&self, uri: &str) -> Result<Box<dyn TransportResponse>, TransportError>;

    /// Number of retries allowed after the first attempt.
    fn max_retry_count(&self) -> u32;

    /// Whether `error` is a transient condition worth another attempt.
    fn is_retryable(&self, error: &TransportError) -> bool;

    /// Base delay for exponential backoff between attempts.
    fn retry_backoff(&self) -> Duration {
        Duration::ZERO
    }
}

/// An open response whose headers have been received.
pub trait TransportResponse: Send {
    /// HTTP status code. Fails when the status line could not be parsed.
    fn status_code(&self) -> Result<u16, TransportError>;

    /// Declared body length, `None` when absent or unparsable.
    fn content_length(&self) -> Option<u64>;

    fn is_chunked(&self) -> bool;

    /// All response headers rendered for diagnostics.
    fn headers_string(&self) -> String;

    /// Takes the body stream. Can be called once.
    fn body(&mut self) -> Result<Box<dyn Read + Send>, TransportError>;

    /// Drops the connection without reading the rest of the body.
    fn release(&mut self);
}

/// Options for [`ReqwestTransport`](crate::ReqwestTransport).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use sluice_fetch::TransportOptions;
///
/// let options = TransportOptions::default()
///     .connect_timeout(Duration::from_secs(3))
///     .max_retry_count(2)
///     .header("Referer", "https://example.com");
/// assert_eq!(options.max_retry_count, 2);
/// ```
#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub max_retry_count: u32,
    pub retry_backoff: Duration,
    pub user_agent: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(7),
            read_timeout: Duration::from_secs(30),
            max_retry_count: 0,
            retry_backoff: Duration::ZERO,
            user_agent: None,
            headers: Vec::new(),
        }
    }
}

impl TransportOptions {
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    #[must_use]
    pub fn max_retry_count(mut self, count: u32) -> Self {
        self.max_retry_count = count;
        self
    }

    #[must_use]
    pub fn retry_backoff(mut self, base: Duration) -> Self {
        self.retry_backoff = base;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Default retry policy: timeouts and interrupted reads are transient.
pub(crate) fn is_transient(error: &TransportError) -> bool {
    matches!(error.kind(), TransportErrorKind::Timeout | TransportErrorKind::Interrupted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = TransportOptions::default();
        assert_eq!(options.connect_timeout, Duration::from_secs(7));
        assert_eq!(options.max_retry_count, 0);
        assert!(options.user_agent.is_none());
        assert!(options.headers.is_empty());
    }

    #[test]
    fn test_builder_chain() {
        let options = TransportOptions::default()
            .read_timeout(Duration::from_secs(30))
            .user_agent("sluice/0.1")
            .header("Accept", "image/*")
            .header("Referer", "https://example.com");
        assert_eq!(options.read_timeout, Duration::from_secs(30));
        assert_eq!(options.user_agent.as_deref(), Some("sluice/0.1"));
        assert_eq!(options.headers.len(), 2);
    }

    #[test]
    fn test_transient_kinds() {
        assert!(is_transient(&TransportError::timeout("read timed out")));
        assert!(is_transient(&TransportError::new(TransportErrorKind::Interrupted, "eintr")));
        assert!(!is_transient(&TransportError::connect("refused")));
        assert!(!is_transient(&TransportError::protocol("bad header")));
    }
}
