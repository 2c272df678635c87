use std::io::{self, Read};
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, TRANSFER_ENCODING};

use super::transport::{Transport, TransportOptions, TransportResponse, is_transient};
use crate::error::{TransportError, TransportErrorKind};

/// Production transport on top of the blocking `reqwest` client.
///
/// `read_timeout` bounds each request as a whole, since the blocking client
/// applies a single timeout from connect until the body is drained.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    max_retry_count: u32,
    retry_backoff: Duration,
}

impl ReqwestTransport {
    pub fn new(options: TransportOptions) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                TransportError::protocol(format!("invalid header name {name:?}")).with_source(e)
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                TransportError::protocol(format!("invalid value for header {name}")).with_source(e)
            })?;
            headers.append(name, value);
        }

        let mut builder = Client::builder()
            .connect_timeout(options.connect_timeout)
            .timeout(options.read_timeout)
            .default_headers(headers);
        if let Some(user_agent) = &options.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder.build().map_err(map_reqwest_error)?;

        Ok(Self {
            client,
            max_retry_count: options.max_retry_count,
            retry_backoff: options.retry_backoff,
        })
    }
}

impl Transport for ReqwestTransport {
    fn open(&self, uri: &str) -> Result<Box<dyn TransportResponse>, TransportError> {
        let response = self.client.get(uri).send().map_err(map_reqwest_error)?;
        Ok(Box::new(ReqwestResponse::new(response)))
    }

    fn max_retry_count(&self) -> u32 {
        self.max_retry_count
    }

    fn is_retryable(&self, error: &TransportError) -> bool {
        is_transient(error)
    }

    fn retry_backoff(&self) -> Duration {
        self.retry_backoff
    }
}

struct ReqwestResponse {
    status: u16,
    content_length: Option<u64>,
    chunked: bool,
    headers: String,
    response: Option<Response>,
}

impl ReqwestResponse {
    fn new(response: Response) -> Self {
        let chunked = response
            .headers()
            .get_all(TRANSFER_ENCODING)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.to_ascii_lowercase().contains("chunked"));
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value.to_str().unwrap_or("<binary>")))
            .collect::<Vec<_>>()
            .join("; ");

        Self {
            status: response.status().as_u16(),
            content_length: response.content_length(),
            chunked,
            headers: format!("[{headers}]"),
            response: Some(response),
        }
    }
}

impl TransportResponse for ReqwestResponse {
    fn status_code(&self) -> Result<u16, TransportError> {
        Ok(self.status)
    }

    fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    fn is_chunked(&self) -> bool {
        self.chunked
    }

    fn headers_string(&self) -> String {
        self.headers.clone()
    }

    fn body(&mut self) -> Result<Box<dyn Read + Send>, TransportError> {
        self.response
            .take()
            .map(|response| Box::new(BodyReader(response)) as Box<dyn Read + Send>)
            .ok_or_else(|| {
                TransportError::new(TransportErrorKind::Other, "response body already taken")
            })
    }

    fn release(&mut self) {
        self.response = None;
    }
}

/// Surfaces reqwest timeouts as `TimedOut` so the retry policy sees them.
struct BodyReader(Response);

impl Read for BodyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf).map_err(|err| {
            let timed_out = err
                .get_ref()
                .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
                .is_some_and(reqwest::Error::is_timeout);
            if timed_out {
                io::Error::new(io::ErrorKind::TimedOut, err)
            } else {
                err
            }
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else if err.is_builder() || err.is_request() || err.is_decode() || err.is_redirect() {
        TransportErrorKind::Protocol
    } else if err.is_body() {
        TransportErrorKind::Io
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, err.to_string()).with_source(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_with_defaults() {
        let transport = ReqwestTransport::new(TransportOptions::default()).unwrap();
        assert_eq!(transport.max_retry_count(), 0);
        assert_eq!(transport.retry_backoff(), Duration::ZERO);
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let options = TransportOptions::default().header("bad header", "x");
        let err = ReqwestTransport::new(options).unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::Protocol);
    }

    #[test]
    fn test_timeouts_are_retryable() {
        let transport =
            ReqwestTransport::new(TransportOptions::default().max_retry_count(3)).unwrap();
        assert_eq!(transport.max_retry_count(), 3);
        assert!(transport.is_retryable(&TransportError::timeout("slow")));
        assert!(!transport.is_retryable(&TransportError::connect("refused")));
    }

    #[test]
    fn test_invalid_url_fails_without_network() {
        let transport = ReqwestTransport::new(TransportOptions::default()).unwrap();
        let err = transport.open("not a url").err().unwrap();
        assert!(!transport.is_retryable(&err));
    }
}
