//! Effectful layer: the transport seam and the orchestrator that drives it.

mod downloader;
#[cfg(feature = "reqwest")]
mod http;
mod transport;

pub use downloader::Downloader;
#[cfg(feature = "reqwest")]
pub use http::ReqwestTransport;
pub use transport::{Transport, TransportOptions, TransportResponse};
