//! Blocking download-and-cache engine.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - request, progress and result types
//! - [`core`] - pure decisions (progress throttling, completeness, retry policy)
//! - [`effects`] - the transport contract and the [`Downloader`] that drives it
//!
//! # Guarantees
//!
//! - **Per-key exclusion**: writers for one disk-cache key hold a
//!   [`sluice_cache::KeyLock`] for the whole lookup/download/commit sequence
//! - **Commit or abort**: every exit path either commits the cache editor or
//!   aborts it, so the cache never exposes partial data
//! - **Cooperative cancellation**: a flag polled at fixed checkpoints; a
//!   blocking read in progress always finishes first

pub mod config;
pub mod core;
pub mod data;
pub mod effects;
mod error;
mod tracker;

pub use config::{Configuration, ConfigurationBuilder, NetworkKind, PauseDownloadController};
pub use data::{
    DataSource, DownloadRequest, DownloadResult, Progress, ProgressCallback, RequestHandle,
    RequestStatus, ResultData,
};
pub use effects::{Downloader, Transport, TransportOptions, TransportResponse};
pub use error::{DownloadError, ErrorCause, TransportError, TransportErrorKind};
pub use tracker::{ErrorTracker, LogErrorTracker};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestTransport;
