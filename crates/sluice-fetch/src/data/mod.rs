//! Immutable data types for download operations.
//!
//! Requests, progress snapshots, and results. A [`DownloadRequest`] carries
//! the only mutable state, its cancellation flag and status, behind a shared
//! [`RequestHandle`] so observers on other threads can read it.

pub mod progress;
pub mod request;
pub mod result;

pub use progress::{Progress, ProgressCallback};
pub use request::{DownloadRequest, RequestHandle, RequestStatus};
pub use result::{DataSource, DownloadResult, ResultData};
