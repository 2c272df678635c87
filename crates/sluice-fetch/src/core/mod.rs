//! Pure decisions used by the downloader.
//!
//! Nothing in here performs I/O; every function takes plain values so the
//! state machine's rules can be tested without a transport or a disk.

mod retry;
mod throttle;
mod validation;

pub use retry::{RetryDecision, decide_retry, retry_delay};
pub use throttle::{PROGRESS_INTERVAL, ProgressThrottle};
pub use validation::{ContentLengthCheck, check_content_length, is_fully_read, is_success_status};
