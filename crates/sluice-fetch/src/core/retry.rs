use std::time::Duration;

/// What the retry loop does with a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// The request was canceled; cancellation beats any retry.
    Cancel,
    /// Transient failure with budget left.
    Retry,
    /// Give up and surface the error.
    Fail,
}

/// Decides the fate of a failed attempt.
///
/// `retry_count` is the number of retries already spent; the first attempt
/// is not a retry, so `max_retry_count = 2` allows three attempts in total.
///
/// # Examples
///
/// ```
/// use sluice_fetch::core::{RetryDecision, decide_retry};
///
/// assert_eq!(decide_retry(false, true, 0, 2), RetryDecision::Retry);
/// assert_eq!(decide_retry(false, true, 2, 2), RetryDecision::Fail);
/// assert_eq!(decide_retry(true, true, 0, 2), RetryDecision::Cancel);
/// ```
pub fn decide_retry(
    canceled: bool,
    retryable: bool,
    retry_count: u32,
    max_retry_count: u32,
) -> RetryDecision {
    if canceled {
        RetryDecision::Cancel
    } else if retryable && retry_count < max_retry_count {
        RetryDecision::Retry
    } else {
        RetryDecision::Fail
    }
}

/// Delay before retry number `retry_count` (0-indexed) with exponential
/// backoff: `base * 2^retry_count`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use sluice_fetch::core::retry_delay;
///
/// assert_eq!(retry_delay(0, Duration::from_millis(100)), Duration::from_millis(100));
/// assert_eq!(retry_delay(2, Duration::from_millis(100)), Duration::from_millis(400));
/// ```
pub fn retry_delay(retry_count: u32, base: Duration) -> Duration {
    let multiplier = 2_u32.saturating_pow(retry_count);
    base.saturating_mul(multiplier)
}
