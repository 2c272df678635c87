/// Only `200 OK` is accepted; partial content and redirects that the
/// transport did not follow are failures.
pub fn is_success_status(status: u16) -> bool {
    status == 200
}

/// Outcome of inspecting the declared body length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentLengthCheck {
    /// Length declared and positive; the byte count must match it.
    Exact(u64),
    /// No positive length, but the body is chunked; end of stream decides.
    Chunked,
    /// Neither a positive length nor chunked transfer.
    Invalid,
}

impl ContentLengthCheck {
    pub fn expected(&self) -> Option<u64> {
        match self {
            ContentLengthCheck::Exact(len) => Some(*len),
            ContentLengthCheck::Chunked | ContentLengthCheck::Invalid => None,
        }
    }
}

/// Validates the declared content length.
///
/// # Examples
///
/// ```
/// use sluice_fetch::core::{ContentLengthCheck, check_content_length};
///
/// assert_eq!(check_content_length(Some(10), false), ContentLengthCheck::Exact(10));
/// assert_eq!(check_content_length(None, true), ContentLengthCheck::Chunked);
/// assert_eq!(check_content_length(Some(0), false), ContentLengthCheck::Invalid);
/// ```
pub fn check_content_length(content_length: Option<u64>, chunked: bool) -> ContentLengthCheck {
    match content_length {
        Some(len) if len > 0 => ContentLengthCheck::Exact(len),
        _ if chunked => ContentLengthCheck::Chunked,
        _ => ContentLengthCheck::Invalid,
    }
}

/// A body is fully read when it was chunked (end of stream is
/// authoritative) or exactly the declared number of bytes arrived.
pub fn is_fully_read(check: ContentLengthCheck, completed: u64) -> bool {
    match check {
        ContentLengthCheck::Chunked => true,
        ContentLengthCheck::Exact(expected) => completed == expected,
        ContentLengthCheck::Invalid => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_200_is_success() {
        assert!(is_success_status(200));
        for code in [201, 204, 206, 301, 304, 404, 500, 503] {
            assert!(!is_success_status(code), "{code} should fail");
        }
    }

    #[test]
    fn test_content_length_rules() {
        assert_eq!(check_content_length(Some(1000), false), ContentLengthCheck::Exact(1000));
        assert_eq!(check_content_length(None, false), ContentLengthCheck::Invalid);
        assert_eq!(check_content_length(Some(0), true), ContentLengthCheck::Chunked);
        assert_eq!(check_content_length(None, true), ContentLengthCheck::Chunked);
        assert_eq!(check_content_length(Some(1000), true), ContentLengthCheck::Exact(1000));
    }

    #[test]
    fn test_fully_read() {
        let exact = ContentLengthCheck::Exact(1000);
        assert!(is_fully_read(exact, 1000));
        assert!(!is_fully_read(exact, 800));
        assert!(!is_fully_read(exact, 1200));
        assert!(is_fully_read(ContentLengthCheck::Chunked, 0));
        assert!(is_fully_read(ContentLengthCheck::Chunked, 12_345));
    }
}
