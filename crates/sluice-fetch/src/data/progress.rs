use std::sync::Arc;

/// Snapshot passed to progress callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Declared length of the body, or `None` for chunked transfers.
    pub total_bytes: Option<u64>,

    /// Bytes read from the body so far in the current attempt.
    pub completed_bytes: u64,
}

impl Progress {
    pub fn new(total_bytes: Option<u64>, completed_bytes: u64) -> Self {
        Self {
            total_bytes,
            completed_bytes,
        }
    }

    /// Percentage of completion, `None` when the total is unknown.
    #[must_use]
    pub fn percentage(&self) -> Option<f64> {
        self.total_bytes.map(|total| {
            if total == 0 {
                100.0
            } else {
                (self.completed_bytes as f64 / total as f64) * 100.0
            }
        })
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total_bytes.is_some_and(|total| self.completed_bytes >= total)
    }
}

/// Callback invoked with throttled progress updates.
///
/// Invoked on the thread running the download, at most once every 100ms
/// while data flows plus once more at end of stream.
pub type ProgressCallback = Arc<dyn Fn(&Progress) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        assert_eq!(Progress::new(Some(200), 50).percentage(), Some(25.0));
        assert_eq!(Progress::new(None, 50).percentage(), None);
        assert!(Progress::new(Some(10), 10).is_complete());
        assert!(!Progress::new(None, 10).is_complete());
    }
}
