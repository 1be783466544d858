//! Per-file upload state and its transitions.
//!
//! A [`SelectedFile`] is only changed through `start`, `record_success`
//! and `record_failure`. Once a file is complete or failed, later chunk
//! outcomes are ignored.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::source::FileSource;
use super::types::UploadState;

#[derive(Debug, Clone, Serialize)]
pub struct SelectedFile {
    pub id: String,
    pub filename: String,
    #[serde(skip)]
    pub source: FileSource,
    pub total_size: u64,
    pub total_chunks: usize,
    pub chunks_sent: usize,
    /// Integer percent, see [`progress_percent`]
    pub progress: u8,
    pub complete: bool,
    pub error: Option<String>,
    pub state: UploadState,
    pub queued_at: DateTime<Utc>,
}

/// Progress percent after `chunks_sent` of `total_chunks`.
///
/// Rounds up, but 100 is reserved for a finished file: with more than a
/// hundred chunks the last few would otherwise already read 100.
pub fn progress_percent(chunks_sent: usize, total_chunks: usize) -> u8 {
    if total_chunks == 0 {
        return 0;
    }
    if chunks_sent >= total_chunks {
        return 100;
    }
    let percent = (chunks_sent as u64 * 100).div_ceil(total_chunks as u64);
    percent.min(99) as u8
}

impl SelectedFile {
    pub fn new(
        id: String,
        filename: String,
        source: FileSource,
        total_size: u64,
        total_chunks: usize,
    ) -> Self {
        Self {
            id,
            filename,
            source,
            total_size,
            total_chunks,
            chunks_sent: 0,
            progress: 0,
            complete: false,
            error: None,
            state: UploadState::Pending,
            queued_at: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Pending -> Uploading. Happens once per file.
    pub fn start(&mut self) -> bool {
        if self.state != UploadState::Pending {
            return false;
        }
        self.state = UploadState::Uploading;
        true
    }

    /// Next chunk in order resolved successfully. Returns false when the
    /// outcome was ignored.
    pub fn record_success(&mut self) -> bool {
        if self.state != UploadState::Uploading || self.chunks_sent >= self.total_chunks {
            return false;
        }

        self.chunks_sent += 1;
        self.progress = progress_percent(self.chunks_sent, self.total_chunks);

        if self.chunks_sent == self.total_chunks {
            self.complete = true;
            self.state = UploadState::Complete;
        }
        true
    }

    /// A chunk failed. The first failure makes the file terminal.
    pub fn record_failure(&mut self, message: String) -> bool {
        if self.state != UploadState::Uploading {
            return false;
        }

        self.error = Some(message);
        self.state = UploadState::Failed;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(total_chunks: usize) -> SelectedFile {
        SelectedFile::new(
            "test-id".to_string(),
            "dump.txt".to_string(),
            FileSource::from_bytes(Vec::new()),
            1024,
            total_chunks,
        )
    }

    #[test]
    fn test_progress_percent_rounds_up() {
        assert_eq!(progress_percent(0, 3), 0);
        assert_eq!(progress_percent(1, 3), 34);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(3, 3), 100);
        assert_eq!(progress_percent(1, 1000), 1);
        assert_eq!(progress_percent(999, 1000), 99);
    }

    #[test]
    fn test_success_path() {
        let mut f = file(3);
        assert!(!f.record_success(), "pending files ignore outcomes");
        assert!(f.start());
        assert!(!f.start());

        let mut last = 0;
        for _ in 0..3 {
            assert!(f.record_success());
            assert!(f.progress >= last);
            last = f.progress;
        }

        assert!(f.complete);
        assert_eq!(f.state, UploadState::Complete);
        assert_eq!(f.progress, 100);
        assert!(!f.record_success());
        assert!(!f.record_failure("late".to_string()));
        assert!(f.error.is_none());
    }

    #[test]
    fn test_failure_is_absorbing() {
        let mut f = file(3);
        f.start();
        f.record_success();

        assert!(f.record_failure("disk full".to_string()));
        assert_eq!(f.state, UploadState::Failed);
        assert_eq!(f.error.as_deref(), Some("disk full"));
        assert!(!f.complete);

        // Later outcomes change nothing
        assert!(!f.record_success());
        assert!(!f.record_failure("other".to_string()));
        assert_eq!(f.chunks_sent, 1);
        assert_eq!(f.progress, 34);
        assert_eq!(f.error.as_deref(), Some("disk full"));
    }

    #[test]
    fn test_progress_reaches_100_only_when_complete() {
        let mut f = file(1000);
        f.start();
        for _ in 0..999 {
            f.record_success();
            assert!(f.progress < 100);
        }
        assert_eq!(f.progress, 99);
        assert!(!f.complete);
        f.record_success();
        assert!(f.complete);
        assert_eq!(f.progress, 100);
    }
}
