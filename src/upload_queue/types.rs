//! Type definitions for the upload queue.
//!
//! Defines chunk descriptors, per-file upload states, queue summaries and
//! constants.

use serde::{Deserialize, Serialize};

use super::task::SelectedFile;

/// Largest file the server accepts (10 GB)
pub const MAX_FILE_SIZE: u64 = 10_000 * 1_000_000;

/// Contiguous byte range of a file, sent as one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDescriptor {
    pub offset: u64,
    pub length: u64,
}

impl ChunkDescriptor {
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

/// Lifecycle of one queued file. `Complete` and `Failed` are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadState {
    Pending,
    Uploading,
    Complete,
    Failed,
}

impl UploadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Complete | UploadState::Failed)
    }
}

/// Queue summary
#[derive(Debug, Clone, Serialize)]
pub struct UploadStatus {
    pub pending: usize,
    pub uploading: usize,
    pub complete: usize,
    pub failed: usize,
    pub files: Vec<SelectedFile>,
}
