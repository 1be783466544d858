//! Wire types for the Dump Hub HTTP API.

use serde::{Deserialize, Serialize};

/// One chunk request for a queued file
#[derive(Debug, Clone)]
pub struct ChunkUpload {
    pub upload_id: String,
    pub filename: String,
    pub offset: u64,
    pub total_size: u64,
    pub bytes: Vec<u8>,
}

/// File waiting in the server upload folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileObj {
    pub filename: String,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesResult {
    #[serde(default)]
    pub dir: String,
    #[serde(default)]
    pub files: Vec<FileObj>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewRequest {
    pub filename: String,
    pub start: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreviewResult {
    #[serde(default)]
    pub preview: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub filename: String,
    pub pattern: String,
    pub columns: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub page: u32,
}

/// Indexed entry returned by a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub origin: String,
    pub origin_id: String,
    #[serde(default)]
    pub data: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub results: Vec<Entry>,
    #[serde(rename = "tot", default)]
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
    pub page: u32,
}

/// Processing state of an analyzed file, as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusKind {
    Processing,
    Deleting,
    Enqueued,
    Error,
    Complete,
    Unknown,
}

impl StatusKind {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => StatusKind::Processing,
            1 => StatusKind::Deleting,
            2 => StatusKind::Enqueued,
            3 => StatusKind::Error,
            4 => StatusKind::Complete,
            _ => StatusKind::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusKind::Processing => "processing",
            StatusKind::Deleting => "deleting",
            StatusKind::Enqueued => "enqueued",
            StatusKind::Error => "error",
            StatusKind::Complete => "complete",
            StatusKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub date: String,
    pub filename: String,
    pub checksum: String,
    pub status: i32,
}

impl StatusEntry {
    pub fn kind(&self) -> StatusKind {
        StatusKind::from_code(self.status)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusResult {
    #[serde(default)]
    pub results: Vec<StatusEntry>,
    #[serde(rename = "tot", default)]
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub checksum: String,
}
