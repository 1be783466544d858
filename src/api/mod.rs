//! Remote Dump Hub API.
//!
//! The upload queue and preview sessions only talk to the server through
//! [`RemoteApi`], so tests can swap in an in-memory implementation.

mod http;
pub mod types;

pub use http::HttpApi;
pub use types::*;

use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Send one chunk of a queued file
    async fn upload_chunk(&self, chunk: ChunkUpload) -> Result<()>;

    /// Files waiting in the server upload folder
    async fn list_files(&self) -> Result<FilesResult>;

    /// Preview lines of a stored file starting at `start_line`
    async fn get_preview(&self, filename: &str, start_line: usize) -> Result<PreviewResult>;

    /// Remove a file from the upload folder
    async fn delete_file(&self, filename: &str) -> Result<()>;

    /// Submit a background analysis job. Success means accepted, not finished.
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<()>;

    async fn search(&self, query: &str, page: u32) -> Result<SearchResult>;

    /// Page of analysis status entries
    async fn get_status(&self, page: u32) -> Result<StatusResult>;

    /// Delete indexed entries by checksum
    async fn delete(&self, checksum: &str) -> Result<()>;
}
