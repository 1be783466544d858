#![allow(dead_code)]

use async_trait::async_trait;
use dumphub_client::api::*;
use dumphub_client::error::{DumpHubError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RecordedChunk {
    pub upload_id: String,
    pub filename: String,
    pub offset: u64,
    pub total_size: u64,
    pub bytes: Vec<u8>,
}

/// In-memory server. Chunk failures and delays are keyed by offset.
#[derive(Default)]
pub struct MockApi {
    pub chunks: Mutex<Vec<RecordedChunk>>,
    pub chunk_failures: HashMap<u64, String>,
    pub chunk_delays: HashMap<u64, Duration>,
    pub listing_calls: AtomicUsize,
    pub stored: Mutex<Vec<FileObj>>,
    pub preview_lines: Vec<String>,
    pub preview_calls: Mutex<Vec<(String, usize)>>,
    pub analyze_calls: Mutex<Vec<AnalyzeRequest>>,
    pub analyze_error: Option<String>,
}

impl MockApi {
    pub fn failing_at(offset: u64, message: &str) -> Self {
        let mut api = Self::default();
        api.chunk_failures.insert(offset, message.to_string());
        api
    }

    pub fn with_preview(lines: &[&str]) -> Self {
        Self {
            preview_lines: lines.iter().map(|l| l.to_string()).collect(),
            stored: Mutex::new(vec![
                FileObj {
                    filename: "combo.txt".to_string(),
                    size: 2048,
                },
                FileObj {
                    filename: "leak.csv".to_string(),
                    size: 4096,
                },
            ]),
            ..Default::default()
        }
    }

    pub fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::SeqCst)
    }

    /// Offsets in the order the chunk requests reached the server
    pub fn sent_offsets(&self, upload_id: &str) -> Vec<u64> {
        self.chunks
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.upload_id == upload_id)
            .map(|c| c.offset)
            .collect()
    }

    pub fn chunks_for(&self, upload_id: &str) -> Vec<RecordedChunk> {
        let mut chunks: Vec<RecordedChunk> = self
            .chunks
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.upload_id == upload_id)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.offset);
        chunks
    }
}

#[async_trait]
impl RemoteApi for MockApi {
    async fn upload_chunk(&self, chunk: ChunkUpload) -> Result<()> {
        if let Some(delay) = self.chunk_delays.get(&chunk.offset) {
            tokio::time::sleep(*delay).await;
        }

        self.chunks.lock().unwrap().push(RecordedChunk {
            upload_id: chunk.upload_id,
            filename: chunk.filename,
            offset: chunk.offset,
            total_size: chunk.total_size,
            bytes: chunk.bytes,
        });

        match self.chunk_failures.get(&chunk.offset) {
            Some(message) => Err(DumpHubError::ChunkUpload(message.clone())),
            None => Ok(()),
        }
    }

    async fn list_files(&self) -> Result<FilesResult> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        Ok(FilesResult {
            dir: "/opt/dumphub/uploads".to_string(),
            files: self.stored.lock().unwrap().clone(),
        })
    }

    async fn get_preview(&self, filename: &str, start_line: usize) -> Result<PreviewResult> {
        self.preview_calls
            .lock()
            .unwrap()
            .push((filename.to_string(), start_line));
        Ok(PreviewResult {
            preview: self.preview_lines.iter().skip(start_line).cloned().collect(),
        })
    }

    async fn delete_file(&self, filename: &str) -> Result<()> {
        self.stored.lock().unwrap().retain(|f| f.filename != filename);
        Ok(())
    }

    async fn analyze(&self, request: &AnalyzeRequest) -> Result<()> {
        self.analyze_calls.lock().unwrap().push(request.clone());
        match &self.analyze_error {
            Some(message) => Err(DumpHubError::Api(message.clone())),
            None => Ok(()),
        }
    }

    async fn search(&self, _query: &str, _page: u32) -> Result<SearchResult> {
        Ok(SearchResult::default())
    }

    async fn get_status(&self, _page: u32) -> Result<StatusResult> {
        Ok(StatusResult::default())
    }

    async fn delete(&self, _checksum: &str) -> Result<()> {
        Ok(())
    }
}
