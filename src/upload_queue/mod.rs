// Module declarations
mod planner;
mod processor;
mod source;
mod task;
mod types;

pub use planner::{chunk_count, plan};
pub use source::FileSource;
pub use task::{progress_percent, SelectedFile};
pub use types::*;

use crate::api::{FilesResult, RemoteApi};
use crate::config::DumpHubConfig;
use crate::error::{DumpHubError, Result};
use crate::events::{EventBus, EventReceiver};
use crate::logging::{log_info, log_warn};
use indexmap::IndexMap;
use processor::{SharedFiles, SharedListing, UploadProcessor};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Chunked upload queue. Every enqueued file starts uploading immediately
/// and proceeds independently of the others.
#[derive(Clone)]
pub struct UploadQueue {
    files: SharedFiles,
    listing: SharedListing,
    drivers: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
    processor: UploadProcessor,
    events: EventBus,
    chunk_size: u64,
}

impl std::fmt::Debug for UploadQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadQueue")
            .field("files", &"<queued files>")
            .field("listing", &"<latest listing>")
            .field("drivers", &"<upload tasks>")
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

impl UploadQueue {
    pub fn new(
        api: Arc<dyn RemoteApi>,
        events: EventBus,
        chunk_size: u64,
        max_chunks_in_flight: usize,
    ) -> Self {
        let files: SharedFiles = Arc::new(Mutex::new(IndexMap::new()));
        let listing: SharedListing = Arc::new(Mutex::new(None));
        let processor = UploadProcessor::new(
            Arc::clone(&files),
            Arc::clone(&listing),
            api,
            events.clone(),
            max_chunks_in_flight,
        );

        Self {
            files,
            listing,
            drivers: Arc::new(Mutex::new(HashMap::new())),
            processor,
            events,
            chunk_size,
        }
    }

    pub fn from_config(api: Arc<dyn RemoteApi>, events: EventBus, config: &DumpHubConfig) -> Self {
        Self::new(
            api,
            events,
            config.chunk_size,
            config.max_chunks_in_flight,
        )
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Plan the file and start uploading it. Returns the upload id.
    pub async fn enqueue(&self, source: FileSource, filename: impl Into<String>) -> Result<String> {
        let filename = filename.into();
        let total_size = source.len().await?;

        if total_size > MAX_FILE_SIZE {
            return Err(DumpHubError::Planning(format!(
                "{} is {} bytes, larger than the {} byte limit",
                filename, total_size, MAX_FILE_SIZE
            )));
        }

        let mut descriptors = plan(total_size, self.chunk_size)?;
        if descriptors.is_empty() {
            // An empty file still needs one request so the server creates it
            log_warn(
                "upload-queue",
                &format!("⚠ {} is empty, sending a single empty chunk", filename),
            )
            .unwrap_or_default();
            descriptors.push(ChunkDescriptor {
                offset: 0,
                length: 0,
            });
        }

        let id = Uuid::new_v4().to_string();
        let file = SelectedFile::new(
            id.clone(),
            filename.clone(),
            source,
            total_size,
            descriptors.len(),
        );

        self.lock_files()?.insert(id.clone(), file);

        log_info(
            "upload-queue",
            &format!(
                "Queued {} as {} ({} chunks)",
                filename,
                id,
                descriptors.len()
            ),
        )
        .unwrap_or_default();

        let driver = self.processor.start(id.clone(), descriptors);
        self.lock_drivers()?.insert(id.clone(), driver);

        Ok(id)
    }

    /// Enqueue a file from disk under its base name
    pub async fn enqueue_path(&self, path: &Path) -> Result<String> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                DumpHubError::Validation(format!("{} has no file name", path.display()))
            })?;

        if !tokio::fs::metadata(path).await?.is_file() {
            return Err(DumpHubError::Validation(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        self.enqueue(FileSource::from_path(path), filename).await
    }

    pub fn get(&self, id: &str) -> Option<SelectedFile> {
        self.files.lock().ok()?.get(id).cloned()
    }

    /// All files in the order they were enqueued
    pub fn snapshot(&self) -> Vec<SelectedFile> {
        self.files
            .lock()
            .map(|files| files.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn status(&self) -> UploadStatus {
        let files = self.snapshot();
        let count = |state: UploadState| files.iter().filter(|f| f.state == state).count();

        UploadStatus {
            pending: count(UploadState::Pending),
            uploading: count(UploadState::Uploading),
            complete: count(UploadState::Complete),
            failed: count(UploadState::Failed),
            files,
        }
    }

    /// Listing fetched after the most recent terminal upload, if any
    pub fn latest_listing(&self) -> Option<FilesResult> {
        self.listing.lock().ok()?.clone()
    }

    /// Wait for one file to become terminal and return its final state
    pub async fn wait(&self, id: &str) -> Option<SelectedFile> {
        let driver = self.drivers.lock().ok()?.remove(id);
        if let Some(driver) = driver {
            let _ = driver.await;
        }
        self.get(id)
    }

    /// Wait for every file enqueued so far
    pub async fn wait_all(&self) -> Vec<SelectedFile> {
        let drivers: Vec<JoinHandle<()>> = match self.drivers.lock() {
            Ok(mut drivers) => drivers.drain().map(|(_, driver)| driver).collect(),
            Err(_) => Vec::new(),
        };

        for driver in drivers {
            let _ = driver.await;
        }

        self.snapshot()
    }

    /// Drop a finished file from the queue. In-flight files cannot be removed.
    pub fn discard(&self, id: &str) -> Result<SelectedFile> {
        let mut files = self.lock_files()?;
        match files.get(id) {
            None => Err(DumpHubError::Validation(format!("Upload {} not found", id))),
            Some(file) if !file.is_terminal() => Err(DumpHubError::Validation(format!(
                "Upload {} is still in progress",
                id
            ))),
            Some(_) => {
                let removed = files
                    .shift_remove(id)
                    .ok_or_else(|| DumpHubError::Validation(format!("Upload {} not found", id)))?;
                drop(files);
                if let Ok(mut drivers) = self.drivers.lock() {
                    drivers.remove(id);
                }
                Ok(removed)
            }
        }
    }

    /// Remove every complete or failed file, returning how many were removed
    pub fn clear_finished(&self) -> usize {
        let Ok(mut files) = self.files.lock() else {
            return 0;
        };
        let finished: Vec<String> = files
            .values()
            .filter(|f| f.is_terminal())
            .map(|f| f.id.clone())
            .collect();

        for id in &finished {
            files.shift_remove(id);
        }
        drop(files);

        if let Ok(mut drivers) = self.drivers.lock() {
            for id in &finished {
                drivers.remove(id);
            }
        }

        finished.len()
    }

    fn lock_files(&self) -> Result<std::sync::MutexGuard<'_, IndexMap<String, SelectedFile>>> {
        self.files
            .lock()
            .map_err(|e| DumpHubError::LockPoisoned(format!("upload files: {}", e)))
    }

    fn lock_drivers(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, JoinHandle<()>>>> {
        self.drivers
            .lock()
            .map_err(|e| DumpHubError::LockPoisoned(format!("upload tasks: {}", e)))
    }
}
